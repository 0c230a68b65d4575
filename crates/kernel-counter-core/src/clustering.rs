//! Two-group clustering of per-object mean colours.
//!
//! Grouping and group identity are separate steps: any
//! [`TwoGroupClusterer`] produces a raw [`Partition`], and [`canonicalize`]
//! relabels it so that group 0 is always the brighter one on the configured
//! brightness channel (green for GFP-marked kernels).

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Parameters for the two-group classifier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Channel whose per-group mean decides which group is "bright".
    pub brightness_channel: usize,
    /// Max Lloyd iterations.
    pub max_iters: usize,
    /// Stop once no center moves further than this (0..255 units).
    pub tolerance: f32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            brightness_channel: 1,
            max_iters: 100,
            tolerance: 1e-4,
        }
    }
}

/// Assignment of each sample to group 0 or 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub labels: Vec<u8>,
}

impl Partition {
    pub fn counts(&self) -> [usize; 2] {
        let ones = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - ones, ones]
    }

    /// Exchange the two group identities.
    pub fn swapped(self) -> Self {
        Self {
            labels: self.labels.into_iter().map(|l| 1 - l).collect(),
        }
    }

    fn channel_mean(&self, samples: &[Vector3<f32>], group: u8, channel: usize) -> Option<f32> {
        let (sum, n) = self
            .labels
            .iter()
            .zip(samples)
            .filter(|&(&l, _)| l == group)
            .fold((0.0f64, 0usize), |(s, n), (_, v)| (s + v[channel] as f64, n + 1));
        (n > 0).then(|| (sum / n as f64) as f32)
    }
}

/// Anything that splits samples into two unnamed groups.
pub trait TwoGroupClusterer {
    fn partition(&self, samples: &[Vector3<f32>]) -> Partition;
}

/// Lloyd's 2-means with deterministic seeding.
///
/// The two initial centers are the samples with the lowest and highest value
/// on `seed_channel`, so repeated runs give identical groups.
#[derive(Clone, Copy, Debug)]
pub struct KMeans2 {
    pub seed_channel: usize,
    pub max_iters: usize,
    pub tolerance: f32,
}

impl KMeans2 {
    pub fn from_params(params: &ClusterParams) -> Self {
        Self {
            seed_channel: params.brightness_channel,
            max_iters: params.max_iters,
            tolerance: params.tolerance,
        }
    }

    fn initial_centers(&self, samples: &[Vector3<f32>]) -> Option<[Vector3<f32>; 2]> {
        let c = self.seed_channel;
        let mut lo = 0usize;
        let mut hi = 0usize;
        for (i, s) in samples.iter().enumerate() {
            if s[c] < samples[lo][c] {
                lo = i;
            }
            if s[c] > samples[hi][c] {
                hi = i;
            }
        }
        if samples[lo] != samples[hi] {
            return Some([samples[lo], samples[hi]]);
        }
        // Flat on the seed channel: fall back to the sample farthest from the first one.
        let first = samples[0];
        let (far, dist) = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (i, (s - first).norm_squared()))
            .fold((0, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
        (dist > 0.0).then(|| [first, samples[far]])
    }
}

fn nearest(sample: &Vector3<f32>, centers: &[Vector3<f32>; 2]) -> u8 {
    let d0 = (sample - centers[0]).norm_squared();
    let d1 = (sample - centers[1]).norm_squared();
    if d1 < d0 {
        1
    } else {
        0
    }
}

impl TwoGroupClusterer for KMeans2 {
    fn partition(&self, samples: &[Vector3<f32>]) -> Partition {
        let Some(mut centers) = (if samples.len() < 2 {
            None
        } else {
            self.initial_centers(samples)
        }) else {
            // Zero or one sample, or all samples identical.
            return Partition {
                labels: vec![0; samples.len()],
            };
        };

        let mut labels = vec![u8::MAX; samples.len()];
        for iter in 0..self.max_iters {
            let mut changed = false;
            for (l, s) in labels.iter_mut().zip(samples) {
                let new_label = nearest(s, &centers);
                if *l != new_label {
                    *l = new_label;
                    changed = true;
                }
            }

            let mut sums = [Vector3::<f32>::zeros(); 2];
            let mut counts = [0usize; 2];
            for (&l, s) in labels.iter().zip(samples) {
                sums[l as usize] += s;
                counts[l as usize] += 1;
            }
            let mut shift = 0.0f32;
            for g in 0..2 {
                if counts[g] > 0 {
                    let updated = sums[g] / counts[g] as f32;
                    shift = shift.max((updated - centers[g]).norm());
                    centers[g] = updated;
                }
            }

            if !changed || shift < self.tolerance {
                debug!("k-means converged after {} iterations", iter + 1);
                break;
            }
        }

        Partition { labels }
    }
}

/// Relabel `partition` so that group 0 has the higher mean on `channel`.
///
/// An empty group never outranks a populated one. Ties keep the input order.
pub fn canonicalize(partition: Partition, samples: &[Vector3<f32>], channel: usize) -> Partition {
    let m0 = partition.channel_mean(samples, 0, channel);
    let m1 = partition.channel_mean(samples, 1, channel);
    let swap = match (m0, m1) {
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a < b,
        _ => false,
    };
    if swap {
        partition.swapped()
    } else {
        partition
    }
}

/// Outcome of classifying one image's objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Group per input sample: 0 = bright, 1 = not bright.
    pub labels: Vec<u8>,
    /// `[bright, not bright]`.
    pub counts: [usize; 2],
    /// Mean colour of each group, `None` for an empty group.
    pub group_means: [Option<Vector3<f32>>; 2],
}

/// Split mean colours into bright / not-bright groups.
///
/// An empty input short-circuits to zero counts without clustering.
pub fn classify_intensities(samples: &[Vector3<f32>], params: &ClusterParams) -> Classification {
    if samples.is_empty() {
        return Classification::default();
    }
    let raw = KMeans2::from_params(params).partition(samples);
    let partition = canonicalize(raw, samples, params.brightness_channel);

    let mut group_means = [None; 2];
    for (g, mean) in group_means.iter_mut().enumerate() {
        let members: Vec<&Vector3<f32>> = partition
            .labels
            .iter()
            .zip(samples)
            .filter(|&(&l, _)| l as usize == g)
            .map(|(_, s)| s)
            .collect();
        if !members.is_empty() {
            let sum: Vector3<f32> = members.iter().copied().sum();
            *mean = Some(sum / members.len() as f32);
        }
    }

    Classification {
        counts: partition.counts(),
        labels: partition.labels,
        group_means,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bright(g: f32) -> Vector3<f32> {
        Vector3::new(60.0, g, 180.0)
    }

    #[test]
    fn empty_input_counts_zero() {
        let res = classify_intensities(&[], &ClusterParams::default());
        assert_eq!(res.counts, [0, 0]);
        assert!(res.labels.is_empty());
    }

    #[test]
    fn single_sample_is_bright() {
        let res = classify_intensities(&[bright(90.0)], &ClusterParams::default());
        assert_eq!(res.counts, [1, 0]);
        assert_eq!(res.labels, vec![0]);
        assert!(res.group_means[1].is_none());
    }

    #[test]
    fn identical_samples_form_one_group() {
        let samples = vec![bright(120.0); 4];
        let res = classify_intensities(&samples, &ClusterParams::default());
        assert_eq!(res.counts, [4, 0]);
    }

    #[test]
    fn separates_two_colour_groups() {
        let samples = vec![
            bright(200.0),
            bright(60.0),
            bright(210.0),
            bright(55.0),
            bright(65.0),
        ];
        let res = classify_intensities(&samples, &ClusterParams::default());
        assert_eq!(res.labels, vec![0, 1, 0, 1, 1]);
        assert_eq!(res.counts, [2, 3]);
        let m0 = res.group_means[0].unwrap();
        assert!((m0.y - 205.0).abs() < 1e-3);
    }

    #[test]
    fn canonical_groups_survive_input_permutation() {
        let samples = vec![
            Vector3::new(40.0, 220.0, 100.0),
            Vector3::new(45.0, 50.0, 110.0),
            Vector3::new(42.0, 230.0, 95.0),
            Vector3::new(50.0, 40.0, 105.0),
        ];
        let res = classify_intensities(&samples, &ClusterParams::default());

        let order = [3usize, 1, 2, 0];
        let permuted: Vec<_> = order.iter().map(|&i| samples[i]).collect();
        let res_perm = classify_intensities(&permuted, &ClusterParams::default());

        for (pos, &orig) in order.iter().enumerate() {
            assert_eq!(res_perm.labels[pos], res.labels[orig]);
        }
        assert_eq!(res.labels[0], 0);
        assert_eq!(res.labels[1], 1);
    }

    #[test]
    fn canonicalize_swaps_backwards_partition() {
        let samples = vec![bright(10.0), bright(250.0)];
        let raw = Partition { labels: vec![0, 1] };
        assert_eq!(canonicalize(raw, &samples, 1).labels, vec![1, 0]);

        let raw = Partition { labels: vec![1, 0] };
        assert_eq!(canonicalize(raw, &samples, 1).labels, vec![1, 0]);
    }

    #[test]
    fn canonicalize_moves_members_out_of_empty_group_zero() {
        let samples = vec![bright(10.0), bright(20.0)];
        let raw = Partition { labels: vec![1, 1] };
        assert_eq!(canonicalize(raw, &samples, 1).labels, vec![0, 0]);
    }

    #[test]
    fn brightness_channel_is_configurable() {
        // Group split on red while green is constant.
        let samples = vec![
            Vector3::new(250.0, 100.0, 0.0),
            Vector3::new(10.0, 100.0, 0.0),
        ];
        let params = ClusterParams {
            brightness_channel: 0,
            ..ClusterParams::default()
        };
        let res = classify_intensities(&samples, &params);
        assert_eq!(res.labels, vec![0, 1]);
    }

    #[test]
    fn kmeans_is_deterministic() {
        let samples: Vec<_> = (0..20)
            .map(|i| Vector3::new(i as f32, (i * 13 % 17) as f32 * 10.0, 5.0))
            .collect();
        let km = KMeans2::from_params(&ClusterParams::default());
        assert_eq!(km.partition(&samples), km.partition(&samples));
    }
}
