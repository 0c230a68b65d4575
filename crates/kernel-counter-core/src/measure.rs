//! Per-object statistics over a label mask.
//!
//! Centroids and mean intensities are enumerated from one accumulation pass
//! and share its label set: every label with at least one pixel, ascending.
//! Downstream code pairs the two sequences by position.

use log::debug;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::image::{LabelMask, RgbImageView};

/// Statistics of one surviving object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeasurement {
    /// Label value in the (uncompacted) mask.
    pub label: u32,
    /// Centroid, `x` = column, `y` = row.
    pub center: Point2<f32>,
    /// Mean of each RGB channel on the 0..255 scale.
    pub mean_rgb: Vector3<f32>,
    /// Pixel count.
    pub area: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct LabelAccum {
    count: usize,
    sum_x: f64,
    sum_y: f64,
    sum_rgb: [f64; 3],
}

fn accumulate(mask: &LabelMask, image: Option<&RgbImageView<'_>>) -> Vec<(u32, LabelAccum)> {
    if let Some(img) = image {
        assert_eq!(
            (img.width, img.height),
            (mask.width, mask.height),
            "image and mask must have the same size"
        );
    }
    let mut acc = vec![LabelAccum::default(); mask.max_label() as usize + 1];
    for y in 0..mask.height {
        for (x, &label) in mask.row(y).iter().enumerate() {
            if label == 0 {
                continue;
            }
            let a = &mut acc[label as usize];
            a.count += 1;
            a.sum_x += x as f64;
            a.sum_y += y as f64;
            if let Some(img) = image {
                let px = img.pixel(x, y);
                for (s, v) in a.sum_rgb.iter_mut().zip(px) {
                    *s += v as f64;
                }
            }
        }
    }
    acc.into_iter()
        .enumerate()
        .skip(1)
        .filter(|(_, a)| a.count > 0)
        .map(|(label, a)| (label as u32, a))
        .collect()
}

impl LabelAccum {
    fn center(&self) -> Point2<f32> {
        let n = self.count as f64;
        Point2::new((self.sum_x / n) as f32, (self.sum_y / n) as f32)
    }

    fn mean_rgb(&self) -> Vector3<f32> {
        let n = self.count as f64;
        Vector3::new(
            (self.sum_rgb[0] / n) as f32,
            (self.sum_rgb[1] / n) as f32,
            (self.sum_rgb[2] / n) as f32,
        )
    }
}

/// Zero every object that touches the last row of the mask.
///
/// Kernels cut by the bottom edge reappear at the top of the next scan
/// tile; dropping them avoids counting them twice. The mask is taken by
/// value and returned; label numbers are not compacted.
pub fn remove_bottom_edge(mut mask: LabelMask) -> LabelMask {
    if mask.height == 0 {
        return mask;
    }
    let mut touching = vec![false; mask.max_label() as usize + 1];
    for &l in mask.row(mask.height - 1) {
        touching[l as usize] = true;
    }
    touching[0] = false;

    let mut removed = 0usize;
    for v in &mut mask.data {
        if touching[*v as usize] {
            *v = 0;
            removed += 1;
        }
    }
    debug!(
        "bottom edge: dropped {} objects ({removed} px)",
        touching.iter().filter(|&&t| t).count()
    );
    mask
}

/// Centroid of every non-empty label, in ascending label order.
pub fn find_centers(mask: &LabelMask) -> Vec<Point2<f32>> {
    accumulate(mask, None)
        .iter()
        .map(|(_, a)| a.center())
        .collect()
}

/// Mean RGB of every non-empty label, in ascending label order.
pub fn mean_intensities(image: &RgbImageView<'_>, mask: &LabelMask) -> Vec<Vector3<f32>> {
    accumulate(mask, Some(image))
        .iter()
        .map(|(_, a)| a.mean_rgb())
        .collect()
}

/// Centroid, mean RGB and area of every non-empty label.
pub fn measure_objects(image: &RgbImageView<'_>, mask: &LabelMask) -> Vec<ObjectMeasurement> {
    accumulate(mask, Some(image))
        .into_iter()
        .map(|(label, a)| ObjectMeasurement {
            label,
            center: a.center(),
            mean_rgb: a.mean_rgb(),
            area: a.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::RgbImage;
    use approx::assert_relative_eq;

    fn mask_from(width: usize, rows: &[u32]) -> LabelMask {
        LabelMask {
            width,
            height: rows.len() / width,
            data: rows.to_vec(),
        }
    }

    #[test]
    fn bottom_touching_label_is_removed_entirely() {
        #[rustfmt::skip]
        let mask = mask_from(4, &[
            1, 1, 0, 2,
            1, 0, 0, 2,
            0, 3, 0, 2,
            0, 3, 0, 0,
        ]);
        let out = remove_bottom_edge(mask.clone());
        assert!(!out.data.contains(&3));
        for (a, b) in mask.data.iter().zip(&out.data) {
            if *a != 3 {
                assert_eq!(a, b);
            }
        }
        assert_eq!(out.max_label(), 2);
    }

    #[test]
    fn bottom_filter_leaves_gaps() {
        #[rustfmt::skip]
        let mask = mask_from(3, &[
            1, 0, 3,
            0, 0, 3,
            2, 0, 0,
        ]);
        let out = remove_bottom_edge(mask);
        assert_eq!(out.data, vec![1, 0, 3, 0, 0, 3, 0, 0, 0]);
        assert_eq!(find_centers(&out).len(), 2);
    }

    #[test]
    fn centers_skip_empty_labels_and_stay_ordered() {
        #[rustfmt::skip]
        let mask = mask_from(4, &[
            4, 4, 0, 0,
            4, 4, 0, 1,
            0, 0, 0, 1,
        ]);
        let centers = find_centers(&mask);
        assert_eq!(centers.len(), 2);
        assert_relative_eq!(centers[0], Point2::new(3.0, 1.5));
        assert_relative_eq!(centers[1], Point2::new(0.5, 0.5));
    }

    #[test]
    fn intensities_align_with_centers() {
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(3, 1, [10, 100, 0]);
        img.put_pixel(3, 2, [30, 200, 0]);
        #[rustfmt::skip]
        let mask = mask_from(4, &[
            0, 0, 0, 0,
            5, 0, 0, 2,
            0, 0, 0, 2,
        ]);
        let centers = find_centers(&mask);
        let means = mean_intensities(&img.view(), &mask);
        assert_eq!(centers.len(), means.len());
        assert_relative_eq!(means[0], Vector3::new(20.0, 150.0, 0.0));
        assert_relative_eq!(means[1], Vector3::new(0.0, 0.0, 0.0));

        let objects = measure_objects(&img.view(), &mask);
        let labels: Vec<u32> = objects.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec![2, 5]);
        for (o, c) in objects.iter().zip(&centers) {
            assert_eq!(o.center, *c);
        }
        assert_eq!(objects[0].area, 2);
    }

    #[test]
    fn empty_mask_measures_nothing() {
        let mask = LabelMask::new(5, 5);
        let img = RgbImage::new(5, 5);
        assert!(find_centers(&mask).is_empty());
        assert!(mean_intensities(&img.view(), &mask).is_empty());
        assert_eq!(remove_bottom_edge(mask.clone()), mask);
    }
}
