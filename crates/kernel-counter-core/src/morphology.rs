//! Grayscale reconstruction and binary morphology.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ::image::Luma;
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::image::{BinaryImage, FloatImage, LabelMask};

const NEIGHBORS_4: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[inline]
pub(crate) fn offset(
    x: usize,
    y: usize,
    (dx, dy): (isize, isize),
    width: usize,
    height: usize,
) -> Option<usize> {
    let nx = x as isize + dx;
    let ny = y as isize + dy;
    if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
        return None;
    }
    Some(ny as usize * width + nx as usize)
}

pub(crate) fn neighbors_4(
    idx: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = usize> {
    let (x, y) = (idx % width, idx / width);
    NEIGHBORS_4
        .into_iter()
        .filter_map(move |d| offset(x, y, d, width, height))
}

#[derive(Clone, Copy, Debug)]
struct Peak {
    value: f32,
    idx: usize,
}

impl PartialEq for Peak {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Peak {}

impl PartialOrd for Peak {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peak {
    // Max-heap on value; lower index first among equal values.
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Grayscale morphological reconstruction by dilation (8-connectivity).
///
/// Seed values spread to neighbours but never rise above `mask`; the result
/// at each pixel is the best "min along the path" value reachable from any
/// seed. `seed` is clamped to `mask` first, so `seed <= mask` need not hold.
pub fn reconstruct_by_dilation(seed: &FloatImage, mask: &FloatImage) -> FloatImage {
    assert_eq!(
        (seed.width, seed.height),
        (mask.width, mask.height),
        "seed and mask must have the same size"
    );
    let (w, h) = (mask.width, mask.height);
    let mut rec: Vec<f32> = seed
        .data
        .iter()
        .zip(&mask.data)
        .map(|(&s, &m)| s.min(m))
        .collect();

    let mut heap: BinaryHeap<Peak> = rec
        .iter()
        .enumerate()
        .map(|(idx, &value)| Peak { value, idx })
        .collect();

    while let Some(Peak { value, idx }) = heap.pop() {
        if value < rec[idx] {
            continue; // stale entry
        }
        let (x, y) = (idx % w, idx / w);
        for d in NEIGHBORS_8 {
            let Some(q) = offset(x, y, d, w, h) else {
                continue;
            };
            let cand = value.min(mask.data[q]);
            if cand > rec[q] {
                rec[q] = cand;
                heap.push(Peak {
                    value: cand,
                    idx: q,
                });
            }
        }
    }

    FloatImage {
        width: w,
        height: h,
        data: rec,
    }
}

/// Fill background regions that are not 4-connected to the image border.
pub fn fill_holes(src: &BinaryImage) -> BinaryImage {
    let (w, h) = (src.width, src.height);
    // Label the background: foreground pixels (255) are the "background" of
    // this labeling.
    let regions = connected_components(&src.to_luma8(), Connectivity::Four, Luma([255u8]));
    let regions = LabelMask::from_label_buffer(regions);

    let mut outside = vec![false; regions.max_label() as usize + 1];
    for y in 0..h {
        for x in 0..w {
            if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                outside[regions.get(x, y) as usize] = true;
            }
        }
    }
    outside[0] = false;

    BinaryImage {
        width: w,
        height: h,
        data: regions
            .data
            .iter()
            .map(|&l| l == 0 || !outside[l as usize])
            .collect(),
    }
}

/// Morphological opening (erosion then dilation) with a Euclidean disk of
/// `radius`.
///
/// Thin bridges narrower than the disk are cut; so are objects that the disk
/// does not fit into. Pixels outside the image never erode the foreground.
pub fn binary_opening(src: &BinaryImage, radius: u8) -> BinaryImage {
    if radius == 0 || src.data.is_empty() {
        return src.clone();
    }
    BinaryImage::from_luma8(&open(&src.to_luma8(), Norm::L2, radius))
}

/// 4-connected component labeling.
///
/// Labels are consecutive from 1 in raster order of each component's first
/// pixel; background stays 0.
pub fn label_components(src: &BinaryImage) -> LabelMask {
    if src.data.is_empty() {
        return LabelMask::new(src.width, src.height);
    }
    let labels = connected_components(&src.to_luma8(), Connectivity::Four, Luma([0u8]));
    LabelMask::from_label_buffer(labels)
}
