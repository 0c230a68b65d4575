//! Marker-driven watershed segmentation of the h-dome image.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::filters::{rescale_intensity, sobel_magnitude};
use crate::image::{BinaryImage, FloatImage, GrayImage, LabelMask};
use crate::morphology::{binary_opening, fill_holes, label_components, neighbors_4};
use crate::params::ParamsError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Seed class of a pixel for the flood.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    #[default]
    Unmarked,
    Background,
    Object,
}

/// Watershed thresholds and post-processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatershedParams {
    /// Rescaled intensities below this seed the background.
    pub low: u8,
    /// Rescaled intensities above this seed objects.
    pub high: u8,
    /// Radius of the disk used to open the binary segmentation.
    pub opening_radius: u8,
}

impl Default for WatershedParams {
    fn default() -> Self {
        Self {
            low: 20,
            high: 80,
            opening_radius: 5,
        }
    }
}

impl WatershedParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.low >= self.high {
            return Err(ParamsError::WatershedThresholds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Classify pixels: `< low` background, `> high` object, otherwise unmarked.
pub fn build_markers(gray: &GrayImage, low: u8, high: u8) -> Vec<Marker> {
    gray.data
        .iter()
        .map(|&v| {
            if v < low {
                Marker::Background
            } else if v > high {
                Marker::Object
            } else {
                Marker::Unmarked
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct FloodItem {
    elevation: f32,
    age: u64,
    idx: usize,
}

impl PartialEq for FloodItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodItem {}

impl PartialOrd for FloodItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.elevation
            .total_cmp(&other.elevation)
            .then_with(|| self.age.cmp(&other.age))
    }
}

/// Priority flood of `elevation` from the marked pixels (4-connectivity).
///
/// The lowest pending pixel is expanded first; equal elevations expand in
/// insertion order. Every pixel reachable from a marker receives that
/// marker's class. Where two basins meet on an exact tie, the boundary
/// follows queue order.
pub fn flood_from_markers(elevation: &FloatImage, markers: &[Marker]) -> Vec<Marker> {
    assert_eq!(
        elevation.data.len(),
        markers.len(),
        "markers must cover the elevation map"
    );
    let (w, h) = (elevation.width, elevation.height);
    let mut out = markers.to_vec();
    let mut heap = BinaryHeap::new();
    let mut age = 0u64;

    for (idx, m) in markers.iter().enumerate() {
        if *m != Marker::Unmarked {
            heap.push(Reverse(FloodItem {
                elevation: elevation.data[idx],
                age,
                idx,
            }));
            age += 1;
        }
    }

    while let Some(Reverse(item)) = heap.pop() {
        let class = out[item.idx];
        for q in neighbors_4(item.idx, w, h) {
            if out[q] != Marker::Unmarked {
                continue;
            }
            out[q] = class;
            heap.push(Reverse(FloodItem {
                elevation: elevation.data[q],
                age,
                idx: q,
            }));
            age += 1;
        }
    }
    out
}

/// Segment the h-dome image into labeled objects.
///
/// Steps: quantize and stretch the dome to bytes, take its Sobel magnitude
/// as the elevation map, seed background/object markers from `low`/`high`,
/// flood, keep everything not claimed by the background, fill enclosed
/// holes, open with a disk and label 4-connected components.
///
/// An image without any object marker yields an empty mask.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(dome, params), fields(width = dome.width, height = dome.height))
)]
pub fn region_based_segmentation(
    dome: &FloatImage,
    params: &WatershedParams,
) -> Result<LabelMask, ParamsError> {
    params.validate()?;
    let (w, h) = (dome.width, dome.height);

    let gray = rescale_intensity(&dome.to_gray_u8());
    let markers = build_markers(&gray, params.low, params.high);
    if !markers.contains(&Marker::Object) {
        debug!("watershed: no object markers above {}", params.high);
        return Ok(LabelMask::new(w, h));
    }

    let elevation = sobel_magnitude(&gray);
    let flooded = flood_from_markers(&elevation, &markers);

    let foreground = BinaryImage {
        width: w,
        height: h,
        data: flooded.iter().map(|&m| m != Marker::Background).collect(),
    };
    let filled = fill_holes(&foreground);
    let opened = binary_opening(&filled, params.opening_radius);
    let labels = label_components(&opened);

    debug!(
        "watershed: {} foreground px, {} after opening, {} objects",
        filled.count(),
        opened.count(),
        labels.max_label()
    );
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dome_with_squares(w: usize, h: usize, squares: &[(usize, usize, usize)]) -> FloatImage {
        let mut dome = FloatImage::new(w, h);
        for &(x0, y0, size) in squares {
            for y in y0..y0 + size {
                for x in x0..x0 + size {
                    dome.set(x, y, 0.3);
                }
            }
        }
        dome
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let dome = FloatImage::new(4, 4);
        for (low, high) in [(80u8, 20u8), (50, 50)] {
            let params = WatershedParams {
                low,
                high,
                ..WatershedParams::default()
            };
            let err = region_based_segmentation(&dome, &params).unwrap_err();
            assert!(matches!(err, ParamsError::WatershedThresholds { .. }));
        }
    }

    #[test]
    fn markers_split_by_thresholds() {
        let gray = GrayImage {
            width: 5,
            height: 1,
            data: vec![0, 20, 50, 80, 81],
        };
        assert_eq!(
            build_markers(&gray, 20, 80),
            vec![
                Marker::Background,
                Marker::Unmarked,
                Marker::Unmarked,
                Marker::Unmarked,
                Marker::Object
            ]
        );
    }

    #[test]
    fn flood_stops_at_ridge() {
        // Elevation ridge in column 2 separates the two seeds.
        let elevation = FloatImage {
            width: 5,
            height: 1,
            data: vec![0.0, 0.1, 0.9, 0.1, 0.0],
        };
        let markers = vec![
            Marker::Background,
            Marker::Unmarked,
            Marker::Unmarked,
            Marker::Unmarked,
            Marker::Object,
        ];
        let out = flood_from_markers(&elevation, &markers);
        assert_eq!(out[1], Marker::Background);
        assert_eq!(out[3], Marker::Object);
        assert_ne!(out[2], Marker::Unmarked);
    }

    #[test]
    fn flood_without_markers_leaves_everything_unmarked() {
        let elevation = FloatImage::new(3, 3);
        let out = flood_from_markers(&elevation, &[Marker::Unmarked; 9]);
        assert!(out.iter().all(|&m| m == Marker::Unmarked));
    }

    #[test]
    fn empty_dome_has_no_objects() {
        let dome = FloatImage::new(30, 30);
        let labels = region_based_segmentation(&dome, &WatershedParams::default()).unwrap();
        assert_eq!(labels.max_label(), 0);
    }

    #[test]
    fn nothing_above_high_has_no_objects() {
        // Max maps to 255 after stretching, so use an impossible `high`.
        let dome = dome_with_squares(30, 30, &[(5, 5, 12)]);
        let params = WatershedParams {
            low: 20,
            high: 255,
            ..WatershedParams::default()
        };
        let labels = region_based_segmentation(&dome, &params).unwrap();
        assert_eq!(labels.max_label(), 0);
    }

    #[test]
    fn separates_two_squares() {
        let dome = dome_with_squares(60, 40, &[(5, 5, 15), (35, 10, 15)]);
        let labels = region_based_segmentation(&dome, &WatershedParams::default()).unwrap();
        assert_eq!(labels.max_label(), 2);
        assert_eq!(labels.get(12, 12), 1);
        assert_eq!(labels.get(42, 17), 2);
        assert_eq!(labels.get(28, 30), 0);
    }

    #[test]
    fn small_objects_vanish_under_opening() {
        let dome = dome_with_squares(40, 40, &[(5, 5, 15), (30, 30, 4)]);
        let labels = region_based_segmentation(&dome, &WatershedParams::default()).unwrap();
        assert_eq!(labels.max_label(), 1);
        assert_eq!(labels.get(32, 32), 0);
    }
}
