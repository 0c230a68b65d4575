//! Per-image orchestration: crop -> maxima -> watershed -> edge filter ->
//! measurements -> classification.

use log::debug;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::clustering::classify_intensities;
use crate::crop::crop_edges;
use crate::image::RgbImageView;
use crate::maxima::filter_regional_maxima;
use crate::measure::{measure_objects, remove_bottom_edge};
use crate::params::{KernelCounterParams, ParamsError};
use crate::watershed::region_based_segmentation;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One detected kernel. Coordinates refer to the cropped image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelRecord {
    pub label: u32,
    /// Centroid, `x` = column, `y` = row.
    pub center: Point2<f32>,
    pub mean_rgb: Vector3<f32>,
    pub area: usize,
    /// 0 = bright (fluorescent), 1 = not bright.
    pub group: u8,
}

/// Result of counting one image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelCountResult {
    /// Size of the cropped image the coordinates refer to.
    pub width: usize,
    pub height: usize,
    /// `[bright, not bright]`.
    pub counts: [usize; 2],
    pub kernels: Vec<KernelRecord>,
}

impl KernelCountResult {
    pub fn bright(&self) -> usize {
        self.counts[0]
    }

    pub fn non_bright(&self) -> usize {
        self.counts[1]
    }

    pub fn total(&self) -> usize {
        self.counts[0] + self.counts[1]
    }
}

/// Count and classify the kernels of one RGB image.
///
/// Finding no kernels is a regular outcome with counts `[0, 0]`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn count_kernels(
    image: &RgbImageView<'_>,
    params: &KernelCounterParams,
) -> Result<KernelCountResult, ParamsError> {
    params.validate()?;

    let cropped = crop_edges(image, params.crop_percentage);
    if cropped.width == 0 || cropped.height == 0 {
        debug!("crop left an empty {}x{} image", cropped.width, cropped.height);
        return Ok(KernelCountResult {
            width: cropped.width,
            height: cropped.height,
            ..KernelCountResult::default()
        });
    }
    let view = cropped.view();

    let dome = filter_regional_maxima(&view, &params.maxima);
    let segments = region_based_segmentation(&dome, &params.watershed)?;
    let segments = remove_bottom_edge(segments);

    let objects = measure_objects(&view, &segments);
    if objects.is_empty() {
        debug!("no kernels found in {}x{} crop", cropped.width, cropped.height);
        return Ok(KernelCountResult {
            width: cropped.width,
            height: cropped.height,
            ..KernelCountResult::default()
        });
    }

    let intensities: Vec<Vector3<f32>> = objects.iter().map(|o| o.mean_rgb).collect();
    let classes = classify_intensities(&intensities, &params.cluster);

    let kernels = objects
        .iter()
        .zip(&classes.labels)
        .map(|(o, &group)| KernelRecord {
            label: o.label,
            center: o.center,
            mean_rgb: o.mean_rgb,
            area: o.area,
            group,
        })
        .collect();

    debug!(
        "kernels: {} bright, {} other",
        classes.counts[0], classes.counts[1]
    );

    Ok(KernelCountResult {
        width: cropped.width,
        height: cropped.height,
        counts: classes.counts,
        kernels,
    })
}
