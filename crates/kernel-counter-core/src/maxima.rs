//! h-dome extraction of regional maxima.
//!
//! The blurred channel is reconstructed from a copy of itself lowered by
//! `h`; subtracting the reconstruction leaves only the bright domes that
//! rise above their surroundings. This works on unevenly lit scans where a
//! global threshold does not.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::filters::gaussian_blur;
use crate::image::{FloatImage, RgbImageView};
use crate::morphology::reconstruct_by_dilation;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters for h-dome maxima isolation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaximaParams {
    /// Dome height in normalized intensity units (0..1).
    pub h: f32,
    /// Channel used for the dome image. Blue varies least with kernel
    /// colour on fluorescence scans.
    pub channel: usize,
    /// Gaussian smoothing applied before reconstruction (pixels).
    pub blur_sigma: f32,
}

impl Default for MaximaParams {
    fn default() -> Self {
        Self {
            h: 0.3,
            channel: 2,
            blur_sigma: 1.0,
        }
    }
}

/// Compute the h-dome image of one channel of `src`.
///
/// The output has the size of `src` and is pointwise `>= 0`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, params), fields(width = src.width, height = src.height))
)]
pub fn filter_regional_maxima(src: &RgbImageView<'_>, params: &MaximaParams) -> FloatImage {
    let channel = FloatImage::from_channel(src, params.channel);
    let blurred = gaussian_blur(&channel, params.blur_sigma);

    let seed = FloatImage {
        width: blurred.width,
        height: blurred.height,
        data: blurred.data.iter().map(|v| v - params.h).collect(),
    };
    let background = reconstruct_by_dilation(&seed, &blurred);

    let dome = FloatImage {
        width: blurred.width,
        height: blurred.height,
        data: blurred
            .data
            .iter()
            .zip(&background.data)
            .map(|(b, r)| (b - r).max(0.0))
            .collect(),
    };

    if let Some((lo, hi)) = dome.min_max() {
        debug!(
            "h-dome: {}x{} h={} range=[{lo:.3}, {hi:.3}]",
            dome.width, dome.height, params.h
        );
    }
    dome
}
