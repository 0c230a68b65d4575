use crate::image::{RgbImage, RgbImageView, RGB_CHANNELS};

/// Crop `percent` of the width from both the left and the right side.
///
/// Both bounds are rounded half-to-even in `f64`: the left one from
/// `percent * width`, the right one from `width - percent * width`. At
/// `percent = 0.5` the result may be zero columns wide. `percent` must be
/// in `[0, 0.5]`; see [`crate::KernelCounterParams::validate`].
pub fn crop_edges(src: &RgbImageView<'_>, percent: f64) -> RgbImage {
    let width = src.width as f64;
    let margin = percent * width;
    let left = (margin.round_ties_even() as usize).min(src.width);
    let right = ((width - margin).round_ties_even() as usize).clamp(left, src.width);
    let out_w = right - left;

    let mut data = Vec::with_capacity(out_w * src.height * RGB_CHANNELS);
    for y in 0..src.height {
        let row = y * src.width * RGB_CHANNELS;
        data.extend_from_slice(&src.data[row + left * RGB_CHANNELS..row + right * RGB_CHANNELS]);
    }

    RgbImage {
        width: out_w,
        height: src.height,
        data,
    }
}
