//! Single-image helpers built on the `image` crate.

use std::path::Path;

use ::image::{ImageError, ImageReader};
use log::debug;

use crate::core::{self, KernelCountResult, KernelCounterParams};
use crate::CountError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Convert an `image::RgbImage` into the lightweight `kernel-counter-core` view type.
pub fn rgb_view(img: &::image::RgbImage) -> core::RgbImageView<'_> {
    core::RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Decode any supported image file and convert it to 8-bit RGB.
///
/// Alpha is dropped; grayscale inputs are replicated across the three channels.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<::image::RgbImage, CountError> {
    let path = path.as_ref();
    let to_err = |source: ImageError| CountError::Image {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)
        .map_err(|e| to_err(ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| to_err(ImageError::IoError(e)))?
        .decode()
        .map_err(to_err)?
        .to_rgb8();
    debug!(
        "decoded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Count kernels in an already decoded image.
pub fn count_kernels_image(
    img: &::image::RgbImage,
    params: &KernelCounterParams,
) -> Result<KernelCountResult, CountError> {
    Ok(core::count_kernels(&rgb_view(img), params)?)
}

/// Count kernels in a raw interleaved RGB buffer.
pub fn count_kernels_from_rgb_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: &KernelCounterParams,
) -> Result<KernelCountResult, CountError> {
    if width == 0 || height == 0 {
        return Err(CountError::InvalidDimensions { width, height });
    }
    let expected = width as usize * height as usize * core::RGB_CHANNELS;
    let view = core::RgbImageView::new(width as usize, height as usize, pixels).ok_or(
        CountError::InvalidRgbBuffer {
            expected,
            got: pixels.len(),
        },
    )?;
    Ok(core::count_kernels(&view, params)?)
}

/// Decode `path` and count its kernels.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(path, params), fields(path = %path.as_ref().display()))
)]
pub fn count_kernels_in_file(
    path: impl AsRef<Path>,
    params: &KernelCounterParams,
) -> Result<KernelCountResult, CountError> {
    let img = load_rgb(path)?;
    count_kernels_image(&img, params)
}
