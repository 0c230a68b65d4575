//! Lightweight row-major image containers.
//!
//! All buffers are row-major with `x` as the column index and `y` as the
//! row index. RGB data is interleaved (`[r, g, b, r, g, b, ...]`).

use ::image::{ImageBuffer, Luma};

/// Number of interleaved channels in an RGB buffer.
pub const RGB_CHANNELS: usize = 3;

#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

impl<'a> RgbImageView<'a> {
    /// Wrap an interleaved buffer; `None` when the length does not match.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(RGB_CHANNELS)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * RGB_CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// Black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * RGB_CHANNELS],
        }
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.view().pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * RGB_CHANNELS;
        self.data[i..i + RGB_CHANNELS].copy_from_slice(&rgb);
    }
}

/// Single-channel floating point image.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Extract channel `c` of an RGB view normalized to `[0, 1]`.
    pub fn from_channel(src: &RgbImageView<'_>, c: usize) -> Self {
        let data = src
            .data
            .chunks_exact(RGB_CHANNELS)
            .map(|px| px[c] as f32 / 255.0)
            .collect();
        Self {
            width: src.width,
            height: src.height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut it = self.data.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Quantize `[0, 1]` values to bytes with rounding; out-of-range values clamp.
    pub fn to_gray_u8(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
                .collect(),
        }
    }

    pub(crate) fn to_luma32(&self) -> ImageBuffer<Luma<f32>, Vec<f32>> {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([self.get(x as usize, y as usize)])
        })
    }

    pub(crate) fn from_luma32(img: ImageBuffer<Luma<f32>, Vec<f32>>) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.into_raw(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub(crate) fn to_luma8(&self) -> ::image::GrayImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([self.data[y as usize * self.width + x as usize]])
        })
    }
}

/// Foreground/background grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl BinaryImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.width + x] = v;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Foreground as 255, background as 0.
    pub(crate) fn to_luma8(&self) -> ::image::GrayImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([if self.get(x as usize, y as usize) { 255 } else { 0 }])
        })
    }

    /// Any non-zero pixel is foreground.
    pub(crate) fn from_luma8(img: &::image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().iter().map(|&v| v != 0).collect(),
        }
    }
}

/// Integer label grid: 0 is background, every positive value one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
}

impl LabelMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, label: u32) {
        self.data[y * self.width + x] = label;
    }

    /// Largest label value; 0 for an empty or all-background mask.
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    pub fn row(&self, y: usize) -> &[u32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub(crate) fn from_label_buffer(img: ImageBuffer<Luma<u32>, Vec<u32>>) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.into_raw(),
        }
    }
}
