//! Linear filters and intensity adjustments.
//!
//! Smoothing and gradients run through `imageproc`; both replicate the edge
//! pixel outside the image.

use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::image::{FloatImage, GrayImage};

/// Gaussian blur. `sigma <= 0` returns an unchanged copy.
pub fn gaussian_blur(src: &FloatImage, sigma: f32) -> FloatImage {
    if sigma <= 0.0 || src.data.is_empty() {
        return src.clone();
    }
    FloatImage::from_luma32(gaussian_blur_f32(&src.to_luma32(), sigma))
}

/// Stretch the intensity range `[min, max]` linearly onto `[0, 255]`.
///
/// A flat image carries no contrast and maps to all zeros.
pub fn rescale_intensity(src: &GrayImage) -> GrayImage {
    let lo = src.data.iter().copied().min().unwrap_or(0);
    let hi = src.data.iter().copied().max().unwrap_or(0);
    if lo == hi {
        return GrayImage::new(src.width, src.height);
    }
    let span = (hi - lo) as f32;
    GrayImage {
        width: src.width,
        height: src.height,
        data: src
            .data
            .iter()
            .map(|&v| ((v - lo) as f32 / span * 255.0) as u8)
            .collect(),
    }
}

/// Sobel gradient magnitude on the `[0, 1]`-normalized image.
///
/// Kernels are normalized by 4 and the two responses combined as
/// `sqrt((gx^2 + gy^2) / 2)`, so the output stays in `[0, 1]`.
pub fn sobel_magnitude(src: &GrayImage) -> FloatImage {
    if src.data.is_empty() {
        return FloatImage::new(src.width, src.height);
    }
    let luma = src.to_luma8();
    let gx = horizontal_sobel(&luma);
    let gy = vertical_sobel(&luma);

    // Each raw response is at most 4 * 255.
    let scale = 4.0 * 255.0;
    let data = gx
        .as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&x, &y)| {
            let (x, y) = (x as f32 / scale, y as f32 / scale);
            ((x * x + y * y) / 2.0).sqrt()
        })
        .collect();
    FloatImage {
        width: src.width,
        height: src.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn blur_keeps_constant_image() {
        let img = FloatImage::filled(7, 5, 0.4);
        let out = gaussian_blur(&img, 1.0);
        for v in out.data {
            assert_relative_eq!(v, 0.4, epsilon = 1e-5);
        }
    }

    #[test]
    fn zero_sigma_is_identity() {
        let mut img = FloatImage::new(5, 5);
        img.set(2, 2, 1.0);
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn blur_spreads_impulse_but_keeps_mass() {
        let mut img = FloatImage::new(21, 21);
        img.set(10, 10, 1.0);
        let out = gaussian_blur(&img, 1.0);
        assert!(out.get(10, 10) < 1.0);
        assert!(out.get(11, 10) > 0.0);
        assert_relative_eq!(out.get(9, 10), out.get(11, 10), epsilon = 1e-6);
        assert_relative_eq!(out.data.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn rescale_stretches_to_full_range() {
        let img = GrayImage {
            width: 3,
            height: 1,
            data: vec![10, 20, 30],
        };
        assert_eq!(rescale_intensity(&img).data, vec![0, 127, 255]);
    }

    #[test]
    fn rescale_of_flat_image_is_black() {
        let img = GrayImage {
            width: 2,
            height: 2,
            data: vec![77; 4],
        };
        assert_eq!(rescale_intensity(&img).data, vec![0; 4]);
    }

    #[test]
    fn sobel_is_zero_on_flat_and_peaks_on_step() {
        let flat = GrayImage {
            width: 6,
            height: 6,
            data: vec![128; 36],
        };
        assert!(sobel_magnitude(&flat).data.iter().all(|&v| v == 0.0));

        let mut step = GrayImage::new(8, 4);
        for y in 0..4 {
            for x in 4..8 {
                step.data[y * 8 + x] = 255;
            }
        }
        let mag = sobel_magnitude(&step);
        assert!(mag.get(3, 2) > 0.3);
        assert!(mag.get(4, 2) > 0.3);
        assert_eq!(mag.get(0, 2), 0.0);
        assert_eq!(mag.get(7, 2), 0.0);
    }
}
