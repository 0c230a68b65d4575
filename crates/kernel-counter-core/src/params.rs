use serde::{Deserialize, Serialize};

use crate::clustering::ClusterParams;
use crate::image::RGB_CHANNELS;
use crate::maxima::MaximaParams;
use crate::watershed::WatershedParams;

/// Invalid pipeline configuration. Each variant names the parameter at fault.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("crop_percentage must be within [0, 0.5], got {0}")]
    CropPercentage(f64),
    #[error("h_dome_value must be a finite value > 0, got {0}")]
    HDome(f32),
    #[error("watershed_low ({low}) must be below watershed_high ({high})")]
    WatershedThresholds { low: u8, high: u8 },
    #[error("{name} must be a channel index below 3, got {channel}")]
    Channel { name: &'static str, channel: usize },
    #[error("blur_sigma must be a finite value >= 0, got {0}")]
    BlurSigma(f32),
    #[error("max_iters must be at least 1")]
    MaxIters,
}

/// Full configuration of the per-image pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelCounterParams {
    /// Fraction of the width cropped from each side, in `[0, 0.5]`.
    pub crop_percentage: f64,
    pub maxima: MaximaParams,
    pub watershed: WatershedParams,
    pub cluster: ClusterParams,
}

impl Default for KernelCounterParams {
    fn default() -> Self {
        Self {
            crop_percentage: 0.15,
            maxima: MaximaParams::default(),
            watershed: WatershedParams::default(),
            cluster: ClusterParams::default(),
        }
    }
}

impl KernelCounterParams {
    /// Check every parameter; run once before any image is processed.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(0.0..=0.5).contains(&self.crop_percentage) {
            return Err(ParamsError::CropPercentage(self.crop_percentage));
        }
        if !self.maxima.h.is_finite() || self.maxima.h <= 0.0 {
            return Err(ParamsError::HDome(self.maxima.h));
        }
        if !self.maxima.blur_sigma.is_finite() || self.maxima.blur_sigma < 0.0 {
            return Err(ParamsError::BlurSigma(self.maxima.blur_sigma));
        }
        check_channel("dome_channel", self.maxima.channel)?;
        check_channel("brightness_channel", self.cluster.brightness_channel)?;
        self.watershed.validate()?;
        if self.cluster.max_iters == 0 {
            return Err(ParamsError::MaxIters);
        }
        Ok(())
    }
}

fn check_channel(name: &'static str, channel: usize) -> Result<(), ParamsError> {
    if channel >= RGB_CHANNELS {
        return Err(ParamsError::Channel { name, channel });
    }
    Ok(())
}
