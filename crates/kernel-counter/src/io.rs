//! JSON configuration and TSV / JSON report helpers for batch runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::core::{KernelCountResult, KernelCounterParams, ParamsError};
use crate::CountError;

/// Default TSV output file name.
pub const DEFAULT_OUTPUT_PATH: &str = "sk_kernel_counter_batch_output.tsv";

fn default_extension() -> String {
    "png".to_string()
}

/// Configuration of a batch run.
///
/// The flat `crop_percentage` / `h_dome_value` / `watershed_*` keys are the
/// everyday knobs; `params` gives access to every pipeline parameter. Flat
/// keys win over the nested block when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelCountConfig {
    #[serde(default)]
    pub input_directory: Option<PathBuf>,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub crop_percentage: Option<f64>,
    #[serde(default)]
    pub h_dome_value: Option<f32>,
    #[serde(default)]
    pub watershed_low: Option<u8>,
    #[serde(default)]
    pub watershed_high: Option<u8>,
    #[serde(default)]
    pub params: Option<KernelCounterParams>,
}

impl Default for KernelCountConfig {
    fn default() -> Self {
        Self {
            input_directory: None,
            extension: default_extension(),
            output_path: None,
            report_path: None,
            crop_percentage: None,
            h_dome_value: None,
            watershed_low: None,
            watershed_high: None,
            params: None,
        }
    }
}

impl KernelCountConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CountError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CountError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the TSV output path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.report_path.as_ref().map(PathBuf::from)
    }

    /// Merge the nested and flat parameters and validate the result.
    pub fn build_params(&self) -> Result<KernelCounterParams, ParamsError> {
        let mut params = self.params.clone().unwrap_or_default();
        if let Some(p) = self.crop_percentage {
            params.crop_percentage = p;
        }
        if let Some(h) = self.h_dome_value {
            params.maxima.h = h;
        }
        if let Some(low) = self.watershed_low {
            params.watershed.low = low;
        }
        if let Some(high) = self.watershed_high {
            params.watershed.high = high;
        }
        params.validate()?;
        Ok(params)
    }
}

/// Successful count for one image, keyed by its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCount {
    pub id: String,
    pub path: PathBuf,
    pub result: KernelCountResult,
}

/// A skipped image and the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFailure {
    pub id: String,
    pub path: PathBuf,
    pub error: String,
}

/// Render `<id>\t<bright>\t<non_bright>` rows joined by `\n`, no header.
pub fn format_tsv(counts: &[ImageCount]) -> String {
    counts
        .iter()
        .map(|c| format!("{}\t{}\t{}", c.id, c.result.bright(), c.result.non_bright()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_tsv(path: impl AsRef<Path>, counts: &[ImageCount]) -> Result<(), CountError> {
    fs::write(path, format_tsv(counts))?;
    Ok(())
}

/// Full batch report with per-kernel records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input_directory: PathBuf,
    pub params: KernelCounterParams,
    pub images: Vec<ImageCount>,
    #[serde(default)]
    pub failures: Vec<ImageFailure>,
}

impl BatchReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CountError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CountError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
