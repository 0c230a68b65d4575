//! High-level facade for the kernel counter.
//!
//! This crate provides:
//! - re-exports of the pure pipeline in `kernel-counter-core`,
//! - (feature-gated) helpers that decode images with the `image` crate and
//!   count kernels in a single file or a whole directory of scans,
//! - JSON configuration and TSV / JSON report writers,
//! - the `kernel-counter` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use kernel_counter::{detect, KernelCounterParams};
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("ear.png")?.decode()?.to_rgb8();
//! let result = detect::count_kernels_image(&img, &KernelCounterParams::default())?;
//! println!("bright={} other={}", result.bright(), result.non_bright());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `kernel_counter::core`: image types and every pipeline stage.
//! - `kernel_counter::detect` (feature `image`): single-image helpers.
//! - `kernel_counter::batch` (feature `image`): directory runs.
//! - `kernel_counter::io`: config loading and report writing.

pub use kernel_counter_core as core;

pub use kernel_counter_core::{
    count_kernels, ClusterParams, KernelCountResult, KernelCounterParams, KernelRecord,
    MaximaParams, ParamsError, WatershedParams,
};

mod error;
pub mod io;

#[cfg(feature = "image")]
pub mod batch;
#[cfg(feature = "image")]
pub mod detect;

pub use error::CountError;
