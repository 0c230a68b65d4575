use std::path::PathBuf;

use kernel_counter_core::ParamsError;

/// Errors produced by the facade helpers and the batch runner.
#[derive(thiserror::Error, Debug)]
pub enum CountError {
    #[error("invalid RGB image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[cfg(feature = "image")]
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("input directory {0} does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error("no input directory given (use --input-directory-path or `input_directory` in the config)")]
    MissingInputDirectory,

    #[error("{failed} of {total} images failed")]
    ImagesFailed { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
