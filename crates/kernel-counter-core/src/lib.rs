//! Core segmentation and classification for scanned kernel images.
//!
//! This crate is intentionally small and purely numerical. It does *not*
//! decode files; callers hand it interleaved RGB buffers. Filtering,
//! binary morphology and labeling run on `imageproc`.
//!
//! The per-image pipeline is:
//! crop -> h-dome maxima -> marker watershed -> bottom-edge filter ->
//! per-object statistics -> two-group clustering.

mod clustering;
mod crop;
mod filters;
mod image;
mod logger;
mod maxima;
mod measure;
mod morphology;
mod params;
mod pipeline;
mod watershed;

pub use clustering::{
    canonicalize, classify_intensities, ClusterParams, Classification, KMeans2, Partition,
    TwoGroupClusterer,
};
pub use crop::crop_edges;
pub use filters::{gaussian_blur, rescale_intensity, sobel_magnitude};
pub use crate::image::{
    BinaryImage, FloatImage, GrayImage, LabelMask, RgbImage, RgbImageView, RGB_CHANNELS,
};
pub use maxima::{filter_regional_maxima, MaximaParams};
pub use measure::{
    find_centers, mean_intensities, measure_objects, remove_bottom_edge, ObjectMeasurement,
};
pub use morphology::{binary_opening, fill_holes, label_components, reconstruct_by_dilation};
pub use params::{KernelCounterParams, ParamsError};
pub use pipeline::{count_kernels, KernelCountResult, KernelRecord};
pub use watershed::{
    build_markers, flood_from_markers, region_based_segmentation, Marker, WatershedParams,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
