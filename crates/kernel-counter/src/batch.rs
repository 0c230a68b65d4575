//! Directory runs: every matching file is one image, processed in sorted
//! file-name order.
//!
//! A file that cannot be decoded is skipped and reported; it never produces a
//! zero row in the output. With the `rayon` feature images are counted in
//! parallel and results are still returned in sorted order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::core::{KernelCountResult, KernelCounterParams};
use crate::detect::count_kernels_in_file;
use crate::io::{ImageCount, ImageFailure};
use crate::CountError;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Collected results of a batch run, in sorted file-name order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub counts: Vec<ImageCount>,
    pub failures: Vec<ImageFailure>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.counts.len() + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Identifier of an image: its file name without the extension.
pub fn image_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// List files directly inside `dir` whose extension matches `extension`
/// (case-insensitive), sorted by file name.
pub fn list_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, CountError> {
    if !dir.is_dir() {
        return Err(CountError::NotADirectory(dir.to_path_buf()));
    }
    let wanted = extension.trim_start_matches('.');
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
        if matches {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn count_one<F>(
    path: &Path,
    params: &KernelCounterParams,
    on_done: &F,
) -> Result<KernelCountResult, CountError>
where
    F: Fn(&Path) + Sync,
{
    let res = count_kernels_in_file(path, params);
    match &res {
        Ok(r) => {
            info!(
                "{}: {} bright, {} other",
                path.display(),
                r.bright(),
                r.non_bright()
            );
            on_done(path);
        }
        Err(e) => warn!("skipping {}: {e}", path.display()),
    }
    res
}

/// Count every image in `paths`, calling `on_done` after each success.
pub fn count_paths<F>(paths: &[PathBuf], params: &KernelCounterParams, on_done: F) -> BatchOutcome
where
    F: Fn(&Path) + Sync,
{
    #[cfg(feature = "rayon")]
    let results: Vec<_> = paths
        .par_iter()
        .map(|p| count_one(p, params, &on_done))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<_> = paths
        .iter()
        .map(|p| count_one(p, params, &on_done))
        .collect();

    let mut outcome = BatchOutcome::default();
    for (path, res) in paths.iter().zip(results) {
        let id = image_id(path);
        match res {
            Ok(result) => outcome.counts.push(ImageCount {
                id,
                path: path.clone(),
                result,
            }),
            Err(e) => outcome.failures.push(ImageFailure {
                id,
                path: path.clone(),
                error: e.to_string(),
            }),
        }
    }
    outcome
}

/// Validate `params`, then count every matching image inside `dir`.
pub fn count_directory<F>(
    dir: &Path,
    extension: &str,
    params: &KernelCounterParams,
    on_done: F,
) -> Result<BatchOutcome, CountError>
where
    F: Fn(&Path) + Sync,
{
    params.validate()?;
    let paths = list_images(dir, extension)?;
    info!("{} images with extension {extension:?} in {}", paths.len(), dir.display());
    Ok(count_paths(&paths, params, on_done))
}
