use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgb, RgbImage};
use kernel_counter::batch::{count_directory, count_paths, list_images};
use kernel_counter::io::format_tsv;
use kernel_counter::{CountError, KernelCounterParams, ParamsError};

const GREEN: [u8; 3] = [40, 220, 200];
const DULL: [u8; 3] = [40, 60, 200];

fn write_scan(path: &Path, disks: &[(u32, u32, [u8; 3])]) {
    let mut img = RgbImage::new(100, 100);
    for &(cx, cy, rgb) in disks {
        for y in 0..100u32 {
            for x in 0..100u32 {
                let dx = x as i64 - cx as i64;
                let dy = y as i64 - cy as i64;
                if dx * dx + dy * dy <= 100 {
                    img.put_pixel(x, y, Rgb(rgb));
                }
            }
        }
    }
    img.save(path).unwrap();
}

fn uncropped() -> KernelCounterParams {
    KernelCounterParams {
        crop_percentage: 0.0,
        ..KernelCounterParams::default()
    }
}

#[test]
fn directory_run_is_sorted_and_skips_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    write_scan(&dir.path().join("ear_b.png"), &[(30, 40, GREEN), (70, 55, DULL)]);
    write_scan(&dir.path().join("ear_a.png"), &[(50, 40, GREEN)]);
    fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let done = AtomicUsize::new(0);
    let outcome = count_directory(dir.path(), "png", &uncropped(), |_| {
        done.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.total(), 3);
    assert!(outcome.has_failures());
    assert_eq!(outcome.failures[0].id, "broken");

    let ids: Vec<_> = outcome.counts.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ear_a", "ear_b"]);
    assert_eq!(format_tsv(&outcome.counts), "ear_a\t1\t0\near_b\t1\t1");
}

#[test]
fn kernel_records_carry_locations_and_groups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ear.png");
    write_scan(&path, &[(30, 40, GREEN), (70, 55, DULL)]);

    let outcome = count_paths(&[path], &uncropped(), |_| {});
    let result = &outcome.counts[0].result;
    assert_eq!(result.kernels.len(), 2);
    for k in &result.kernels {
        let (ex, ey) = if k.group == 0 { (30.0, 40.0) } else { (70.0, 55.0) };
        approx::assert_abs_diff_eq!(k.center.x, ex, epsilon = 1.0);
        approx::assert_abs_diff_eq!(k.center.y, ey, epsilon = 1.0);
    }
}

#[test]
fn empty_directory_yields_empty_outcome() {
    let dir = tempfile::tempdir().unwrap();
    assert!(list_images(dir.path(), "png").unwrap().is_empty());
    let outcome = count_directory(dir.path(), "png", &uncropped(), |_| {}).unwrap();
    assert_eq!(outcome.total(), 0);
    assert_eq!(format_tsv(&outcome.counts), "");
}

#[test]
fn invalid_params_fail_before_listing() {
    let params = KernelCounterParams {
        crop_percentage: 0.9,
        ..KernelCounterParams::default()
    };
    // The directory does not exist; validation must fire first.
    let err = count_directory(Path::new("/no/such/dir"), "png", &params, |_| {}).unwrap_err();
    assert!(matches!(
        err,
        CountError::Params(ParamsError::CropPercentage(_))
    ));
}
