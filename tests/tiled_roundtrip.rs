//! End-to-end runs through the public API against real image files.
//!
//! Sources are synthesized with the `image` crate into a temp directory, so
//! no fixtures are needed.

use bigthumb::config::{ThumbConfig, TilingConfig, parse_config};
use bigthumb::imaging::{Region, RustBackend};
use bigthumb::quick::{self, Job};
use bigthumb::rescale::HeightGuard;
use bigthumb::{PipelineError, ScaleMode, ThumbnailPipeline, thumbnail, thumbnail_for_size};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x * 7 + y * 13) % 256) as u8,
        ])
    })
}

fn write_source(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn decode(path: &Path) -> RgbImage {
    image::open(path).unwrap().to_rgb8()
}

fn tiles(width: u32, height: u32) -> ThumbConfig {
    ThumbConfig {
        tiling: TilingConfig {
            tile_width: width,
            tile_height: height,
        },
        ..ThumbConfig::default()
    }
}

#[test]
fn factor_one_with_small_tiles_reproduces_source() {
    let tmp = TempDir::new().unwrap();
    let img = gradient(37, 23);
    let source = write_source(tmp.path(), "src.png", &img);
    let target = tmp.path().join("out/copy.png");
    let backend = RustBackend::new();

    let report = ThumbnailPipeline::new(&backend, tiles(7, 5))
        .run_with_report(&source, &target, ScaleMode::Uniform(1.0))
        .unwrap();

    assert_eq!((report.rows, report.cols), (5, 6));
    assert_eq!(report.source_format, "png");
    assert_eq!(decode(&target), img);
}

#[test]
fn uniform_half_matches_reported_size() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "src.png", &gradient(120, 80));
    let target = tmp.path().join("half.png");
    let backend = RustBackend::new();

    let report = ThumbnailPipeline::new(&backend, tiles(50, 50))
        .run_with_report(&source, &target, ScaleMode::Uniform(0.5))
        .unwrap();

    assert_eq!((report.output_width, report.output_height), (60, 40));
    assert_eq!(decode(&target).dimensions(), (60, 40));
}

#[test]
fn default_thumbnail_is_one_percent() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "big.png", &gradient(400, 300));
    let target = tmp.path().join("thumbs/big.jpg");

    let written = thumbnail(&source, &target).unwrap();

    assert_eq!(written, target);
    assert_eq!(decode(&target).dimensions(), (4, 3));
}

#[test]
fn apportioned_size_follows_height_guard() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "wide.png", &gradient(300, 200));
    let target = tmp.path().join("sized.png");

    // Single tile: full target width, but 200 < 300 (source width) so the
    // height is apportioned: floor(5000 * 20 / 200).
    thumbnail_for_size(&source, &target, 30, 20).unwrap();
    assert_eq!(decode(&target).dimensions(), (30, 500));

    let mut config = ThumbConfig::default();
    config.apportion.height_guard = HeightGuard::SourceHeight;
    let backend = RustBackend::new();
    ThumbnailPipeline::new(&backend, config)
        .run(
            &source,
            &target,
            ScaleMode::Apportioned {
                width: 30,
                height: 20,
            },
        )
        .unwrap();
    assert_eq!(decode(&target).dimensions(), (30, 20));
}

#[test]
fn rewritten_source_is_read_again() {
    let tmp = TempDir::new().unwrap();
    let backend = RustBackend::new();
    let pipeline = ThumbnailPipeline::new(&backend, tiles(8, 8));

    for name in ["src.bmp", "src.png", "src.tif"] {
        let source = tmp.path().join(name);
        let target = tmp.path().join(format!("out-{name}.png"));

        RgbImage::from_pixel(16, 16, Rgb([255, 0, 0])).save(&source).unwrap();
        pipeline
            .run(&source, &target, ScaleMode::Uniform(1.0))
            .unwrap();
        assert_eq!(decode(&target).get_pixel(4, 4).0, [255, 0, 0], "{name}");

        RgbImage::from_pixel(16, 16, Rgb([0, 0, 255])).save(&source).unwrap();
        pipeline
            .run(&source, &target, ScaleMode::Uniform(1.0))
            .unwrap();
        assert_eq!(decode(&target).get_pixel(4, 4).0, [0, 0, 255], "{name}");
    }
}

#[test]
fn tiff_source_is_tiled() {
    let tmp = TempDir::new().unwrap();
    let img = gradient(90, 70);
    let source = write_source(tmp.path(), "src.tif", &img);
    let target = tmp.path().join("copy.png");
    let backend = RustBackend::new();

    let report = ThumbnailPipeline::new(&backend, tiles(25, 30))
        .run_with_report(&source, &target, ScaleMode::Uniform(1.0))
        .unwrap();

    assert_eq!(report.source_format, "tiff");
    assert_eq!((report.rows, report.cols), (3, 4));
    assert_eq!(decode(&target), img);
}

#[test]
fn config_file_drives_tiling() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "src.png", &gradient(64, 48));
    let config = parse_config("[tiling]\ntile_width = 16\ntile_height = 16\n").unwrap();
    let backend = RustBackend::new();

    let report = ThumbnailPipeline::new(&backend, config)
        .run_with_report(
            &source,
            &tmp.path().join("t.png"),
            ScaleMode::Uniform(0.25),
        )
        .unwrap();

    assert_eq!((report.rows, report.cols), (3, 4));
    assert_eq!((report.output_width, report.output_height), (16, 12));
}

#[test]
fn unknown_target_format_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "src.png", &gradient(10, 10));
    let target = tmp.path().join("out.unknown");
    let backend = RustBackend::new();

    let result = ThumbnailPipeline::new(&backend, ThumbConfig::default()).run(
        &source,
        &target,
        ScaleMode::Uniform(0.5),
    );

    assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    assert!(!target.exists());
}

#[test]
fn missing_source_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let backend = RustBackend::new();

    let result = ThumbnailPipeline::new(&backend, ThumbConfig::default()).run(
        &tmp.path().join("absent.png"),
        &tmp.path().join("t.png"),
        ScaleMode::Uniform(0.5),
    );

    assert!(matches!(result, Err(PipelineError::Io(_))));
}

#[test]
fn quick_crop_copies_exact_pixels() {
    let tmp = TempDir::new().unwrap();
    let img = gradient(40, 30);
    let source = write_source(tmp.path(), "src.png", &img);
    let target = tmp.path().join("crop.png");
    let backend = RustBackend::new();

    quick::crop(
        &backend,
        &Job::new(&source, &target),
        Region::new(10, 5, 12, 9),
        None,
    )
    .unwrap();

    let expected = image::imageops::crop_imm(&img, 10, 5, 12, 9).to_image();
    assert_eq!(decode(&target), expected);
}

#[test]
fn quick_convert_changes_format_only() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "src.png", &gradient(33, 21));
    let target = tmp.path().join("src.bmp");
    let backend = RustBackend::new();

    quick::convert(&backend, &Job::new(&source, &target)).unwrap();

    let reader = image::ImageReader::open(&target)
        .unwrap()
        .with_guessed_format()
        .unwrap();
    assert_eq!(reader.format(), Some(image::ImageFormat::Bmp));
    assert_eq!(decode(&target), gradient(33, 21));
}

#[test]
fn quick_fit_width_keeps_aspect() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "src.png", &gradient(200, 100));
    let target = tmp.path().join("fit.jpg");
    let backend = RustBackend::new();

    quick::fit_width(&backend, &Job::new(&source, &target), 50).unwrap();

    assert_eq!(decode(&target).dimensions(), (50, 25));
}
