//! End-to-end pipeline runs over the synthetic capture backend.

use anyhow::Result;

use frameflow::frame::FrameData;
use frameflow::pipeline::{CaptureVideoPipe, MetricsPipe, Pipeline, ProgressPipe, SaveImagePipe};
use frameflow::save_image::{ImageFormat, SaveImage};
use frameflow::{CaptureConfig, Progress};

#[test]
fn video_frames_land_as_images() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CaptureConfig::for_source("stub://clip?frames=8");

    let source = CaptureVideoPipe::open(&config)?;
    assert_eq!(source.frame_count(), Some(8));

    let metrics_stage = MetricsPipe::new();
    let metrics = metrics_stage.handle();

    let mut pipeline = Pipeline::with_source(source)
        .map(SaveImagePipe::new(SaveImage::new(dir.path(), ImageFormat::Png)))
        .map(ProgressPipe::with_progress(Progress::hidden()))
        .map(metrics_stage);
    pipeline.run()?;
    pipeline.close()?;

    for idx in 0..8 {
        assert!(dir.path().join(format!("{idx:06}.png")).is_file());
    }
    assert_eq!(metrics.borrow().len(), 8);
    Ok(())
}

#[test]
fn filter_drops_items_before_the_save_stage() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CaptureConfig::for_source("stub://clip?frames=10");

    let mut pipeline = Pipeline::with_source(CaptureVideoPipe::open(&config)?)
        .filter(|data: &FrameData| Ok(data.idx % 2 == 0))
        .map(SaveImagePipe::new(SaveImage::new(dir.path(), ImageFormat::Png)));
    pipeline.run()?;
    pipeline.close()?;

    let saved = std::fs::read_dir(dir.path())?.count();
    assert_eq!(saved, 5);
    assert!(dir.path().join("000000.png").is_file());
    assert!(!dir.path().join("000001.png").exists());
    Ok(())
}

#[test]
fn unthreaded_capture_feeds_the_pipeline_too() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = CaptureConfig::for_source("stub://clip?frames=4");
    config.threaded = false;

    let mut pipeline = Pipeline::with_source(CaptureVideoPipe::open(&config)?)
        .map(SaveImagePipe::new(SaveImage::new(dir.path(), ImageFormat::Jpg)));
    pipeline.run()?;
    pipeline.close()?;

    assert_eq!(std::fs::read_dir(dir.path())?.count(), 4);
    Ok(())
}

#[test]
fn save_error_surfaces_and_stops_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CaptureConfig::for_source("stub://clip?frames=5");

    // Pre-create a file the save stage will refuse to overwrite.
    let save = SaveImage::new(dir.path(), ImageFormat::Png);
    let clash = dir.path().join("000002.png");
    std::fs::write(&clash, b"occupied")?;

    let mut pipeline =
        Pipeline::with_source(CaptureVideoPipe::open(&config)?).map(SaveImagePipe::new(save));
    let err = pipeline.run().expect_err("overwrite must fail");
    assert!(err.to_string().contains("already exists"));
    pipeline.close()?;

    // Frames before the clash were written, none after it.
    assert!(dir.path().join("000001.png").is_file());
    assert!(!dir.path().join("000003.png").exists());
    Ok(())
}
