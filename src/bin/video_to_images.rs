//! video_to_images - split a video source into still images
//!
//! Reads frames from a file, camera or stream (configured on the command
//! line or via a TOML file) and writes one image per frame into the
//! output directory. Ctrl+C stops the run cleanly after the in-flight
//! frame.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use frameflow::config::FramePos;
use frameflow::observable::{observable, STOP_EVENT};
use frameflow::pipeline::{CaptureVideoPipe, MetricsPipe, Pipeline, ProgressPipe, SaveImagePipe};
use frameflow::save_image::{ImageFormat, SaveImage};
use frameflow::CaptureConfig;

#[derive(Parser, Debug)]
#[command(about = "Split a video source into still images")]
struct Args {
    /// Video source: file path, camera index or stream URL
    #[arg(short, long, env = "FRAMEFLOW_SOURCE")]
    input: Option<String>,

    /// Capture config file (TOML)
    #[arg(short, long, env = "FRAMEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory for the images
    #[arg(short, long)]
    output: PathBuf,

    /// Image format
    #[arg(long, default_value = "jpg")]
    format: ImageFormat,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 95)]
    jpg_quality: u8,

    /// Overwrite existing images
    #[arg(long)]
    overwrite: bool,

    /// First frame to export (1-based index or [HH:]MM:SS[.mmm])
    #[arg(long)]
    start_frame: Option<FramePos>,

    /// Last frame to export, inclusive (1-based index or [HH:]MM:SS[.mmm])
    #[arg(long)]
    end_frame: Option<FramePos>,

    /// Write per-frame metrics samples to this file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Disable the progress display
    #[arg(long)]
    no_progress: bool,
}

fn capture_config(args: &Args) -> Result<CaptureConfig> {
    let mut config = match (&args.config, &args.input) {
        (Some(path), _) => CaptureConfig::load(path)?,
        (None, Some(input)) => CaptureConfig::for_source(input),
        (None, None) => return Err(anyhow!("either --input or --config is required")),
    };
    if args.start_frame.is_some() || args.end_frame.is_some() {
        let file = config
            .file
            .as_mut()
            .ok_or_else(|| anyhow!("--start-frame/--end-frame only apply to file capture"))?;
        if args.start_frame.is_some() {
            file.start_frame = args.start_frame.clone();
        }
        if args.end_frame.is_some() {
            file.end_frame = args.end_frame.clone();
        }
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    ctrlc::set_handler(|| {
        log::info!("interrupt received, stopping");
        observable().notify(STOP_EVENT);
    })?;

    let config = capture_config(&args)?;
    let source = CaptureVideoPipe::open(&config)?;
    let total = source.frame_count();

    let save = SaveImage::new(&args.output, args.format)
        .with_jpg_quality(args.jpg_quality)
        .with_overwrite(args.overwrite);

    let metrics_stage = MetricsPipe::new();
    let metrics = metrics_stage.handle();

    let progress_stage = if args.no_progress {
        ProgressPipe::with_progress(frameflow::Progress::hidden())
    } else {
        ProgressPipe::new(total)
    };

    let mut pipeline = Pipeline::with_source(source)
        .map(SaveImagePipe::new(save))
        .map(progress_stage)
        .map(metrics_stage);

    let run_result = pipeline.run();
    let close_result = pipeline.close();
    run_result?;
    close_result?;

    let metrics = metrics.borrow();
    log::info!(
        "{} it, {:.3} s, {:.3} s/it, {:.2} it/s",
        metrics.len(),
        metrics.elapsed(),
        metrics.sec_per_iter(),
        metrics.iter_per_sec()
    );
    if let Some(path) = &args.metrics {
        metrics.save(path)?;
        log::info!("metrics written to {}", path.display());
    }
    Ok(())
}
