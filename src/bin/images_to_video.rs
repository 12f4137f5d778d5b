//! images_to_video - encode a directory of images into a video file
//!
//! Lists images under the input path (sorted, optionally filtered),
//! decodes them in order and appends each to the output video. Requires
//! the save-video-ffmpeg feature at build time.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use frameflow::observable::{observable, STOP_EVENT};
use frameflow::pipeline::{CaptureImagePipe, MetricsPipe, Pipeline, ProgressPipe, SaveVideoPipe};
use frameflow::save_video::{SaveVideo, SaveVideoConfig};

#[derive(Parser, Debug)]
#[command(about = "Encode a directory of images into a video file")]
struct Args {
    /// Image file or directory to read
    #[arg(short, long)]
    input: PathBuf,

    /// Output video file
    #[arg(short, long)]
    output: PathBuf,

    /// Frame rate of the output video
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Codec tag: mp4v, mjpg or h264
    #[arg(long, default_value = "mp4v")]
    fourcc: String,

    /// Only include files whose name contains this substring
    #[arg(long)]
    contains: Option<String>,

    /// Directory recursion depth (0 = top level only, unlimited if unset)
    #[arg(long)]
    level: Option<usize>,

    /// Overwrite an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Write per-frame metrics samples to this file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Disable the progress display
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    ctrlc::set_handler(|| {
        log::info!("interrupt received, stopping");
        observable().notify(STOP_EVENT);
    })?;

    let source = CaptureImagePipe::open(
        &args.input,
        frameflow::capture::image_dir::DEFAULT_IMAGE_EXTS,
        args.contains.as_deref(),
        args.level,
    )?;
    let total = source.total();
    log::info!("{total} images under {}", args.input.display());

    let mut save_config = SaveVideoConfig::new(&args.output);
    save_config.fps = args.fps;
    save_config.fourcc = args.fourcc.clone();
    save_config.overwrite = args.overwrite;
    let save = SaveVideo::new(save_config)?;

    let metrics_stage = MetricsPipe::new();
    let metrics = metrics_stage.handle();

    let progress_stage = if args.no_progress {
        ProgressPipe::with_progress(frameflow::Progress::hidden())
    } else {
        ProgressPipe::new(Some(total))
    };

    let mut pipeline = Pipeline::with_source(source)
        .map(SaveVideoPipe::new(save))
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
