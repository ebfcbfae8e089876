//! Track the pupil through a video or an image sequence.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use pupiltrack_common::config::TrackerConfig;
use pupiltrack_media::{
    CsvMeasurementWriter, FfmpegFrameSource, ImageSequenceSource, JsonlMeasurementWriter,
    OverlayWriter,
};
use pupiltrack_vision::{
    FrameObserver, FrameSource, MeasurementSink, PupilPipeline, RunOutcome, RunSummary,
    StopSignal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl OutputFormat {
    fn default_file_name(self) -> &'static str {
        match self {
            Self::Csv => "pupil_data.csv",
            Self::Jsonl => "pupil_data.jsonl",
        }
    }
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Video file, or a directory of frames with --images
    pub input: PathBuf,

    /// Output file (defaults to pupil_data.csv / pupil_data.jsonl)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Analyze every Nth decoded frame
    #[arg(long)]
    pub frame_skip: Option<u32>,

    /// Desired analysis rate; overrides --frame-skip when the source rate is known
    #[arg(long)]
    pub target_fps: Option<f64>,

    /// Resize factor applied before detection
    #[arg(long)]
    pub scale: Option<f64>,

    /// Relative area change below which a frame counts as unchanged
    #[arg(long)]
    pub change_threshold: Option<f64>,

    /// Gaussian blur kernel size (odd; 1 disables blurring)
    #[arg(long)]
    pub blur_kernel: Option<u32>,

    /// Pixels darker than this are candidate pupil pixels
    #[arg(long)]
    pub intensity_threshold: Option<u8>,

    /// Treat INPUT as a directory of image frames
    #[arg(long)]
    pub images: bool,

    /// Input frame rate when the source does not report one
    #[arg(long)]
    pub source_fps: Option<f64>,

    /// Write annotated frames for inspection
    #[arg(long)]
    pub visualize: bool,

    /// Directory for annotated frames
    #[arg(long, default_value = "overlays")]
    pub overlay_dir: PathBuf,

    /// Stop the run after writing this many annotated frames
    #[arg(long)]
    pub max_overlays: Option<u64>,

    /// Config file (defaults to the user config location)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl TrackArgs {
    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_file_name()))
    }

    /// Load the base config and apply command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => TrackerConfig::load(),
        };

        let pipeline = &mut config.pipeline;
        if let Some(n) = self.frame_skip {
            pipeline.frame_skip = n;
        }
        if self.target_fps.is_some() {
            pipeline.target_fps = self.target_fps;
        }
        if let Some(scale) = self.scale {
            pipeline.scaling_factor = scale;
        }
        if let Some(threshold) = self.change_threshold {
            pipeline.change_threshold = threshold;
        }
        if self.visualize || self.max_overlays.is_some() {
            pipeline.visualization_enabled = true;
        }

        let detector = &mut config.detector;
        if let Some(kernel) = self.blur_kernel {
            detector.blur_kernel_size = kernel;
        }
        if let Some(threshold) = self.intensity_threshold {
            detector.intensity_threshold = threshold;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }
}

pub async fn run(args: TrackArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let output = args.output_path();

    println!("Tracking pupil: {}", args.input.display());
    println!("  Output: {} ({:?})", output.display(), args.format);
    println!(
        "  Sampling: every {} frame(s){}",
        config.pipeline.frame_skip,
        config
            .pipeline
            .target_fps
            .map(|fps| format!(", target {fps} fps"))
            .unwrap_or_default()
    );
    println!("  Scale: {}", config.pipeline.scaling_factor);
    if config.pipeline.visualization_enabled {
        println!("  Overlays: {}", args.overlay_dir.display());
    }
    println!();
    println!("Press Ctrl+C to stop early...");
    println!();

    let stop = StopSignal::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current frame");
            ctrl_c_stop.request_stop();
        }
    });

    let summary = {
        let output = output.clone();
        tokio::task::spawn_blocking(move || track_blocking(&args, config, &output, &stop))
            .await
            .context("Tracking task panicked")??
    };

    print_summary(&summary, &output);
    Ok(())
}

fn track_blocking(
    args: &TrackArgs,
    config: TrackerConfig,
    output: &Path,
    stop: &StopSignal,
) -> anyhow::Result<RunSummary> {
    let mut source: Box<dyn FrameSource> = if args.images {
        Box::new(ImageSequenceSource::open(&args.input, args.source_fps)?)
    } else {
        Box::new(FfmpegFrameSource::open(&args.input)?.with_fallback_frame_rate(args.source_fps))
    };

    let mut sink: Box<dyn MeasurementSink> = match args.format {
        OutputFormat::Csv => Box::new(CsvMeasurementWriter::create(output)?),
        OutputFormat::Jsonl => Box::new(JsonlMeasurementWriter::create(output)?),
    };

    let mut overlay = if config.pipeline.visualization_enabled {
        Some(OverlayWriter::new(&args.overlay_dir, args.max_overlays)?)
    } else {
        None
    };

    let mut pipeline = PupilPipeline::new(config.pipeline, config.detector)?;
    let summary = pipeline.run(
        source.as_mut(),
        sink.as_mut(),
        overlay.as_mut().map(|o| o as &mut dyn FrameObserver),
        stop,
    )?;
    Ok(summary)
}

fn print_summary(summary: &RunSummary, output: &Path) {
    match summary.outcome {
        RunOutcome::Completed => println!("Tracking complete."),
        RunOutcome::Aborted => println!("Tracking stopped early; partial results kept."),
    }
    println!("  Frames decoded: {}", summary.frames_decoded);
    println!(
        "  Frames analyzed: {} (every {})",
        summary.frames_sampled, summary.frame_skip
    );
    println!("  Records written: {}", summary.records_emitted);
    println!(
        "  Frames without pupil: {}",
        summary.frames_without_detection
    );
    println!("  Output: {}", output.display());
    println!();
    println!("{}", summary.timings);

    if summary.frames_sampled > 0 && summary.records_emitted == 0 {
        println!("No pupil was found in any analyzed frame. Try a higher --intensity-threshold.");
    }
}
