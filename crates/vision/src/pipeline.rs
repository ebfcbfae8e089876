//! The per-frame tracking loop.
//!
//! ```text
//! FrameSource ──► FrameSampler ──► PupilDetector ──► ChangeClassifier ──► MeasurementSink
//!                                        │
//!                                        └──► FrameObserver (visualization, may request stop)
//! ```
//!
//! Frames are processed strictly in decode order on the calling thread. The
//! classifier depends on the previous detection, so any future parallel
//! decoding must still feed detections to it in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use pupiltrack_common::clock::{Stopwatch, SystemClock, WallClock};
use pupiltrack_common::config::{DetectorConfig, PipelineConfig};
use pupiltrack_common::error::PupilResult;

use crate::classifier::ChangeClassifier;
use crate::detector::{DarkBlobDetector, Detection, PupilDetector};
use crate::record::{MeasurementRecord, MeasurementSink};
use crate::sampler::FrameSampler;
use crate::source::FrameSource;
use crate::timing::{Stage, StageTimings};

/// Shared flag used to request a graceful stop from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Answer of a visualization observer after seeing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverControl {
    Continue,
    Stop,
}

/// Receives every analyzed frame together with its detection.
pub trait FrameObserver {
    fn observe(
        &mut self,
        frame_index: u64,
        frame: &DynamicImage,
        detection: &Detection,
    ) -> PupilResult<ObserverControl>;
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source reached end of stream.
    Completed,
    /// A stop was requested; records emitted so far remain valid.
    Aborted,
}

/// Counters and timings of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub frame_skip: u32,
    pub frames_decoded: u64,
    pub frames_sampled: u64,
    pub records_emitted: u64,
    pub frames_without_detection: u64,
    pub timings: StageTimings,
}

/// Sampler, detector, and classifier wired together for one video.
pub struct PupilPipeline<D = DarkBlobDetector, C = SystemClock> {
    config: PipelineConfig,
    detector: D,
    classifier: ChangeClassifier,
    clock: C,
}

impl PupilPipeline {
    /// Build the reference pipeline with the dark-blob detector and system clock.
    pub fn new(config: PipelineConfig, detector: DetectorConfig) -> PupilResult<Self> {
        detector.validate()?;
        Self::with_parts(config, DarkBlobDetector::new(detector), SystemClock)
    }
}

impl<D: PupilDetector, C: WallClock> PupilPipeline<D, C> {
    pub fn with_parts(config: PipelineConfig, detector: D, clock: C) -> PupilResult<Self> {
        config.validate()?;
        let classifier = ChangeClassifier::new(config.change_threshold);
        Ok(Self {
            config,
            detector,
            classifier,
            clock,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn classifier(&self) -> &ChangeClassifier {
        &self.classifier
    }

    /// Detect and, when something was found, classify and build a record.
    ///
    /// A frame without detection returns `None` and leaves the classifier
    /// baseline untouched.
    pub fn process_frame(
        &mut self,
        frame_index: u64,
        frame: &DynamicImage,
    ) -> (Detection, Option<MeasurementRecord>) {
        self.measure(frame_index, frame, &mut StageTimings::default())
    }

    fn measure(
        &mut self,
        frame_index: u64,
        frame: &DynamicImage,
        timings: &mut StageTimings,
    ) -> (Detection, Option<MeasurementRecord>) {
        let watch = Stopwatch::start();
        let detection = self.detector.detect(frame);
        timings.record(Stage::Detect, watch.elapsed());

        let Some(area) = detection.area else {
            tracing::trace!(frame = frame_index, "No dark region found");
            return (detection, None);
        };

        let watch = Stopwatch::start();
        let change = self.classifier.observe(area);
        timings.record(Stage::Classify, watch.elapsed());

        let record =
            MeasurementRecord::from_detection(self.clock.now(), frame_index, &detection, change);
        tracing::debug!(
            frame = frame_index,
            area,
            center_x = ?record.center_x,
            center_y = ?record.center_y,
            change = %change,
            "Pupil measured"
        );
        (detection, Some(record))
    }

    /// Drive the whole source through the pipeline.
    ///
    /// The source is released on every exit path, including errors and
    /// stop requests. The observer is only consulted when visualization is
    /// enabled in the config.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn MeasurementSink,
        observer: Option<&mut dyn FrameObserver>,
        stop: &StopSignal,
    ) -> PupilResult<RunSummary> {
        let result = self.run_frames(source, sink, observer, stop);
        let released = source.release();
        let summary = result?;
        released?;
        sink.finish()?;

        summary.timings.log_summary();
        tracing::info!(
            outcome = ?summary.outcome,
            frames_decoded = summary.frames_decoded,
            frames_sampled = summary.frames_sampled,
            records_emitted = summary.records_emitted,
            frames_without_detection = summary.frames_without_detection,
            "Pupil tracking finished"
        );
        Ok(summary)
    }

    fn run_frames(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn MeasurementSink,
        mut observer: Option<&mut dyn FrameObserver>,
        stop: &StopSignal,
    ) -> PupilResult<RunSummary> {
        if !self.config.visualization_enabled {
            observer = None;
        }

        let frame_skip = self.resolve_frame_skip(source);
        let mut sampler = FrameSampler::new(frame_skip, self.config.scaling_factor);
        let mut timings = StageTimings::default();
        let mut frames_sampled = 0u64;
        let mut records_emitted = 0u64;
        let mut frames_without_detection = 0u64;
        let mut outcome = RunOutcome::Completed;

        tracing::info!(
            source = %source.describe(),
            detector = self.detector.name(),
            frame_skip,
            scaling_factor = self.config.scaling_factor,
            change_threshold = self.config.change_threshold,
            "Starting pupil tracking"
        );

        while let Some(sample) = sampler.next_sample(source, &mut timings)? {
            frames_sampled += 1;

            let (detection, record) = self.measure(sample.index, &sample.image, &mut timings);
            match record {
                Some(record) => {
                    let watch = Stopwatch::start();
                    sink.emit(&record)?;
                    timings.record(Stage::Emit, watch.elapsed());
                    records_emitted += 1;
                }
                None => frames_without_detection += 1,
            }

            if let Some(obs) = observer.as_deref_mut() {
                let watch = Stopwatch::start();
                let control = obs.observe(sample.index, &sample.image, &detection)?;
                timings.record(Stage::Observe, watch.elapsed());
                if control == ObserverControl::Stop {
                    tracing::info!(frame = sample.index, "Stop requested by observer");
                    outcome = RunOutcome::Aborted;
                    break;
                }
            }

            if stop.is_stop_requested() {
                tracing::info!(frame = sample.index, "Stop requested");
                outcome = RunOutcome::Aborted;
                break;
            }
        }

        Ok(RunSummary {
            outcome,
            frame_skip,
            frames_decoded: sampler.frames_decoded(),
            frames_sampled,
            records_emitted,
            frames_without_detection,
            timings,
        })
    }

    fn resolve_frame_skip(&self, source: &dyn FrameSource) -> u32 {
        let source_fps = source.frame_rate();
        if self.config.target_fps.is_some() && source_fps.is_none() {
            tracing::warn!(
                frame_skip = self.config.frame_skip,
                "Source reports no frame rate; ignoring target_fps"
            );
        }
        self.config.effective_frame_skip(source_fps)
    }
}
