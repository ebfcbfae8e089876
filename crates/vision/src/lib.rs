//! PupilTrack Vision: the pupil-tracking pipeline
//!
//! Turns a stream of decoded video frames into timestamped pupil measurements:
//! - **Frame Sampler:** stride-based frame selection and optional rescaling
//! - **Pupil Detector:** blur, inverse threshold, outer contours, largest dark blob
//! - **Change Classifier:** relative area change against the previous detection
//! - **Pipeline:** drives the three stages in strict frame order
//!
//! This crate is pure computation with no file or process I/O. Frame sources,
//! measurement sinks, and visualization are collaborators behind traits.

pub mod classifier;
pub mod contour;
pub mod detector;
pub mod pipeline;
pub mod record;
pub mod sampler;
pub mod source;
pub mod timing;

pub use classifier::{classify, ChangeClassifier, ChangeLabel};
pub use detector::{DarkBlobDetector, Detection, PupilDetector};
pub use pipeline::{FrameObserver, ObserverControl, PupilPipeline, RunOutcome, RunSummary, StopSignal};
pub use record::{MeasurementRecord, MeasurementSink};
pub use sampler::{FrameSampler, SampledFrame};
pub use source::{FrameSource, MemoryFrameSource};
