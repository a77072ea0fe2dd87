//! # Gaze Events
//!
//! An oculomotor event detection core that transforms a continuous, possibly
//! noisy, possibly binocular stream of gaze samples recorded during one
//! experimental trial into discrete saccade, fixation and blink events, and
//! merges them with experimenter messages into a chronological timeline.
//!
//! ## Overview
//!
//! The input is one trial's worth of already-captured data: a millisecond
//! timestamp array, one or two `(x, y)` position arrays with `NaN` marking
//! missing samples, an optional pupil-size array, and a raw message list.
//! Vendor file parsing, persistence, visualization and tracker control all
//! live in external collaborators; this crate is only the transform between
//! them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gaze_events::{DetectionConfig, EventDetector, Eye, TrialInput};
//!
//! let config = DetectionConfig {
//!     recorded_eye: Eye::Left,
//!     ..DetectionConfig::default()
//! };
//! let input = TrialInput::monocular(
//!     vec![0.0, 2.0, 4.0, 6.0],
//!     vec![512.0, 512.0, 514.0, 513.0],
//!     vec![384.0, 385.0, 384.0, 384.0],
//! );
//!
//! let trial = EventDetector::new().detect(&input, &config).expect("detection failed");
//! for event in trial.timeline.iter() {
//!     println!("{:?} at {} ms", event.kind(), event.start_time());
//! }
//! ```
//!
//! ## Architecture
//!
//! The system is organized into the following modules:
//!
//! - [`config`]: Resolved numeric configuration and selector parsing
//! - [`signal`]: Gap interpolation and low-pass trajectory filtering
//! - [`detect`]: Per-eye saccade and blink candidate detection
//! - [`reconcile`]: Cross-eye merging and duration/amplitude policies
//! - [`timeline`]: Event types and the chronological per-trial timeline
//! - [`workflow`]: Trial assembly and pipeline orchestration
//!
//! ## Detection Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Raw trial  │───▶│   Signal    │───▶│  Candidate  │───▶│    Event    │
//! │   arrays    │    │ Conditioner │    │  Detector   │    │  Reconciler │
//! └─────────────┘    └─────────────┘    │  (per eye)  │    │ (cross-eye) │
//!                                       └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────────┐    ┌─────────────┐                       ┌─────────────┐
//! │  Downstream │◀───│    Event    │◀──── messages ────────│    Typed    │
//! │ collaborator│    │  Timeline   │                       │   events    │
//! └─────────────┘    └─────────────┘                       └─────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The transform is synchronous and CPU-bound. Trials are mutually
//! independent and may be processed in parallel on separate threads; within
//! one trial, timeline mutation is single-writer.

pub mod config;
pub mod signal;
pub mod detect;
pub mod reconcile;
pub mod timeline;
pub mod workflow;

// Re-export commonly used types
pub use config::{BinocularAveraging, DetectionConfig, Eye, FilterConfig, FilterKind, ScreenGeometry};
pub use timeline::events::{Blink, Event, EventData, EventId, EventKind, Fixation, Message, Saccade};
pub use timeline::{Anchor, EventTimeline};
pub use workflow::{EventDetector, EyeChannels, Trial, TrialInput, TrialMetadata};

/// Result type alias for the detection core
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the detection core
///
/// Every variant is a fatal input-consistency error: it indicates
/// inconsistent data or selectors supplied by the ingestion collaborator,
/// never a recoverable runtime condition. Degenerate-but-valid inputs
/// (all-missing trajectories, zero candidates, zero messages) are handled
/// states, not errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown eye selector: {0:?} (expected one of \"L\", \"R\", \"B\")")]
    EyeSelector(String),

    #[error("Unknown filter selector: {0:?}")]
    FilterSelector(String),

    #[error("Non-positive resampling frequency: {0}")]
    ResamplingRate(f64),

    #[error("No sample matches timestamp {0} ms exactly")]
    TimestampLookup(f64),

    #[error("Trial input error: {0}")]
    TrialInput(String),

    #[error("Signal conditioning error: {0}")]
    Signal(String),

    #[error("Timeline error: {0}")]
    Timeline(String),
}
