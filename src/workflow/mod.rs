//! Trial assembly
//!
//! Orchestrates the complete detection pipeline for one trial: condition
//! each eye's channels, detect candidates per eye, reconcile across eyes,
//! and assemble the event timeline together with the experimenter messages.

use crate::config::{DetectionConfig, Eye};
use crate::detect::{self, kinematics, CandidateInterval, KinematicProfile};
use crate::reconcile::{self, EyeInput};
use crate::signal;
use crate::timeline::events::Message;
use crate::timeline::EventTimeline;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One eye's raw recorded channels, NaN marking missing samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeChannels {
    /// Horizontal gaze position, px
    pub x: Vec<f64>,
    /// Vertical gaze position, px
    pub y: Vec<f64>,
    /// Pupil size, vendor units; carried for downstream collaborators
    pub pupil: Option<Vec<f64>>,
}

/// The raw per-trial data handed over by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialInput {
    /// Sample timestamps, milliseconds, strictly increasing
    pub timestamps: Vec<f64>,
    /// Left-eye channels, when recorded
    pub left: Option<EyeChannels>,
    /// Right-eye channels, when recorded
    pub right: Option<EyeChannels>,
    /// Unordered experimenter messages
    pub messages: Vec<Message>,
}

impl TrialInput {
    /// Single-eye trial; the channels land on the left-eye slot, pair it
    /// with [`Eye::Left`] in the configuration.
    pub fn monocular(timestamps: Vec<f64>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            timestamps,
            left: Some(EyeChannels { x, y, pupil: None }),
            right: None,
            messages: Vec::new(),
        }
    }

    /// Two-eye trial over one shared clock.
    pub fn binocular(
        timestamps: Vec<f64>,
        left_x: Vec<f64>,
        left_y: Vec<f64>,
        right_x: Vec<f64>,
        right_y: Vec<f64>,
    ) -> Self {
        Self {
            timestamps,
            left: Some(EyeChannels {
                x: left_x,
                y: left_y,
                pupil: None,
            }),
            right: Some(EyeChannels {
                x: right_x,
                y: right_y,
                pupil: None,
            }),
            messages: Vec::new(),
        }
    }

    /// Attach the experimenter message list.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    fn validate(&self, recorded_eye: Eye) -> Result<()> {
        if self.timestamps.is_empty() {
            return Err(Error::TrialInput("empty trial clock".into()));
        }
        if self.timestamps.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::TrialInput(
                "timestamps must be strictly increasing".into(),
            ));
        }

        let n = self.timestamps.len();
        for (label, channels) in [("left", &self.left), ("right", &self.right)] {
            if let Some(ch) = channels {
                if ch.x.len() != n || ch.y.len() != n {
                    return Err(Error::TrialInput(format!(
                        "{label} channel length {}x{} does not match {} timestamps",
                        ch.x.len(),
                        ch.y.len(),
                        n
                    )));
                }
                if let Some(pupil) = &ch.pupil {
                    if pupil.len() != n {
                        return Err(Error::TrialInput(format!(
                            "{label} pupil channel length {} does not match {} timestamps",
                            pupil.len(),
                            n
                        )));
                    }
                }
            }
        }

        let missing = |label: &str| Error::TrialInput(format!("{label} eye channels missing"));
        match recorded_eye {
            Eye::Left if self.left.is_none() => Err(missing("left")),
            Eye::Right if self.right.is_none() => Err(missing("right")),
            Eye::Binocular if self.left.is_none() || self.right.is_none() => {
                Err(Error::TrialInput(
                    "binocular trial requires both eye channel sets".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Trial bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialMetadata {
    /// Unique trial ID; events back-reference it
    pub id: Uuid,
    /// When detection ran
    pub detected_at: DateTime<Utc>,
    /// Number of samples in the trial
    pub sample_count: usize,
    /// Trial span, ms
    pub duration_ms: f64,
}

impl TrialMetadata {
    fn new(timestamps: &[f64]) -> Self {
        Self {
            id: Uuid::new_v4(),
            detected_at: Utc::now(),
            sample_count: timestamps.len(),
            duration_ms: timestamps.last().unwrap_or(&0.0) - timestamps.first().unwrap_or(&0.0),
        }
    }
}

/// One detected trial: metadata plus the assembled event timeline.
///
/// A trial owns its timeline exclusively; distinct trials share no state and
/// may be processed on separate threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub metadata: TrialMetadata,
    pub timeline: EventTimeline,
}

impl Trial {
    /// Saccade payloads in chronological order
    pub fn saccades(&self) -> impl Iterator<Item = &crate::Saccade> {
        self.timeline.iter().filter_map(|e| match &e.data {
            crate::EventData::Saccade(s) => Some(s),
            _ => None,
        })
    }

    /// Fixation payloads in chronological order
    pub fn fixations(&self) -> impl Iterator<Item = &crate::Fixation> {
        self.timeline.iter().filter_map(|e| match &e.data {
            crate::EventData::Fixation(f) => Some(f),
            _ => None,
        })
    }

    /// Blink payloads in chronological order
    pub fn blinks(&self) -> impl Iterator<Item = &crate::Blink> {
        self.timeline.iter().filter_map(|e| match &e.data {
            crate::EventData::Blink(b) => Some(b),
            _ => None,
        })
    }
}

/// One eye after conditioning and candidate detection.
struct PreparedEye {
    x: Vec<f64>,
    y: Vec<f64>,
    profile: KinematicProfile,
    candidates: Vec<CandidateInterval>,
}

/// Event detector orchestrating the complete detection pipeline
#[derive(Debug, Default)]
pub struct EventDetector;

impl EventDetector {
    pub fn new() -> Self {
        Self
    }

    /// Run detection over one trial.
    ///
    /// Synchronous and CPU-bound; fails only on input-consistency errors
    /// (invalid configuration, mismatched arrays, inconsistent clock).
    pub fn detect(&self, input: &TrialInput, config: &DetectionConfig) -> Result<Trial> {
        config.validate()?;
        input.validate(config.recorded_eye)?;

        let t = &input.timestamps;
        info!(
            samples = t.len(),
            eye = ?config.recorded_eye,
            "detecting oculomotor events"
        );

        if config.recorded_eye != Eye::Binocular && input.left.is_some() && input.right.is_some() {
            warn!(
                "both eye channel sets supplied for a monocular trial; the unselected eye is ignored"
            );
        }

        let left = match config.recorded_eye {
            Eye::Left | Eye::Binocular => {
                Some(self.prepare_eye(t, input.left.as_ref().expect("validated"), config)?)
            }
            Eye::Right => None,
        };
        let right = match config.recorded_eye {
            Eye::Right | Eye::Binocular => {
                Some(self.prepare_eye(t, input.right.as_ref().expect("validated"), config)?)
            }
            Eye::Left => None,
        };

        // Blink runs scan the channels the detectors saw: conditioning
        // restores every original gap, so the missing mask is the raw one
        let mask_channels: Vec<&[f64]> = left
            .iter()
            .chain(right.iter())
            .flat_map(|eye| [eye.x.as_slice(), eye.y.as_slice()])
            .collect();
        let blink_runs = detect::detect_blink_runs(t, &mask_channels);
        debug!(blink_runs = blink_runs.len(), "blink-run scan complete");

        let left_input = left.as_ref().map(|eye| EyeInput {
            x_px: &eye.x,
            y_px: &eye.y,
            profile: &eye.profile,
            candidates: eye.candidates.clone(),
        });
        let right_input = right.as_ref().map(|eye| EyeInput {
            x_px: &eye.x,
            y_px: &eye.y,
            profile: &eye.profile,
            candidates: eye.candidates.clone(),
        });

        let events = reconcile::reconcile(
            t,
            left_input.as_ref(),
            right_input.as_ref(),
            blink_runs,
            config,
        );

        let metadata = TrialMetadata::new(t);
        let timeline = EventTimeline::assemble(
            metadata.id,
            t.clone(),
            events.saccades,
            events.fixations.unwrap_or_default(),
            events.blinks,
            input.messages.clone(),
        )?;

        info!(
            trial = %metadata.id,
            events = timeline.len(),
            "trial timeline assembled"
        );
        Ok(Trial { metadata, timeline })
    }

    fn prepare_eye(
        &self,
        t: &[f64],
        channels: &EyeChannels,
        config: &DetectionConfig,
    ) -> Result<PreparedEye> {
        let (x, y) = signal::apply_filter(
            t,
            &channels.x,
            &channels.y,
            &config.filter,
            config.resampling_rate,
            config.position_decimals,
        )?;

        let (x_deg, y_deg) = kinematics::to_degrees(&config.screen, &x, &y);
        let profile = kinematics::profile(t, x_deg, y_deg);
        let candidates = detect::detect_saccade_candidates(
            t,
            &profile,
            config.saccade_velocity_threshold,
            config.saccade_acceleration_threshold,
        );
        debug!(candidates = candidates.len(), "per-eye candidate scan complete");

        Ok(PreparedEye {
            x,
            y,
            profile,
            candidates,
        })
    }
}
