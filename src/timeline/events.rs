//! Core event types
//!
//! The four event variants one trial's timeline is made of. Saccades,
//! fixations and blinks are created once by the reconciler and never change;
//! messages are the only mutable variant and are edited exclusively through
//! the owning timeline so both of its orders stay sorted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of an event within its owning timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub(crate) u64);

/// Closed tag over the event variants, used for typed navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Saccade,
    Fixation,
    Blink,
    Message,
}

impl EventKind {
    /// True for the gaze-derived variants (everything but messages)
    pub fn is_oculomotor(&self) -> bool {
        matches!(self, EventKind::Saccade | EventKind::Fixation | EventKind::Blink)
    }
}

/// A rapid, ballistic eye movement between two fixations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saccade {
    /// Onset time, ms
    pub start_time: f64,
    /// Offset time, ms
    pub end_time: f64,
    /// Elapsed time, ms
    pub duration: f64,
    /// First sample of the interval
    pub start_index: usize,
    /// Last sample of the interval
    pub end_index: usize,
    /// Gaze position at onset, px
    pub start: (f64, f64),
    /// Gaze position at offset, px
    pub end: (f64, f64),
    /// Endpoint distance in degrees of visual angle
    pub amplitude: f64,
    /// Endpoint distance in pixels
    pub length: f64,
    /// Direction of the displacement, radians
    pub direction: f64,
}

/// A period of relatively stable gaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixation {
    /// Onset time, ms
    pub start_time: f64,
    /// Offset time, ms
    pub end_time: f64,
    /// Elapsed time, ms
    pub duration: f64,
    /// First sample of the interval
    pub start_index: usize,
    /// Last sample of the interval
    pub end_index: usize,
    /// NaN-ignoring mean gaze position over the interval, px
    pub center: (f64, f64),
}

/// A period of missing gaze data attributed to eyelid closure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blink {
    /// Onset time, ms
    pub start_time: f64,
    /// Offset time, ms
    pub end_time: f64,
    /// Elapsed time, ms
    pub duration: f64,
    /// First sample of the interval
    pub start_index: usize,
    /// Last sample of the interval
    pub end_index: usize,
}

/// An experimenter-supplied text marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Marker time, ms; serves as both start and end
    pub time: f64,
    /// Marker text
    pub text: String,
}

/// Payload of one timeline event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventData {
    Saccade(Saccade),
    Fixation(Fixation),
    Blink(Blink),
    Message(Message),
}

/// One event owned by a trial's timeline.
///
/// The back-reference to the owning trial is its identifier, not a pointer:
/// the timeline owns the event, the event only knows where it belongs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Identity within the owning timeline
    pub id: EventId,
    /// Identifier of the owning trial
    pub trial: Uuid,
    /// The typed payload
    pub data: EventData,
}

impl Event {
    /// The closed type tag of this event
    pub fn kind(&self) -> EventKind {
        match self.data {
            EventData::Saccade(_) => EventKind::Saccade,
            EventData::Fixation(_) => EventKind::Fixation,
            EventData::Blink(_) => EventKind::Blink,
            EventData::Message(_) => EventKind::Message,
        }
    }

    /// Onset time; a message's single time stands in for both bounds
    pub fn start_time(&self) -> f64 {
        match &self.data {
            EventData::Saccade(s) => s.start_time,
            EventData::Fixation(f) => f.start_time,
            EventData::Blink(b) => b.start_time,
            EventData::Message(m) => m.time,
        }
    }

    /// Offset time; a message's single time stands in for both bounds
    pub fn end_time(&self) -> f64 {
        match &self.data {
            EventData::Saccade(s) => s.end_time,
            EventData::Fixation(f) => f.end_time,
            EventData::Blink(b) => b.end_time,
            EventData::Message(m) => m.time,
        }
    }

    /// The key the timeline sorts by
    pub(crate) fn time_key(&self) -> f64 {
        self.start_time()
    }

    /// Borrow the message payload, if this is a message
    pub fn as_message(&self) -> Option<&Message> {
        match &self.data {
            EventData::Message(m) => Some(m),
            _ => None,
        }
    }
}
