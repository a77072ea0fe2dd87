//! Per-trial event timeline
//!
//! One trial's chronological merge of saccade, fixation, blink and message
//! events. The sequence is always sorted by time key; construction verifies
//! that every oculomotor interval endpoint resolves to exactly the sample
//! index the reconciler claimed, and every later mutation (message insert,
//! update, delete) re-establishes sorted order in both the merged sequence
//! and the message-only sequence.
//!
//! Not safe for concurrent mutation: message edits re-derive global sort
//! order across both sequences, so writers must be serialized per trial.

pub mod events;

use crate::{Error, Result};
use events::{Blink, Event, EventData, EventId, EventKind, Fixation, Message, Saccade};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference point for timeline navigation.
///
/// The two variants deliberately have different semantics: a member anchor
/// walks positions in the merged sequence (counting type matches when a kind
/// filter is given), while a time anchor is a boundary lookup over time keys
/// strictly before or after the given instant.
#[derive(Debug, Clone, Copy)]
pub enum Anchor {
    /// An event that belongs to this timeline
    Member(EventId),
    /// A bare timestamp, not necessarily any event's time
    Time(f64),
}

/// The chronologically ordered event sequence of one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTimeline {
    trial: Uuid,
    timestamps: Vec<f64>,
    /// Merged sequence, sorted by time key
    events: Vec<Event>,
    /// Message-only sequence, sorted by message time
    messages: Vec<EventId>,
    next_id: u64,
}

impl EventTimeline {
    /// Build the merged timeline for one trial.
    ///
    /// The saccade/fixation/blink lists are already time-ordered by
    /// construction; the message list is unordered. The merge is stable, so
    /// events with equal time keys keep list order (saccades, fixations,
    /// blinks, then messages) — the same final order repeated ordered
    /// insertion would produce.
    ///
    /// Every interval endpoint must match its claimed sample index exactly;
    /// anything else means the reconciler handed over inconsistent
    /// index/time data and is a fatal error, not a recoverable condition.
    pub fn assemble(
        trial: Uuid,
        timestamps: Vec<f64>,
        saccades: Vec<Saccade>,
        fixations: Vec<Fixation>,
        blinks: Vec<Blink>,
        mut raw_messages: Vec<Message>,
    ) -> Result<Self> {
        for s in &saccades {
            check_endpoint(&timestamps, s.start_time, s.start_index)?;
            check_endpoint(&timestamps, s.end_time, s.end_index)?;
        }
        for f in &fixations {
            check_endpoint(&timestamps, f.start_time, f.start_index)?;
            check_endpoint(&timestamps, f.end_time, f.end_index)?;
        }
        for b in &blinks {
            check_endpoint(&timestamps, b.start_time, b.start_index)?;
            check_endpoint(&timestamps, b.end_time, b.end_index)?;
        }

        raw_messages.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut timeline = Self {
            trial,
            timestamps,
            events: Vec::new(),
            messages: Vec::new(),
            next_id: 0,
        };

        let mut events = Vec::new();
        for s in saccades {
            events.push(timeline.wrap(EventData::Saccade(s)));
        }
        for f in fixations {
            events.push(timeline.wrap(EventData::Fixation(f)));
        }
        for b in blinks {
            events.push(timeline.wrap(EventData::Blink(b)));
        }
        for m in raw_messages {
            let event = timeline.wrap(EventData::Message(m));
            timeline.messages.push(event.id);
            events.push(event);
        }

        events.sort_by(|a, b| a.time_key().total_cmp(&b.time_key()));
        timeline.events = events;
        Ok(timeline)
    }

    fn wrap(&mut self, data: EventData) -> Event {
        let id = EventId(self.next_id);
        self.next_id += 1;
        Event {
            id,
            trial: self.trial,
            data,
        }
    }

    /// Identifier of the owning trial
    pub fn trial(&self) -> Uuid {
        self.trial
    }

    /// The trial clock the events were detected against
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Number of events in the merged sequence
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the merged sequence is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate the merged sequence in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Iterate events of one kind in chronological order
    pub fn iter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    /// Look an event up by identity
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// The message-only sequence, sorted by message time
    pub fn messages(&self) -> impl Iterator<Item = &Event> + '_ {
        self.messages.iter().filter_map(|id| self.get(*id))
    }

    /// Sample index whose timestamp is nearest to `t`.
    ///
    /// Ties resolve to the lowest index. `None` only for an empty clock.
    pub fn index_from_time(&self, t: f64) -> Option<usize> {
        let ts = &self.timestamps;
        if ts.is_empty() {
            return None;
        }
        let i = ts.partition_point(|&x| x < t);
        if i == 0 {
            return Some(0);
        }
        if i == ts.len() {
            return Some(ts.len() - 1);
        }
        // The lower neighbor wins a tie
        if (t - ts[i - 1]).abs() <= (ts[i] - t).abs() {
            Some(i - 1)
        } else {
            Some(i)
        }
    }

    /// The event `step` places (or type matches) after the anchor.
    ///
    /// Member anchors walk the merged sequence: without a kind filter the
    /// result is the event `step` positions later; with one, matches of that
    /// kind are counted until the `step`-th. Time anchors return the
    /// `step`-th event whose time key lies strictly after the anchor,
    /// searching the kind-filtered time sequence directly when a kind is
    /// given.
    pub fn next_event(
        &self,
        anchor: Anchor,
        step: usize,
        kind: Option<EventKind>,
    ) -> Option<&Event> {
        self.navigate(anchor, step, kind, Direction::Forward)
    }

    /// Mirror of [`next_event`](Self::next_event) walking backwards.
    pub fn previous_event(
        &self,
        anchor: Anchor,
        step: usize,
        kind: Option<EventKind>,
    ) -> Option<&Event> {
        self.navigate(anchor, step, kind, Direction::Backward)
    }

    fn navigate(
        &self,
        anchor: Anchor,
        step: usize,
        kind: Option<EventKind>,
        direction: Direction,
    ) -> Option<&Event> {
        if step == 0 {
            return None;
        }
        match anchor {
            Anchor::Member(id) => {
                let pos = self.events.iter().position(|e| e.id == id)?;
                match kind {
                    None => {
                        let target = match direction {
                            Direction::Forward => pos.checked_add(step)?,
                            Direction::Backward => pos.checked_sub(step)?,
                        };
                        self.events.get(target)
                    }
                    Some(kind) => {
                        let mut remaining = step;
                        let mut walk: Box<dyn Iterator<Item = &Event> + '_> = match direction {
                            Direction::Forward => Box::new(self.events[pos + 1..].iter()),
                            Direction::Backward => Box::new(self.events[..pos].iter().rev()),
                        };
                        walk.find(|e| {
                            if e.kind() == kind {
                                remaining -= 1;
                                remaining == 0
                            } else {
                                false
                            }
                        })
                    }
                }
            }
            Anchor::Time(t) => {
                let matches_kind = |e: &&Event| kind.map_or(true, |k| e.kind() == k);
                match direction {
                    Direction::Forward => self
                        .events
                        .iter()
                        .filter(matches_kind)
                        .filter(|e| e.time_key() > t)
                        .nth(step - 1),
                    Direction::Backward => self
                        .events
                        .iter()
                        .rev()
                        .filter(matches_kind)
                        .filter(|e| e.time_key() < t)
                        .nth(step - 1),
                }
            }
        }
    }

    /// Insert a message marker at its sorted position in both sequences.
    pub fn insert_message(&mut self, time: f64, text: impl Into<String>) -> EventId {
        let event = self.wrap(EventData::Message(Message {
            time,
            text: text.into(),
        }));
        let id = event.id;

        let pos = self.events.partition_point(|e| e.time_key() <= time);
        self.events.insert(pos, event);

        let mpos = self
            .messages
            .partition_point(|mid| self.message_time(*mid) <= time);
        self.messages.insert(mpos, id);
        id
    }

    /// Re-time or re-text a message.
    ///
    /// Performs a full re-sort of both sequences afterwards; with per-trial
    /// message counts this is cheap, but it is not O(1).
    pub fn update_message(
        &mut self,
        id: EventId,
        new_time: f64,
        new_text: impl Into<String>,
    ) -> Result<()> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::Timeline(format!("no event with id {:?}", id)))?;
        match &mut event.data {
            EventData::Message(m) => {
                m.time = new_time;
                m.text = new_text.into();
            }
            _ => {
                return Err(Error::Timeline(format!(
                    "event {:?} is not a message",
                    id
                )))
            }
        }

        self.events
            .sort_by(|a, b| a.time_key().total_cmp(&b.time_key()));
        let times: Vec<(EventId, f64)> = self
            .messages
            .iter()
            .map(|mid| (*mid, self.message_time(*mid)))
            .collect();
        let mut sorted = times;
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
        self.messages = sorted.into_iter().map(|(mid, _)| mid).collect();
        Ok(())
    }

    /// Remove a message from both sequences, returning its payload.
    pub fn delete_message(&mut self, id: EventId) -> Result<Message> {
        let pos = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::Timeline(format!("no event with id {:?}", id)))?;
        if self.events[pos].as_message().is_none() {
            return Err(Error::Timeline(format!("event {:?} is not a message", id)));
        }
        let event = self.events.remove(pos);
        self.messages.retain(|mid| *mid != id);
        match event.data {
            EventData::Message(m) => Ok(m),
            _ => unreachable!("checked above"),
        }
    }

    fn message_time(&self, id: EventId) -> f64 {
        self.events
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.as_message())
            .map(|m| m.time)
            .unwrap_or(f64::INFINITY)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Resolve one interval endpoint against the trial clock.
///
/// The timestamp must match exactly one sample, and that sample must be the
/// index the event claims.
fn check_endpoint(timestamps: &[f64], time: f64, index: usize) -> Result<()> {
    let i = timestamps.partition_point(|&x| x < time);
    if i >= timestamps.len() || timestamps[i] != time || i != index {
        return Err(Error::TimestampLookup(time));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 50.0).collect()
    }

    fn fixation(timestamps: &[f64], start: usize, end: usize) -> Fixation {
        Fixation {
            start_time: timestamps[start],
            end_time: timestamps[end],
            duration: timestamps[end] - timestamps[start],
            start_index: start,
            end_index: end,
            center: (0.0, 0.0),
        }
    }

    fn saccade(timestamps: &[f64], start: usize, end: usize) -> Saccade {
        Saccade {
            start_time: timestamps[start],
            end_time: timestamps[end],
            duration: timestamps[end] - timestamps[start],
            start_index: start,
            end_index: end,
            start: (0.0, 0.0),
            end: (10.0, 0.0),
            amplitude: 1.0,
            length: 10.0,
            direction: 0.0,
        }
    }

    fn sample_timeline() -> EventTimeline {
        // fixation [0,2], saccade [2,4], fixation [4,6] at 50 ms spacing
        let t = times(7);
        EventTimeline::assemble(
            Uuid::new_v4(),
            t.clone(),
            vec![saccade(&t, 2, 4)],
            vec![fixation(&t, 0, 2), fixation(&t, 4, 6)],
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_assemble_orders_by_time() {
        let timeline = sample_timeline();
        let starts: Vec<f64> = timeline.iter().map(|e| e.start_time()).collect();
        assert_eq!(starts, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_assemble_rejects_mismatched_endpoint() {
        let t = times(5);
        let mut bad = saccade(&t, 1, 3);
        bad.end_time += 1.0; // no longer matches any sample
        let err = EventTimeline::assemble(Uuid::new_v4(), t, vec![bad], vec![], vec![], vec![])
            .unwrap_err();
        assert!(matches!(err, Error::TimestampLookup(_)));
    }

    #[test]
    fn test_assemble_rejects_wrong_index() {
        let t = times(5);
        let mut bad = saccade(&t, 1, 3);
        bad.start_index = 2; // time says 1, index says 2
        let err = EventTimeline::assemble(Uuid::new_v4(), t, vec![bad], vec![], vec![], vec![])
            .unwrap_err();
        assert!(matches!(err, Error::TimestampLookup(_)));
    }

    #[test]
    fn test_unordered_messages_are_sorted_in() {
        let t = times(3);
        let timeline = EventTimeline::assemble(
            Uuid::new_v4(),
            t,
            vec![],
            vec![],
            vec![],
            vec![
                Message { time: 90.0, text: "late".into() },
                Message { time: 10.0, text: "early".into() },
            ],
        )
        .unwrap();
        let texts: Vec<&str> = timeline
            .messages()
            .map(|e| e.as_message().unwrap().text.as_str())
            .collect();
        assert_eq!(texts, vec!["early", "late"]);
    }

    #[test]
    fn test_index_from_time_identity() {
        let timeline = sample_timeline();
        for (i, &t) in timeline.timestamps().iter().enumerate() {
            assert_eq!(timeline.index_from_time(t), Some(i));
        }
    }

    #[test]
    fn test_index_from_time_nearest_and_ties() {
        let timeline = sample_timeline();
        assert_eq!(timeline.index_from_time(60.0), Some(1));
        assert_eq!(timeline.index_from_time(-10.0), Some(0));
        assert_eq!(timeline.index_from_time(1e6), Some(6));
        // 75 is equidistant between samples 1 and 2; the first minimizer wins
        assert_eq!(timeline.index_from_time(75.0), Some(1));
    }

    #[test]
    fn test_member_navigation_untyped() {
        let timeline = sample_timeline();
        let first = timeline.iter().next().unwrap().id;
        let second = timeline.next_event(Anchor::Member(first), 1, None).unwrap();
        assert_eq!(second.kind(), EventKind::Saccade);
        let third = timeline.next_event(Anchor::Member(first), 2, None).unwrap();
        assert_eq!(third.start_time(), 200.0);
        assert!(timeline.next_event(Anchor::Member(first), 3, None).is_none());
        assert!(timeline.previous_event(Anchor::Member(first), 1, None).is_none());
    }

    #[test]
    fn test_member_navigation_typed_counts_matches() {
        let timeline = sample_timeline();
        let first = timeline.iter().next().unwrap().id;
        let fix = timeline
            .next_event(Anchor::Member(first), 1, Some(EventKind::Fixation))
            .unwrap();
        // The saccade in between is not counted
        assert_eq!(fix.start_time(), 200.0);
        assert!(timeline
            .next_event(Anchor::Member(first), 2, Some(EventKind::Fixation))
            .is_none());
    }

    #[test]
    fn test_navigation_round_trip() {
        let timeline = sample_timeline();
        let middle = timeline.iter().nth(1).unwrap().id;
        let back = timeline.previous_event(Anchor::Member(middle), 1, None).unwrap();
        let forth = timeline.next_event(Anchor::Member(back.id), 1, None).unwrap();
        assert_eq!(forth.id, middle);
    }

    #[test]
    fn test_time_anchor_is_boundary_lookup() {
        let timeline = sample_timeline();
        // 100.0 is an event's exact time; strictly-after skips it
        let next = timeline.next_event(Anchor::Time(100.0), 1, None).unwrap();
        assert_eq!(next.start_time(), 200.0);
        let prev = timeline.previous_event(Anchor::Time(100.0), 1, None).unwrap();
        assert_eq!(prev.start_time(), 0.0);
        // Second event strictly before 250
        let prev2 = timeline.previous_event(Anchor::Time(250.0), 2, None).unwrap();
        assert_eq!(prev2.start_time(), 100.0);
    }

    #[test]
    fn test_time_anchor_with_kind_filter() {
        let timeline = sample_timeline();
        let fix = timeline
            .next_event(Anchor::Time(0.0), 1, Some(EventKind::Fixation))
            .unwrap();
        assert_eq!(fix.start_time(), 200.0);
        let sac = timeline
            .previous_event(Anchor::Time(300.0), 1, Some(EventKind::Saccade))
            .unwrap();
        assert_eq!(sac.start_time(), 100.0);
    }

    #[test]
    fn test_insert_message_at_sorted_position() {
        let mut timeline = sample_timeline();
        timeline.insert_message(125.0, "probe");
        let kinds: Vec<EventKind> = timeline.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Fixation,
                EventKind::Saccade,
                EventKind::Message,
                EventKind::Fixation
            ]
        );
    }

    #[test]
    fn test_insert_then_delete_restores_timeline() {
        let mut timeline = sample_timeline();
        let before: Vec<EventId> = timeline.iter().map(|e| e.id).collect();
        let id = timeline.insert_message(125.0, "probe");
        assert_eq!(timeline.len(), before.len() + 1);
        let removed = timeline.delete_message(id).unwrap();
        assert_eq!(removed.text, "probe");
        let after: Vec<EventId> = timeline.iter().map(|e| e.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_message_resorts_both_sequences() {
        let mut timeline = sample_timeline();
        let early = timeline.insert_message(10.0, "a");
        timeline.insert_message(300.0, "b");
        timeline.update_message(early, 400.0, "a-moved").unwrap();

        let message_times: Vec<f64> = timeline
            .messages()
            .map(|e| e.as_message().unwrap().time)
            .collect();
        assert_eq!(message_times, vec![300.0, 400.0]);

        let merged_times: Vec<f64> = timeline.iter().map(|e| e.start_time()).collect();
        let mut sorted = merged_times.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(merged_times, sorted);
        assert_eq!(timeline.iter().last().unwrap().id, early);
    }

    #[test]
    fn test_mutating_non_message_is_fatal() {
        let mut timeline = sample_timeline();
        let saccade_id = timeline
            .iter_kind(EventKind::Saccade)
            .next()
            .unwrap()
            .id;
        assert!(matches!(
            timeline.update_message(saccade_id, 0.0, "x"),
            Err(Error::Timeline(_))
        ));
        assert!(matches!(
            timeline.delete_message(saccade_id),
            Err(Error::Timeline(_))
        ));
    }
}
