//! Integration tests for timeline queries, navigation and message editing.

use gaze_events::{
    Anchor, DetectionConfig, EventDetector, EventKind, EventTimeline, Eye, Message, TrialInput,
};
use uuid::Uuid;

fn clock(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64 * 10.0).collect()
}

fn monocular_config() -> DetectionConfig {
    DetectionConfig {
        recorded_eye: Eye::Left,
        fixation_minimum_duration: 5.0,
        ..DetectionConfig::default()
    }
}

/// A trial with a fixation / saccade / fixation structure plus two messages.
fn detected_trial() -> gaze_events::Trial {
    let x = vec![0.0, 0.0, 500.0, 500.0, 500.0, 500.0];
    let y = vec![0.0; 6];
    let input = TrialInput::monocular(clock(6), x, y).with_messages(vec![
        Message { time: 45.0, text: "response".into() },
        Message { time: 5.0, text: "stimulus".into() },
    ]);
    EventDetector::new()
        .detect(&input, &monocular_config())
        .unwrap()
}

#[test]
fn test_index_from_time_identity_over_trial_clock() {
    let trial = detected_trial();
    let timeline = &trial.timeline;
    for (i, &t) in timeline.timestamps().iter().enumerate() {
        assert_eq!(timeline.index_from_time(t), Some(i));
    }
}

#[test]
fn test_message_insertion_lands_between_events() {
    // Events at 100, 150 and 200 ms; a message at 125 lands at position 1
    let mut timeline = EventTimeline::assemble(
        Uuid::new_v4(),
        vec![100.0, 150.0, 200.0],
        vec![],
        vec![],
        vec![],
        vec![
            Message { time: 100.0, text: "a".into() },
            Message { time: 150.0, text: "b".into() },
            Message { time: 200.0, text: "c".into() },
        ],
    )
    .unwrap();

    timeline.insert_message(125.0, "probe");
    let probe = timeline.iter().nth(1).unwrap();
    assert_eq!(probe.as_message().unwrap().text, "probe");
    assert_eq!(probe.as_message().unwrap().time, 125.0);
}

#[test]
fn test_merged_timeline_interleaves_messages_chronologically() {
    let trial = detected_trial();
    let kinds: Vec<EventKind> = trial.timeline.iter().map(|e| e.kind()).collect();
    // fixation@0, message@5, saccade@10, fixation@30, message@45
    assert_eq!(
        kinds,
        vec![
            EventKind::Fixation,
            EventKind::Message,
            EventKind::Saccade,
            EventKind::Fixation,
            EventKind::Message,
        ]
    );
}

#[test]
fn test_navigation_round_trip_for_interior_events() {
    let trial = detected_trial();
    let timeline = &trial.timeline;
    let ids: Vec<_> = timeline.iter().map(|e| e.id).collect();

    for &id in &ids[1..ids.len() - 1] {
        let prev = timeline.previous_event(Anchor::Member(id), 1, None).unwrap();
        let back = timeline.next_event(Anchor::Member(prev.id), 1, None).unwrap();
        assert_eq!(back.id, id);
    }
}

#[test]
fn test_typed_navigation_round_trip() {
    let trial = detected_trial();
    let timeline = &trial.timeline;
    // From the second message, the previous message is the first one, and
    // stepping forward one message from there returns to the second
    let second_message = timeline.iter_kind(EventKind::Message).nth(1).unwrap().id;
    let first_message = timeline
        .previous_event(Anchor::Member(second_message), 1, Some(EventKind::Message))
        .unwrap();
    assert_eq!(first_message.as_message().unwrap().text, "stimulus");
    let back = timeline
        .next_event(Anchor::Member(first_message.id), 1, Some(EventKind::Message))
        .unwrap();
    assert_eq!(back.id, second_message);
}

#[test]
fn test_time_anchor_boundary_semantics() {
    let trial = detected_trial();
    let timeline = &trial.timeline;

    // Strictly-after lookup from a timestamp that matches an event exactly
    let next = timeline.next_event(Anchor::Time(10.0), 1, None).unwrap();
    assert_eq!(next.start_time(), 30.0);

    // Typed backward lookup searches only the saccade time sequence
    let saccade = timeline
        .previous_event(Anchor::Time(1000.0), 1, Some(EventKind::Saccade))
        .unwrap();
    assert_eq!(saccade.kind(), EventKind::Saccade);
    assert_eq!(saccade.start_time(), 10.0);

    // No event lies strictly before the trial start
    assert!(timeline.previous_event(Anchor::Time(0.0), 1, None).is_none());
}

#[test]
fn test_insert_then_delete_restores_order_and_length() {
    let trial = detected_trial();
    let mut timeline = trial.timeline.clone();
    let before: Vec<_> = timeline.iter().map(|e| e.id).collect();

    let id = timeline.insert_message(22.0, "transient");
    assert_eq!(timeline.len(), before.len() + 1);
    timeline.delete_message(id).unwrap();

    let after: Vec<_> = timeline.iter().map(|e| e.id).collect();
    assert_eq!(before, after);
}

#[test]
fn test_update_message_moves_it_across_the_timeline() {
    let trial = detected_trial();
    let mut timeline = trial.timeline.clone();
    let first_message = timeline.iter_kind(EventKind::Message).next().unwrap().id;

    timeline
        .update_message(first_message, 500.0, "stimulus-moved")
        .unwrap();

    // The moved message is now last in both sequences
    assert_eq!(timeline.iter().last().unwrap().id, first_message);
    let last_message_time = timeline
        .messages()
        .last()
        .unwrap()
        .as_message()
        .unwrap()
        .time;
    assert_eq!(last_message_time, 500.0);

    // And the merged sequence is still sorted
    let times: Vec<f64> = timeline.iter().map(|e| e.start_time()).collect();
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(times, sorted);
}

#[test]
fn test_deleted_message_is_no_longer_navigable() {
    let trial = detected_trial();
    let mut timeline = trial.timeline.clone();
    let id = timeline.insert_message(22.0, "transient");
    timeline.delete_message(id).unwrap();

    assert!(timeline.get(id).is_none());
    assert!(timeline.next_event(Anchor::Member(id), 1, None).is_none());
    assert!(timeline.delete_message(id).is_err());
}
