//! Event reconciliation
//!
//! Turns raw per-eye candidates into the final, policy-compliant event lists
//! for one trial. The steps run in a fixed order — per-eye duration filter,
//! binocular coincidence merge, amplitude filter, fixation derivation,
//! short-fixation absorption, final fixation filter, blink filter, attribute
//! derivation — and the order is load-bearing: reordering them changes the
//! result.
//!
//! Every duration and amplitude boundary is strict-greater-than: a value
//! equal to its threshold does not pass.

use crate::config::{BinocularAveraging, DetectionConfig};
use crate::detect::kinematics::{amplitude_deg, KinematicProfile};
use crate::detect::CandidateInterval;
use crate::timeline::events::{Blink, Fixation, Saccade};
use tracing::debug;

/// One eye's conditioned channels, kinematics and saccade candidates.
pub struct EyeInput<'a> {
    /// Conditioned horizontal positions, px, gaps restored to NaN
    pub x_px: &'a [f64],
    /// Conditioned vertical positions, px, gaps restored to NaN
    pub y_px: &'a [f64],
    /// Kinematic profile of the conditioned trajectory
    pub profile: &'a KinematicProfile,
    /// Raw saccade candidates from the detector scan
    pub candidates: Vec<CandidateInterval>,
}

/// The reconciled, policy-compliant event lists of one trial.
pub struct ReconciledEvents {
    pub saccades: Vec<Saccade>,
    /// `None` when every sample of every eye is missing — a fixation list is
    /// omitted entirely for an all-missing trial
    pub fixations: Option<Vec<Fixation>>,
    pub blinks: Vec<Blink>,
}

/// Apply the full reconciliation policy.
///
/// `left`/`right` carry whichever eyes were recorded; binocular behavior
/// (coincidence merge, amplitude averaging, midpoint positions) engages only
/// when both are present.
pub fn reconcile(
    t: &[f64],
    left: Option<&EyeInput<'_>>,
    right: Option<&EyeInput<'_>>,
    blink_runs: Vec<CandidateInterval>,
    config: &DetectionConfig,
) -> ReconciledEvents {
    let n = t.len();

    // Step 1: per-eye duration filter
    let min_duration = config.saccade_minimum_duration;
    let left_candidates = left.map(|eye| retain_longer(&eye.candidates, min_duration));
    let right_candidates = right.map(|eye| retain_longer(&eye.candidates, min_duration));

    // Step 2: binocular coincidence merge
    let mut saccade_intervals = match (&left_candidates, &right_candidates) {
        (Some(l), Some(r)) => merge_binocular(t, l, r),
        (Some(l), None) => l.clone(),
        (None, Some(r)) => r.clone(),
        (None, None) => Vec::new(),
    };
    debug!(
        candidates = saccade_intervals.len(),
        "saccade candidates after duration filter and merge"
    );

    // Step 3: amplitude filter
    let amplitude = |interval: &CandidateInterval| -> f64 {
        match (left, right) {
            (Some(l), Some(r)) => {
                (amplitude_deg(l.profile, interval.start, interval.end)
                    + amplitude_deg(r.profile, interval.start, interval.end))
                    / 2.0
            }
            (Some(eye), None) | (None, Some(eye)) => {
                amplitude_deg(eye.profile, interval.start, interval.end)
            }
            (None, None) => f64::NAN,
        }
    };
    saccade_intervals.retain(|c| amplitude(c) > config.saccade_minimum_amplitude);

    // Steps 4 + 5: fixation derivation with short-fixation absorption.
    // The complement is re-derived after every fusion, so no fixation index
    // computed before a mutation is ever reused after it.
    absorb_short_fixations(t, &mut saccade_intervals, config.fixation_minimum_duration);

    // Step 6: final fixation duration filter
    let mut fixation_intervals = derive_fixation_intervals(t, &saccade_intervals, n);
    fixation_intervals.retain(|f| f.duration > config.fixation_minimum_duration);

    // Step 7: blink duration filter
    let blink_intervals = retain_longer(&blink_runs, config.blink_minimum_duration);

    debug!(
        saccades = saccade_intervals.len(),
        fixations = fixation_intervals.len(),
        blinks = blink_intervals.len(),
        "reconciled event intervals"
    );

    // Step 8: attribute derivation
    let position = |index: usize| display_position(left, right, config.averaging, index);

    let saccades = saccade_intervals
        .iter()
        .map(|c| {
            let start = position(c.start);
            let end = position(c.end);
            let (dx, dy) = (end.0 - start.0, end.1 - start.1);
            Saccade {
                start_time: t[c.start],
                end_time: t[c.end],
                duration: c.duration,
                start_index: c.start,
                end_index: c.end,
                start,
                end,
                amplitude: amplitude(c),
                length: dx.hypot(dy),
                direction: dy.atan2(dx),
            }
        })
        .collect();

    let fixations = if trial_all_missing(left, right) {
        None
    } else {
        Some(
            fixation_intervals
                .iter()
                .map(|f| Fixation {
                    start_time: t[f.start],
                    end_time: t[f.end],
                    duration: f.duration,
                    start_index: f.start,
                    end_index: f.end,
                    center: interval_center(left, right, config.averaging, f.start, f.end),
                })
                .collect(),
        )
    };

    let blinks = blink_intervals
        .iter()
        .map(|b| Blink {
            start_time: t[b.start],
            end_time: t[b.end],
            duration: b.duration,
            start_index: b.start,
            end_index: b.end,
        })
        .collect();

    ReconciledEvents {
        saccades,
        fixations,
        blinks,
    }
}

/// Keep candidates whose duration strictly exceeds the threshold.
fn retain_longer(candidates: &[CandidateInterval], threshold: f64) -> Vec<CandidateInterval> {
    candidates
        .iter()
        .filter(|c| c.duration > threshold)
        .copied()
        .collect()
}

/// Merge left- and right-eye candidates into binocular intervals.
///
/// For each left candidate, every right candidate sharing at least one
/// sample joins the group; the merged interval spans the group's extremes.
/// A left candidate with no right coincidence is discarded. A merged
/// interval whose start lies before the previous accepted interval's end is
/// discarded rather than extended — the conservative policy against
/// double-counting overlapping chains.
fn merge_binocular(
    t: &[f64],
    left: &[CandidateInterval],
    right: &[CandidateInterval],
) -> Vec<CandidateInterval> {
    let mut merged: Vec<CandidateInterval> = Vec::new();
    for l in left {
        let group: Vec<&CandidateInterval> = right.iter().filter(|r| r.intersects(l)).collect();
        let Some(first) = group.first() else {
            continue;
        };

        let start = group
            .iter()
            .map(|r| r.start)
            .fold(first.start, usize::min)
            .min(l.start);
        let end = group
            .iter()
            .map(|r| r.end)
            .fold(first.end, usize::max)
            .max(l.end);

        if let Some(prev) = merged.last() {
            if start < prev.end {
                continue;
            }
        }
        merged.push(CandidateInterval {
            start,
            end,
            duration: t[end] - t[start],
        });
    }
    merged
}

/// The complement of the saccade sequence over `[0, n-1]`.
///
/// Fixations share their boundary samples with the adjacent saccades: a
/// fixation begins at the sample where the previous saccade ends and ends at
/// the sample where the next one starts. A leading fixation exists when the
/// first saccade does not start at sample 0, a trailing one when the last
/// does not end at the last sample; with no saccades the whole trial is one
/// fixation.
fn derive_fixation_intervals(
    t: &[f64],
    saccades: &[CandidateInterval],
    n: usize,
) -> Vec<CandidateInterval> {
    if n == 0 {
        return Vec::new();
    }
    let span = |start: usize, end: usize| CandidateInterval {
        start,
        end,
        duration: t[end] - t[start],
    };

    let Some(first) = saccades.first() else {
        return vec![span(0, n - 1)];
    };

    let mut fixations = Vec::with_capacity(saccades.len() + 1);
    if first.start > 0 {
        fixations.push(span(0, first.start));
    }
    for pair in saccades.windows(2) {
        fixations.push(span(pair[0].end, pair[1].start));
    }
    let last = saccades.last().expect("nonempty checked above");
    if last.end < n - 1 {
        fixations.push(span(last.end, n - 1));
    }
    fixations
}

/// Fuse saccade pairs separated by a sub-threshold fixation.
///
/// A too-short fixation between two saccades is absorbed into the preceding
/// saccade by extending its end index to the following saccade's end index;
/// a short fixation with no following (or no preceding) saccade is left
/// alone. Each fusion removes one saccade, so the loop terminates, and the
/// gap durations are re-read from the mutated list on every pass.
fn absorb_short_fixations(
    t: &[f64],
    saccades: &mut Vec<CandidateInterval>,
    fixation_minimum_duration: f64,
) {
    loop {
        let fused = (0..saccades.len().saturating_sub(1)).find(|&k| {
            let gap = t[saccades[k + 1].start] - t[saccades[k].end];
            gap <= fixation_minimum_duration
        });
        let Some(k) = fused else {
            break;
        };
        let start = saccades[k].start;
        let end = saccades[k + 1].end;
        saccades[k] = CandidateInterval {
            start,
            end,
            duration: t[end] - t[start],
        };
        saccades.remove(k + 1);
    }
}

/// The display position at one sample under the binocular averaging policy.
fn display_position(
    left: Option<&EyeInput<'_>>,
    right: Option<&EyeInput<'_>>,
    averaging: BinocularAveraging,
    index: usize,
) -> (f64, f64) {
    match (left, right) {
        (Some(l), Some(r)) => match averaging {
            BinocularAveraging::Mean => (
                (l.x_px[index] + r.x_px[index]) / 2.0,
                (l.y_px[index] + r.y_px[index]) / 2.0,
            ),
            BinocularAveraging::Left => (l.x_px[index], l.y_px[index]),
            BinocularAveraging::Right => (r.x_px[index], r.y_px[index]),
        },
        (Some(eye), None) | (None, Some(eye)) => (eye.x_px[index], eye.y_px[index]),
        (None, None) => (f64::NAN, f64::NAN),
    }
}

/// NaN-ignoring mean gaze position over an inclusive interval, pooled across
/// the eyes the averaging policy selects.
fn interval_center(
    left: Option<&EyeInput<'_>>,
    right: Option<&EyeInput<'_>>,
    averaging: BinocularAveraging,
    start: usize,
    end: usize,
) -> (f64, f64) {
    let eyes: Vec<&EyeInput<'_>> = match (left, right) {
        (Some(l), Some(r)) => match averaging {
            BinocularAveraging::Mean => vec![l, r],
            BinocularAveraging::Left => vec![l],
            BinocularAveraging::Right => vec![r],
        },
        (Some(eye), None) | (None, Some(eye)) => vec![eye],
        (None, None) => Vec::new(),
    };

    let mean_over = |values: Vec<f64>| -> f64 {
        let valid: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            f64::NAN
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        }
    };

    let xs = eyes
        .iter()
        .flat_map(|eye| eye.x_px[start..=end].iter().copied())
        .collect();
    let ys = eyes
        .iter()
        .flat_map(|eye| eye.y_px[start..=end].iter().copied())
        .collect();
    (mean_over(xs), mean_over(ys))
}

/// True when every sample of every recorded eye is missing.
fn trial_all_missing(left: Option<&EyeInput<'_>>, right: Option<&EyeInput<'_>>) -> bool {
    let eye_missing = |eye: &EyeInput<'_>| {
        eye.x_px.iter().all(|v| v.is_nan()) && eye.y_px.iter().all(|v| v.is_nan())
    };
    match (left, right) {
        (Some(l), Some(r)) => eye_missing(l) && eye_missing(r),
        (Some(eye), None) | (None, Some(eye)) => eye_missing(eye),
        (None, None) => true,
    }
}
