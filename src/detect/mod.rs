//! Per-eye candidate detection
//!
//! Pure scans over one eye's conditioned trajectory. Saccade candidates come
//! from a velocity+acceleration threshold crossing; blink candidates are runs
//! of simultaneously missing samples. Both are emitted as inclusive
//! sample-index intervals and carry no policy: duration, amplitude and
//! binocular reconciliation happen downstream.

pub mod kinematics;

pub use kinematics::KinematicProfile;

/// One raw candidate: an inclusive sample-index interval with its duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateInterval {
    /// First sample of the interval
    pub start: usize,
    /// Last sample of the interval
    pub end: usize,
    /// Elapsed time across the interval, ms
    pub duration: f64,
}

impl CandidateInterval {
    fn new(t: &[f64], start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            duration: t[end] - t[start],
        }
    }

    /// True when the index intervals share at least one sample.
    pub fn intersects(&self, other: &CandidateInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Scan for runs where every supplied channel is simultaneously missing.
///
/// A run opens at the first sample where all channels are NaN and covers
/// every sample until data resumes on any channel; a run still open at the
/// sequence end closes at the last index. Independent of the
/// velocity/acceleration criterion.
pub fn detect_blink_runs(t: &[f64], channels: &[&[f64]]) -> Vec<CandidateInterval> {
    if channels.is_empty() {
        return Vec::new();
    }
    let all_missing = |i: usize| channels.iter().all(|c| c[i].is_nan());

    let mut runs = Vec::new();
    let mut i = 0;
    while i < t.len() {
        if !all_missing(i) {
            i += 1;
            continue;
        }
        let start = i;
        while i < t.len() && all_missing(i) {
            i += 1;
        }
        runs.push(CandidateInterval::new(t, start, i - 1));
    }
    runs
}

/// Scan a kinematic profile for saccade candidates.
///
/// A candidate opens at sample `i` when the speed at `i` exceeds
/// `vel_thresh` and the acceleration into `i` exceeds `acc_thresh`; it
/// closes at the first subsequent sample whose speed is missing or at most
/// `vel_thresh` (that sample is part of the interval), or at the last index
/// when the trial ends mid-saccade. Undefined kinematics across a data gap
/// terminate an open candidate the same way. Scanning resumes after the
/// closing sample.
pub fn detect_saccade_candidates(
    t: &[f64],
    profile: &KinematicProfile,
    vel_thresh: f64,
    acc_thresh: f64,
) -> Vec<CandidateInterval> {
    let n = t.len();
    let mut candidates = Vec::new();

    let mut i = 1;
    while i < n {
        // NaN speed or acceleration fails both comparisons and cannot open
        let opens = profile.speed[i] > vel_thresh && profile.acceleration[i - 1] > acc_thresh;
        if !opens {
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i + 1;
        while j < n && !(profile.speed[j].is_nan() || profile.speed[j] <= vel_thresh) {
            j += 1;
        }
        let end = j.min(n - 1);
        candidates.push(CandidateInterval::new(t, start, end));
        i = end + 1;
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    fn times(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 10.0).collect()
    }

    /// Build a profile directly from speed samples; acceleration between
    /// consecutive samples is derived the same way the kinematics module
    /// derives it (dv over dt, ms → s scaling).
    fn profile_from_speed(t: &[f64], speed: Vec<f64>) -> KinematicProfile {
        let acceleration = (0..speed.len().saturating_sub(1))
            .map(|k| ((speed[k + 1] - speed[k]) / (t[k + 1] - t[k]) * 1000.0).abs())
            .collect();
        KinematicProfile {
            x_deg: vec![0.0; speed.len()],
            y_deg: vec![0.0; speed.len()],
            speed,
            acceleration,
        }
    }

    #[test]
    fn test_blink_run_in_interior() {
        let t = times(6);
        let x = [1.0, NAN, NAN, NAN, 1.0, 1.0];
        let y = [1.0, NAN, NAN, NAN, 1.0, 1.0];
        let runs = detect_blink_runs(&t, &[&x, &y]);
        assert_eq!(runs, vec![CandidateInterval { start: 1, end: 3, duration: 20.0 }]);
    }

    #[test]
    fn test_blink_requires_all_channels_missing() {
        let t = times(4);
        let x = [1.0, NAN, NAN, 1.0];
        let y = [1.0, 2.0, NAN, 1.0];
        let runs = detect_blink_runs(&t, &[&x, &y]);
        // Only index 2 has both channels missing
        assert_eq!(runs, vec![CandidateInterval { start: 2, end: 2, duration: 0.0 }]);
    }

    #[test]
    fn test_open_blink_run_closes_at_last_index() {
        let t = times(4);
        let x = [1.0, 1.0, NAN, NAN];
        let y = [1.0, 1.0, NAN, NAN];
        let runs = detect_blink_runs(&t, &[&x, &y]);
        assert_eq!(runs, vec![CandidateInterval { start: 2, end: 3, duration: 10.0 }]);
    }

    #[test]
    fn test_no_blink_runs_on_clean_data() {
        let t = times(3);
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        assert!(detect_blink_runs(&t, &[&x, &y]).is_empty());
    }

    #[test]
    fn test_candidate_opens_and_closes_on_thresholds() {
        let t = times(6);
        let p = profile_from_speed(&t, vec![0.0, 200.0, 200.0, 0.0, 0.0, 0.0]);
        let candidates = detect_saccade_candidates(&t, &p, 50.0, 1000.0);
        // Opens at 1 (speed and incoming acceleration both high), the first
        // below-threshold sample at 3 closes and joins the interval
        assert_eq!(candidates, vec![CandidateInterval { start: 1, end: 3, duration: 20.0 }]);
    }

    #[test]
    fn test_candidate_needs_acceleration_too() {
        let t = times(5);
        // Speed already high at the edge: no acceleration step into sample 1
        let p = profile_from_speed(&t, vec![200.0, 200.0, 200.0, 200.0, 200.0]);
        assert!(detect_saccade_candidates(&t, &p, 50.0, 1000.0).is_empty());
    }

    #[test]
    fn test_open_candidate_closes_at_sequence_end() {
        let t = times(4);
        let p = profile_from_speed(&t, vec![0.0, 0.0, 300.0, 300.0]);
        let candidates = detect_saccade_candidates(&t, &p, 50.0, 1000.0);
        assert_eq!(candidates, vec![CandidateInterval { start: 2, end: 3, duration: 10.0 }]);
    }

    #[test]
    fn test_gap_terminates_open_candidate() {
        let t = times(6);
        let mut p = profile_from_speed(&t, vec![0.0, 300.0, 300.0, 300.0, 300.0, 0.0]);
        p.speed[3] = NAN;
        let candidates = detect_saccade_candidates(&t, &p, 50.0, 1000.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].start, candidates[0].end), (1, 3));
    }

    #[test]
    fn test_two_separate_candidates() {
        let t = times(8);
        let p = profile_from_speed(&t, vec![0.0, 300.0, 0.0, 0.0, 0.0, 300.0, 0.0, 0.0]);
        let candidates = detect_saccade_candidates(&t, &p, 50.0, 1000.0);
        assert_eq!(candidates.len(), 2);
        assert_eq!((candidates[0].start, candidates[0].end), (1, 2));
        assert_eq!((candidates[1].start, candidates[1].end), (5, 6));
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        let t = times(4);
        // Speed exactly at the threshold never opens a candidate
        let p = profile_from_speed(&t, vec![0.0, 50.0, 50.0, 0.0]);
        assert!(detect_saccade_candidates(&t, &p, 50.0, 0.0).is_empty());
    }
}
