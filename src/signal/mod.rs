//! Signal conditioning
//!
//! Prepares one eye's raw trajectory for kinematic analysis: fills data gaps
//! by linear interpolation, optionally smooths the trajectory with a
//! moving-average or Butterworth low-pass filter, and restores the original
//! gaps afterwards so the detectors downstream still see true missing data.

pub mod butterworth;

use crate::config::{FilterConfig, FilterKind};
use crate::Result;
use butterworth::LowPass;

/// Fill missing samples of one channel by linear interpolation in time.
///
/// Interior gaps are interpolated against the nearest valid neighbors;
/// leading and trailing gaps are held at the nearest valid value. An
/// all-missing channel is returned unchanged — the caller must handle that
/// state explicitly.
pub fn interpolate_gaps(t: &[f64], channel: &[f64]) -> Vec<f64> {
    debug_assert_eq!(t.len(), channel.len());
    let mut out = channel.to_vec();

    let mut valid = channel.iter().enumerate().filter(|(_, v)| !v.is_nan());
    let first = match valid.next() {
        Some((i, _)) => i,
        None => return out,
    };
    let last = channel
        .iter()
        .rposition(|v| !v.is_nan())
        .expect("at least one valid sample");

    for slot in out.iter_mut().take(first) {
        *slot = channel[first];
    }
    for slot in out.iter_mut().skip(last + 1) {
        *slot = channel[last];
    }

    let mut prev = first;
    for i in first + 1..=last {
        if channel[i].is_nan() {
            continue;
        }
        if i > prev + 1 {
            let (t0, v0) = (t[prev], channel[prev]);
            let (t1, v1) = (t[i], channel[i]);
            let span = t1 - t0;
            for j in prev + 1..i {
                out[j] = v0 + (v1 - v0) * ((t[j] - t0) / span);
            }
        }
        prev = i;
    }

    out
}

/// Centered moving average with the window truncated at the array edges.
pub fn moving_average(channel: &[f64], size: usize) -> Vec<f64> {
    if size <= 1 || channel.is_empty() {
        return channel.to_vec();
    }
    let half_left = (size - 1) / 2;
    let half_right = size / 2;
    let n = channel.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_left);
            let hi = (i + half_right).min(n - 1);
            let window = &channel[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Round a value to a fixed number of decimal digits.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Condition one eye's position channels for detection.
///
/// Selects one of no-op, moving-average, causal Butterworth or zero-phase
/// Butterworth smoothing. Both channels are gap-interpolated before
/// filtering; the originally-missing positions are restored to NaN
/// afterwards, and the output is rounded to `decimals` digits so that
/// strict-equality comparisons downstream stay stable across the filter.
pub fn apply_filter(
    t: &[f64],
    x: &[f64],
    y: &[f64],
    filter: &FilterConfig,
    sample_rate: f64,
    decimals: u32,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if filter.kind == FilterKind::None {
        return Ok((x.to_vec(), y.to_vec()));
    }

    let smooth: Box<dyn Fn(&[f64]) -> Result<Vec<f64>>> = match filter.kind {
        FilterKind::None => unreachable!("handled above"),
        FilterKind::MovingAverage => {
            let size = filter.size;
            Box::new(move |ch| Ok(moving_average(ch, size)))
        }
        FilterKind::Butterworth | FilterKind::ButterworthZeroPhase => {
            let nyquist = sample_rate / 2.0;
            let normalized = filter.cutoff_hz / nyquist;
            let lowpass = LowPass::design(filter.order, normalized)?;
            let zero_phase = filter.kind == FilterKind::ButterworthZeroPhase;
            Box::new(move |ch| {
                Ok(if zero_phase {
                    lowpass.filtfilt(ch)
                } else {
                    lowpass.filter(ch)
                })
            })
        }
    };

    let mut channels = Vec::with_capacity(2);
    for channel in [x, y] {
        let filled = interpolate_gaps(t, channel);
        if filled.iter().any(|v| v.is_nan()) {
            // All-missing channel: nothing to filter, hand it back as-is.
            channels.push(filled);
            continue;
        }
        let mut smoothed = smooth(&filled)?;
        for (out, orig) in smoothed.iter_mut().zip(channel) {
            *out = if orig.is_nan() {
                f64::NAN
            } else {
                round_to(*out, decimals)
            };
        }
        channels.push(smoothed);
    }

    let smoothed_y = channels.pop().expect("two channels pushed");
    let smoothed_x = channels.pop().expect("two channels pushed");
    Ok((smoothed_x, smoothed_y))
}
