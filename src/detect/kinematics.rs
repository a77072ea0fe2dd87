//! Trajectory kinematics
//!
//! Converts a pixel trajectory into degrees of visual angle and derives the
//! per-sample velocity and acceleration magnitudes the saccade criterion
//! runs on. Missing samples propagate as NaN through every derivative, so a
//! data gap leaves the surrounding kinematics undefined.

use crate::config::ScreenGeometry;

/// Per-sample kinematics of one eye's conditioned trajectory.
#[derive(Debug, Clone)]
pub struct KinematicProfile {
    /// Gaze position in degrees of visual angle, horizontal
    pub x_deg: Vec<f64>,
    /// Gaze position in degrees of visual angle, vertical
    pub y_deg: Vec<f64>,
    /// Speed magnitude per sample, deg/s
    pub speed: Vec<f64>,
    /// Acceleration magnitude between consecutive samples, deg/s²;
    /// entry `k` spans samples `k → k+1`, so the array is one shorter
    /// than the trajectory
    pub acceleration: Vec<f64>,
}

/// Convert both position channels from pixels to degrees of visual angle.
pub fn to_degrees(screen: &ScreenGeometry, x_px: &[f64], y_px: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let x_deg = x_px.iter().map(|&x| screen.deg_x(x)).collect();
    let y_deg = y_px.iter().map(|&y| screen.deg_y(y)).collect();
    (x_deg, y_deg)
}

/// Numerical gradient of `values` with respect to `t`: central difference in
/// the interior, one-sided difference at the two edges.
fn gradient(values: &[f64], t: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![f64::NAN],
        _ => (0..n)
            .map(|i| {
                let (lo, hi) = if i == 0 {
                    (0, 1)
                } else if i == n - 1 {
                    (n - 2, n - 1)
                } else {
                    (i - 1, i + 1)
                };
                (values[hi] - values[lo]) / (t[hi] - t[lo])
            })
            .collect(),
    }
}

/// Compute the velocity/acceleration profile of one degree-space trajectory.
///
/// Timestamps are in milliseconds; speeds come out in deg/s and
/// accelerations in deg/s².
pub fn profile(t: &[f64], x_deg: Vec<f64>, y_deg: Vec<f64>) -> KinematicProfile {
    const MS_PER_S: f64 = 1000.0;

    let vx: Vec<f64> = gradient(&x_deg, t).iter().map(|v| v * MS_PER_S).collect();
    let vy: Vec<f64> = gradient(&y_deg, t).iter().map(|v| v * MS_PER_S).collect();

    let speed = vx.iter().zip(&vy).map(|(&x, &y)| x.hypot(y)).collect();

    let acceleration = (0..t.len().saturating_sub(1))
        .map(|k| {
            let dt = t[k + 1] - t[k];
            let ax = (vx[k + 1] - vx[k]) / dt * MS_PER_S;
            let ay = (vy[k + 1] - vy[k]) / dt * MS_PER_S;
            ax.hypot(ay)
        })
        .collect();

    KinematicProfile {
        x_deg,
        y_deg,
        speed,
        acceleration,
    }
}

/// Degree-space distance between two samples of a profile.
pub fn amplitude_deg(profile: &KinematicProfile, start: usize, end: usize) -> f64 {
    let dx = profile.x_deg[end] - profile.x_deg[start];
    let dy = profile.y_deg[end] - profile.y_deg[start];
    dx.hypot(dy)
}
