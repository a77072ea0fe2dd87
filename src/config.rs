//! Resolved detection configuration
//!
//! The pipeline consumes one immutable, fully-resolved configuration value.
//! Loading and merging configuration sources is the ingestion collaborator's
//! job; by the time a [`DetectionConfig`] reaches this crate every field is a
//! concrete number or selector.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which eye(s) the trial was recorded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Eye {
    /// Left eye only
    Left,
    /// Right eye only
    Right,
    /// Both eyes (binocular)
    #[default]
    Binocular,
}

impl Eye {
    /// Parse the recorded-eye selector supplied by the ingestion layer.
    ///
    /// The selector set is closed; anything else is a fatal input error.
    pub fn from_selector(s: &str) -> Result<Self> {
        match s {
            "L" => Ok(Eye::Left),
            "R" => Ok(Eye::Right),
            "B" => Ok(Eye::Binocular),
            other => Err(Error::EyeSelector(other.to_string())),
        }
    }

    /// True for binocular recordings
    pub fn is_binocular(&self) -> bool {
        matches!(self, Eye::Binocular)
    }
}

/// Trajectory filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterKind {
    /// No filtering, channels pass through untouched
    #[default]
    None,
    /// Centered moving-average smoothing
    MovingAverage,
    /// Causal Butterworth low-pass
    Butterworth,
    /// Zero-phase (forward-backward) Butterworth low-pass
    ButterworthZeroPhase,
}

impl FilterKind {
    /// Parse the filter selector supplied by the ingestion layer.
    pub fn from_selector(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(FilterKind::None),
            "moving_average" => Ok(FilterKind::MovingAverage),
            "butterworth" => Ok(FilterKind::Butterworth),
            "butterworth_zero_phase" => Ok(FilterKind::ButterworthZeroPhase),
            other => Err(Error::FilterSelector(other.to_string())),
        }
    }
}

/// How the two eyes of a binocular recording combine into display positions
/// (saccade endpoints, fixation centers). Amplitude always averages the two
/// independently computed per-eye amplitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BinocularAveraging {
    /// Midpoint of the two eyes / pooled mean
    #[default]
    Mean,
    /// Left-eye positions only
    Left,
    /// Right-eye positions only
    Right,
}

/// Physical display and observer geometry
///
/// Used to convert pixel coordinates into degrees of visual angle: the gaze
/// angle per axis is the arctangent of the screen-centered metric offset over
/// the viewing distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Screen width in pixels
    pub width_px: f64,
    /// Screen height in pixels
    pub height_px: f64,
    /// Distance from observer to screen, centimeters
    pub viewing_distance_cm: f64,
    /// Horizontal pixel density, dots per centimeter
    pub dots_per_cm_horizontal: f64,
    /// Vertical pixel density, dots per centimeter
    pub dots_per_cm_vertical: f64,
}

impl ScreenGeometry {
    /// Horizontal gaze angle in degrees for a pixel column
    pub fn deg_x(&self, x_px: f64) -> f64 {
        let cm = (x_px - self.width_px / 2.0) / self.dots_per_cm_horizontal;
        (cm / self.viewing_distance_cm).atan().to_degrees()
    }

    /// Vertical gaze angle in degrees for a pixel row
    pub fn deg_y(&self, y_px: f64) -> f64 {
        let cm = (y_px - self.height_px / 2.0) / self.dots_per_cm_vertical;
        (cm / self.viewing_distance_cm).atan().to_degrees()
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        // 1024x768 on a 17" 4:3 panel at a typical lab viewing distance
        Self {
            width_px: 1024.0,
            height_px: 768.0,
            viewing_distance_cm: 70.0,
            dots_per_cm_horizontal: 29.6,
            dots_per_cm_vertical: 29.6,
        }
    }
}

/// Trajectory filter configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Which filter to apply
    pub kind: FilterKind,
    /// Low-pass cutoff frequency in Hz (Butterworth variants)
    pub cutoff_hz: f64,
    /// Window width in samples (moving average)
    pub size: usize,
    /// Filter order (Butterworth variants)
    pub order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::None,
            cutoff_hz: 50.0,
            size: 5,
            order: 2,
        }
    }
}

/// Immutable, fully-resolved detection configuration for one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Which eye(s) were recorded
    pub recorded_eye: Eye,
    /// Display and observer geometry
    pub screen: ScreenGeometry,
    /// Saccade onset velocity threshold, deg/s
    pub saccade_velocity_threshold: f64,
    /// Saccade onset acceleration threshold, deg/s²
    pub saccade_acceleration_threshold: f64,
    /// Minimum saccade duration, ms (strictly-greater-than boundary)
    pub saccade_minimum_duration: f64,
    /// Minimum saccade amplitude, degrees (strictly-greater-than boundary)
    pub saccade_minimum_amplitude: f64,
    /// Minimum fixation duration, ms (strictly-greater-than boundary)
    pub fixation_minimum_duration: f64,
    /// Minimum blink duration, ms (strictly-greater-than boundary)
    pub blink_minimum_duration: f64,
    /// Nominal recording rate, Hz; the filter cutoff normalizes against its
    /// Nyquist frequency
    pub resampling_rate: f64,
    /// Trajectory filter settings
    pub filter: FilterConfig,
    /// Binocular combination policy for display positions
    pub averaging: BinocularAveraging,
    /// Decimal digits positions are rounded to after filtering, derived by
    /// the ingestion layer from the precision of the recorded values
    pub position_decimals: u32,
}

impl DetectionConfig {
    /// Check the numeric fields that detection divides by or scans with.
    ///
    /// A non-positive resampling frequency is a fatal input error; filter
    /// design normalizes its cutoff against the Nyquist frequency derived
    /// from it.
    pub fn validate(&self) -> Result<()> {
        if !(self.resampling_rate > 0.0) {
            return Err(Error::ResamplingRate(self.resampling_rate));
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            recorded_eye: Eye::Binocular,
            screen: ScreenGeometry::default(),
            saccade_velocity_threshold: 40.0,
            saccade_acceleration_threshold: 8000.0,
            saccade_minimum_duration: 6.0,
            saccade_minimum_amplitude: 0.25,
            fixation_minimum_duration: 50.0,
            blink_minimum_duration: 30.0,
            resampling_rate: 500.0,
            filter: FilterConfig::default(),
            averaging: BinocularAveraging::Mean,
            position_decimals: 2,
        }
    }
}
