//! Per-frame timing for animated sequences
//!
//! This module turns a total duration and an easing curve into concrete
//! per-frame delays. It supports:
//!
//! - Uniform timing
//! - Easing curves (ease-in, ease-out, ease-in-out, bounce)
//! - Explicit comma-separated millisecond lists
//!
//! Every plan sums exactly to the requested total and no frame is shorter
//! than [`MIN_FRAME_MS`].
//!
//! # Example
//!
//! ```
//! use spritealign::timing::{plan, TimingCurve};
//!
//! let durations = plan(4, 500, TimingCurve::EaseInOut).unwrap();
//! assert_eq!(durations.total_ms(), 500);
//! assert!(durations.as_slice().iter().all(|&d| d >= 10));
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;
use thiserror::Error;

/// Shortest delay any frame may have, in milliseconds.
pub const MIN_FRAME_MS: u32 = 10;

/// Frame rate used when neither a duration nor a frame rate is given.
pub const DEFAULT_FPS: f64 = 16.0;

/// Offset added to every curve weight so no frame's share approaches zero.
const WEIGHT_FLOOR: f64 = 0.1;

/// Error type for timing plans
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimingError {
    #[error("cannot plan timing for zero frames")]
    NoFrames,
    /// Total too short for every frame to get the minimum delay
    #[error("total duration {total_ms}ms is too short for {frames} frames (need at least {min_ms}ms)")]
    TotalTooShort { total_ms: u32, frames: usize, min_ms: u32 },
    #[error("frame rate must be a positive number, got {0}")]
    InvalidFps(f64),
    /// Text is neither a preset nor a millisecond list
    #[error("'{0}' is not a valid preset or comma-separated ms list (valid presets: {presets})", presets = TimingCurve::NAMES.join(", "))]
    InvalidTiming(String),
    #[error("frame durations must be positive, entry {index} is 0")]
    ZeroEntry { index: usize },
    /// Explicit list length differs from the frame count
    #[error("timing list has {actual} values but there are {expected} frames")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Easing curve distributing time across frames.
///
/// With `t = i / (n - 1)` (or `0.5` for a single frame), each frame's weight is:
///
/// | Curve | Weight | Effect |
/// |-------|--------|--------|
/// | `uniform` | `1` | Equal delays |
/// | `ease-in` | `1 - t + 0.1` | Early frames linger |
/// | `ease-out` | `t + 0.1` | Late frames linger |
/// | `ease-in-out` | `(1 + cos(2 pi t)) / 2 + 0.1` | Slow start and end, fast middle |
/// | `bounce` | `(1 - cos(2 pi t)) / 2 + 0.1` | Fast ends, slow middle |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingCurve {
    #[default]
    Uniform,
    EaseIn,
    EaseOut,
    EaseInOut,
    Bounce,
}

impl TimingCurve {
    /// Preset names accepted by [`FromStr`].
    pub const NAMES: [&'static str; 5] = ["uniform", "ease-in", "ease-out", "ease-in-out", "bounce"];

    /// Unnormalized weight at normalized position `t` in `[0, 1]`.
    pub fn weight(&self, t: f64) -> f64 {
        // One full period: 0 at both ends, 1 in the middle
        let hump = (1.0 - (2.0 * PI * t).cos()) / 2.0;
        match self {
            TimingCurve::Uniform => 1.0,
            TimingCurve::EaseIn => 1.0 - t + WEIGHT_FLOOR,
            TimingCurve::EaseOut => t + WEIGHT_FLOOR,
            TimingCurve::EaseInOut => 1.0 - hump + WEIGHT_FLOOR,
            TimingCurve::Bounce => hump + WEIGHT_FLOOR,
        }
    }
}

impl FromStr for TimingCurve {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Ok(TimingCurve::Uniform),
            "ease-in" => Ok(TimingCurve::EaseIn),
            "ease-out" => Ok(TimingCurve::EaseOut),
            "ease-in-out" => Ok(TimingCurve::EaseInOut),
            "bounce" => Ok(TimingCurve::Bounce),
            _ => Err(TimingError::InvalidTiming(s.to_string())),
        }
    }
}

impl std::fmt::Display for TimingCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = match self {
            TimingCurve::Uniform => 0,
            TimingCurve::EaseIn => 1,
            TimingCurve::EaseOut => 2,
            TimingCurve::EaseInOut => 3,
            TimingCurve::Bounce => 4,
        };
        write!(f, "{}", Self::NAMES[index])
    }
}

/// What the user asked for: a curve or literal delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingSpec {
    Curve(TimingCurve),
    Explicit(Vec<u32>),
}

impl Default for TimingSpec {
    fn default() -> Self {
        TimingSpec::Curve(TimingCurve::Uniform)
    }
}

impl TimingSpec {
    /// Build the plan for `num_frames` frames.
    ///
    /// `total_ms` is ignored for explicit lists; the list's sum becomes the total.
    pub fn plan(&self, num_frames: usize, total_ms: u32) -> Result<TimingPlan, TimingError> {
        match self {
            TimingSpec::Curve(curve) => plan(num_frames, total_ms, *curve),
            TimingSpec::Explicit(durations) => {
                if durations.len() != num_frames {
                    return Err(TimingError::LengthMismatch { expected: num_frames, actual: durations.len() });
                }
                Ok(TimingPlan(durations.clone()))
            }
        }
    }
}

impl FromStr for TimingSpec {
    type Err = TimingError;

    /// Parse a preset name or a comma-separated list like `"100, 80, 120"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(curve) = s.parse::<TimingCurve>() {
            return Ok(TimingSpec::Curve(curve));
        }

        let mut durations = Vec::new();
        for (index, part) in s.split(',').enumerate() {
            let value: u32 = part.trim().parse().map_err(|_| TimingError::InvalidTiming(s.to_string()))?;
            if value == 0 {
                return Err(TimingError::ZeroEntry { index });
            }
            durations.push(value);
        }
        Ok(TimingSpec::Explicit(durations))
    }
}

/// Ordered per-frame delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingPlan(Vec<u32>);

impl TimingPlan {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all delays, saturating at `u32::MAX` for oversized explicit lists.
    pub fn total_ms(&self) -> u32 {
        self.0.iter().fold(0u32, |total, &d| total.saturating_add(d))
    }
}

/// Total duration for `num_frames` frames at `fps`: `round(1000 / fps) * num_frames`.
pub fn total_from_fps(fps: f64, num_frames: usize) -> Result<u32, TimingError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(TimingError::InvalidFps(fps));
    }
    let per_frame = (1000.0 / fps).round() as u32;
    Ok(per_frame.saturating_mul(num_frames as u32))
}

/// Distribute `total_ms` across `num_frames` frames following `curve`.
///
/// # Arguments
///
/// * `num_frames` - Number of frames (must be non-zero)
/// * `total_ms` - Exact sum of the resulting plan (at least `10 * num_frames`)
/// * `curve` - Weighting curve
///
/// # Returns
///
/// Durations of `max(10, round(total * w_i / sum(w)))` for every frame but
/// the last, which receives the remainder. If the minimum delay pushed the
/// leading frames over budget, the shortfall is taken back from the longest
/// leading frames so the last frame also keeps the minimum.
pub fn plan(num_frames: usize, total_ms: u32, curve: TimingCurve) -> Result<TimingPlan, TimingError> {
    if num_frames == 0 {
        return Err(TimingError::NoFrames);
    }
    let min_total = MIN_FRAME_MS.saturating_mul(num_frames as u32);
    if total_ms < min_total {
        return Err(TimingError::TotalTooShort { total_ms, frames: num_frames, min_ms: min_total });
    }

    let weights: Vec<f64> = (0..num_frames)
        .map(|i| {
            let t = if num_frames > 1 { i as f64 / (num_frames - 1) as f64 } else { 0.5 };
            curve.weight(t)
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut durations: Vec<u32> = weights
        .iter()
        .map(|w| ((total_ms as f64 * w / total_weight).round() as u32).max(MIN_FRAME_MS))
        .collect();

    let last = num_frames - 1;
    let mut leading: u32 = durations[..last].iter().sum();
    while total_ms - leading.min(total_ms) < MIN_FRAME_MS {
        // min_total guarantees some leading frame is still above the minimum
        let Some(longest) = (0..last).max_by_key(|&i| durations[i]) else { break };
        if durations[longest] <= MIN_FRAME_MS {
            break;
        }
        durations[longest] -= 1;
        leading -= 1;
    }
    durations[last] = total_ms - leading;

    Ok(TimingPlan(durations))
}
