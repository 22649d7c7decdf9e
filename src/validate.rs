//! Platform limit checks for finished stickers
//!
//! Validation only observes: it never alters or rejects an artifact. Each
//! check records the measured value next to the limit so a report can be
//! printed or serialized as-is.

use crate::apng::PngInfo;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Limits for animated stickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatedLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub min_frames: u32,
    pub max_frames: u32,
    pub max_duration_ms: u32,
    /// File size must be strictly below this
    pub max_bytes: u64,
}

impl Default for AnimatedLimits {
    fn default() -> Self {
        Self {
            max_width: 320,
            max_height: 270,
            min_frames: 5,
            max_frames: 20,
            max_duration_ms: 4000,
            max_bytes: MIB,
        }
    }
}

/// Limits for still stickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// File size must be strictly below this
    pub max_bytes: u64,
}

impl Default for StaticLimits {
    fn default() -> Self {
        Self { max_width: 370, max_height: 320, max_bytes: MIB }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub measured: String,
    pub limit: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, measured: String, limit: String) -> Self {
        Self { name, passed, measured, limit }
    }
}

/// Per-check results plus an overall verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `"animated"` or `"static"`
    pub kind: &'static str,
    pub passed: bool,
    pub checks: Vec<Check>,
}

impl ValidationReport {
    fn from_checks(kind: &'static str, checks: Vec<Check>) -> Self {
        let passed = checks.iter().all(|c| c.passed);
        Self { kind, passed, checks }
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} sticker validation [{}]:", self.kind, if self.passed { "PASS" } else { "FAIL" })?;
        for check in &self.checks {
            writeln!(
                f,
                "  [{}] {}: {} (limit {})",
                if check.passed { "OK" } else { "NG" },
                check.name,
                check.measured,
                check.limit
            )?;
        }
        Ok(())
    }
}

fn kib(bytes: u64) -> String {
    format!("{:.1}KB", bytes as f64 / 1024.0)
}

fn size_check(width: u32, height: u32, max_width: u32, max_height: u32) -> Check {
    Check::new(
        "dimensions",
        width <= max_width && height <= max_height,
        format!("{}x{} px", width, height),
        format!("max {}x{}", max_width, max_height),
    )
}

fn bytes_check(byte_size: u64, max_bytes: u64) -> Check {
    Check::new("file size", byte_size < max_bytes, kib(byte_size), format!("< {}KB", max_bytes / 1024))
}

/// Check an animated sticker's realized properties.
pub fn validate_animated(
    width: u32,
    height: u32,
    frame_count: u32,
    total_duration_ms: u32,
    byte_size: u64,
    limits: &AnimatedLimits,
) -> ValidationReport {
    let checks = vec![
        size_check(width, height, limits.max_width, limits.max_height),
        Check::new(
            "frames",
            (limits.min_frames..=limits.max_frames).contains(&frame_count),
            frame_count.to_string(),
            format!("{}-{}", limits.min_frames, limits.max_frames),
        ),
        Check::new(
            "duration",
            total_duration_ms <= limits.max_duration_ms,
            format!("{}ms", total_duration_ms),
            format!("max {}ms", limits.max_duration_ms),
        ),
        bytes_check(byte_size, limits.max_bytes),
    ];
    ValidationReport::from_checks("animated", checks)
}

/// Check a still sticker, including that it carries an alpha channel.
pub fn validate_static(
    width: u32,
    height: u32,
    has_alpha: bool,
    byte_size: u64,
    limits: &StaticLimits,
) -> ValidationReport {
    let checks = vec![
        size_check(width, height, limits.max_width, limits.max_height),
        bytes_check(byte_size, limits.max_bytes),
        Check::new(
            "alpha",
            has_alpha,
            if has_alpha { "present" } else { "missing" }.to_string(),
            "required".to_string(),
        ),
    ];
    ValidationReport::from_checks("static", checks)
}

/// Validate a file that was read back from disk, choosing limits by whether it is animated.
pub fn validate_file(
    info: &PngInfo,
    byte_size: u64,
    animated: &AnimatedLimits,
    still: &StaticLimits,
) -> ValidationReport {
    if info.animated {
        validate_animated(info.width, info.height, info.frame_count, info.total_duration_ms, byte_size, animated)
    } else {
        validate_static(info.width, info.height, info.has_alpha, byte_size, still)
    }
}

/// Shrink an image to fit within `max_width x max_height`, keeping its aspect ratio.
///
/// Images that already fit are returned unchanged; nothing is ever enlarged.
pub fn fit_within(image: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w <= max_width && h <= max_height {
        return image.clone();
    }

    let scale = (max_width as f64 / w as f64).min(max_height as f64 / h as f64);
    let new_w = ((w as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let new_h = ((h as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    imageops::resize(image, new_w, new_h, FilterType::Lanczos3)
}
