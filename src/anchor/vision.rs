//! Semantic anchor hints from an external vision service
//!
//! The service itself is not part of this crate. It is reached through the
//! [`VisionAnalyzer`] trait; [`HintDirectory`] replays responses that were
//! captured earlier, one `<frame-stem>.json` per frame.

use super::chain::{AnchorStrategy, FrameContext, StrategyMiss};
use super::{AnchorPoint, AnchorSource};
use crate::frame::Frame;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Error type for vision hints
#[derive(Debug, Error)]
pub enum VisionError {
    /// The analyzer could not produce a response
    #[error("vision analyzer failed: {0}")]
    Unavailable(String),
    /// A captured response file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Response is not JSON or lacks a required field
    #[error("could not parse response: {0}")]
    Parse(#[from] serde_json::Error),
    /// A fractional coordinate is outside [0, 1]
    #[error("{field}={value} is out of range [0, 1]")]
    FractionOutOfRange { field: &'static str, value: f64 },
    /// The pixel bbox is not ordered or exceeds the image
    #[error("bbox_px={bbox:?} invalid for image {width}x{height}")]
    InvalidBBox { bbox: [i64; 4], width: u32, height: u32 },
}

/// One response of the vision service.
///
/// Fractions are relative to the analysed image's dimensions; `bbox_px` is
/// `[left, top, right, bottom]` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionHint {
    pub feet_y_frac: f64,
    pub head_y_frac: f64,
    pub center_x_frac: f64,
    pub center_y_frac: f64,
    #[serde(deserialize_with = "deserialize_bbox")]
    pub bbox_px: [i64; 4],
}

/// Accept integer or float pixel values, truncating floats.
fn deserialize_bbox<'de, D>(deserializer: D) -> Result<[i64; 4], D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = <[f64; 4]>::deserialize(deserializer)?;
    Ok(values.map(|v| v as i64))
}

impl VisionHint {
    /// Check fraction ranges and bbox ordering against an image size.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), VisionError> {
        let fractions = [
            ("feet_y_frac", self.feet_y_frac),
            ("head_y_frac", self.head_y_frac),
            ("center_x_frac", self.center_x_frac),
            ("center_y_frac", self.center_y_frac),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(VisionError::FractionOutOfRange { field, value });
            }
        }

        let [left, top, right, bottom] = self.bbox_px;
        let (w, h) = (width as i64, height as i64);
        if !(0 <= left && left < right && right <= w && 0 <= top && top < bottom && bottom <= h) {
            return Err(VisionError::InvalidBBox { bbox: self.bbox_px, width, height });
        }
        Ok(())
    }

    /// Scale the fractions to pixel coordinates of a `width x height` image.
    pub fn to_anchor(&self, width: u32, height: u32) -> AnchorPoint {
        let (w, h) = (width as f64, height as f64);
        AnchorPoint {
            center_x: self.center_x_frac * w,
            center_y: self.center_y_frac * h,
            feet_y: self.feet_y_frac * h,
            head_y: self.head_y_frac * h,
        }
    }
}

/// Parse a raw service response, tolerating a Markdown code fence around the JSON.
pub fn parse_vision_response(text: &str) -> Result<VisionHint, VisionError> {
    let json = strip_code_fence(text);
    Ok(serde_json::from_str(json)?)
}

fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n```\s*$").ok());

    match fence.as_ref().and_then(|re| re.captures(text)).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim(),
        None => text.trim(),
    }
}

/// Source of vision hints for individual frames.
///
/// Implementations may fail per frame; a failure only downgrades that frame
/// to the next anchor strategy. Credentials and endpoints, if any, are
/// passed to the implementation when it is constructed.
pub trait VisionAnalyzer: Send + Sync {
    fn analyze(&self, frame: &Frame) -> Result<VisionHint, VisionError>;
}

/// Analyzer that replays captured responses from a directory.
#[derive(Debug, Clone)]
pub struct HintDirectory {
    dir: PathBuf,
}

impl HintDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the response captured for `frame_name` (`frame_003.png` -> `frame_003.json`).
    pub fn hint_path(&self, frame_name: &str) -> PathBuf {
        let stem = Path::new(frame_name).file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        let mut file_name = stem;
        file_name.push(".json");
        self.dir.join(file_name)
    }
}

impl VisionAnalyzer for HintDirectory {
    fn analyze(&self, frame: &Frame) -> Result<VisionHint, VisionError> {
        let path = self.hint_path(&frame.name);
        let text = fs::read_to_string(&path).map_err(|source| VisionError::Io { path, source })?;
        parse_vision_response(&text)
    }
}

/// Strategy adapter around a [`VisionAnalyzer`].
pub struct VisionAnchors {
    analyzer: Box<dyn VisionAnalyzer>,
}

impl VisionAnchors {
    pub fn new(analyzer: Box<dyn VisionAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl AnchorStrategy for VisionAnchors {
    fn source(&self) -> AnchorSource {
        AnchorSource::ExternalVisionHint
    }

    fn resolve(&self, ctx: &FrameContext<'_>) -> Result<AnchorPoint, StrategyMiss> {
        let (width, height) = (ctx.frame.width(), ctx.frame.height());
        let hint = self.analyzer.analyze(ctx.frame)?;
        hint.validate(width, height)?;

        let point = hint.to_anchor(width, height);
        let local_feet = point.feet_y - ctx.bbox.top as f64;
        let content_height = ctx.bbox.height() as f64;
        if !(0.0..=content_height).contains(&local_feet) {
            warn!(
                "  {}: vision feet_y {:.1} is outside the content height {}",
                ctx.frame.name, local_feet, content_height
            );
        }
        Ok(point)
    }
}
