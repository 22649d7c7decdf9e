//! Alpha-channel anchor analysis
//!
//! No external calls: the centroid comes from the opaque pixels themselves and
//! head/feet rows from a row-density scan. The feet threshold is higher than
//! the head threshold so thin dangling extremities (tails, fur wisps) are not
//! mistaken for ground contact.

use super::chain::{AnchorStrategy, FrameContext, StrategyMiss};
use super::{AnchorPoint, AnchorSource};
use crate::classify::DEFAULT_ALPHA_THRESHOLD;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Head row: topmost row with at least this fraction of the densest row.
pub const DEFAULT_HEAD_DENSITY: f64 = 0.10;

/// Feet row: bottommost row with at least this fraction of the densest row.
pub const DEFAULT_FEET_DENSITY: f64 = 0.15;

/// Thresholds for pixel anchor analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelAnchorOptions {
    pub alpha_threshold: u8,
    pub head_density: f64,
    pub feet_density: f64,
}

impl Default for PixelAnchorOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            head_density: DEFAULT_HEAD_DENSITY,
            feet_density: DEFAULT_FEET_DENSITY,
        }
    }
}

/// Find anchor points from the alpha channel in a single pass.
///
/// * `center_x`, `center_y` - mean position of all opaque pixels
/// * `head_y` - topmost row whose opaque count reaches `head_density` of the peak row
/// * `feet_y` - bottommost row whose opaque count reaches `feet_density` of the peak row
///
/// Returns `None` if no pixel is opaque.
pub fn find_anchor_points(image: &RgbaImage, options: &PixelAnchorOptions) -> Option<AnchorPoint> {
    let (_, height) = image.dimensions();
    let mut row_opaque = vec![0u64; height as usize];
    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut total = 0u64;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] >= options.alpha_threshold {
            row_opaque[y as usize] += 1;
            sum_x += x as u64;
            sum_y += y as u64;
            total += 1;
        }
    }

    if total == 0 {
        return None;
    }

    let peak = row_opaque.iter().copied().max().unwrap_or(0) as f64;
    let dense_enough = |count: u64, density: f64| count as f64 >= peak * density;

    let head_y = row_opaque.iter().position(|&c| dense_enough(c, options.head_density)).unwrap_or(0);
    let feet_y = row_opaque
        .iter()
        .rposition(|&c| dense_enough(c, options.feet_density))
        .unwrap_or(height.saturating_sub(1) as usize);

    Some(AnchorPoint {
        center_x: sum_x as f64 / total as f64,
        center_y: sum_y as f64 / total as f64,
        feet_y: feet_y as f64,
        head_y: head_y as f64,
    })
}

/// Strategy wrapper around [`find_anchor_points`].
#[derive(Debug, Clone, Default)]
pub struct PixelAnchors {
    pub options: PixelAnchorOptions,
}

impl PixelAnchors {
    pub fn new(options: PixelAnchorOptions) -> Self {
        Self { options }
    }
}

impl AnchorStrategy for PixelAnchors {
    fn source(&self) -> AnchorSource {
        AnchorSource::PixelCentroid
    }

    fn resolve(&self, ctx: &FrameContext<'_>) -> Result<AnchorPoint, StrategyMiss> {
        find_anchor_points(&ctx.frame.image, &self.options).ok_or(StrategyMiss::FullyTransparent)
    }
}
