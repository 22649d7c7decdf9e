//! Configuration schema types for `spritealign.toml`
//!
//! Every field has a default, so an empty or partial file is valid.

use crate::anchor::{PixelAnchorOptions, DEFAULT_FEET_DENSITY, DEFAULT_HEAD_DENSITY};
use crate::canvas::DEFAULT_CANVAS_PADDING;
use crate::classify::{ClassifyOptions, DEFAULT_CHROMA_KEY, DEFAULT_CHROMA_TOLERANCE};
use crate::color::parse_color;
use crate::grid::{GridOptions, DEFAULT_DIVIDER_RATIO};
use crate::quantize::DEFAULT_MAX_COLORS;
use crate::timing::DEFAULT_FPS;
use crate::validate::{AnimatedLimits, StaticLimits};
use serde::{Deserialize, Serialize};

/// Divider detection settings for `cut --auto-grid`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Max channel distance for a pixel to count as background
    pub tolerance: u8,
    /// Background fraction a line must exceed to be a divider
    pub divider_ratio: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        let defaults = GridOptions::default();
        Self { tolerance: defaults.tolerance, divider_ratio: DEFAULT_DIVIDER_RATIO }
    }
}

/// Chroma key used when `--chroma-key` is given without a color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaConfig {
    /// Key color in any syntax accepted by [`parse_color`]
    pub color: String,
    pub tolerance: u8,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self { color: DEFAULT_CHROMA_KEY.to_string(), tolerance: DEFAULT_CHROMA_TOLERANCE }
    }
}

/// Anchor detection and canvas sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Fraction of peak row density marking the head row
    pub head_density: f64,
    /// Fraction of peak row density marking the feet row
    pub feet_density: f64,
    /// Auto canvas = largest content size times this factor
    pub canvas_padding: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            head_density: DEFAULT_HEAD_DENSITY,
            feet_density: DEFAULT_FEET_DENSITY,
            canvas_padding: DEFAULT_CANVAS_PADDING,
        }
    }
}

/// Animation assembly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    pub fps: f64,
    /// Number of plays, 0 = infinite
    pub loop_count: u32,
    /// Palette size used by `--quantize`
    pub quantize_colors: usize,
    /// Downscale retries used by `--auto-resize`
    pub resize_attempts: u32,
    pub resize_factor: f64,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            loop_count: 0,
            quantize_colors: DEFAULT_MAX_COLORS,
            resize_attempts: 3,
            resize_factor: 0.8,
        }
    }
}

/// Platform limits for finished stickers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub animated: AnimatedLimits,
    #[serde(rename = "static")]
    pub still: StaticLimits,
}

/// Complete `spritealign.toml` contents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classify: ClassifyOptions,
    pub grid: GridConfig,
    pub chroma: ChromaConfig,
    pub anchor: AnchorConfig,
    pub combine: CombineConfig,
    pub limits: LimitsConfig,
}

impl Config {
    /// Grid detection options, sharing the classifier's edge sampling.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            tolerance: self.grid.tolerance,
            divider_ratio: self.grid.divider_ratio,
            edge_samples: self.classify.edge_samples,
        }
    }

    /// Pixel anchor options, sharing the classifier's alpha threshold.
    pub fn pixel_anchor_options(&self) -> PixelAnchorOptions {
        PixelAnchorOptions {
            alpha_threshold: self.classify.alpha_threshold,
            head_density: self.anchor.head_density,
            feet_density: self.anchor.feet_density,
        }
    }

    /// Validate field ranges.
    ///
    /// Returns one message per violation; an empty list means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.classify.edge_samples == 0 {
            errors.push("classify.edge_samples: must be at least 1".to_string());
        }
        if self.classify.feather_radius.is_nan() || self.classify.feather_radius < 0.0 {
            errors.push("classify.feather_radius: must be zero or positive".to_string());
        }

        if !in_unit_interval(self.grid.divider_ratio) {
            errors.push(format!("grid.divider_ratio: {} is outside (0, 1]", self.grid.divider_ratio));
        }

        if let Err(e) = parse_color(&self.chroma.color) {
            errors.push(format!("chroma.color: {}", e));
        }

        for (field, value) in [
            ("anchor.head_density", self.anchor.head_density),
            ("anchor.feet_density", self.anchor.feet_density),
        ] {
            if !in_unit_interval(value) {
                errors.push(format!("{}: {} is outside (0, 1]", field, value));
            }
        }
        if self.anchor.canvas_padding.is_nan() || self.anchor.canvas_padding < 1.0 {
            errors.push("anchor.canvas_padding: must be at least 1.0".to_string());
        }

        if !self.combine.fps.is_finite() || self.combine.fps <= 0.0 {
            errors.push("combine.fps: must be a positive number".to_string());
        }
        if self.combine.quantize_colors < 2 {
            errors.push("combine.quantize_colors: must be at least 2".to_string());
        }
        if !in_unit_interval(self.combine.resize_factor) || self.combine.resize_factor >= 1.0 {
            errors.push(format!("combine.resize_factor: {} is outside (0, 1)", self.combine.resize_factor));
        }

        let animated = &self.limits.animated;
        if animated.min_frames > animated.max_frames {
            errors.push(format!(
                "limits.animated: min_frames ({}) exceeds max_frames ({})",
                animated.min_frames, animated.max_frames
            ));
        }
        for (field, width, height) in [
            ("limits.animated", animated.max_width, animated.max_height),
            ("limits.static", self.limits.still.max_width, self.limits.still.max_height),
        ] {
            if width == 0 || height == 0 {
                errors.push(format!("{}: dimensions must be positive", field));
            }
        }

        errors
    }
}

fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.chroma.color, "#00FF00");
        assert_eq!(config.chroma.tolerance, 40);
        assert_eq!(config.combine.fps, 16.0);
        assert_eq!(config.combine.quantize_colors, 256);
        assert_eq!(config.limits.animated.max_width, 320);
        assert_eq!(config.limits.still.max_width, 370);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[anchor]
feet_density = 0.2

[limits.static]
max_width = 200
"#,
        )
        .unwrap();
        assert_eq!(config.anchor.feet_density, 0.2);
        assert_eq!(config.anchor.head_density, 0.10);
        assert_eq!(config.limits.still.max_width, 200);
        assert_eq!(config.limits.still.max_height, 320);
        assert_eq!(config.classify.color_threshold, 30);
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let mut config = Config::default();
        config.grid.divider_ratio = 1.5;
        config.anchor.head_density = 0.0;
        config.chroma.color = "not-a-color".to_string();
        config.limits.animated.min_frames = 30;

        let errors = config.validate();
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.iter().any(|e| e.starts_with("grid.divider_ratio")));
        assert!(errors.iter().any(|e| e.starts_with("anchor.head_density")));
        assert!(errors.iter().any(|e| e.starts_with("chroma.color")));
        assert!(errors.iter().any(|e| e.contains("min_frames (30)")));
    }

    #[test]
    fn test_derived_options_share_classifier_settings() {
        let mut config = Config::default();
        config.classify.edge_samples = 4;
        config.classify.alpha_threshold = 200;
        assert_eq!(config.grid_options().edge_samples, 4);
        assert_eq!(config.pixel_anchor_options().alpha_threshold, 200);
    }
}
