//! Sprite sheet grid inference
//!
//! Rows and columns that are almost entirely background are divider bands;
//! every contiguous run of non-divider lines is one row (or column) of cells.

use crate::classify::{estimate_background, DEFAULT_COLOR_THRESHOLD, DEFAULT_EDGE_SAMPLES};
use crate::color::max_channel_distance;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Fraction of background pixels above which a line is a divider.
pub const DEFAULT_DIVIDER_RATIO: f64 = 0.9;

/// Column/row layout of a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub cols: u32,
    pub rows: u32,
}

impl Grid {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells, or `None` if it does not fit in a `u32`.
    pub fn cells(&self) -> Option<u32> {
        self.cols.checked_mul(self.rows)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cols x {} rows", self.cols, self.rows)
    }
}

/// Tuning knobs for divider detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Max channel distance for a pixel to match the background
    pub tolerance: u8,
    /// Background fraction a line must exceed to be a divider
    pub divider_ratio: f64,
    /// Samples per edge for background estimation
    pub edge_samples: u32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_COLOR_THRESHOLD,
            divider_ratio: DEFAULT_DIVIDER_RATIO,
            edge_samples: DEFAULT_EDGE_SAMPLES,
        }
    }
}

/// Detect the grid of a sprite sheet from its divider bands.
///
/// Returns `None` when no rows or no columns of content are found; the caller
/// must then supply the grid explicitly. No default grid is ever guessed.
pub fn detect_grid(sheet: &RgbaImage, options: &GridOptions) -> Option<Grid> {
    let (w, h) = sheet.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let background = estimate_background(sheet, options.edge_samples);
    let is_background =
        |x: u32, y: u32| max_channel_distance(sheet.get_pixel(x, y), &background) <= options.tolerance;

    let row_dividers = (0..h).map(|y| {
        let matching = (0..w).filter(|&x| is_background(x, y)).count();
        matching as f64 / w as f64 > options.divider_ratio
    });
    let rows = count_segments(row_dividers);

    let col_dividers = (0..w).map(|x| {
        let matching = (0..h).filter(|&y| is_background(x, y)).count();
        matching as f64 / h as f64 > options.divider_ratio
    });
    let cols = count_segments(col_dividers);

    if rows == 0 || cols == 0 {
        None
    } else {
        Some(Grid::new(cols, rows))
    }
}

/// Count runs of `false` (content lines) separated by `true` (divider lines).
fn count_segments(dividers: impl Iterator<Item = bool>) -> u32 {
    let mut segments = 0;
    let mut in_content = false;
    for is_divider in dividers {
        if is_divider {
            in_content = false;
        } else if !in_content {
            segments += 1;
            in_content = true;
        }
    }
    segments
}
