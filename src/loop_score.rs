//! First/last frame continuity check for looping animations

use crate::color::luma;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Side length both frames are reduced to before comparing.
pub const SAMPLE_SIZE: u32 = 64;

/// Scores below this are a smooth loop; at or above, the jump is likely visible.
pub const SMOOTH_THRESHOLD: f64 = 20.0;

/// Visual difference between the last and first frame on a 0-100 scale.
///
/// Both frames are resized to 64x64 (Lanczos), differenced per RGB channel,
/// converted to luma and averaged. Identical frames score `0.0`. Alpha is
/// ignored, as a frame is compared by its color channels only.
pub fn loop_score(first: &RgbaImage, last: &RgbaImage) -> f64 {
    let a = imageops::resize(first, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Lanczos3);
    let b = imageops::resize(last, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Lanczos3);

    let total: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| {
            let diff = |c: usize| p[c].abs_diff(q[c]);
            luma(diff(0), diff(1), diff(2)) as u64
        })
        .sum();

    let pixels = (SAMPLE_SIZE * SAMPLE_SIZE) as f64;
    total as f64 / pixels / 255.0 * 100.0
}

/// Whether a score counts as a smooth loop.
pub fn is_smooth(score: f64) -> bool {
    score < SMOOTH_THRESHOLD
}
