//! Sequence assembly: quantize, encode, and shrink until the file fits

use crate::apng::{encode_apng, ApngError};
use crate::quantize::quantize;
use crate::timing::TimingPlan;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info, warn};
use rayon::prelude::*;

/// Retry policy for oversized output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizePolicy {
    /// Encoded size must be strictly below this
    pub max_bytes: u64,
    /// Maximum number of downscale retries
    pub attempts: u32,
    /// Each retry scales the previous attempt's dimensions by this factor
    pub factor: f64,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self { max_bytes: 1024 * 1024, attempts: 3, factor: 0.8 }
    }
}

/// Settings for [`assemble`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AssembleOptions {
    /// Number of plays, 0 = infinite
    pub loop_count: u32,
    /// Reduce each frame to this many colors before encoding
    pub quantize_colors: Option<usize>,
    /// Shrink and re-encode while over budget
    pub auto_resize: Option<ResizePolicy>,
}

/// An encoded animation and its realized properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceArtifact {
    pub bytes: Vec<u8>,
    pub frame_count: usize,
    pub total_duration_ms: u32,
    pub width: u32,
    pub height: u32,
    /// Downscale retries performed (0 = encoded at original size)
    pub resize_attempts: u32,
}

impl SequenceArtifact {
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encode frames into an animated PNG.
///
/// # Arguments
///
/// * `frames` - Equally sized frames in playback order
/// * `plan` - One delay per frame
/// * `options` - Loop count, quantization and size budget
///
/// # Returns
///
/// The final artifact. When the budget cannot be met within the allowed
/// retries, the last (smallest) attempt is returned anyway; the caller's
/// validation report shows the overrun.
pub fn assemble(
    frames: &[RgbaImage],
    plan: &TimingPlan,
    options: &AssembleOptions,
) -> Result<SequenceArtifact, ApngError> {
    let first = frames.first().ok_or(ApngError::NoFrames)?;
    let (mut width, mut height) = first.dimensions();

    let mut artifact = encode(frames, plan, options, 0)?;

    let Some(policy) = options.auto_resize else {
        return Ok(artifact);
    };

    for attempt in 1..=policy.attempts {
        if artifact.byte_size() < policy.max_bytes {
            break;
        }
        width = ((width as f64 * policy.factor) as u32).max(1);
        height = ((height as f64 * policy.factor) as u32).max(1);
        info!(
            "Auto-resize attempt {}: {:.1}KB exceeds {}KB, scaling to {}x{}",
            attempt,
            artifact.byte_size() as f64 / 1024.0,
            policy.max_bytes / 1024,
            width,
            height
        );

        // Always resample from the originals to avoid compounding blur
        let resized: Vec<RgbaImage> =
            frames.par_iter().map(|f| imageops::resize(f, width, height, FilterType::Lanczos3)).collect();
        artifact = encode(&resized, plan, options, attempt)?;
    }

    if artifact.byte_size() >= policy.max_bytes {
        warn!(
            "Output is still {:.1}KB after {} resize attempts",
            artifact.byte_size() as f64 / 1024.0,
            artifact.resize_attempts
        );
    }
    Ok(artifact)
}

fn encode(
    frames: &[RgbaImage],
    plan: &TimingPlan,
    options: &AssembleOptions,
    attempt: u32,
) -> Result<SequenceArtifact, ApngError> {
    let quantized;
    let frames = match options.quantize_colors {
        Some(colors) => {
            debug!("Quantizing {} frames to {} colors", frames.len(), colors);
            quantized = frames.par_iter().map(|f| quantize(f, colors)).collect::<Vec<_>>();
            quantized.as_slice()
        }
        None => frames,
    };

    let bytes = encode_apng(frames, plan.as_slice(), options.loop_count)?;
    let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
    debug!("Encoded {}x{} x{} frames: {} bytes", width, height, frames.len(), bytes.len());

    Ok(SequenceArtifact {
        bytes,
        frame_count: frames.len(),
        total_duration_ms: plan.total_ms(),
        width,
        height,
        resize_attempts: attempt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apng::probe;
    use crate::timing::{plan, TimingCurve};
    use image::Rgba;

    /// Frames of hash-like noise that compress poorly
    fn noisy_frames(count: u32, size: u32) -> Vec<RgbaImage> {
        (0..count)
            .map(|i| {
                RgbaImage::from_fn(size, size, |x, y| {
                    let v = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503)).wrapping_add(i * 97);
                    let v = v ^ (v >> 13);
                    Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, 255])
                })
            })
            .collect()
    }

    #[test]
    fn test_assemble_reports_realized_properties() {
        let frames = vec![RgbaImage::from_pixel(12, 10, Rgba([9, 9, 9, 255])); 5];
        let timing = plan(5, 500, TimingCurve::EaseIn).unwrap();
        let artifact = assemble(&frames, &timing, &AssembleOptions::default()).unwrap();

        assert_eq!(artifact.frame_count, 5);
        assert_eq!(artifact.total_duration_ms, 500);
        assert_eq!((artifact.width, artifact.height), (12, 10));
        assert_eq!(artifact.resize_attempts, 0);

        let info = probe(artifact.bytes.as_slice()).unwrap();
        assert_eq!(info.frame_count, 5);
        assert_eq!(info.total_duration_ms, 500);
    }

    #[test]
    fn test_auto_resize_shrinks_from_originals() {
        let frames = noisy_frames(3, 100);
        let timing = plan(3, 300, TimingCurve::Uniform).unwrap();
        let policy = ResizePolicy { max_bytes: 1, attempts: 3, factor: 0.8 };
        let options = AssembleOptions { auto_resize: Some(policy), ..Default::default() };

        let artifact = assemble(&frames, &timing, &options).unwrap();
        // 100 -> 80 -> 64 -> 51, still over the impossible budget
        assert_eq!(artifact.resize_attempts, 3);
        assert_eq!((artifact.width, artifact.height), (51, 51));
        assert_eq!(artifact.frame_count, 3);
    }

    #[test]
    fn test_auto_resize_skipped_when_under_budget() {
        let frames = noisy_frames(2, 20);
        let timing = plan(2, 200, TimingCurve::Uniform).unwrap();
        let options = AssembleOptions { auto_resize: Some(ResizePolicy::default()), ..Default::default() };
        let artifact = assemble(&frames, &timing, &options).unwrap();
        assert_eq!(artifact.resize_attempts, 0);
        assert_eq!(artifact.width, 20);
    }

    #[test]
    fn test_quantize_shrinks_noisy_output() {
        let frames = noisy_frames(2, 64);
        let timing = plan(2, 200, TimingCurve::Uniform).unwrap();
        let plain = assemble(&frames, &timing, &AssembleOptions::default()).unwrap();
        let options = AssembleOptions { quantize_colors: Some(16), ..Default::default() };
        let quantized = assemble(&frames, &timing, &options).unwrap();
        assert!(quantized.byte_size() < plain.byte_size());
    }
}
