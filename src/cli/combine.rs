//! Combine command implementation

use std::path::Path;
use std::process::ExitCode;

use image::RgbaImage;
use log::{info, warn};

use crate::apng::ApngError;
use crate::assemble::{assemble, AssembleOptions, ResizePolicy};
use crate::config::Config;
use crate::loop_score::{is_smooth, loop_score};
use crate::output::{load_frames, write_bytes, OutputError};
use crate::timing::{total_from_fps, TimingPlan, TimingSpec};
use crate::validate::validate_animated;

use super::{require_exists, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the combine command
pub fn run_combine(
    frames_dir: &Path,
    output: &Path,
    duration: Option<u32>,
    timing: &str,
    quantize: bool,
    auto_resize: bool,
    report_json: bool,
    config: &Config,
) -> ExitCode {
    if let Err(code) = require_exists(frames_dir, "Frames directory") {
        return code;
    }

    let spec: TimingSpec = match timing.parse() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let frames: Vec<RgbaImage> = match load_frames(frames_dir) {
        Ok(frames) => frames.into_iter().map(|f| f.image).collect(),
        Err(e @ OutputError::NoFrames(_)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let plan = match build_plan(&spec, frames.len(), duration, config.combine.fps) {
        Ok(plan) => plan,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    info!("Timing ({}): {:?} ms, total {}ms", timing, plan.as_slice(), plan.total_ms());

    let options = AssembleOptions {
        loop_count: config.combine.loop_count,
        quantize_colors: quantize.then_some(config.combine.quantize_colors),
        auto_resize: auto_resize.then_some(ResizePolicy {
            max_bytes: config.limits.animated.max_bytes,
            attempts: config.combine.resize_attempts,
            factor: config.combine.resize_factor,
        }),
    };

    let artifact = match assemble(&frames, &plan, &options) {
        Ok(artifact) => artifact,
        Err(e @ ApngError::SizeMismatch { .. }) => {
            eprintln!("Error: {} (align the frames first)", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = write_bytes(&artifact.bytes, output) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    info!(
        "Wrote {} ({}x{}, {} frames, {:.1}KB)",
        output.display(),
        artifact.width,
        artifact.height,
        artifact.frame_count,
        artifact.byte_size() as f64 / 1024.0
    );

    if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
        let score = loop_score(first, last);
        if is_smooth(score) {
            info!("Loop continuity: {:.1} (smooth)", score);
        } else {
            warn!("Loop continuity: {:.1} (visible jump between last and first frame)", score);
        }
    }

    let report = validate_animated(
        artifact.width,
        artifact.height,
        artifact.frame_count as u32,
        artifact.total_duration_ms,
        artifact.byte_size(),
        &config.limits.animated,
    );

    if report_json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("{}", output.display());
        print!("{}", report);
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Resolve the total duration and distribute it across `num_frames` frames.
///
/// An explicit `duration` wins over `fps`; explicit ms lists ignore both.
fn build_plan(
    spec: &TimingSpec,
    num_frames: usize,
    duration: Option<u32>,
    fps: f64,
) -> Result<TimingPlan, String> {
    let total_ms = match (spec, duration) {
        (_, Some(ms)) => ms,
        (TimingSpec::Explicit(_), None) => 0,
        (TimingSpec::Curve(_), None) => total_from_fps(fps, num_frames).map_err(|e| e.to_string())?,
    };
    spec.plan(num_frames, total_ms).map_err(|e| e.to_string())
}
