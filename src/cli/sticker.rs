//! Sticker command implementation (still images)

use std::path::Path;
use std::process::ExitCode;

use log::info;

use crate::apng::probe;
use crate::classify::{remove_background, remove_chroma_key};
use crate::config::Config;
use crate::output::{load_image, save_png};
use crate::validate::{fit_within, validate_static};

use super::{chroma_color, require_exists, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the sticker command
pub fn run_sticker(
    input: &Path,
    output: &Path,
    chroma_key: bool,
    remove_bg: bool,
    fit: bool,
    config: &Config,
) -> ExitCode {
    if let Err(code) = require_exists(input, "Image") {
        return code;
    }

    let mut image = match load_image(input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if chroma_key {
        let color = match chroma_color(config) {
            Ok(color) => color,
            Err(code) => return code,
        };
        image = remove_chroma_key(&image, color, config.chroma.tolerance, config.classify.feather_radius);
    } else if remove_bg {
        image = remove_background(&image, &config.classify);
    }

    if fit {
        let limits = &config.limits.still;
        let (before_w, before_h) = image.dimensions();
        image = fit_within(&image, limits.max_width, limits.max_height);
        if image.dimensions() != (before_w, before_h) {
            info!("Resized {}x{} -> {}x{}", before_w, before_h, image.width(), image.height());
        }
    }

    if let Err(e) = save_png(&image, output) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    // Measure what was actually written, not the in-memory image
    let written = match std::fs::read(output) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read back {}: {}", output.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let info = match probe(written.as_slice()) {
        Ok(info) => info,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let report =
        validate_static(info.width, info.height, info.has_alpha, written.len() as u64, &config.limits.still);
    println!("{}", output.display());
    print!("{}", report);
    ExitCode::from(EXIT_SUCCESS)
}
