//! Align command implementation

use std::path::Path;
use std::process::ExitCode;

use log::{info, warn};

use crate::align::{align, AlignOptions, BackgroundRemoval};
use crate::anchor::{AnchorChain, AnchorFile, HintDirectory, PixelAnchors, VisionAnchors};
use crate::canvas::VerticalAnchor;
use crate::config::Config;
use crate::output::{load_frames, write_frames, OutputError};

use super::{chroma_color, require_exists, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the align command
pub fn run_align(
    frames_dir: &Path,
    output: &Path,
    width: Option<u32>,
    height: Option<u32>,
    vertical_anchor: VerticalAnchor,
    chroma_key: bool,
    anchor_file: Option<&Path>,
    pixel_align: bool,
    vision_hints: Option<&Path>,
    config: &Config,
) -> ExitCode {
    if let Err(code) = require_exists(frames_dir, "Frames directory") {
        return code;
    }

    let removal = if chroma_key {
        match chroma_color(config) {
            Ok(color) => BackgroundRemoval::ChromaKey { color, tolerance: config.chroma.tolerance },
            Err(code) => return code,
        }
    } else {
        BackgroundRemoval::Auto
    };

    let frames = match load_frames(frames_dir) {
        Ok(frames) => frames,
        Err(e @ OutputError::NoFrames(_)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    info!("Loaded {} frames from {}", frames.len(), frames_dir.display());

    let chain = build_chain(anchor_file, pixel_align, vision_hints, config);
    let options = AlignOptions {
        classify: config.classify,
        removal,
        vertical_anchor,
        padding: config.anchor.canvas_padding,
        width,
        height,
    };

    let alignment = match align(&frames, &chain, &options) {
        Ok(alignment) => alignment,
        // Every alignment failure is an input problem
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match write_frames(&alignment.into_frames(), output) {
        Ok(paths) => {
            for path in &paths {
                println!("{}", path.display());
            }
            info!("Wrote {} aligned frames to {}", paths.len(), output.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Assemble the anchor strategies enabled on the command line.
///
/// An anchor file that cannot be read is skipped with a warning; the
/// remaining strategies still apply.
fn build_chain(
    anchor_file: Option<&Path>,
    pixel_align: bool,
    vision_hints: Option<&Path>,
    config: &Config,
) -> AnchorChain {
    let mut chain = AnchorChain::new();

    if let Some(path) = anchor_file {
        match AnchorFile::load(path) {
            Ok(file) => {
                info!("Loaded {} precomputed anchors from {}", file.len(), path.display());
                chain = chain.with(Box::new(file));
            }
            Err(e) => warn!("Ignoring anchor file: {}", e),
        }
    }

    if pixel_align {
        chain = chain.with(Box::new(PixelAnchors::new(config.pixel_anchor_options())));
    }

    if let Some(dir) = vision_hints {
        if !dir.is_dir() {
            warn!("Vision hint directory {} does not exist; every frame will fall back", dir.display());
        }
        chain = chain.with(Box::new(VisionAnchors::new(Box::new(HintDirectory::new(dir)))));
    }

    chain
}
