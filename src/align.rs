//! Frame alignment onto a uniform canvas
//!
//! Each frame goes through background removal, bounding box detection, anchor
//! resolution and compositing. Frames are independent of each other, so both
//! passes run on rayon's thread pool; results keep the input order.

use crate::anchor::{AnchorChain, AnchorSource};
use crate::canvas::{CanvasSpec, VerticalAnchor, DEFAULT_CANVAS_PADDING};
use crate::classify::{content_bbox, remove_background, remove_chroma_key, ClassifyOptions, ContentBBox};
use crate::frame::{frame_file_name, Frame};
use image::{imageops, Rgba};
use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

/// Error type for frame alignment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("no frames to align")]
    NoFrames,
    /// No frame has content, so no canvas can be sized
    #[error("all frames are fully transparent")]
    AllTransparent,
    #[error("canvas size {width}x{height} must be non-zero")]
    EmptyCanvas { width: u32, height: u32 },
}

/// How backgrounds are removed before alignment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackgroundRemoval {
    /// Alpha if present, otherwise the edge-median background color
    #[default]
    Auto,
    /// A known key color within a max channel distance
    ChromaKey { color: Rgba<u8>, tolerance: u8 },
}

/// Settings for [`align`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignOptions {
    pub classify: ClassifyOptions,
    pub removal: BackgroundRemoval,
    pub vertical_anchor: VerticalAnchor,
    /// Factor applied to the largest content size for auto canvas sizing
    pub padding: f64,
    /// Explicit canvas width (auto when `None`)
    pub width: Option<u32>,
    /// Explicit canvas height (auto when `None`)
    pub height: Option<u32>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            classify: ClassifyOptions::default(),
            removal: BackgroundRemoval::Auto,
            vertical_anchor: VerticalAnchor::Center,
            padding: DEFAULT_CANVAS_PADDING,
            width: None,
            height: None,
        }
    }
}

/// One output frame plus how it was placed.
#[derive(Debug, Clone)]
pub struct AlignedFrame {
    /// Canvas-sized frame, renamed to its sequence position
    pub frame: Frame,
    /// Name of the input frame it came from
    pub source_name: String,
    /// `None` for frames without content (emitted transparent)
    pub bbox: Option<ContentBBox>,
    pub anchor_source: Option<AnchorSource>,
    pub offset: Option<(i64, i64)>,
}

/// Result of aligning a sequence.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub canvas: CanvasSpec,
    pub frames: Vec<AlignedFrame>,
}

impl Alignment {
    /// Output frames in sequence order.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames.into_iter().map(|f| f.frame).collect()
    }
}

/// Remove the background of one frame according to `removal`.
pub fn clean_frame(frame: &Frame, removal: BackgroundRemoval, options: &ClassifyOptions) -> Frame {
    let image = match removal {
        BackgroundRemoval::Auto => remove_background(&frame.image, options),
        BackgroundRemoval::ChromaKey { color, tolerance } => {
            remove_chroma_key(&frame.image, color, tolerance, options.feather_radius)
        }
    };
    frame.with_image(image)
}

/// Align frames so the character stays steady across the sequence.
///
/// # Arguments
///
/// * `frames` - Input frames in sequence order; names are used for anchor lookups
/// * `chain` - Anchor strategies to try for each frame
/// * `options` - Background removal and canvas settings
///
/// # Returns
///
/// One canvas-sized frame per input frame, in the same order. Frames without
/// content become fully transparent canvases.
pub fn align(frames: &[Frame], chain: &AnchorChain, options: &AlignOptions) -> Result<Alignment, AlignError> {
    if frames.is_empty() {
        return Err(AlignError::NoFrames);
    }

    let prepared: Vec<(Frame, Option<ContentBBox>)> = frames
        .par_iter()
        .map(|frame| {
            let cleaned = clean_frame(frame, options.removal, &options.classify);
            let bbox = content_bbox(&cleaned.image, &options.classify);
            (cleaned, bbox)
        })
        .collect();

    let sizes = prepared.iter().filter_map(|(_, bbox)| bbox.map(|b| (b.width(), b.height())));
    let canvas =
        CanvasSpec::auto(sizes, options.padding, options.width, options.height, options.vertical_anchor)
            .ok_or(AlignError::AllTransparent)?;
    if canvas.width == 0 || canvas.height == 0 {
        return Err(AlignError::EmptyCanvas { width: canvas.width, height: canvas.height });
    }

    info!(
        "Canvas: {}x{}, center: ({}, {}), anchor: {}, strategies: {}",
        canvas.width,
        canvas.height,
        canvas.center_x(),
        canvas.center_y(),
        canvas.vertical_anchor,
        chain.sources().iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" > ")
    );

    let aligned: Vec<AlignedFrame> = prepared
        .par_iter()
        .enumerate()
        .map(|(index, (cleaned, bbox))| place_frame(index, cleaned, *bbox, chain, &canvas))
        .collect();

    info!("Aligned {} frames", aligned.len());
    Ok(Alignment { canvas, frames: aligned })
}

fn place_frame(
    index: usize,
    cleaned: &Frame,
    bbox: Option<ContentBBox>,
    chain: &AnchorChain,
    canvas: &CanvasSpec,
) -> AlignedFrame {
    let name = frame_file_name(index);
    let Some(bbox) = bbox else {
        debug!("  {}: no content, emitting transparent canvas", cleaned.name);
        return AlignedFrame {
            frame: Frame::new(name, canvas.blank()),
            source_name: cleaned.name.clone(),
            bbox: None,
            anchor_source: None,
            offset: None,
        };
    };

    let resolved = chain.resolve(cleaned, bbox);
    let content = imageops::crop_imm(&cleaned.image, bbox.left, bbox.top, bbox.width(), bbox.height()).to_image();
    let (image, offset) = canvas.place(&content, &resolved.local(&bbox));

    info!("  {} [{}]: bbox={} -> paste=({},{})", cleaned.name, resolved.source, bbox, offset.0, offset.1);

    AlignedFrame {
        frame: Frame::new(name, image),
        source_name: cleaned.name.clone(),
        bbox: Some(bbox),
        anchor_source: Some(resolved.source),
        offset: Some(offset),
    }
}
