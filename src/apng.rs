//! Animated PNG encoding and inspection

use image::RgbaImage;
use std::io::Read;
use thiserror::Error;

/// Error type for APNG encoding and decoding
#[derive(Debug, Error)]
pub enum ApngError {
    #[error("cannot encode an animation without frames")]
    NoFrames,
    /// Every frame must share the first frame's size
    #[error("frame {index} is {actual_w}x{actual_h}, expected {width}x{height}")]
    SizeMismatch { index: usize, width: u32, height: u32, actual_w: u32, actual_h: u32 },
    #[error("{frames} frames but {delays} delays")]
    DelayCount { frames: usize, delays: usize },
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
    #[error("PNG decoding failed: {0}")]
    Decoding(#[from] png::DecodingError),
}

/// Encode frames as an animated PNG.
///
/// # Arguments
///
/// * `frames` - Equally sized RGBA frames in playback order
/// * `delays_ms` - Per-frame display time in milliseconds
/// * `loop_count` - Number of plays, 0 = loop forever
///
/// # Returns
///
/// The encoded file contents.
pub fn encode_apng(frames: &[RgbaImage], delays_ms: &[u32], loop_count: u32) -> Result<Vec<u8>, ApngError> {
    let first = frames.first().ok_or(ApngError::NoFrames)?;
    if frames.len() != delays_ms.len() {
        return Err(ApngError::DelayCount { frames: frames.len(), delays: delays_ms.len() });
    }
    let (width, height) = first.dimensions();
    for (index, frame) in frames.iter().enumerate() {
        let (actual_w, actual_h) = frame.dimensions();
        if (actual_w, actual_h) != (width, height) {
            return Err(ApngError::SizeMismatch { index, width, height, actual_w, actual_h });
        }
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        // Default level writes stored deflate blocks for noisy frames
        encoder.set_compression(png::Compression::Best);
        encoder.set_animated(frames.len() as u32, loop_count)?;

        let mut writer = encoder.write_header()?;
        for (frame, &delay) in frames.iter().zip(delays_ms) {
            let (num, den) = delay_fraction(delay);
            writer.set_frame_delay(num, den)?;
            writer.write_image_data(frame.as_raw())?;
        }
        writer.finish()?;
    }
    Ok(bytes)
}

/// Express a millisecond delay as the u16 fraction stored in `fcTL`.
///
/// Delays too long for millisecond precision fall back to centiseconds.
fn delay_fraction(delay_ms: u32) -> (u16, u16) {
    match u16::try_from(delay_ms) {
        Ok(ms) => (ms, 1000),
        Err(_) => ((delay_ms / 10).min(u16::MAX as u32) as u16, 100),
    }
}

/// Facts read back from an encoded PNG or APNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngInfo {
    pub width: u32,
    pub height: u32,
    /// Alpha channel or `tRNS` transparency is present
    pub has_alpha: bool,
    /// `acTL` chunk present
    pub animated: bool,
    /// Number of animation frames (1 for still images)
    pub frame_count: u32,
    /// Plays declared by `acTL` (0 = infinite), `None` for still images
    pub loop_count: Option<u32>,
    /// Sum of all frame delays in milliseconds (0 for still images)
    pub total_duration_ms: u32,
}

/// Read dimensions, transparency and animation timing from PNG data.
pub fn probe<R: Read>(source: R) -> Result<PngInfo, ApngError> {
    let decoder = png::Decoder::new(source);
    let mut reader = decoder.read_info()?;

    let info = reader.info();
    let (width, height) = (info.width, info.height);
    let has_alpha = matches!(info.color_type, png::ColorType::Rgba | png::ColorType::GrayscaleAlpha)
        || info.trns.is_some();
    let animation = info.animation_control;

    let Some(control) = animation else {
        return Ok(PngInfo {
            width,
            height,
            has_alpha,
            animated: false,
            frame_count: 1,
            loop_count: None,
            total_duration_ms: 0,
        });
    };

    let mut buffer = vec![0; reader.output_buffer_size()];
    let mut total_ms = 0u32;
    for _ in 0..control.num_frames {
        reader.next_frame(&mut buffer)?;
        if let Some(fc) = reader.info().frame_control {
            let den = if fc.delay_den == 0 { 100 } else { fc.delay_den as u32 };
            total_ms = total_ms.saturating_add((fc.delay_num as u32 * 1000 + den / 2) / den);
        }
    }

    Ok(PngInfo {
        width,
        height,
        has_alpha,
        animated: true,
        frame_count: control.num_frames,
        loop_count: Some(control.num_plays),
        total_duration_ms: total_ms,
    })
}
