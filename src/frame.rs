//! Named animation frames

use image::{Rgba, RgbaImage};

/// Transparent color used for empty frames and canvases
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// One raster frame plus the identity used for anchor lookups and logging.
///
/// Each pipeline stage produces new frames rather than editing the ones it
/// was given.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// File name of the frame, e.g. `frame_003.png`
    pub name: String,
    pub image: RgbaImage,
}

impl Frame {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self { name: name.into(), image }
    }

    /// A fully transparent frame of the given size.
    pub fn transparent(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(name, RgbaImage::from_pixel(width, height, TRANSPARENT))
    }

    /// Replace the image while keeping the frame's identity.
    pub fn with_image(&self, image: RgbaImage) -> Self {
        Self { name: self.name.clone(), image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether every pixel has zero alpha.
    pub fn is_fully_transparent(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }
}

/// Canonical file name for the frame at `index`.
///
/// The fixed-width suffix keeps lexicographic order equal to sequence order.
///
/// ```
/// use spritealign::frame::frame_file_name;
///
/// assert_eq!(frame_file_name(7), "frame_007.png");
/// assert_eq!(frame_file_name(123), "frame_123.png");
/// ```
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:03}.png", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_frame() {
        let frame = Frame::transparent("a.png", 3, 2);
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert!(frame.is_fully_transparent());
    }

    #[test]
    fn test_with_image_keeps_name() {
        let frame = Frame::transparent("walk.png", 1, 1);
        let replaced = frame.with_image(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        assert_eq!(replaced.name, "walk.png");
        assert!(!replaced.is_fully_transparent());
        assert!(frame.is_fully_transparent());
    }

    #[test]
    fn test_frame_names_sort_in_sequence_order() {
        let mut names: Vec<String> = [10, 2, 100, 0].iter().map(|&i| frame_file_name(i)).collect();
        names.sort();
        assert_eq!(names, vec!["frame_000.png", "frame_002.png", "frame_010.png", "frame_100.png"]);
    }
}
