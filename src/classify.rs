//! Foreground classification and background removal
//!
//! A frame is classified in one of two modes:
//!
//! | Mode | Chosen when | Foreground pixel |
//! |------|-------------|------------------|
//! | Alpha | min alpha < `transparency_cutoff` | alpha >= `alpha_threshold` |
//! | Color | frame is fully opaque | max channel distance to the edge-median background > `color_threshold` |
//!
//! The same classification drives bounding boxes, background removal and the
//! sprite sheet segmenter.

use crate::color::max_channel_distance;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Alpha at or above which a pixel counts as opaque foreground.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// A frame whose minimum alpha is below this carries meaningful transparency.
pub const DEFAULT_TRANSPARENCY_CUTOFF: u8 = 250;

/// Max channel distance from the background color that still counts as background.
pub const DEFAULT_COLOR_THRESHOLD: u8 = 30;

/// Pixels sampled along each edge when estimating the background color.
pub const DEFAULT_EDGE_SAMPLES: u32 = 10;

/// Default chroma-key color.
pub const DEFAULT_CHROMA_KEY: &str = "#00FF00";

/// Default chroma-key tolerance.
pub const DEFAULT_CHROMA_TOLERANCE: u8 = 40;

const OPAQUE: u8 = 255;
const CLEAR: u8 = 0;

/// Tuning knobs for foreground classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyOptions {
    /// Alpha at or above which a pixel is foreground (alpha mode)
    pub alpha_threshold: u8,
    /// Minimum alpha below which a frame is treated as already transparent
    pub transparency_cutoff: u8,
    /// Background distance threshold (color mode)
    pub color_threshold: u8,
    /// Samples per edge for background estimation
    pub edge_samples: u32,
    /// Gaussian radius applied to the generated alpha channel (0 = hard edges)
    pub feather_radius: f32,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            transparency_cutoff: DEFAULT_TRANSPARENCY_CUTOFF,
            color_threshold: DEFAULT_COLOR_THRESHOLD,
            edge_samples: DEFAULT_EDGE_SAMPLES,
            feather_radius: 0.0,
        }
    }
}

/// Tight pixel rectangle around foreground content.
///
/// `right` and `bottom` are exclusive, so `left < right` and `top < bottom`
/// always hold for a constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentBBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ContentBBox {
    /// Create a bounding box, returning `None` when it would be empty.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Option<Self> {
        if left < right && top < bottom {
            Some(Self { left, top, right, bottom })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Whether pixel `(x, y)` lies inside the box.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl std::fmt::Display for ContentBBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{},{})", self.left, self.top, self.right, self.bottom)
    }
}

/// How foreground was told apart from background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMode {
    /// Frame already carries transparency; alpha decides
    Alpha,
    /// Frame is opaque; distance from this estimated background color decides
    Color(Rgba<u8>),
}

/// Result of classifying one frame.
#[derive(Debug, Clone)]
pub struct Classification {
    pub mode: BackgroundMode,
    /// 255 for foreground, 0 for background
    pub mask: GrayImage,
    /// `None` when the mask is empty
    pub bbox: Option<ContentBBox>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.bbox.is_none()
    }
}

/// Check whether the image has any meaningful transparency.
pub fn has_transparency(image: &RgbaImage, cutoff: u8) -> bool {
    image.pixels().map(|p| p[3]).min().is_some_and(|min| min < cutoff)
}

/// Estimate the background color from pixels sampled along all four edges.
///
/// Roughly `samples_per_edge` pixels are taken from each edge and the
/// per-channel median is returned, which tolerates stray corner artifacts.
/// An empty image yields opaque black.
pub fn estimate_background(image: &RgbaImage, samples_per_edge: u32) -> Rgba<u8> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Rgba([0, 0, 0, OPAQUE]);
    }

    let samples = samples_per_edge.max(1);
    let step_x = (w / samples).max(1) as usize;
    let step_y = (h / samples).max(1);

    let mut sampled: Vec<Rgba<u8>> = Vec::new();
    for x in (0..w).step_by(step_x) {
        sampled.push(*image.get_pixel(x, 0));
        sampled.push(*image.get_pixel(x, h - 1));
    }
    // Corners were already taken by the horizontal edges
    let end = h.saturating_sub(step_y);
    let mut y = step_y;
    while y < end {
        sampled.push(*image.get_pixel(0, y));
        sampled.push(*image.get_pixel(w - 1, y));
        y += step_y;
    }

    let median = |channel: usize| {
        let mut values: Vec<u8> = sampled.iter().map(|p| p[channel]).collect();
        values.sort_unstable();
        values[values.len() / 2]
    };

    Rgba([median(0), median(1), median(2), OPAQUE])
}

/// Classify every pixel of a frame as foreground or background.
pub fn classify(image: &RgbaImage, options: &ClassifyOptions) -> Classification {
    let (w, h) = image.dimensions();

    let (mode, mask) = if has_transparency(image, options.transparency_cutoff) {
        let mask = GrayImage::from_fn(w, h, |x, y| {
            let alpha = image.get_pixel(x, y)[3];
            Luma([if alpha >= options.alpha_threshold { OPAQUE } else { CLEAR }])
        });
        (BackgroundMode::Alpha, mask)
    } else {
        let background = estimate_background(image, options.edge_samples);
        let mask = GrayImage::from_fn(w, h, |x, y| {
            let distance = max_channel_distance(image.get_pixel(x, y), &background);
            Luma([if distance > options.color_threshold { OPAQUE } else { CLEAR }])
        });
        (BackgroundMode::Color(background), mask)
    };

    let bbox = mask_bbox(&mask);
    Classification { mode, mask, bbox }
}

/// Tight bounding box of a frame's foreground, or `None` if there is none.
pub fn content_bbox(image: &RgbaImage, options: &ClassifyOptions) -> Option<ContentBBox> {
    classify(image, options).bbox
}

/// Bounding box of all non-zero mask pixels.
pub fn mask_bbox(mask: &GrayImage) -> Option<ContentBBox> {
    let mut left = u32::MAX;
    let mut top = u32::MAX;
    let mut right = 0;
    let mut bottom = 0;

    for (x, y, value) in mask.enumerate_pixels() {
        if value[0] != CLEAR {
            left = left.min(x);
            top = top.min(y);
            right = right.max(x + 1);
            bottom = bottom.max(y + 1);
        }
    }

    ContentBBox::new(left, top, right, bottom)
}

/// Make the background of an opaque frame transparent.
///
/// Frames that already carry transparency are returned unchanged (and are
/// not feathered); their alpha channel already separates the character.
pub fn remove_background(image: &RgbaImage, options: &ClassifyOptions) -> RgbaImage {
    let classification = classify(image, options);
    match classification.mode {
        BackgroundMode::Alpha => image.clone(),
        BackgroundMode::Color(_) => {
            let alpha = feather_alpha(classification.mask, options.feather_radius);
            with_alpha(image, &alpha)
        }
    }
}

/// Remove a known chroma-key background color.
///
/// Pixels whose max channel distance to `key` is within `tolerance` become
/// transparent; everything else becomes fully opaque. The source alpha is
/// ignored.
pub fn remove_chroma_key(
    image: &RgbaImage,
    key: Rgba<u8>,
    tolerance: u8,
    feather_radius: f32,
) -> RgbaImage {
    let alpha = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let distance = max_channel_distance(image.get_pixel(x, y), &key);
        Luma([if distance <= tolerance { CLEAR } else { OPAQUE }])
    });
    let alpha = feather_alpha(alpha, feather_radius);
    with_alpha(image, &alpha)
}

/// Soften a binary alpha mask with a Gaussian blur.
///
/// A radius of zero (or less) is a pass-through.
pub fn feather_alpha(alpha: GrayImage, radius: f32) -> GrayImage {
    if radius <= 0.0 {
        return alpha;
    }
    image::imageops::blur(&alpha, radius)
}

/// Copy of `image` with its alpha channel replaced by `alpha`.
fn with_alpha(image: &RgbaImage, alpha: &GrayImage) -> RgbaImage {
    let mut output = image.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        pixel[3] = alpha.get_pixel(x, y)[0];
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// Solid background with a filled rectangle `[x0, x1) x [y0, y1)`
    fn make_rect_frame(
        width: u32,
        height: u32,
        background: Rgba<u8>,
        fill: Rgba<u8>,
        rect: (u32, u32, u32, u32),
    ) -> RgbaImage {
        let (x0, y0, x1, y1) = rect;
        RgbaImage::from_fn(width, height, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                fill
            } else {
                background
            }
        })
    }

    #[test]
    fn test_bbox_new_rejects_empty() {
        assert!(ContentBBox::new(3, 3, 3, 5).is_none());
        assert!(ContentBBox::new(3, 5, 4, 5).is_none());
        let bbox = ContentBBox::new(1, 2, 4, 6).unwrap();
        assert_eq!((bbox.width(), bbox.height()), (3, 4));
    }

    #[test]
    fn test_has_transparency_cutoff() {
        let opaque = RgbaImage::from_pixel(4, 4, WHITE);
        assert!(!has_transparency(&opaque, DEFAULT_TRANSPARENCY_CUTOFF));

        let mut nearly = opaque.clone();
        nearly.put_pixel(2, 2, Rgba([255, 255, 255, 251]));
        assert!(!has_transparency(&nearly, DEFAULT_TRANSPARENCY_CUTOFF));

        nearly.put_pixel(1, 1, Rgba([255, 255, 255, 249]));
        assert!(has_transparency(&nearly, DEFAULT_TRANSPARENCY_CUTOFF));
    }

    #[test]
    fn test_estimate_background_ignores_corner_artifact() {
        let mut img = RgbaImage::from_pixel(40, 40, WHITE);
        img.put_pixel(0, 0, RED);
        img.put_pixel(39, 39, RED);
        assert_eq!(estimate_background(&img, DEFAULT_EDGE_SAMPLES), WHITE);
    }

    #[test]
    fn test_estimate_background_tiny_image() {
        let img = RgbaImage::from_pixel(1, 1, RED);
        assert_eq!(estimate_background(&img, DEFAULT_EDGE_SAMPLES), RED);
    }

    #[test]
    fn test_classify_alpha_mode() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(3, 4, Rgba([10, 10, 10, 200]));
        img.put_pixel(6, 7, Rgba([10, 10, 10, 128]));
        img.put_pixel(8, 8, Rgba([10, 10, 10, 127]));

        let result = classify(&img, &ClassifyOptions::default());
        assert_eq!(result.mode, BackgroundMode::Alpha);
        assert_eq!(result.bbox, ContentBBox::new(3, 4, 7, 8));
    }

    #[test]
    fn test_classify_color_mode() {
        let img = make_rect_frame(50, 40, WHITE, RED, (10, 5, 30, 25));
        let result = classify(&img, &ClassifyOptions::default());
        assert_eq!(result.mode, BackgroundMode::Color(WHITE));
        assert_eq!(result.bbox, ContentBBox::new(10, 5, 30, 25));
    }

    #[test]
    fn test_classify_threshold_is_exclusive() {
        // Exactly `color_threshold` away from the background stays background
        let near = Rgba([225, 225, 225, 255]);
        let img = make_rect_frame(20, 20, WHITE, near, (5, 5, 10, 10));
        assert!(classify(&img, &ClassifyOptions::default()).is_empty());

        let far = Rgba([224, 224, 224, 255]);
        let img = make_rect_frame(20, 20, WHITE, far, (5, 5, 10, 10));
        assert_eq!(content_bbox(&img, &ClassifyOptions::default()), ContentBBox::new(5, 5, 10, 10));
    }

    #[test]
    fn test_classify_empty_frame() {
        let clear = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        assert!(content_bbox(&clear, &ClassifyOptions::default()).is_none());

        let solid = RgbaImage::from_pixel(8, 8, WHITE);
        assert!(content_bbox(&solid, &ClassifyOptions::default()).is_none());
    }

    #[test]
    fn test_bbox_contains_all_foreground() {
        let mut img = RgbaImage::from_pixel(30, 30, Rgba([0, 0, 0, 0]));
        for &(x, y) in &[(2, 9), (17, 3), (25, 28), (11, 11)] {
            img.put_pixel(x, y, RED);
        }
        let result = classify(&img, &ClassifyOptions::default());
        let bbox = result.bbox.unwrap();
        assert!(bbox.left < bbox.right && bbox.top < bbox.bottom);
        for (x, y, value) in result.mask.enumerate_pixels() {
            if value[0] != 0 {
                assert!(bbox.contains(x, y), "({x},{y}) outside {bbox}");
            }
        }
        assert_eq!(bbox, ContentBBox::new(2, 3, 26, 29).unwrap());
    }

    #[test]
    fn test_remove_background_opaque() {
        let img = make_rect_frame(20, 20, WHITE, RED, (4, 4, 8, 8));
        let out = remove_background(&img, &ClassifyOptions::default());
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(5, 5)[3], 255);
        assert_eq!(out.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_remove_background_keeps_transparent_input() {
        let mut img = RgbaImage::from_pixel(6, 6, Rgba([9, 9, 9, 0]));
        img.put_pixel(1, 1, Rgba([9, 9, 9, 90]));
        let out = remove_background(&img, &ClassifyOptions::default());
        assert_eq!(out, img);
    }

    #[test]
    fn test_remove_background_feathered_edges() {
        let img = make_rect_frame(30, 30, WHITE, RED, (10, 10, 20, 20));
        let options = ClassifyOptions { feather_radius: 2.0, ..Default::default() };
        let out = remove_background(&img, &options);
        let edge = out.get_pixel(10, 15)[3];
        assert!(edge > 0 && edge < 255, "edge alpha {edge} should be soft");
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_chroma_key_green_becomes_transparent() {
        let img = RgbaImage::from_pixel(50, 50, GREEN);
        let out = remove_chroma_key(&img, GREEN, DEFAULT_CHROMA_TOLERANCE, 0.0);
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_chroma_key_red_stays_opaque() {
        let img = RgbaImage::from_pixel(50, 50, RED);
        let out = remove_chroma_key(&img, GREEN, DEFAULT_CHROMA_TOLERANCE, 0.0);
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_chroma_key_tolerance_boundary() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([40, 215, 40, 255]));
        let out = remove_chroma_key(&img, GREEN, 40, 0.0);
        assert!(out.pixels().all(|p| p[3] == 0));
        let out = remove_chroma_key(&img, GREEN, 39, 0.0);
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_feather_zero_is_passthrough() {
        let mask = GrayImage::from_fn(5, 5, |x, _| Luma([if x < 2 { 0 } else { 255 }]));
        assert_eq!(feather_alpha(mask.clone(), 0.0), mask);
    }
}
