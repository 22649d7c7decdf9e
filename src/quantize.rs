//! Palette reduction using median cut in LAB color space.
//!
//! Frames are reduced independently to at most `max_colors` RGBA colors,
//! then mapped back to full RGBA so the encoder sees ordinary frames with a
//! much smaller color set. Fully transparent pixels always keep a dedicated
//! palette slot.

use image::{Rgba, RgbaImage};
use std::collections::HashMap;

/// Palette size used when quantization is requested.
pub const DEFAULT_MAX_COLORS: usize = 256;

/// A color represented as RGBA values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    const CLEAR: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    /// Fully transparent pixels collapse to a single color regardless of RGB.
    fn from_rgba(rgba: Rgba<u8>) -> Self {
        if rgba[3] == 0 {
            Self::CLEAR
        } else {
            Self { r: rgba[0], g: rgba[1], b: rgba[2], a: rgba[3] }
        }
    }

    fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    fn is_transparent(&self) -> bool {
        self.a == 0
    }

    fn lab(&self) -> LabColor {
        LabColor::from_rgb(self.r, self.g, self.b)
    }
}

/// LAB color representation for perceptual distances.
#[derive(Debug, Clone, Copy)]
struct LabColor {
    l: f64,
    a: f64,
    b: f64,
}

impl LabColor {
    /// Convert sRGB to LAB (D65 reference white).
    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r_lin = srgb_to_linear(r as f64 / 255.0);
        let g_lin = srgb_to_linear(g as f64 / 255.0);
        let b_lin = srgb_to_linear(b as f64 / 255.0);

        let x = r_lin * 0.4124564 + g_lin * 0.3575761 + b_lin * 0.1804375;
        let y = r_lin * 0.2126729 + g_lin * 0.7151522 + b_lin * 0.0721750;
        let z = r_lin * 0.0193339 + g_lin * 0.1191920 + b_lin * 0.9503041;

        let fx = lab_f(x / 0.95047);
        let fy = lab_f(y);
        let fz = lab_f(z / 1.08883);

        Self { l: 116.0 * fy - 16.0, a: 500.0 * (fx - fy), b: 200.0 * (fy - fz) }
    }

    /// CIE76 Delta E.
    fn distance(&self, other: &LabColor) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        (dl * dl + da * da + db * db).sqrt()
    }

    fn channel(&self, channel: LabChannel) -> f64 {
        match channel {
            LabChannel::L => self.l,
            LabChannel::A => self.a,
            LabChannel::B => self.b,
        }
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    let delta: f64 = 6.0 / 29.0;
    if t > delta.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * delta * delta) + 4.0 / 29.0
    }
}

#[derive(Debug, Clone, Copy)]
enum LabChannel {
    L,
    A,
    B,
}

/// A box of colors for median cut: original color, LAB color, pixel count.
#[derive(Debug, Clone)]
struct ColorBox {
    colors: Vec<(Color, LabColor, u32)>,
}

impl ColorBox {
    fn widest_channel(&self) -> LabChannel {
        let range = |channel: LabChannel| {
            let (min, max) = self.colors.iter().fold((f64::MAX, f64::MIN), |(lo, hi), (_, lab, _)| {
                let v = lab.channel(channel);
                (lo.min(v), hi.max(v))
            });
            max - min
        };
        let (l, a, b) = (range(LabChannel::L), range(LabChannel::A), range(LabChannel::B));

        if l >= a && l >= b {
            LabChannel::L
        } else if a >= b {
            LabChannel::A
        } else {
            LabChannel::B
        }
    }

    /// Split along the widest channel at the pixel-weighted median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();
        self.colors.sort_by(|(_, x, _), (_, y, _)| x.channel(channel).total_cmp(&y.channel(channel)));

        let total = self.pixel_count();
        let mut running = 0u64;
        let mut split_idx = self.colors.len() / 2;
        for (i, (_, _, count)) in self.colors.iter().enumerate() {
            running += *count as u64;
            if running >= total / 2 {
                split_idx = i + 1;
                break;
            }
        }
        // Both halves must be non-empty
        split_idx = split_idx.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(split_idx);
        (ColorBox { colors: self.colors }, ColorBox { colors: right })
    }

    /// Original color closest to the box's weighted LAB mean.
    fn representative(&self) -> Color {
        let total = self.pixel_count() as f64;
        let mean = |channel: LabChannel| {
            self.colors.iter().map(|(_, lab, count)| lab.channel(channel) * *count as f64).sum::<f64>() / total
        };
        let center = LabColor { l: mean(LabChannel::L), a: mean(LabChannel::A), b: mean(LabChannel::B) };

        self.colors
            .iter()
            .min_by(|(_, x, _), (_, y, _)| center.distance(x).total_cmp(&center.distance(y)))
            .map(|(c, _, _)| *c)
            .unwrap_or(Color::CLEAR)
    }

    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|(_, _, count)| *count as u64).sum()
    }
}

/// Build a palette of at most `max_colors` entries.
fn median_cut(colors: HashMap<Color, u32>, max_colors: usize) -> Vec<Color> {
    if colors.len() <= max_colors {
        return colors.into_keys().collect();
    }

    let has_clear = colors.contains_key(&Color::CLEAR);
    let opaque: Vec<(Color, LabColor, u32)> = colors
        .into_iter()
        .filter(|(color, _)| !color.is_transparent())
        .map(|(color, count)| (color, color.lab(), count))
        .collect();

    let effective_max = (if has_clear { max_colors.saturating_sub(1) } else { max_colors }).max(1);

    let mut boxes = vec![ColorBox { colors: opaque }];
    while boxes.len() < effective_max {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| b.pixel_count())
            .map(|(i, _)| i);
        let Some(index) = candidate else { break };

        let (left, right) = boxes.remove(index).split();
        boxes.push(left);
        boxes.push(right);
    }

    let mut palette: Vec<Color> = boxes.iter().map(ColorBox::representative).collect();
    if has_clear {
        palette.push(Color::CLEAR);
    }
    palette
}

/// Nearest palette entry, weighing alpha differences alongside LAB distance.
fn nearest(color: Color, palette: &[(Color, LabColor)]) -> Color {
    if color.is_transparent() {
        return Color::CLEAR;
    }
    let lab = color.lab();
    palette
        .iter()
        .filter(|(p, _)| !p.is_transparent())
        .min_by(|(p, x), (q, y)| {
            let dp = lab.distance(x) + alpha_penalty(color, *p);
            let dq = lab.distance(y) + alpha_penalty(color, *q);
            dp.total_cmp(&dq)
        })
        .map(|(p, _)| *p)
        .unwrap_or(color)
}

fn alpha_penalty(a: Color, b: Color) -> f64 {
    (a.a as f64 - b.a as f64).abs() * 100.0 / 255.0
}

/// Reduce an image to at most `max_colors` distinct RGBA colors.
///
/// Images that already fit are returned unchanged.
pub fn quantize(image: &RgbaImage, max_colors: usize) -> RgbaImage {
    let mut counts: HashMap<Color, u32> = HashMap::new();
    for pixel in image.pixels() {
        *counts.entry(Color::from_rgba(*pixel)).or_insert(0) += 1;
    }
    if counts.len() <= max_colors {
        return image.clone();
    }

    let palette: Vec<(Color, LabColor)> =
        median_cut(counts, max_colors).into_iter().map(|c| (c, c.lab())).collect();

    let mut mapping: HashMap<Color, Color> = HashMap::new();
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let color = Color::from_rgba(*pixel);
        let mapped = *mapping.entry(color).or_insert_with(|| nearest(color, &palette));
        *pixel = mapped.to_rgba();
    }
    output
}

/// Number of distinct RGBA colors in an image (transparent pixels count once).
pub fn count_colors(image: &RgbaImage) -> usize {
    image.pixels().map(|p| Color::from_rgba(*p)).collect::<std::collections::HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64x64 gradient with 4096 distinct opaque colors and a transparent border
    fn make_gradient() -> RgbaImage {
        RgbaImage::from_fn(64, 64, |x, y| {
            if x == 0 || y == 0 {
                Rgba([9, 9, 9, 0])
            } else {
                Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
            }
        })
    }

    #[test]
    fn test_lab_conversion_extremes() {
        let black = LabColor::from_rgb(0, 0, 0);
        let white = LabColor::from_rgb(255, 255, 255);
        assert!(black.l < 1.0);
        assert!(white.l > 99.0 && white.a.abs() < 1.0 && white.b.abs() < 1.0);
        assert!(black.distance(&white) > 90.0);
    }

    #[test]
    fn test_quantize_limits_palette() {
        let image = make_gradient();
        assert!(count_colors(&image) > DEFAULT_MAX_COLORS);

        let reduced = quantize(&image, DEFAULT_MAX_COLORS);
        assert_eq!(reduced.dimensions(), image.dimensions());
        assert!(count_colors(&reduced) <= DEFAULT_MAX_COLORS);
    }

    #[test]
    fn test_quantize_keeps_transparency() {
        let reduced = quantize(&make_gradient(), 16);
        assert!(count_colors(&reduced) <= 16);
        assert_eq!(*reduced.get_pixel(0, 5), Rgba([0, 0, 0, 0]));
        assert!(reduced.enumerate_pixels().filter(|(x, y, _)| *x > 0 && *y > 0).all(|(_, _, p)| p[3] == 255));
    }

    #[test]
    fn test_quantize_small_palette_untouched() {
        let image = RgbaImage::from_fn(8, 8, |x, _| if x < 4 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 128]) });
        assert_eq!(quantize(&image, DEFAULT_MAX_COLORS), image);
    }

    #[test]
    fn test_quantize_maps_to_similar_colors() {
        let image = make_gradient();
        let reduced = quantize(&image, 64);
        let original = image.get_pixel(40, 40);
        let mapped = reduced.get_pixel(40, 40);
        let diff = (0..3).map(|c| (original[c] as i32 - mapped[c] as i32).abs()).max().unwrap_or(0);
        assert!(diff < 64, "mapped {mapped:?} too far from {original:?}");
    }
}
