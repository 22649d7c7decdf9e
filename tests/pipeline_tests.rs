//! End-to-end tests of the library pipeline
//!
//! Sheets and frames are synthesized in memory so every expected value can be
//! derived by hand: cut -> align -> time -> assemble -> validate.

use image::{Rgba, RgbaImage};
use spritealign::align::{align, AlignOptions, BackgroundRemoval};
use spritealign::anchor::{
    AnchorChain, AnchorFile, AnchorPoint, AnchorSource, HintDirectory, PixelAnchors, VisionAnchors,
};
use spritealign::apng::probe;
use spritealign::assemble::{assemble, AssembleOptions};
use spritealign::classify::{remove_chroma_key, ClassifyOptions};
use spritealign::color::parse_color;
use spritealign::frame::Frame;
use spritealign::grid::{detect_grid, Grid, GridOptions};
use spritealign::loop_score::loop_score;
use spritealign::output::{load_frames, write_frames};
use spritealign::segment::{cut, CutMode};
use spritealign::timing::{plan, total_from_fps, TimingCurve, MIN_FRAME_MS};
use spritealign::validate::{validate_animated, AnimatedLimits};
use tempfile::TempDir;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([40, 50, 160, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Sheet of `cols x rows` 40px cells, each with a centered 19px diamond,
/// except the cells listed in `empty`.
///
/// A diamond rather than a square keeps transparent corners after cropping,
/// the way a real character does.
fn make_sheet(cols: u32, rows: u32, empty: &[u32]) -> RgbaImage {
    let cell = 40;
    RgbaImage::from_fn(cols * cell, rows * cell, |x, y| {
        let index = (y / cell) * cols + x / cell;
        let dx = (x % cell) as i32 - 20;
        let dy = (y % cell) as i32 - 20;
        if dx.abs() + dy.abs() < 10 && !empty.contains(&index) {
            Rgba([(30 + index * 25) as u8, 60, 120, 255])
        } else {
            WHITE
        }
    })
}

/// A 100x100 white frame with an ink rectangle covering `[left, right) x [top, bottom)`.
fn framed_rect(name: &str, left: u32, top: u32, right: u32, bottom: u32) -> Frame {
    let image = RgbaImage::from_fn(100, 100, |x, y| {
        if x >= left && x < right && y >= top && y < bottom {
            INK
        } else {
            WHITE
        }
    });
    Frame::new(name, image)
}

#[test]
fn test_grid_round_trip() {
    for &(cols, rows) in &[(4, 2), (2, 3), (5, 1)] {
        let sheet = make_sheet(cols, rows, &[]);
        let grid = detect_grid(&sheet, &GridOptions::default());
        assert_eq!(grid, Some(Grid::new(cols, rows)), "{cols}x{rows}");
    }
}

#[test]
fn test_frame_count_preserved_through_pipeline() {
    // Cell 5 is blank; it must survive as a transparent frame everywhere
    let sheet = make_sheet(4, 2, &[5]);
    let options = ClassifyOptions::default();
    let grid = detect_grid(&sheet, &GridOptions::default()).expect("grid should be detected");
    assert_eq!(grid, Grid::new(4, 2));

    let frames = cut(&sheet, grid, None, CutMode::ContentAware, &options).unwrap();
    assert_eq!(frames.len(), 8);
    assert!(frames[5].is_fully_transparent());
    assert_eq!((frames[0].width(), frames[0].height()), (19, 19));

    let alignment = align(&frames, &AnchorChain::new(), &AlignOptions::default()).unwrap();
    assert_eq!((alignment.canvas.width, alignment.canvas.height), (20, 20));
    assert_eq!(alignment.frames.len(), 8);
    assert!(alignment.frames[5].bbox.is_none());
    for (index, aligned) in alignment.frames.iter().enumerate() {
        assert_eq!(aligned.frame.name, format!("frame_{:03}.png", index));
        assert_eq!(aligned.source_name, frames[index].name);
    }

    let images: Vec<RgbaImage> = alignment.into_frames().into_iter().map(|f| f.image).collect();
    let total = total_from_fps(16.0, images.len()).unwrap();
    let timing = plan(images.len(), total, TimingCurve::EaseInOut).unwrap();
    let artifact = assemble(&images, &timing, &AssembleOptions::default()).unwrap();
    assert_eq!(artifact.frame_count, 8);
    assert_eq!(artifact.total_duration_ms, 504);

    let info = probe(artifact.bytes.as_slice()).unwrap();
    assert_eq!(info.frame_count, 8);
    assert_eq!(info.total_duration_ms, 504);
    assert_eq!(info.loop_count, Some(0));

    let report = validate_animated(
        info.width,
        info.height,
        info.frame_count,
        info.total_duration_ms,
        artifact.byte_size(),
        &AnimatedLimits::default(),
    );
    assert!(report.passed, "{}", report);
}

#[test]
fn test_anchor_file_takes_priority() {
    let frame = framed_rect("walk_0.png", 30, 20, 70, 80);
    let file: AnchorFile =
        [("walk_0.png".to_string(), AnchorPoint::new(40.0, 60.0, 80.0, 20.0))].into_iter().collect();
    let chain = AnchorChain::new().with(Box::new(PixelAnchors::default())).with(Box::new(file));

    let alignment = align(&[frame], &chain, &AlignOptions::default()).unwrap();
    let aligned = &alignment.frames[0];

    // Canvas 44x66, center (22, 33); local anchor (10, 40)
    assert_eq!((alignment.canvas.width, alignment.canvas.height), (44, 66));
    assert_eq!(aligned.anchor_source, Some(AnchorSource::PrecomputedFile));
    assert_eq!(aligned.offset, Some((12, -7)));
}

#[test]
fn test_vision_hints_fall_back_per_frame() {
    let hints = TempDir::new().unwrap();
    std::fs::write(
        hints.path().join("a.json"),
        "```json\n{\"feet_y_frac\": 0.8, \"head_y_frac\": 0.2, \"center_x_frac\": 0.5, \
         \"center_y_frac\": 0.5, \"bbox_px\": [30, 20, 70, 80]}\n```",
    )
    .unwrap();

    let frames = vec![framed_rect("a.png", 30, 20, 70, 80), framed_rect("b.png", 30, 20, 70, 80)];
    let chain = AnchorChain::new().with(Box::new(VisionAnchors::new(Box::new(HintDirectory::new(hints.path())))));
    let alignment = align(&frames, &chain, &AlignOptions::default()).unwrap();

    assert_eq!(alignment.frames.len(), 2);
    assert_eq!(alignment.frames[0].anchor_source, Some(AnchorSource::ExternalVisionHint));
    assert_eq!(alignment.frames[1].anchor_source, Some(AnchorSource::BoundingBoxGeometric));
}

#[test]
fn test_centering_example() {
    let image = RgbaImage::from_fn(120, 120, |x, y| {
        if (10..110).contains(&x) && (10..110).contains(&y) {
            INK
        } else {
            CLEAR
        }
    });
    let options = AlignOptions { width: Some(220), height: Some(220), ..Default::default() };
    let alignment = align(&[Frame::new("square.png", image)], &AnchorChain::new(), &options).unwrap();
    assert_eq!(alignment.frames[0].offset, Some((60, 60)));
}

#[test]
fn test_chroma_key_example() {
    let key = parse_color("#00FF00").unwrap();

    let green = RgbaImage::from_pixel(50, 50, Rgba([0, 255, 0, 255]));
    let keyed = remove_chroma_key(&green, key, 40, 0.0);
    assert!(keyed.pixels().all(|p| p[3] == 0));

    let red = RgbaImage::from_pixel(50, 50, Rgba([255, 0, 0, 255]));
    let kept = remove_chroma_key(&red, key, 40, 0.0);
    assert!(kept.pixels().all(|p| p[3] == 255));
}

#[test]
fn test_chroma_removal_in_align() {
    let image = RgbaImage::from_fn(60, 60, |x, y| {
        if (20..40).contains(&x) && (10..50).contains(&y) {
            INK
        } else {
            Rgba([0, 255, 0, 255])
        }
    });
    let options = AlignOptions {
        removal: BackgroundRemoval::ChromaKey { color: parse_color("lime").unwrap(), tolerance: 40 },
        ..Default::default()
    };
    let alignment = align(&[Frame::new("g.png", image)], &AnchorChain::new(), &options).unwrap();
    let bbox = alignment.frames[0].bbox.unwrap();
    assert_eq!((bbox.width(), bbox.height()), (20, 40));
}

#[test]
fn test_loop_score_identical_frames() {
    let frame = make_sheet(2, 1, &[]);
    assert_eq!(loop_score(&frame, &frame), 0.0);
}

#[test]
fn test_timing_sum_is_exact() {
    let curves = [
        TimingCurve::Uniform,
        TimingCurve::EaseIn,
        TimingCurve::EaseOut,
        TimingCurve::EaseInOut,
        TimingCurve::Bounce,
    ];
    for curve in curves {
        for frames in 1..=20usize {
            for total in [frames as u32 * MIN_FRAME_MS, 333, 1000, 4000] {
                if total < frames as u32 * MIN_FRAME_MS {
                    continue;
                }
                let timing = plan(frames, total, curve).unwrap();
                assert_eq!(timing.total_ms(), total, "{curve} n={frames} total={total}");
                assert!(timing.as_slice().iter().all(|&d| d >= MIN_FRAME_MS), "{curve} n={frames} total={total}");
            }
        }
    }
}

#[test]
fn test_frames_round_trip_through_directories() {
    let dir = TempDir::new().unwrap();
    let sheet = make_sheet(3, 1, &[]);
    let frames = cut(&sheet, Grid::new(3, 1), Some(2), CutMode::Raw, &ClassifyOptions::default()).unwrap();

    write_frames(&frames, dir.path()).unwrap();
    let loaded = load_frames(dir.path()).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].name, "frame_000.png");
    assert_eq!((loaded[1].width(), loaded[1].height()), (40, 40));
}
