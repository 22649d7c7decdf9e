//! Sprite sheet segmentation - cuts a grid layout into individual frames

use crate::classify::{classify, remove_background, ClassifyOptions};
use crate::frame::{frame_file_name, Frame};
use crate::grid::{detect_grid, Grid, GridOptions};
use image::{imageops, RgbaImage};
use log::{debug, info};
use thiserror::Error;

/// How each grid cell is turned into a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutMode {
    /// Emit the cell pixels unmodified
    Raw,
    /// Remove the background and crop to the character's bounding box
    #[default]
    ContentAware,
}

impl std::fmt::Display for CutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutMode::Raw => write!(f, "simple"),
            CutMode::ContentAware => write!(f, "content-aware"),
        }
    }
}

/// Error type for sprite sheet segmentation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Neither an explicit grid nor auto-detection was requested
    #[error("--cols and --rows are required when --auto-grid is not specified")]
    MissingGrid,
    /// Auto-detection found no divider structure
    #[error("could not detect a grid in the image; specify --cols and --rows explicitly")]
    GridNotDetected,
    /// A grid dimension is zero
    #[error("grid must have at least one column and one row, got {0}")]
    EmptyGrid(Grid),
    /// More frames requested than the grid holds
    #[error("count ({count}) exceeds grid cells ({cells})")]
    CountExceedsGrid { count: u32, cells: u32 },
    /// The cell count does not fit in a `u32`
    #[error("grid {0} has too many cells")]
    GridTooLarge(Grid),
    /// The sheet is smaller than one pixel per cell
    #[error("sheet {width}x{height} is too small for a {grid} grid")]
    SheetTooSmall { width: u32, height: u32, grid: Grid },
}

/// Pick the grid to cut with: auto-detected when requested, explicit otherwise.
pub fn resolve_grid(
    sheet: &RgbaImage,
    explicit: Option<Grid>,
    auto_grid: bool,
    options: &GridOptions,
) -> Result<Grid, SegmentError> {
    if auto_grid {
        let grid = detect_grid(sheet, options).ok_or(SegmentError::GridNotDetected)?;
        info!("Auto-detected grid: {}", grid);
        return Ok(grid);
    }
    explicit.ok_or(SegmentError::MissingGrid)
}

/// Cut a sprite sheet into frames in row-major order.
///
/// # Arguments
///
/// * `sheet` - The sprite sheet image (read only; cells are copied out)
/// * `grid` - Column/row layout of the sheet
/// * `count` - Number of frames to extract (default: every cell)
/// * `mode` - Raw cells or content-aware crops
/// * `options` - Classification settings for content-aware mode
///
/// # Returns
///
/// Exactly `count` frames named `frame_000.png`, `frame_001.png`, ...
/// A content-aware cell with no detected content becomes a fully transparent
/// frame of the cell's size, so the frame count is always preserved.
pub fn cut(
    sheet: &RgbaImage,
    grid: Grid,
    count: Option<u32>,
    mode: CutMode,
    options: &ClassifyOptions,
) -> Result<Vec<Frame>, SegmentError> {
    if grid.cols == 0 || grid.rows == 0 {
        return Err(SegmentError::EmptyGrid(grid));
    }

    let cells = grid.cells().ok_or(SegmentError::GridTooLarge(grid))?;
    let count = count.unwrap_or(cells);
    if count > cells {
        return Err(SegmentError::CountExceedsGrid { count, cells });
    }

    let (width, height) = sheet.dimensions();
    let cell_w = width / grid.cols;
    let cell_h = height / grid.rows;
    if cell_w == 0 || cell_h == 0 {
        return Err(SegmentError::SheetTooSmall { width, height, grid });
    }

    info!("Cutting {} frames ({}x{} cells, {} mode)", count, cell_w, cell_h, mode);

    let frames = (0..count)
        .map(|index| {
            let left = (index % grid.cols) * cell_w;
            let top = (index / grid.cols) * cell_h;
            let cell = imageops::crop_imm(sheet, left, top, cell_w, cell_h).to_image();
            let name = frame_file_name(index as usize);

            match mode {
                CutMode::Raw => Frame::new(name, cell),
                CutMode::ContentAware => extract_content(name, &cell, options),
            }
        })
        .collect();

    Ok(frames)
}

/// Background-remove a cell and crop it to its content.
fn extract_content(name: String, cell: &RgbaImage, options: &ClassifyOptions) -> Frame {
    let cleaned = remove_background(cell, options);
    match classify(&cleaned, options).bbox {
        Some(bbox) => {
            debug!("  {}: content_bbox={} content_size={}x{}", name, bbox, bbox.width(), bbox.height());
            let content =
                imageops::crop_imm(&cleaned, bbox.left, bbox.top, bbox.width(), bbox.height()).to_image();
            Frame::new(name, content)
        }
        None => {
            debug!("  {}: empty cell", name);
            Frame::transparent(name, cell.width(), cell.height())
        }
    }
}
