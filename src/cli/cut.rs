//! Cut command implementation

use std::path::Path;
use std::process::ExitCode;

use log::info;

use crate::config::Config;
use crate::grid::Grid;
use crate::output::{load_image, write_frames};
use crate::segment::{cut, resolve_grid, CutMode};

use super::{require_exists, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the cut command
pub fn run_cut(
    sheet_path: &Path,
    cols: Option<u32>,
    rows: Option<u32>,
    auto_grid: bool,
    count: Option<u32>,
    simple: bool,
    output: &Path,
    config: &Config,
) -> ExitCode {
    if let Err(code) = require_exists(sheet_path, "Sprite sheet") {
        return code;
    }

    let sheet = match load_image(sheet_path) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    info!("Sheet: {} ({}x{})", sheet_path.display(), sheet.width(), sheet.height());

    let explicit = match (cols, rows) {
        (Some(cols), Some(rows)) => Some(Grid::new(cols, rows)),
        (None, None) => None,
        _ => {
            eprintln!("Error: --cols and --rows must be given together");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let grid = match resolve_grid(&sheet, explicit, auto_grid, &config.grid_options()) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let mode = if simple { CutMode::Raw } else { CutMode::ContentAware };
    let frames = match cut(&sheet, grid, count, mode, &config.classify) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match write_frames(&frames, output) {
        Ok(paths) => {
            for path in &paths {
                println!("{}", path.display());
            }
            info!("Wrote {} frames to {}", paths.len(), output.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
