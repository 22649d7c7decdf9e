//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod align;
mod combine;
mod cut;
mod sticker;
mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::canvas::VerticalAnchor;
use crate::color::parse_color;
use crate::config::{load_config, merge_cli_overrides, CliOverrides, Config};
use image::Rgba;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// spritealign - Cut, align and retime character frames into animated PNG stickers
#[derive(Parser)]
#[command(name = "spritealign")]
#[command(about = "Cut sprite sheets, align character frames and assemble loop-ready APNG stickers")]
#[command(version)]
pub struct Cli {
    /// Config file (default: nearest spritealign.toml, then the XDG config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show per-frame detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut a sprite sheet into individual frames
    Cut {
        /// Sprite sheet image
        sheet: PathBuf,

        /// Number of columns
        #[arg(long)]
        cols: Option<u32>,

        /// Number of rows
        #[arg(long)]
        rows: Option<u32>,

        /// Detect columns and rows from the sheet's divider bands
        #[arg(long, conflicts_with_all = ["cols", "rows"])]
        auto_grid: bool,

        /// Number of frames to extract (default: every cell)
        #[arg(long)]
        count: Option<u32>,

        /// Emit raw cells instead of background-removed, content-cropped frames
        #[arg(long)]
        simple: bool,

        /// Output directory
        #[arg(short, long, default_value = "./frames")]
        output: PathBuf,
    },

    /// Align frames onto a common canvas so the character stays steady
    Align {
        /// Directory of PNG frames, played in file-name order
        frames_dir: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./aligned")]
        output: PathBuf,

        /// Canvas width (default: largest content width x padding)
        #[arg(long)]
        width: Option<u32>,

        /// Canvas height (default: largest content height x padding)
        #[arg(long)]
        height: Option<u32>,

        /// Vertical reference the anchor is aligned to
        #[arg(long, value_enum, default_value_t = VerticalAnchor::Center)]
        anchor: VerticalAnchor,

        /// Remove this background color instead of auto-detecting (bare flag: config color)
        #[arg(long, value_name = "COLOR", num_args = 0..=1, require_equals = true)]
        chroma_key: Option<Option<String>>,

        /// Max channel distance for chroma keying
        #[arg(long)]
        chroma_tolerance: Option<u8>,

        /// Feather radius for generated alpha edges
        #[arg(long, value_name = "RADIUS")]
        edge_feather: Option<f32>,

        /// JSON file of precomputed anchors keyed by frame file name
        #[arg(long, value_name = "JSON")]
        anchor_file: Option<PathBuf>,

        /// Use alpha-density anchors (center of mass, head and feet rows)
        #[arg(long)]
        pixel_align: bool,

        /// Directory of captured vision responses, one <frame>.json per frame
        #[arg(long, value_name = "DIR")]
        vision_hints: Option<PathBuf>,
    },

    /// Assemble frames into an animated PNG
    Combine {
        /// Directory of PNG frames, played in file-name order
        frames_dir: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "./sticker.apng")]
        output: PathBuf,

        /// Frames per second used to derive the total duration
        #[arg(long, conflicts_with = "duration")]
        fps: Option<f64>,

        /// Total duration in milliseconds
        #[arg(long, value_name = "MS")]
        duration: Option<u32>,

        /// Number of plays, 0 = infinite
        #[arg(long = "loop", value_name = "N")]
        loop_count: Option<u32>,

        /// Timing curve (uniform, ease-in, ease-out, ease-in-out, bounce) or comma-separated ms list
        #[arg(long, default_value = "uniform")]
        timing: String,

        /// Reduce each frame's palette before encoding
        #[arg(long)]
        quantize: bool,

        /// Shrink and re-encode while the file exceeds the size limit
        #[arg(long)]
        auto_resize: bool,

        /// Print the validation report as JSON
        #[arg(long)]
        report_json: bool,
    },

    /// Finish a single still image as a static sticker
    Sticker {
        /// Input image
        image: PathBuf,

        /// Output PNG file
        #[arg(short, long, default_value = "./sticker.png")]
        output: PathBuf,

        /// Remove this background color (bare flag: config color)
        #[arg(long, value_name = "COLOR", num_args = 0..=1, require_equals = true, conflicts_with = "remove_bg")]
        chroma_key: Option<Option<String>>,

        /// Remove an auto-detected solid background
        #[arg(long)]
        remove_bg: bool,

        /// Downsize to the static sticker limits when larger
        #[arg(long)]
        fit: bool,
    },

    /// Check an existing PNG or APNG against sticker limits
    Validate {
        /// File to inspect
        file: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    dispatch(cli.command, config)
}

/// Install the logger; `RUST_LOG` still takes precedence over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(level));
}

fn dispatch(command: Commands, mut config: Config) -> ExitCode {
    match command {
        Commands::Cut { sheet, cols, rows, auto_grid, count, simple, output } => {
            cut::run_cut(&sheet, cols, rows, auto_grid, count, simple, &output, &config)
        }
        Commands::Align {
            frames_dir,
            output,
            width,
            height,
            anchor,
            chroma_key,
            chroma_tolerance,
            edge_feather,
            anchor_file,
            pixel_align,
            vision_hints,
        } => {
            let overrides = CliOverrides {
                chroma_color: chroma_key.clone().flatten(),
                chroma_tolerance,
                feather_radius: edge_feather,
                ..Default::default()
            };
            merge_cli_overrides(&mut config, &overrides);
            align::run_align(
                &frames_dir,
                &output,
                width,
                height,
                anchor,
                chroma_key.is_some(),
                anchor_file.as_deref(),
                pixel_align,
                vision_hints.as_deref(),
                &config,
            )
        }
        Commands::Combine {
            frames_dir,
            output,
            fps,
            duration,
            loop_count,
            timing,
            quantize,
            auto_resize,
            report_json,
        } => {
            let overrides = CliOverrides { fps, loop_count, ..Default::default() };
            merge_cli_overrides(&mut config, &overrides);
            combine::run_combine(
                &frames_dir,
                &output,
                duration,
                &timing,
                quantize,
                auto_resize,
                report_json,
                &config,
            )
        }
        Commands::Sticker { image, output, chroma_key, remove_bg, fit } => {
            let overrides = CliOverrides { chroma_color: chroma_key.clone().flatten(), ..Default::default() };
            merge_cli_overrides(&mut config, &overrides);
            sticker::run_sticker(&image, &output, chroma_key.is_some(), remove_bg, fit, &config)
        }
        Commands::Validate { file, json } => validate::run_validate(&file, json, &config),
    }
}

/// Parse the configured chroma key color.
pub(crate) fn chroma_color(config: &Config) -> Result<Rgba<u8>, ExitCode> {
    parse_color(&config.chroma.color).map_err(|e| {
        eprintln!("Error: invalid chroma key color '{}': {}", config.chroma.color, e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Reject a missing input path before any work is done.
pub(crate) fn require_exists(path: &Path, what: &str) -> Result<(), ExitCode> {
    if path.exists() {
        Ok(())
    } else {
        eprintln!("Error: {} not found: {}", what, path.display());
        Err(ExitCode::from(EXIT_INVALID_ARGS))
    }
}
