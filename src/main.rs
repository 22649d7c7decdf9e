//! spritealign - Command-line tool for turning character frames into animated stickers

use std::process::ExitCode;

use spritealign::cli;

fn main() -> ExitCode {
    cli::run()
}
