//! Validate command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::apng::{probe, PngInfo};
use crate::config::Config;
use crate::validate::{validate_file, ValidationReport};

use super::{require_exists, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the validate command
///
/// The report is informational: a readable file always exits 0, even when
/// checks fail.
pub fn run_validate(file: &Path, json: bool, config: &Config) -> ExitCode {
    if let Err(code) = require_exists(file, "File") {
        return code;
    }

    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", file.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let info = match probe(bytes.as_slice()) {
        Ok(info) => info,
        Err(e) => {
            eprintln!("Error: {}: {}", file.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let report = validate_file(&info, bytes.len() as u64, &config.limits.animated, &config.limits.still);

    if json {
        match serde_json::to_string_pretty(&json_report(file, &info, &report)) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("{}", describe(file, &info));
        print!("{}", report);
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// One-line summary of what was read from the file.
fn describe(file: &Path, info: &PngInfo) -> String {
    if info.animated {
        let plays = match info.loop_count {
            Some(0) | None => "loops forever".to_string(),
            Some(n) => format!("plays {}x", n),
        };
        format!(
            "{}: {}x{} APNG, {} frames, {}ms, {}",
            file.display(),
            info.width,
            info.height,
            info.frame_count,
            info.total_duration_ms,
            plays
        )
    } else {
        format!(
            "{}: {}x{} PNG, {}",
            file.display(),
            info.width,
            info.height,
            if info.has_alpha { "with alpha" } else { "no alpha" }
        )
    }
}

fn json_report(file: &Path, info: &PngInfo, report: &ValidationReport) -> serde_json::Value {
    serde_json::json!({
        "file": file.display().to_string(),
        "width": info.width,
        "height": info.height,
        "animated": info.animated,
        "frames": info.frame_count,
        "loop_count": info.loop_count,
        "duration_ms": info.total_duration_ms,
        "has_alpha": info.has_alpha,
        "report": report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(animated: bool) -> PngInfo {
        PngInfo {
            width: 320,
            height: 270,
            has_alpha: true,
            animated,
            frame_count: if animated { 8 } else { 1 },
            loop_count: animated.then_some(0),
            total_duration_ms: if animated { 504 } else { 0 },
        }
    }

    #[test]
    fn test_describe_animated() {
        let line = describe(Path::new("out.apng"), &info(true));
        assert_eq!(line, "out.apng: 320x270 APNG, 8 frames, 504ms, loops forever");
    }

    #[test]
    fn test_describe_still() {
        let line = describe(Path::new("s.png"), &info(false));
        assert_eq!(line, "s.png: 320x270 PNG, with alpha");
    }

    #[test]
    fn test_json_report_shape() {
        let still = info(false);
        let report = validate_file(&still, 2048, &Default::default(), &Default::default());
        let value = json_report(Path::new("s.png"), &still, &report);
        assert_eq!(value["animated"], false);
        assert_eq!(value["report"]["kind"], "static");
        assert_eq!(value["report"]["passed"], true);
    }
}
