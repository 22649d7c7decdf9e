//! Precomputed anchor mappings loaded from JSON

use super::chain::{AnchorStrategy, FrameContext, StrategyMiss};
use super::{AnchorPoint, AnchorSource};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for anchor file loading
#[derive(Debug, Error)]
pub enum AnchorFileError {
    /// File could not be read
    #[error("failed to read anchor file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File content is not a valid anchor mapping
    #[error("invalid anchor file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Mapping from frame file name to an anchor in original frame coordinates.
///
/// ```json
/// {
///   "frame_000.png": {"center_x": 120, "center_y": 140, "feet_y": 230, "head_y": 40},
///   "frame_001.png": {"center_x": 118, "center_y": 141, "feet_y": 231, "head_y": 42}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorFile {
    entries: HashMap<String, AnchorPoint>,
}

impl AnchorFile {
    /// Load a mapping from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AnchorFileError> {
        let text = fs::read_to_string(path)
            .map_err(|source| AnchorFileError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    /// Parse a mapping from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, AnchorFileError> {
        let entries: HashMap<String, AnchorPoint> = serde_json::from_str(text)?;
        Ok(Self { entries })
    }

    pub fn get(&self, frame_name: &str) -> Option<&AnchorPoint> {
        self.entries.get(frame_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, AnchorPoint)> for AnchorFile {
    fn from_iter<I: IntoIterator<Item = (String, AnchorPoint)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl AnchorStrategy for AnchorFile {
    fn source(&self) -> AnchorSource {
        AnchorSource::PrecomputedFile
    }

    fn resolve(&self, ctx: &FrameContext<'_>) -> Result<AnchorPoint, StrategyMiss> {
        self.get(&ctx.frame.name).copied().ok_or_else(|| StrategyMiss::NotInFile(ctx.frame.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ContentBBox;
    use crate::frame::Frame;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "frame_000.png": {"center_x": 120, "center_y": 140, "feet_y": 230, "head_y": 40},
        "frame_002.png": {"center_x": 50.5, "center_y": 60, "feet_y": 90, "head_y": 10}
    }"#;

    #[test]
    fn test_parse_integer_and_float_coordinates() {
        let file = AnchorFile::from_json_str(SAMPLE).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.get("frame_000.png"), Some(&AnchorPoint::new(120.0, 140.0, 230.0, 40.0)));
        assert_eq!(file.get("frame_002.png").map(|a| a.center_x), Some(50.5));
        assert!(file.get("frame_001.png").is_none());
    }

    #[test]
    fn test_missing_field_is_error() {
        let result = AnchorFile::from_json_str(r#"{"frame_000.png": {"center_x": 1}}"#);
        assert!(matches!(result, Err(AnchorFileError::Parse(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(SAMPLE.as_bytes()).unwrap();
        let file = AnchorFile::load(tmp.path()).unwrap();
        assert_eq!(file.len(), 2);

        let missing = AnchorFile::load(Path::new("/nonexistent/anchors.json"));
        assert!(matches!(missing, Err(AnchorFileError::Io { .. })));
    }

    #[test]
    fn test_strategy_uses_entry_verbatim() {
        let file = AnchorFile::from_json_str(SAMPLE).unwrap();
        let frame = Frame::transparent("frame_000.png", 300, 300);
        let bbox = ContentBBox::new(10, 10, 20, 20).unwrap();
        let ctx = FrameContext { frame: &frame, bbox };
        assert_eq!(file.resolve(&ctx).unwrap(), AnchorPoint::new(120.0, 140.0, 230.0, 40.0));

        let other = Frame::transparent("frame_001.png", 300, 300);
        let ctx = FrameContext { frame: &other, bbox };
        assert!(matches!(file.resolve(&ctx), Err(StrategyMiss::NotInFile(name)) if name == "frame_001.png"));
    }
}
