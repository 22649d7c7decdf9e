//! Frame directories and PNG file output

use crate::frame::Frame;
use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// An input image could not be opened or decoded
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Directory holds no PNG frames
    #[error("no PNG files found in {0}")]
    NoFrames(PathBuf),
    #[error("invalid path pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save an RGBA image to a PNG file.
///
/// # Arguments
///
/// * `image` - The image to save
/// * `path` - The output file path (parent directories are created)
///
/// # Returns
///
/// * `Ok(())` on success
/// * `Err(OutputError)` on failure
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Write already-encoded bytes to `path`, creating parent directories.
pub fn write_bytes(bytes: &[u8], path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Open an image file as RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, OutputError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| OutputError::Load { path: path.to_path_buf(), source })
}

/// All `*.png` files directly inside `dir`, sorted by file name.
///
/// Sorting by name makes zero-padded frame names play in sequence order.
pub fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    let escaped = glob::Pattern::escape(&dir.display().to_string());
    let pattern = format!("{}/*.png", escaped);

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
        return Err(OutputError::NoFrames(dir.to_path_buf()));
    }
    Ok(files)
}

/// Load every frame in a directory, named after its file.
pub fn load_frames(dir: &Path) -> Result<Vec<Frame>, OutputError> {
    list_frame_files(dir)?
        .iter()
        .map(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            Ok(Frame::new(name, load_image(path)?))
        })
        .collect()
}

/// Write frames into `dir` under their own names, creating `dir` if needed.
///
/// # Returns
///
/// The written paths, in frame order.
pub fn write_frames(frames: &[Frame], dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    std::fs::create_dir_all(dir)?;
    frames
        .iter()
        .map(|frame| {
            let path = dir.join(&frame.name);
            save_png(&frame.image, &path)?;
            Ok(path)
        })
        .collect()
}
