//! Image loading for the session.
//!
//! Decodes raw image files into displayable RGBA buffers plus a persisted
//! data URL, ready to feed `SessionStore::load_image`. A file that fails to
//! decode is excluded and reported; the rest of the batch proceeds.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Errors while reading or decoding an image file.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// A decoded image plus its persisted data URL.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Filename of the source image.
    pub name: String,
    /// Decoded RGBA pixels.
    pub image: RgbaImage,
    /// `data:image/png;base64,...` form kept for the oracle and export
    /// boundaries.
    pub data_url: String,
}

/// Encode an image as a PNG data URL.
pub fn png_data_url(image: &RgbaImage, name: &str) -> Result<String, DecodeError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| DecodeError::Encode {
            name: name.to_string(),
            source,
        })?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
}

/// Decode an image from raw file bytes.
pub fn load_image_bytes(name: &str, bytes: &[u8]) -> Result<LoadedImage, DecodeError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| DecodeError::Decode {
            name: name.to_string(),
            source,
        })?
        .to_rgba8();

    let data_url = png_data_url(&image, name)?;
    log::debug!(
        "decoded '{}': {}x{}",
        name,
        image.width(),
        image.height()
    );

    Ok(LoadedImage {
        name: name.to_string(),
        image,
        data_url,
    })
}

/// Decode an image file from disk.
pub fn load_image_file(path: &Path) -> Result<LoadedImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_image_bytes(&name, &bytes)
}

/// Result of scanning a folder: the decodable images plus the failures.
#[derive(Debug, Default)]
pub struct FolderScan {
    pub images: Vec<LoadedImage>,
    pub failures: Vec<DecodeError>,
}

/// Load every supported image in a folder, sorted by filename.
///
/// Files that fail to decode land in `failures` and do not abort the scan;
/// only an unreadable folder is a hard error.
pub fn load_folder(folder: &Path) -> Result<FolderScan, DecodeError> {
    let entries = std::fs::read_dir(folder).map_err(|source| DecodeError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(is_image_file)
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut scan = FolderScan::default();
    for path in paths {
        match load_image_file(&path) {
            Ok(loaded) => scan.images.push(loaded),
            Err(e) => {
                log::warn!("skipping {:?}: {}", path, e);
                scan.failures.push(e);
            }
        }
    }

    log::info!(
        "scanned {:?}: {} images loaded, {} skipped",
        folder,
        scan.images.len(),
        scan.failures.len()
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::decode_data_url;
    use image::Rgba;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("photo.png"));
        assert!(is_image_file("PHOTO.JPG"));
        assert!(is_image_file("a/b/photo.webp"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("photo"));
    }

    #[test]
    fn test_load_image_bytes_round_trip() {
        let loaded = load_image_bytes("tiny.png", &png_bytes(5, 3)).unwrap();
        assert_eq!(loaded.name, "tiny.png");
        assert_eq!(loaded.image.dimensions(), (5, 3));
        assert!(loaded.data_url.starts_with("data:image/png;base64,"));

        // The data URL decodes back to the same pixels.
        let bytes = decode_data_url(&loaded.data_url).unwrap();
        let reloaded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(reloaded.as_raw(), loaded.image.as_raw());
    }

    #[test]
    fn test_undecodable_bytes() {
        let err = load_image_bytes("bad.png", b"not an image").unwrap_err();
        assert!(matches!(err, DecodeError::Decode { .. }));
    }

    #[test]
    fn test_load_folder_excludes_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_good.png"), png_bytes(4, 4)).unwrap();
        std::fs::write(dir.path().join("a_good.png"), png_bytes(2, 2)).unwrap();
        std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let scan = load_folder(dir.path()).unwrap();
        assert_eq!(scan.images.len(), 2);
        assert_eq!(scan.failures.len(), 1);
        // Sorted by filename.
        assert_eq!(scan.images[0].name, "a_good.png");
        assert_eq!(scan.images[1].name, "b_good.png");
    }

    #[test]
    fn test_missing_folder_is_a_hard_error() {
        let err = load_folder(Path::new("/nonexistent/seglab")).unwrap_err();
        assert!(matches!(err, DecodeError::Io { .. }));
    }
}
