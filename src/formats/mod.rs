//! Dataset export from confirmed masks.
//!
//! The session's confirmed masks can be exported to annotation formats
//! commonly used for segmentation training sets:
//!
//! - **COCO**: single JSON for the whole dataset, mask geometry as
//!   uncompressed RLE
//! - **YOLO**: `classes.txt` plus one `.txt` per image with normalized
//!   bounding boxes derived from each mask's extent
//!
//! Formats implement the [`DatasetFormat`] trait and produce in-memory
//! files; [`write_archive`] bundles them, together with the mask PNGs,
//! into a zip. File I/O beyond that is the caller's business.

mod archive;
mod coco;
mod yolo;

pub use archive::write_archive;
pub use coco::CocoFormat;
pub use yolo::YoloFormat;

use std::collections::HashMap;

use thiserror::Error;

use crate::model::ClassDef;
use crate::session::{ConfirmedMask, SessionStore};

/// Errors during dataset export.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("mask references unregistered class '{name}'")]
    UnknownClass { name: String },
}

/// One image staged for export.
#[derive(Debug, Clone)]
pub struct ExportImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Persisted data URL of the source image.
    pub data_url: String,
    /// Confirmed masks in confirm order.
    pub masks: Vec<ConfirmedMask>,
}

impl ExportImage {
    /// Base name (without extension) used for per-image output files.
    pub fn base_name(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(&self.file_name)
    }
}

/// Everything a format needs: the images plus the class list whose order
/// defines category ids.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub images: Vec<ExportImage>,
    pub classes: Vec<ClassDef>,
}

impl ExportBundle {
    /// Snapshot a session into an export bundle.
    ///
    /// Entries are named `img_{id:04}.png`; callers with real filenames can
    /// rename before exporting.
    pub fn from_store(store: &SessionStore) -> Self {
        let images = store
            .entries()
            .iter()
            .map(|entry| ExportImage {
                file_name: format!("img_{:04}.png", entry.id()),
                width: entry.width(),
                height: entry.height(),
                data_url: entry.data_url().to_string(),
                masks: entry.confirmed().to_vec(),
            })
            .collect();
        let classes = store.classes().iter().cloned().collect();
        Self { images, classes }
    }

    /// Registry index of a class name, as formats assign category ids.
    pub fn class_index(&self, name: &str) -> Result<usize, FormatError> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| FormatError::UnknownClass {
                name: name.to_string(),
            })
    }
}

/// Options for export operations.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Skip images that have no confirmed masks.
    pub skip_empty_images: bool,
    /// Pretty-print JSON output.
    pub pretty_json: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            skip_empty_images: false,
            pretty_json: true,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_empty_images(mut self, skip: bool) -> Self {
        self.skip_empty_images = skip;
        self
    }

    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }
}

/// Result of exporting a bundle: filename → content, plus warnings for
/// anything skipped.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub files: HashMap<String, Vec<u8>>,
    pub warnings: Vec<String>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A dataset annotation format.
pub trait DatasetFormat: Send + Sync {
    /// Unique identifier (e.g. "coco", "yolo").
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// File extensions this format writes.
    fn extensions(&self) -> &[&'static str];

    /// Export a bundle to the format's output files.
    fn export(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError>;
}

/// All available format ids.
pub fn available_formats() -> Vec<&'static str> {
    vec!["coco", "yolo"]
}

/// Create a format by id.
pub fn format_by_id(id: &str) -> Option<Box<dyn DatasetFormat>> {
    match id.to_lowercase().as_str() {
        "coco" => Some(Box::new(CocoFormat::new())),
        "yolo" => Some(Box::new(YoloFormat::new())),
        _ => None,
    }
}
