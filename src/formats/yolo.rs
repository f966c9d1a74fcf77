//! YOLO export.
//!
//! Writes `classes.txt` (one class name per line, registry order) plus one
//! annotation file per image. Each confirmed mask contributes one line of
//! normalized center-based bounding box coordinates derived from the
//! mask's pixel extent:
//!
//! ```text
//! <class_index> <x_center> <y_center> <width> <height>
//! ```

use std::fmt::Write as _;

use crate::mask::mask_extent;

use super::{DatasetFormat, ExportBundle, ExportOptions, ExportResult, FormatError};

/// YOLO dataset export format.
#[derive(Debug, Clone, Default)]
pub struct YoloFormat;

impl YoloFormat {
    pub fn new() -> Self {
        Self
    }
}

/// Convert a pixel-extent bbox to normalized YOLO center coordinates.
fn bbox_to_yolo(
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    img_width: u32,
    img_height: u32,
) -> (f32, f32, f32, f32) {
    let x_center = (x as f32 + w as f32 / 2.0) / img_width as f32;
    let y_center = (y as f32 + h as f32 / 2.0) / img_height as f32;
    (
        x_center,
        y_center,
        w as f32 / img_width as f32,
        h as f32 / img_height as f32,
    )
}

impl DatasetFormat for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn export(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        let mut result = ExportResult::new();

        let classes_txt = bundle
            .classes
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        result.add_file("classes.txt", classes_txt.into_bytes());

        for image in &bundle.images {
            if options.skip_empty_images && image.masks.is_empty() {
                result.add_warning(format!("{}: no confirmed masks, skipped", image.file_name));
                continue;
            }

            let mut lines = String::new();
            for confirmed in &image.masks {
                let class_index = bundle.class_index(&confirmed.class_name)?;

                let Some((x, y, w, h)) = mask_extent(&confirmed.mask) else {
                    result.add_warning(format!(
                        "{}: empty '{}' mask skipped",
                        image.file_name, confirmed.class_name
                    ));
                    continue;
                };

                let (cx, cy, nw, nh) = bbox_to_yolo(x, y, w, h, image.width, image.height);
                let _ = writeln!(lines, "{} {:.6} {:.6} {:.6} {:.6}", class_index, cx, cy, nw, nh);
            }

            result.add_file(format!("{}.txt", image.base_name()), lines.into_bytes());
        }

        Ok(result)
    }
}
