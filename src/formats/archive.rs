//! Zip bundling of an export.
//!
//! The archive carries the chosen format's annotation files plus one PNG
//! per confirmed mask, laid out as:
//!
//! ```text
//! annotations/<format files>
//! masks/<image base>_<index>_<class>.png
//! ```

use std::io::{Cursor, Write as _};

use image::ImageFormat;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{DatasetFormat, ExportBundle, ExportOptions, FormatError};

/// Export a bundle with the given format and wrap everything in a zip.
/// Returns the archive bytes.
pub fn write_archive(
    bundle: &ExportBundle,
    format: &dyn DatasetFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, FormatError> {
    let result = format.export(bundle, options)?;
    for warning in &result.warnings {
        log::warn!("export: {}", warning);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default();

    // Deterministic archive layout: sort the format's files by name.
    let mut names: Vec<&String> = result.files.keys().collect();
    names.sort();
    for name in names {
        zip.start_file(format!("annotations/{}", name), file_options)?;
        zip.write_all(&result.files[name])?;
    }

    for image in &bundle.images {
        for (index, confirmed) in image.masks.iter().enumerate() {
            let mut png = Vec::new();
            confirmed
                .mask
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

            let name = format!(
                "masks/{}_{:02}_{}.png",
                image.base_name(),
                index,
                confirmed.class_name
            );
            zip.start_file(name, file_options)?;
            zip.write_all(&png)?;
        }
    }

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    log::info!(
        "wrote archive: {} images, {} bytes",
        bundle.images.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MASK_BLEND_ALPHA;
    use crate::formats::{CocoFormat, ExportImage};
    use crate::model::ClassDef;
    use crate::session::ConfirmedMask;
    use image::{Rgba, RgbaImage};
    use zip::ZipArchive;

    fn test_bundle() -> ExportBundle {
        let mut mask = RgbaImage::new(4, 4);
        mask.put_pixel(1, 1, Rgba([0, 0, 255, MASK_BLEND_ALPHA]));

        ExportBundle {
            images: vec![ExportImage {
                file_name: "shot.png".to_string(),
                width: 4,
                height: 4,
                data_url: String::new(),
                masks: vec![ConfirmedMask {
                    mask,
                    class_name: "cat".to_string(),
                    class_color: [0, 0, 255],
                }],
            }],
            classes: vec![ClassDef::new("cat", [0, 0, 255])],
        }
    }

    #[test]
    fn test_archive_layout() {
        let bytes = write_archive(
            &test_bundle(),
            &CocoFormat::new(),
            &ExportOptions::new(),
        )
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert!(names.contains(&"annotations/annotations.json".to_string()));
        assert!(names.contains(&"masks/shot_00_cat.png".to_string()));
    }

    #[test]
    fn test_mask_png_round_trips() {
        let bundle = test_bundle();
        let bytes = write_archive(&bundle, &CocoFormat::new(), &ExportOptions::new()).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("masks/shot_00_cat.png").unwrap();
        let mut png = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut png).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), bundle.images[0].masks[0].mask.as_raw());
    }
}
