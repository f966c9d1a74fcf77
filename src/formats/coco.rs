//! COCO JSON export.
//!
//! Writes one `annotations.json` for the whole bundle. Mask geometry is
//! encoded as uncompressed column-major RLE (the `counts`/`size` form COCO
//! uses for crowd regions), which is exact for pixel masks and needs no
//! contour tracing.

use serde::Serialize;

use crate::mask::{mask_area, mask_extent, ColoredMask};

use super::{DatasetFormat, ExportBundle, ExportOptions, ExportResult, FormatError};

/// COCO dataset export format.
#[derive(Debug, Clone, Default)]
pub struct CocoFormat;

impl CocoFormat {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct CocoDataset {
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

#[derive(Serialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct CocoCategory {
    id: u32,
    name: String,
}

#[derive(Serialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u32,
    bbox: [f32; 4],
    area: f32,
    segmentation: CocoRle,
    iscrowd: u8,
}

#[derive(Serialize)]
struct CocoRle {
    counts: Vec<u32>,
    /// `[height, width]`, per the COCO convention.
    size: [u32; 2],
}

/// Column-major run lengths of a mask's membership, starting with the
/// background run (zero-length when the first pixel is a member).
fn rle_counts(mask: &ColoredMask) -> Vec<u32> {
    let mut counts = Vec::new();
    let mut current_member = false;
    let mut run = 0u32;

    for x in 0..mask.width() {
        for y in 0..mask.height() {
            let member = mask.get_pixel(x, y).0[3] > 0;
            if member == current_member {
                run += 1;
            } else {
                counts.push(run);
                current_member = member;
                run = 1;
            }
        }
    }
    counts.push(run);
    counts
}

impl DatasetFormat for CocoFormat {
    fn id(&self) -> &'static str {
        "coco"
    }

    fn display_name(&self) -> &'static str {
        "COCO"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn export(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        let mut result = ExportResult::new();

        let categories = bundle
            .classes
            .iter()
            .enumerate()
            .map(|(index, class)| CocoCategory {
                id: index as u32 + 1,
                name: class.name.clone(),
            })
            .collect();

        let mut images = Vec::new();
        let mut annotations = Vec::new();
        let mut next_annotation_id = 1u64;

        for (image_index, image) in bundle.images.iter().enumerate() {
            if options.skip_empty_images && image.masks.is_empty() {
                result.add_warning(format!("{}: no confirmed masks, skipped", image.file_name));
                continue;
            }

            let image_id = image_index as u64 + 1;
            images.push(CocoImage {
                id: image_id,
                file_name: image.file_name.clone(),
                width: image.width,
                height: image.height,
            });

            for confirmed in &image.masks {
                let category_id = bundle.class_index(&confirmed.class_name)? as u32 + 1;

                let Some((x, y, w, h)) = mask_extent(&confirmed.mask) else {
                    result.add_warning(format!(
                        "{}: empty '{}' mask skipped",
                        image.file_name, confirmed.class_name
                    ));
                    continue;
                };

                annotations.push(CocoAnnotation {
                    id: next_annotation_id,
                    image_id,
                    category_id,
                    bbox: [x as f32, y as f32, w as f32, h as f32],
                    area: mask_area(&confirmed.mask) as f32,
                    segmentation: CocoRle {
                        counts: rle_counts(&confirmed.mask),
                        size: [confirmed.mask.height(), confirmed.mask.width()],
                    },
                    iscrowd: 1,
                });
                next_annotation_id += 1;
            }
        }

        let dataset = CocoDataset {
            images,
            annotations,
            categories,
        };
        let json = if options.pretty_json {
            serde_json::to_string_pretty(&dataset)?
        } else {
            serde_json::to_string(&dataset)?
        };
        result.add_file("annotations.json", json.into_bytes());
        Ok(result)
    }
}
