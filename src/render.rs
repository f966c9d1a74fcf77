//! Frame composition for an image entry.
//!
//! Produces an ordered draw list from annotation state. Pure and
//! side-effect-free: composing the same entry twice yields an identical
//! frame, so callers may re-render freely.

use image::RgbaImage;

use crate::constants::{
    CONFIRMED_ALPHA_SCALE, HIGHLIGHT_ALPHA_SCALE, MARKER_RADIUS, NEGATIVE_MARKER_COLOR,
    PENDING_ALPHA_SCALE, POSITIVE_MARKER_COLOR,
};
use crate::mask::ColoredMask;
use crate::model::PointLabel;
use crate::session::ImageEntry;

/// One element of the draw list, bottom-most first.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer<'a> {
    /// The decoded base image.
    Base { image: &'a RgbaImage },
    /// A mask overlay. `alpha_scale` multiplies the mask's stored alpha at
    /// draw time; the stored pixels are not modified.
    Mask {
        image: &'a ColoredMask,
        alpha_scale: f32,
    },
    /// A filled seed point marker.
    Marker {
        x: u32,
        y: u32,
        color: [u8; 3],
        radius: f32,
    },
}

/// An ordered draw list for one image entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame<'a> {
    layers: Vec<Layer<'a>>,
}

impl<'a> Frame<'a> {
    pub fn layers(&self) -> &[Layer<'a>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Compose the draw list for an entry.
///
/// Order is fixed: base image, confirmed masks in confirm order (the
/// highlighted one emphasized), the pending mask at full stored alpha, then
/// point markers so they are never occluded.
pub fn compose(entry: &ImageEntry) -> Frame<'_> {
    let mut layers = Vec::with_capacity(2 + entry.confirmed().len() + entry.points().len());

    layers.push(Layer::Base {
        image: entry.image(),
    });

    for (index, confirmed) in entry.confirmed().iter().enumerate() {
        let alpha_scale = if entry.highlighted() == Some(index) {
            HIGHLIGHT_ALPHA_SCALE
        } else {
            CONFIRMED_ALPHA_SCALE
        };
        layers.push(Layer::Mask {
            image: &confirmed.mask,
            alpha_scale,
        });
    }

    if let Some(pending) = entry.pending() {
        layers.push(Layer::Mask {
            image: pending,
            alpha_scale: PENDING_ALPHA_SCALE,
        });
    }

    for point in entry.points() {
        let color = match point.label {
            PointLabel::Positive => POSITIVE_MARKER_COLOR,
            PointLabel::Negative => NEGATIVE_MARKER_COLOR,
        };
        layers.push(Layer::Marker {
            x: point.x,
            y: point.y,
            color,
            radius: MARKER_RADIUS,
        });
    }

    Frame { layers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::RawMask;
    use crate::model::SeedPoint;
    use crate::session::SessionStore;
    use image::{GrayImage, Luma, RgbaImage};

    fn full_candidate(w: u32, h: u32) -> RawMask {
        RawMask::new(GrayImage::from_pixel(w, h, Luma([255])), 0.9)
    }

    fn confirm_one(store: &mut SessionStore, id: crate::session::ImageId, class: &str) {
        let ticket = store.add_point(id, SeedPoint::positive(2, 2)).unwrap();
        store
            .apply_mask_response(ticket, &[full_candidate(8, 8)])
            .unwrap();
        store.confirm_mask(id, class).unwrap();
    }

    #[test]
    fn test_empty_entry_composes_base_only() {
        let mut store = SessionStore::new();
        let id = store.load_image(RgbaImage::new(8, 8), String::new());

        let frame = compose(store.entry(id).unwrap());
        assert_eq!(frame.len(), 1);
        assert!(matches!(frame.layers()[0], Layer::Base { .. }));
    }

    #[test]
    fn test_draw_order_and_alpha_scales() {
        let mut store = SessionStore::new();
        store.add_class_with_color("cat", [0, 0, 255]).unwrap();
        let id = store.load_image(RgbaImage::new(8, 8), String::new());

        confirm_one(&mut store, id, "cat");
        confirm_one(&mut store, id, "cat");
        store.toggle_highlight(id, 0).unwrap();

        // Stage a pending mask for a three-point prompt.
        store.add_point(id, SeedPoint::positive(1, 1)).unwrap();
        store.add_point(id, SeedPoint::negative(6, 6)).unwrap();
        let ticket = store.add_point(id, SeedPoint::positive(3, 3)).unwrap();
        store
            .apply_mask_response(ticket, &[full_candidate(8, 8)])
            .unwrap();

        let frame = compose(store.entry(id).unwrap());
        let layers = frame.layers();
        assert_eq!(layers.len(), 1 + 2 + 1 + 3);

        assert!(matches!(layers[0], Layer::Base { .. }));
        assert!(matches!(
            layers[1],
            Layer::Mask { alpha_scale, .. } if alpha_scale == HIGHLIGHT_ALPHA_SCALE
        ));
        assert!(matches!(
            layers[2],
            Layer::Mask { alpha_scale, .. } if alpha_scale == CONFIRMED_ALPHA_SCALE
        ));
        assert!(matches!(
            layers[3],
            Layer::Mask { alpha_scale, .. } if alpha_scale == PENDING_ALPHA_SCALE
        ));

        // Markers come last, colored by label, in insertion order.
        assert!(matches!(
            layers[4],
            Layer::Marker { x: 1, y: 1, color, .. } if color == POSITIVE_MARKER_COLOR
        ));
        assert!(matches!(
            layers[5],
            Layer::Marker { x: 6, y: 6, color, .. } if color == NEGATIVE_MARKER_COLOR
        ));
        assert!(matches!(
            layers[6],
            Layer::Marker { x: 3, y: 3, color, .. } if color == POSITIVE_MARKER_COLOR
        ));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let mut store = SessionStore::new();
        store.add_class("cat").unwrap();
        let id = store.load_image(RgbaImage::new(8, 8), String::new());
        confirm_one(&mut store, id, "cat");
        store.add_point(id, SeedPoint::positive(4, 4)).unwrap();

        let entry = store.entry(id).unwrap();
        assert_eq!(compose(entry), compose(entry));
    }

    #[test]
    fn test_pending_layer_absent_without_mask() {
        let mut store = SessionStore::new();
        let id = store.load_image(RgbaImage::new(8, 8), String::new());
        store.add_point(id, SeedPoint::positive(4, 4)).unwrap();

        let frame = compose(store.entry(id).unwrap());
        assert!(
            !frame
                .layers()
                .iter()
                .any(|l| matches!(l, Layer::Mask { .. }))
        );
        assert_eq!(frame.len(), 2);
    }
}
