//! Deterministic mock oracle for tests.

use image::{GrayImage, Luma};

use crate::mask::RawMask;
use crate::model::{PointLabel, SeedPoint};

use super::{OracleError, SegmentationOracle};

/// A stand-in segmentation service.
///
/// Proposes rectangular masks spanning the positive seed points, inflated
/// by a margin that grows per candidate, so the first candidate is always
/// the tightest and highest-scored. Fully deterministic: the same image and
/// points always produce the same masks.
#[derive(Debug, Clone)]
pub struct MockOracle {
    candidates: usize,
    margin: u32,
    fail: bool,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            candidates: 1,
            margin: 4,
            fail: false,
        }
    }

    /// Return `count` candidates with decreasing scores.
    pub fn with_candidates(mut self, count: usize) -> Self {
        self.candidates = count.max(1);
        self
    }

    /// Make every request fail with [`OracleError::Unavailable`].
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn candidate(&self, width: u32, height: u32, points: &[SeedPoint], index: usize) -> RawMask {
        let positives: Vec<&SeedPoint> = points
            .iter()
            .filter(|p| p.label == PointLabel::Positive)
            .collect();
        // With no positive points, fall back to spanning everything placed.
        let anchor: Vec<&SeedPoint> = if positives.is_empty() {
            points.iter().collect()
        } else {
            positives
        };

        let margin = self.margin * (index as u32 + 1);
        let min_x = anchor.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = anchor.iter().map(|p| p.y).min().unwrap_or(0);
        let max_x = anchor.iter().map(|p| p.x).max().unwrap_or(0);
        let max_y = anchor.iter().map(|p| p.y).max().unwrap_or(0);

        let x0 = min_x.saturating_sub(margin);
        let y0 = min_y.saturating_sub(margin);
        let x1 = (max_x + margin).min(width.saturating_sub(1));
        let y1 = (max_y + margin).min(height.saturating_sub(1));

        let mut mask = GrayImage::new(width, height);
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        RawMask::new(mask, 0.95 - 0.1 * index as f32)
    }
}

impl SegmentationOracle for MockOracle {
    fn request_mask(
        &self,
        image_png: &[u8],
        points: &[SeedPoint],
    ) -> Result<Vec<RawMask>, OracleError> {
        if self.fail {
            return Err(OracleError::unavailable("mock oracle set to fail"));
        }

        let (width, height) = image::load_from_memory(image_png)?.to_luma8().dimensions();
        Ok((0..self.candidates)
            .map(|i| self.candidate(width, height, points, i))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::new(w, h)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_mock_is_deterministic() {
        let oracle = MockOracle::new();
        let png = png_bytes(32, 32);
        let points = [SeedPoint::positive(10, 10), SeedPoint::negative(30, 30)];

        let a = oracle.request_mask(&png, &points).unwrap();
        let b = oracle.request_mask(&png, &points).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        // The negative point does not anchor the rectangle.
        assert_eq!(a[0].mask.get_pixel(10, 10).0, [255]);
        assert_eq!(a[0].mask.get_pixel(30, 30).0, [0]);
    }

    #[test]
    fn test_candidates_are_ordered_best_first() {
        let oracle = MockOracle::new().with_candidates(3);
        let png = png_bytes(64, 64);
        let masks = oracle
            .request_mask(&png, &[SeedPoint::positive(32, 32)])
            .unwrap();

        assert_eq!(masks.len(), 3);
        assert!(masks[0].score > masks[1].score);
        assert!(masks[1].score > masks[2].score);
    }

    #[test]
    fn test_failing_mode() {
        let oracle = MockOracle::new().failing();
        let err = oracle
            .request_mask(&png_bytes(8, 8), &[SeedPoint::positive(1, 1)])
            .unwrap_err();
        assert!(matches!(err, OracleError::Unavailable { .. }));
    }
}
