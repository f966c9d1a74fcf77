//! Wire format for the segmentation service.
//!
//! The reference service accepts the image as encoded bytes plus a JSON
//! list of labeled points, and answers with base64-encoded single-channel
//! PNG masks, each carrying a confidence score. Candidates are ordered by
//! score, best first.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::mask::RawMask;
use crate::model::{PointLabel, SeedPoint};

use super::OracleError;

/// A labeled point as the service expects it: label 1 = positive, 0 = negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: u32,
    pub y: u32,
    pub label: u8,
}

impl From<&SeedPoint> for WirePoint {
    fn from(point: &SeedPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            label: point.label.to_wire(),
        }
    }
}

impl From<&WirePoint> for SeedPoint {
    fn from(point: &WirePoint) -> Self {
        SeedPoint::new(point.x, point.y, PointLabel::from_wire(point.label))
    }
}

/// Request body: the point list replayed in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub points: Vec<WirePoint>,
}

/// One candidate mask: a base64 single-channel PNG plus its confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskPayload {
    pub mask_b64: String,
    pub score: f32,
}

/// Response body: candidate masks, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub masks: Vec<MaskPayload>,
}

/// Serialize a point list to the `points_json` form the service consumes.
pub fn points_json(points: &[SeedPoint]) -> Result<String, OracleError> {
    let request = PredictRequest {
        points: points.iter().map(WirePoint::from).collect(),
    };
    Ok(serde_json::to_string(&request)?)
}

/// Parse a response body into raw masks, sorted by score descending.
///
/// An empty candidate list is an error: the session never stages "nothing"
/// as a pending mask.
pub fn decode_response(json: &str) -> Result<Vec<RawMask>, OracleError> {
    let response: PredictResponse = serde_json::from_str(json)?;
    if response.masks.is_empty() {
        return Err(OracleError::EmptyResponse);
    }

    let mut masks = Vec::with_capacity(response.masks.len());
    for payload in &response.masks {
        let bytes = BASE64.decode(&payload.mask_b64)?;
        let mask = image::load_from_memory(&bytes)?.to_luma8();
        masks.push(RawMask::new(mask, payload.score));
    }

    masks.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(masks)
}

/// Encode raw masks as a response body. Mainly for tests and service stubs.
pub fn encode_response(masks: &[RawMask]) -> Result<String, OracleError> {
    let mut payloads = Vec::with_capacity(masks.len());
    for raw in masks {
        let mut bytes = Vec::new();
        raw.mask
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        payloads.push(MaskPayload {
            mask_b64: BASE64.encode(&bytes),
            score: raw.score,
        });
    }
    Ok(serde_json::to_string(&PredictResponse { masks: payloads })?)
}

/// Extract the raw bytes from a `data:image/...;base64,` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, OracleError> {
    let payload = match url.split_once(',') {
        Some((_, payload)) => payload,
        None => url,
    };
    Ok(BASE64.decode(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn dot_mask(score: f32) -> RawMask {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([255]));
        RawMask::new(mask, score)
    }

    #[test]
    fn test_points_json_matches_wire_contract() {
        let points = vec![SeedPoint::positive(3, 7), SeedPoint::negative(9, 2)];
        let json = points_json(&points).unwrap();
        assert_eq!(
            json,
            r#"{"points":[{"x":3,"y":7,"label":1},{"x":9,"y":2,"label":0}]}"#
        );
    }

    #[test]
    fn test_response_round_trip_sorts_by_score() {
        let encoded = encode_response(&[dot_mask(0.2), dot_mask(0.8)]).unwrap();
        let decoded = decode_response(&encoded).unwrap();

        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].score > decoded[1].score);
        assert_eq!(decoded[0].mask.get_pixel(1, 1).0, [255]);
    }

    #[test]
    fn test_empty_response_is_an_error() {
        let err = decode_response(r#"{"masks":[]}"#).unwrap_err();
        assert!(matches!(err, OracleError::EmptyResponse));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            decode_response("not json").unwrap_err(),
            OracleError::Payload(_)
        ));
        let err = decode_response(r#"{"masks":[{"mask_b64":"!!!","score":1.0}]}"#).unwrap_err();
        assert!(matches!(err, OracleError::Base64(_)));
    }

    #[test]
    fn test_decode_data_url_strips_prefix() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        // A bare base64 string is accepted too.
        assert_eq!(decode_data_url("aGVsbG8=").unwrap(), b"hello");
    }
}
