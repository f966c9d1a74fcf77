//! The segmentation oracle boundary.
//!
//! The oracle is the external service that turns an image plus labeled seed
//! points into candidate membership masks. This module defines the trait
//! seam, the wire format spoken by the reference service, a background
//! worker that keeps oracle calls off the interaction thread, and a
//! deterministic mock for tests.

mod mock;
mod wire;
mod worker;

pub use mock::MockOracle;
pub use wire::{
    decode_data_url, decode_response, encode_response, points_json, MaskPayload, PredictRequest,
    PredictResponse, WirePoint,
};
pub use worker::{OracleWorker, RefreshRequest, RefreshResult};

use thiserror::Error;

use crate::mask::RawMask;
use crate::model::SeedPoint;

/// Errors from the oracle transport or payload handling.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The service could not be reached or answered with a failure.
    /// Recoverable: the session keeps its points so the user can retry.
    #[error("segmentation service unavailable: {message}")]
    Unavailable { message: String },

    /// The service answered but produced no candidate masks.
    #[error("segmentation service returned no candidate masks")]
    EmptyResponse,

    /// A candidate mask payload could not be decoded or encoded as an image.
    #[error("candidate mask image error: {0}")]
    MaskDecode(#[from] image::ImageError),

    /// The response JSON did not match the wire contract.
    #[error("malformed oracle payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A base64 field in the payload was invalid.
    #[error("invalid base64 in oracle payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl OracleError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// A segmentation service that proposes masks for a prompted image.
///
/// Candidates are returned best first. Implementations never return an
/// empty list; they map that case to [`OracleError::EmptyResponse`].
/// Debouncing and staleness handling are the session store's job, not the
/// adapter's: the adapter may be called again for the same image while an
/// earlier call is still running.
pub trait SegmentationOracle: Send {
    fn request_mask(
        &self,
        image_png: &[u8],
        points: &[SeedPoint],
    ) -> Result<Vec<RawMask>, OracleError>;
}
