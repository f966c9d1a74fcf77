//! Shared constants for mask staging and frame composition.

/// Alpha value written into every member pixel of a colored mask.
/// Source mask opacity is treated as a boolean; the blend is always 50%.
pub const MASK_BLEND_ALPHA: u8 = 128;

/// Staging color for an unconfirmed candidate mask.
pub const PENDING_COLOR: [u8; 3] = [255, 0, 0];

/// Alpha scale applied to the highlighted confirmed mask when composing.
pub const HIGHLIGHT_ALPHA_SCALE: f32 = 0.9;

/// Alpha scale applied to non-highlighted confirmed masks when composing.
pub const CONFIRMED_ALPHA_SCALE: f32 = 0.5;

/// Alpha scale applied to the pending mask (full stored alpha).
pub const PENDING_ALPHA_SCALE: f32 = 1.0;

/// Marker color for positive seed points.
pub const POSITIVE_MARKER_COLOR: [u8; 3] = [0, 255, 0];

/// Marker color for negative seed points.
pub const NEGATIVE_MARKER_COLOR: [u8; 3] = [255, 0, 0];

/// Radius of a seed point marker, in image pixels.
pub const MARKER_RADIUS: f32 = 5.0;
