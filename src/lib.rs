//! seglab - annotation session engine for semi-automatic segmentation
//! labeling.
//!
//! A user loads several images, places positive/negative seed points on
//! each, receives a candidate mask from an external segmentation oracle,
//! and accepts masks under class labels until every image carries a set of
//! labeled masks ready for export.
//!
//! The crate is the state engine behind that loop: the [`session`] store
//! tracks points, pending and confirmed masks per image; [`mask`] turns raw
//! oracle masks into colored overlays; [`render`] produces the ordered draw
//! list; [`oracle`] is the trait seam and background worker for the
//! external segmentation service; [`formats`] exports confirmed masks as
//! COCO/YOLO archives.

pub mod color_utils;
pub mod constants;
pub mod formats;
pub mod loader;
pub mod mask;
pub mod model;
pub mod oracle;
pub mod render;
pub mod session;
pub mod viewport;

pub use loader::{load_folder, load_image_bytes, load_image_file, DecodeError, LoadedImage};
pub use mask::{mask_area, mask_extent, recolor, recolor_rgba, ColoredMask, RawMask};
pub use model::{ClassDef, ClassRegistry, PointLabel, SeedPoint};
pub use oracle::{MockOracle, OracleError, OracleWorker, RefreshResult, SegmentationOracle};
pub use render::{compose, Frame, Layer};
pub use session::{
    ConfirmedMask, EntryPhase, ImageEntry, ImageId, MaskOutcome, RefreshTicket, SessionError,
    SessionStore,
};
pub use viewport::ViewportMapping;
