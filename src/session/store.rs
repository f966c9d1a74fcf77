//! The central annotation session store.
//!
//! One [`ImageEntry`] per loaded image, a shared class registry, and the
//! named operations the edit loop is built from. All mutation happens on
//! the caller's thread; the segmentation oracle is the only asynchronous
//! boundary, and its responses re-enter the store through
//! [`SessionStore::apply_mask_response`] guarded by a revision check.

use image::RgbaImage;
use thiserror::Error;

use crate::constants::PENDING_COLOR;
use crate::mask::{recolor, recolor_rgba, RawMask};
use crate::model::{ClassRegistry, SeedPoint};

use super::entry::{ConfirmedMask, EntryPhase, ImageEntry, ImageId};

/// Validation errors surfaced synchronously by store operations.
/// The store state is unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown image id {id}")]
    UnknownImage { id: ImageId },

    #[error("no pending mask to confirm")]
    NoPendingMask,

    #[error("class '{name}' is not registered")]
    UnknownClass { name: String },

    #[error("mask index {index} out of range ({len} confirmed masks)")]
    InvalidMaskIndex { index: usize, len: usize },

    #[error("class '{name}' is already registered")]
    DuplicateClass { name: String },
}

/// Staleness token for one oracle refresh.
///
/// Issued by [`SessionStore::add_point`], carried through the oracle round
/// trip, and checked against the entry's current revision before the
/// response is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTicket {
    pub image_id: ImageId,
    pub revision: u64,
}

/// Result of feeding an oracle response back into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOutcome {
    /// The best candidate was staged as the pending mask.
    Applied,
    /// The point list changed since the request was issued; the response
    /// was discarded and the store is untouched.
    Stale,
}

/// The annotation session: all loaded images, their annotation state, and
/// the class registry.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: Vec<ImageEntry>,
    classes: ClassRegistry,
    next_id: ImageId,
    current: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Append a new entry for a decoded image and return its stable id.
    /// Ids are never reused, not even across [`SessionStore::reset`].
    pub fn load_image(&mut self, image: RgbaImage, data_url: String) -> ImageId {
        let id = self.next_id;
        self.next_id += 1;

        log::info!(
            "loaded image {} ({}x{})",
            id,
            image.width(),
            image.height()
        );
        self.entries.push(ImageEntry::new(id, image, data_url));
        id
    }

    pub fn entry(&self, id: ImageId) -> Result<&ImageEntry, SessionError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(SessionError::UnknownImage { id })
    }

    fn entry_mut(&mut self, id: ImageId) -> Result<&mut ImageEntry, SessionError> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(SessionError::UnknownImage { id })
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroy every entry. Class registry and id counter survive.
    pub fn reset(&mut self) {
        log::info!("session reset, dropping {} images", self.entries.len());
        self.entries.clear();
        self.current = 0;
    }

    // ------------------------------------------------------------------
    // Active-image cursor
    // ------------------------------------------------------------------

    /// The entry the user is currently editing, if any images are loaded.
    pub fn current_entry(&self) -> Option<&ImageEntry> {
        self.entries.get(self.current)
    }

    /// Move the cursor to the given image.
    pub fn set_current(&mut self, id: ImageId) -> Result<(), SessionError> {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.current = index;
                Ok(())
            }
            None => Err(SessionError::UnknownImage { id }),
        }
    }

    /// Advance the cursor to the next image, wrapping around.
    pub fn next_image(&mut self) {
        if !self.entries.is_empty() {
            self.current = (self.current + 1) % self.entries.len();
        }
    }

    /// Move the cursor to the previous image, wrapping around.
    pub fn prev_image(&mut self) {
        if !self.entries.is_empty() {
            self.current = if self.current == 0 {
                self.entries.len() - 1
            } else {
                self.current - 1
            };
        }
    }

    /// Progress string like "3/15" for the active image.
    pub fn progress(&self) -> String {
        format!("{}/{}", self.current + 1, self.entries.len())
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Register a class with an auto-assigned palette color.
    pub fn add_class(&mut self, name: &str) -> Result<(), SessionError> {
        if !self.classes.add(name) {
            return Err(SessionError::DuplicateClass {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Register a class with an explicit color.
    pub fn add_class_with_color(&mut self, name: &str, color: [u8; 3]) -> Result<(), SessionError> {
        if !self.classes.add_with_color(name, color) {
            return Err(SessionError::DuplicateClass {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Change a class's color. Masks confirmed earlier keep their snapshot.
    pub fn set_class_color(&mut self, name: &str, color: [u8; 3]) -> Result<(), SessionError> {
        if !self.classes.set_color(name, color) {
            return Err(SessionError::UnknownClass {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edit loop
    // ------------------------------------------------------------------

    /// Append a seed point to an image.
    ///
    /// Any staged pending mask is dropped (it no longer matches the point
    /// set) and the entry's revision is bumped. The returned ticket is what
    /// the caller hands to the oracle worker; a response is applied only if
    /// the ticket is still current when it arrives.
    pub fn add_point(
        &mut self,
        id: ImageId,
        point: SeedPoint,
    ) -> Result<RefreshTicket, SessionError> {
        let entry = self.entry_mut(id)?;
        entry.points.push(point);
        entry.pending = None;
        entry.revision += 1;

        log::debug!(
            "image {}: point {:?} added ({} total), revision {}",
            id,
            point.label,
            entry.points.len(),
            entry.revision
        );
        Ok(RefreshTicket {
            image_id: id,
            revision: entry.revision,
        })
    }

    /// Empty the point list and discard any pending mask.
    ///
    /// Returns `false` when the entry was already `Empty` (no change to
    /// signal, no revision bump).
    pub fn clear_points(&mut self, id: ImageId) -> Result<bool, SessionError> {
        let entry = self.entry_mut(id)?;
        if entry.phase() == EntryPhase::Empty {
            return Ok(false);
        }
        entry.points.clear();
        entry.pending = None;
        entry.revision += 1;
        log::debug!("image {}: points cleared, revision {}", id, entry.revision);
        Ok(true)
    }

    /// Feed an oracle response back into the store.
    ///
    /// The response is applied only if the ticket's revision still matches
    /// the entry's; otherwise it is discarded on arrival, never applied
    /// retroactively. Only the first (best) candidate is staged; the rest
    /// are dropped.
    pub fn apply_mask_response(
        &mut self,
        ticket: RefreshTicket,
        masks: &[RawMask],
    ) -> Result<MaskOutcome, SessionError> {
        let entry = self.entry_mut(ticket.image_id)?;

        if ticket.revision != entry.revision {
            log::debug!(
                "image {}: discarding mask response for revision {} (now {})",
                ticket.image_id,
                ticket.revision,
                entry.revision
            );
            return Ok(MaskOutcome::Stale);
        }

        let Some(best) = masks.first() else {
            log::debug!("image {}: empty candidate list discarded", ticket.image_id);
            return Ok(MaskOutcome::Stale);
        };

        if best.mask.dimensions() != entry.image.dimensions() {
            log::warn!(
                "image {}: mask size {:?} does not match image size {:?}",
                ticket.image_id,
                best.mask.dimensions(),
                entry.image.dimensions()
            );
        }
        if masks.len() > 1 {
            log::debug!(
                "image {}: {} extra candidates dropped",
                ticket.image_id,
                masks.len() - 1
            );
        }

        entry.pending = Some(recolor(&best.mask, PENDING_COLOR));
        Ok(MaskOutcome::Applied)
    }

    /// Record a failed oracle refresh.
    ///
    /// The entry stays in `PointsPlaced`: points are kept so the user can
    /// retry by editing them, and no pending mask exists to roll back.
    pub fn refresh_failed(&mut self, ticket: RefreshTicket, reason: &str) {
        log::warn!(
            "image {}: mask refresh for revision {} failed: {}",
            ticket.image_id,
            ticket.revision,
            reason
        );
    }

    /// Accept the pending mask under a class label.
    ///
    /// Atomic: on success the points are empty, the pending slot is absent,
    /// and exactly one [`ConfirmedMask`] was appended, all within a single
    /// mutation. Returns the index of the new confirmed mask.
    pub fn confirm_mask(&mut self, id: ImageId, class_name: &str) -> Result<usize, SessionError> {
        // Borrow the registry before taking the entry mutably.
        let class = self
            .classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownClass {
                name: class_name.to_string(),
            });

        let entry = self.entry_mut(id)?;
        let Some(pending) = entry.pending.as_ref() else {
            return Err(SessionError::NoPendingMask);
        };
        let class = class?;

        let mask = recolor_rgba(pending, class.color);
        entry.confirmed.push(ConfirmedMask {
            mask,
            class_name: class.name.clone(),
            class_color: class.color,
        });
        entry.points.clear();
        entry.pending = None;
        entry.revision += 1;

        let index = entry.confirmed.len() - 1;
        log::info!(
            "image {}: mask {} confirmed as '{}'",
            id,
            index,
            class.name
        );
        Ok(index)
    }

    /// Toggle highlight on a confirmed mask.
    ///
    /// Highlighting an already-highlighted index clears the highlight.
    /// Returns the new highlight state.
    pub fn toggle_highlight(
        &mut self,
        id: ImageId,
        index: usize,
    ) -> Result<Option<usize>, SessionError> {
        let entry = self.entry_mut(id)?;
        let len = entry.confirmed.len();
        if index >= len {
            return Err(SessionError::InvalidMaskIndex { index, len });
        }

        entry.highlighted = if entry.highlighted == Some(index) {
            None
        } else {
            Some(index)
        };
        Ok(entry.highlighted)
    }
}
