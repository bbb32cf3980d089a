//! The persistence seam.
//!
//! The backing store owns every entity; the dispatcher only reads and
//! mutates selected fields through this trait, one creation at a time.
//! Saves to a single creation are assumed to be serialized by the store
//! (row locking or equivalent); no locking happens here.

use crate::creation::Creation;
use crate::ids::CreationId;

/// Lookup of creations by id.
///
/// Returning `None` for an id the dispatcher was handed is a programming
/// error in the calling code and surfaces as
/// [`NotifyError::MissingCreation`](crate::error::NotifyError::MissingCreation).
pub trait CreationStore {
    fn creation(&self, id: CreationId) -> Option<&Creation>;
    fn creation_mut(&mut self, id: CreationId) -> Option<&mut Creation>;
}
