//! Error taxonomy for the core.
//!
//! Three families: invariant violations (should never happen in correct
//! calling code), authorization failures on the listing boundary, and port
//! failures (mailer or queue) which propagate to whoever triggered the
//! save. Nothing is logged-and-swallowed here.

use thiserror::Error;

use crate::ids::{CreationId, UserId, WorkId};

/// Failure raised by a dispatcher lifecycle hook.
///
/// A port failure aborts the remaining fan-out for that hook; notices
/// already sent or enqueued earlier in the same call are not rolled back.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The store had no creation for an id the dispatcher was given.
    /// Programming error in the calling code, never a user-facing state.
    #[error("creation {0} is missing from the store")]
    MissingCreation(CreationId),

    /// The synchronous mail facility rejected a notice.
    #[error("mail delivery failed")]
    Delivery(#[source] anyhow::Error),

    /// The subscription mail queue refused an enqueue.
    #[error("subscription notice could not be queued")]
    Queue(#[source] anyhow::Error),
}

/// Failure from the per-work links listing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinksError {
    #[error("work {0} does not exist")]
    NotFound(WorkId),

    #[error("user {user} does not own work {work}")]
    Forbidden { user: UserId, work: WorkId },
}
