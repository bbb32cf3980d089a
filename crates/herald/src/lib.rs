//! # Herald
//!
//! Notification fan-out and collection cache invalidation for a fan-works
//! archive. Herald decides who hears about a save (co-authors, gift
//! recipients, subscribers, prompt requesters, parent-work owners) and
//! which cached collection fragments that save dirtied.
//!
//! ## Core Concepts
//!
//! Herald separates **decisions** from **delivery**:
//! - The [`Dispatcher`] inspects a creation's before/after state and picks
//!   the notices to fire.
//! - Delivery belongs to the ports: [`Mailer`] (synchronous one-off mail)
//!   and [`MailQueue`] (batched subscription mail, external worker).
//!
//! ## Architecture
//!
//! ```text
//! Persistence layer (save / update / destroy)
//!     │
//!     ├─ after_create ──┐
//!     ├─ before_update ─┤          ┌─► Mailer.send()        co-authors,
//!     └─ after_save ────┼─────────►│                        recipients,
//!                       │          │                        prompters,
//!              Dispatcher          │                        parent owners
//!                       │          └─► MailQueue.enqueue()  subscribers
//!                       │
//!                       └─► save_creatorships()  pseuds := authors
//!
//! Collection / member record save or destroy
//!     │
//!     ▼
//! CollectionSweeper ──► FragmentCache.expire("collection-blurb-{id}")
//!                       FragmentCache.expire("collection-profile-{id}")
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Creatorship reconciliation** - after any save, a creation's
//!    persisted pseuds equal its pending author list with removals applied
//! 2. **Credit propagates one level** - chapter ↔ work ↔ first chapter /
//!    series, never further
//! 3. **At most one notice per (work, kind) per transition** - fan-out is
//!    gated on the posted flip and on pending state, not re-fired on every
//!    update
//! 4. **Recipient mail is durable-save-only** - previews run the create
//!    and update hooks but never `after_save`
//! 5. **Concealed works stay silent** - unrevealed or anonymous works send
//!    no subscriber, prompter, or parent notices
//!
//! ## What This Is Not
//!
//! Herald is **not** a message queue, a scheduler, or a durable event
//! system. Notification dispatch is a synchronous side effect of a save,
//! with no retry and no ordering guarantee beyond "happens after this
//! in-process call". Delivery transport, retries, and batching live behind
//! the ports (see `herald-queue-postgres` for a durable queue backend).

// Core modules
mod byline;
mod collection;
mod creation;
mod creatorship;
mod dispatch;
mod error;
mod ids;
mod links;
mod mail;
mod prefs;
mod store;
mod subscription;
mod sweep;

// Shared fixtures for this crate's unit tests (public fakes live in
// herald-testing)
#[cfg(test)]
mod testutil;

// Re-export id types
pub use ids::{
    ChallengeClaimId, ChapterId, CollectionId, CreationId, PseudId, SeriesId, SubscriptionId,
    UserId, WorkId, WorkLinkId,
};

// Re-export the domain model
pub use collection::{Collection, Collections};
pub use creation::{
    ActingUser, Chapter, Creation, ParentWorkRelationship, PriorState, Pseud, Series, Work,
};
pub use subscription::{Subscription, SubscriptionTarget, Subscriptions};

// Re-export ports
pub use byline::{BylineParser, ParseOptions, ParsedBylines};
pub use mail::{Mailer, MailQueue, Notice, SubscriptionNotice};
pub use prefs::{PreferenceFlag, Preferences};
pub use store::CreationStore;

// Re-export the dispatcher
pub use creatorship::{new_coauthors, save_creatorships, CoAuthorDelta};
pub use dispatch::Dispatcher;

// Re-export the sweeper
pub use sweep::{
    affected_collections, fragment_key, CollectionScope, CollectionSweeper, Fragment,
    FragmentCache, Swept,
};

// Re-export the links listing
pub use links::{list_work_links, Paginated, WorkLink, WorkLinkStore, LINKS_PER_PAGE};

// Re-export error types
pub use error::{LinksError, NotifyError};
