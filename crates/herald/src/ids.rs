//! Newtype identifiers for every entity the core touches.
//!
//! Ids are opaque UUIDs. The newtypes exist so a `WorkId` can never be
//! handed to something expecting a `CollectionId`; the dispatcher juggles
//! seven entity kinds and mixing them up would be silent data corruption.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// A story.
    WorkId
);
entity_id!(
    /// One chapter of a work.
    ChapterId
);
entity_id!(
    /// A series grouping several works.
    SeriesId
);
entity_id!(
    /// An authorial identity. A user may write under several pseuds.
    PseudId
);
entity_id!(
    /// An account.
    UserId
);
entity_id!(
    /// A curated grouping of works.
    CollectionId
);
entity_id!(
    /// A (subscriber, subscribable) registration.
    SubscriptionId
);
entity_id!(
    /// A claim on a prompt in a challenge exchange.
    ChallengeClaimId
);
entity_id!(
    /// An external link record attached to a work.
    WorkLinkId
);

/// Identifies any of the three authorable entity kinds.
///
/// Notices carry this instead of a bare UUID so the mailer knows which
/// template family to render without a separate "class name" string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CreationId {
    Work(WorkId),
    Chapter(ChapterId),
    Series(SeriesId),
}

impl CreationId {
    /// The work id, when this identifies a work.
    pub fn as_work(self) -> Option<WorkId> {
        match self {
            CreationId::Work(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for CreationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationId::Work(id) => write!(f, "work:{id}"),
            CreationId::Chapter(id) => write!(f, "chapter:{id}"),
            CreationId::Series(id) => write!(f, "series:{id}"),
        }
    }
}

impl From<WorkId> for CreationId {
    fn from(id: WorkId) -> Self {
        CreationId::Work(id)
    }
}

impl From<ChapterId> for CreationId {
    fn from(id: ChapterId) -> Self {
        CreationId::Chapter(id)
    }
}

impl From<SeriesId> for CreationId {
    fn from(id: SeriesId) -> Self {
        CreationId::Series(id)
    }
}
