//! The authorable entities: works, chapters, series.
//!
//! `Creation` is the sum of the three kinds. All three carry the same
//! creatorship bookkeeping (`authors` is the intended credit list for the
//! save in flight, `pseuds` is what is actually persisted,
//! `authors_to_remove` is the pending deletion list); the reconciliation in
//! [`crate::creatorship`] brings `pseuds` in line with the other two after
//! every save.

use serde::{Deserialize, Serialize};

use crate::ids::{
    ChallengeClaimId, ChapterId, CollectionId, CreationId, PseudId, SeriesId, UserId, WorkId,
};

/// An authorial identity. Belongs to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseud {
    pub id: PseudId,
    pub user_id: UserId,
    pub name: String,
}

impl Pseud {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: PseudId::new(),
            user_id,
            name: name.into(),
        }
    }
}

/// The identity performing the save, threaded explicitly through the
/// dispatcher so "don't notify yourself about your own edit" never depends
/// on ambient global state.
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub id: UserId,
    pub pseuds: Vec<PseudId>,
}

impl ActingUser {
    pub fn new(id: UserId, pseuds: Vec<PseudId>) -> Self {
        Self { id, pseuds }
    }

    pub fn owns_pseud(&self, pseud: PseudId) -> bool {
        self.pseuds.contains(&pseud)
    }
}

/// Link from a responding work back to the work it responds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentWorkRelationship {
    pub parent: WorkId,
}

/// A story.
#[derive(Debug, Clone)]
pub struct Work {
    pub id: WorkId,
    pub title: String,
    pub posted: bool,
    pub authors: Vec<Pseud>,
    pub pseuds: Vec<Pseud>,
    pub authors_to_remove: Vec<Pseud>,
    /// Free-text byline list of gift recipients pending notification.
    pub new_recipients: String,
    /// Derived from collection membership; true while any containing
    /// collection hides member works entirely.
    pub in_unrevealed_collection: bool,
    /// Derived from collection membership; true while any containing
    /// collection hides member creators.
    pub in_anon_collection: bool,
    /// Ordered; the first entry is the work's primary collection.
    pub collections: Vec<CollectionId>,
    pub challenge_claims: Vec<ChallengeClaimId>,
    pub parent_works: Vec<ParentWorkRelationship>,
    /// Ordered; the first entry is the chapter at position 1.
    pub chapters: Vec<ChapterId>,
    pub series: Vec<SeriesId>,
}

impl Work {
    pub fn unrevealed(&self) -> bool {
        self.in_unrevealed_collection
    }

    pub fn anonymous(&self) -> bool {
        self.in_anon_collection
    }

    pub fn primary_collection(&self) -> Option<CollectionId> {
        self.collections.first().copied()
    }

    pub fn first_chapter(&self) -> Option<ChapterId> {
        self.chapters.first().copied()
    }

    /// User ids behind the credited pseuds, deduplicated, credit order.
    pub fn author_user_ids(&self) -> Vec<UserId> {
        let mut ids = Vec::new();
        for pseud in &self.pseuds {
            if !ids.contains(&pseud.user_id) {
                ids.push(pseud.user_id);
            }
        }
        ids
    }
}

/// One chapter of a work. Position is 1-based; position 1 is the chapter
/// created together with the work itself.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: ChapterId,
    pub work_id: WorkId,
    pub position: u32,
    pub posted: bool,
    pub authors: Vec<Pseud>,
    pub pseuds: Vec<Pseud>,
    pub authors_to_remove: Vec<Pseud>,
}

/// A series grouping several works. Never triggers posted notifications
/// itself; it only participates in creatorship propagation.
#[derive(Debug, Clone)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub posted: bool,
    pub authors: Vec<Pseud>,
    pub pseuds: Vec<Pseud>,
    pub authors_to_remove: Vec<Pseud>,
    pub works: Vec<WorkId>,
}

/// Any of the three authorable entity kinds.
#[derive(Debug, Clone)]
pub enum Creation {
    Work(Work),
    Chapter(Chapter),
    Series(Series),
}

impl Creation {
    pub fn id(&self) -> CreationId {
        match self {
            Creation::Work(w) => CreationId::Work(w.id),
            Creation::Chapter(c) => CreationId::Chapter(c.id),
            Creation::Series(s) => CreationId::Series(s.id),
        }
    }

    pub fn posted(&self) -> bool {
        match self {
            Creation::Work(w) => w.posted,
            Creation::Chapter(c) => c.posted,
            Creation::Series(s) => s.posted,
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Creation::Series(_))
    }

    pub fn as_work(&self) -> Option<&Work> {
        match self {
            Creation::Work(w) => Some(w),
            _ => None,
        }
    }

    pub fn authors(&self) -> &[Pseud] {
        match self {
            Creation::Work(w) => &w.authors,
            Creation::Chapter(c) => &c.authors,
            Creation::Series(s) => &s.authors,
        }
    }

    pub fn pseuds(&self) -> &[Pseud] {
        match self {
            Creation::Work(w) => &w.pseuds,
            Creation::Chapter(c) => &c.pseuds,
            Creation::Series(s) => &s.pseuds,
        }
    }

    pub fn authors_to_remove(&self) -> &[Pseud] {
        match self {
            Creation::Work(w) => &w.authors_to_remove,
            Creation::Chapter(c) => &c.authors_to_remove,
            Creation::Series(s) => &s.authors_to_remove,
        }
    }

    /// Add a pseud to the persisted creatorship unless already credited.
    pub fn add_pseud(&mut self, pseud: Pseud) {
        let pseuds = self.pseuds_mut();
        if !pseuds.iter().any(|p| p.id == pseud.id) {
            pseuds.push(pseud);
        }
    }

    /// Drop a pseud from the persisted creatorship. Removing an absent
    /// pseud is a no-op.
    pub fn remove_pseud(&mut self, pseud: PseudId) {
        self.pseuds_mut().retain(|p| p.id != pseud);
    }

    fn pseuds_mut(&mut self) -> &mut Vec<Pseud> {
        match self {
            Creation::Work(w) => &mut w.pseuds,
            Creation::Chapter(c) => &mut c.pseuds,
            Creation::Series(s) => &mut s.pseuds,
        }
    }

    /// Minimal record validity. An invalid update suppresses the entire
    /// notification branch for that transition.
    pub fn is_valid(&self) -> bool {
        match self {
            Creation::Work(w) => !w.title.trim().is_empty(),
            Creation::Chapter(c) => c.position >= 1,
            Creation::Series(s) => !s.title.trim().is_empty(),
        }
    }
}

impl From<Work> for Creation {
    fn from(work: Work) -> Self {
        Creation::Work(work)
    }
}

impl From<Chapter> for Creation {
    fn from(chapter: Chapter) -> Self {
        Creation::Chapter(chapter)
    }
}

impl From<Series> for Creation {
    fn from(series: Series) -> Self {
        Creation::Series(series)
    }
}

/// Before-image of the fields the dispatcher compares across a save.
///
/// Passed explicitly into [`crate::dispatch::Dispatcher::before_update`]
/// instead of asking the entity "did X change?" against hidden diff state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorState {
    pub posted: bool,
    pub in_anon_collection: bool,
    pub in_unrevealed_collection: bool,
}

impl PriorState {
    /// Capture the comparison fields of a creation as it exists before the
    /// pending save is applied.
    pub fn of(creation: &Creation) -> Self {
        match creation {
            Creation::Work(w) => Self {
                posted: w.posted,
                in_anon_collection: w.in_anon_collection,
                in_unrevealed_collection: w.in_unrevealed_collection,
            },
            other => Self {
                posted: other.posted(),
                in_anon_collection: false,
                in_unrevealed_collection: false,
            },
        }
    }
}
