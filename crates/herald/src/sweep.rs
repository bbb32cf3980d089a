//! Collection fragment-cache invalidation.
//!
//! Whenever a collection or any record associated with one is saved or
//! destroyed, the cached blurb and profile fragments of every affected
//! collection (the collection itself, its parent, its children) are
//! expired. No dirty-checking: invalidation is unconditional and expiring
//! an already-expired key is a no-op.

use smallvec::SmallVec;
use tracing::trace;

use crate::collection::{Collection, Collections};
use crate::creation::Work;
use crate::ids::CollectionId;

/// Cached presentational fragments kept per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Blurb,
    Profile,
}

impl Fragment {
    fn as_str(self) -> &'static str {
        match self {
            Fragment::Blurb => "blurb",
            Fragment::Profile => "profile",
        }
    }
}

/// Typed construction of the cache key for one fragment of one collection.
pub fn fragment_key(fragment: Fragment, collection: CollectionId) -> String {
    format!("collection-{}-{}", fragment.as_str(), collection)
}

/// Fragment cache port. `expire` is idempotent and returns nothing.
pub trait FragmentCache {
    fn expire(&self, key: &str);
}

/// How a swept record relates to collections.
pub enum CollectionScope<'a> {
    /// The record is itself a collection.
    Collection(&'a Collection),
    /// The record belongs to at most one collection (items, participants,
    /// profiles).
    Member(Option<CollectionId>),
    /// The record belongs to many collections (works).
    Members(&'a [CollectionId]),
    /// The record has nothing to do with collections.
    None,
}

/// A record whose save or destroy may dirty collection fragments.
pub trait Swept {
    fn collection_scope(&self) -> CollectionScope<'_>;
}

impl Swept for Collection {
    fn collection_scope(&self) -> CollectionScope<'_> {
        CollectionScope::Collection(self)
    }
}

impl Swept for Work {
    fn collection_scope(&self) -> CollectionScope<'_> {
        CollectionScope::Members(&self.collections)
    }
}

/// The affected set for one record: per referenced collection, itself plus
/// its parent plus its children, deduplicated. A referenced id missing
/// from the index contributes only itself.
pub fn affected_collections(
    scope: CollectionScope<'_>,
    index: &dyn Collections,
) -> SmallVec<[CollectionId; 4]> {
    let mut affected = SmallVec::new();
    match scope {
        CollectionScope::Collection(collection) => {
            extend_family(&mut affected, collection);
        }
        CollectionScope::Member(id) => {
            if let Some(id) = id {
                extend_by_id(&mut affected, id, index);
            }
        }
        CollectionScope::Members(ids) => {
            for id in ids {
                extend_by_id(&mut affected, *id, index);
            }
        }
        CollectionScope::None => {}
    }
    affected
}

fn extend_by_id(
    affected: &mut SmallVec<[CollectionId; 4]>,
    id: CollectionId,
    index: &dyn Collections,
) {
    match index.collection(id) {
        Some(collection) => extend_family(affected, collection),
        None => push_unique(affected, id),
    }
}

fn extend_family(affected: &mut SmallVec<[CollectionId; 4]>, collection: &Collection) {
    push_unique(affected, collection.id);
    if let Some(parent) = collection.parent {
        push_unique(affected, parent);
    }
    for child in &collection.children {
        push_unique(affected, *child);
    }
}

fn push_unique(affected: &mut SmallVec<[CollectionId; 4]>, id: CollectionId) {
    if !affected.contains(&id) {
        affected.push(id);
    }
}

/// Expires collection fragments in response to record changes.
pub struct CollectionSweeper<C> {
    cache: C,
}

impl<C: FragmentCache> CollectionSweeper<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn after_save(&self, record: &dyn Swept, index: &dyn Collections) {
        self.expire_for(record, index);
    }

    /// Destroys invalidate exactly like saves.
    pub fn after_destroy(&self, record: &dyn Swept, index: &dyn Collections) {
        self.expire_for(record, index);
    }

    fn expire_for(&self, record: &dyn Swept, index: &dyn Collections) {
        for id in affected_collections(record.collection_scope(), index) {
            trace!(collection = %id, "expiring collection fragments");
            self.cache.expire(&fragment_key(Fragment::Blurb, id));
            self.cache.expire(&fragment_key(Fragment::Profile, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct Index {
        collections: HashMap<CollectionId, Collection>,
    }

    impl Index {
        fn of(collections: Vec<Collection>) -> Self {
            Self {
                collections: collections.into_iter().map(|c| (c.id, c)).collect(),
            }
        }
    }

    impl Collections for Index {
        fn collection(&self, id: CollectionId) -> Option<&Collection> {
            self.collections.get(&id)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingCache {
        expired: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingCache {
        fn expired(&self) -> Vec<String> {
            self.expired.lock().unwrap().clone()
        }
    }

    impl FragmentCache for RecordingCache {
        fn expire(&self, key: &str) {
            self.expired.lock().unwrap().push(key.to_string());
        }
    }

    fn family() -> (Collection, Collection, Collection, Collection) {
        let mut parent = Collection::new("exchanges");
        let mut hub = Collection::new("yuletide");
        let mut child_a = Collection::new("yuletide-2025");
        let mut child_b = Collection::new("yuletide-madness");
        hub.parent = Some(parent.id);
        parent.children.push(hub.id);
        child_a.parent = Some(hub.id);
        child_b.parent = Some(hub.id);
        hub.children = vec![child_a.id, child_b.id];
        (parent, hub, child_a, child_b)
    }

    #[test]
    fn collection_affects_self_parent_and_children() {
        let (parent, hub, child_a, child_b) = family();
        let index = Index::of(vec![parent.clone(), child_a.clone(), child_b.clone()]);

        let affected = affected_collections(CollectionScope::Collection(&hub), &index);

        assert_eq!(affected.len(), 4);
        for id in [hub.id, parent.id, child_a.id, child_b.id] {
            assert!(affected.contains(&id));
        }
    }

    #[test]
    fn overlapping_families_do_not_duplicate() {
        let (parent, hub, child_a, child_b) = family();
        let index = Index::of(vec![parent, hub.clone(), child_a.clone(), child_b]);

        // a work sitting in both the hub and one of its children: the hub
        // shows up as itself and as the child's parent
        let memberships = vec![hub.id, child_a.id];
        let affected = affected_collections(CollectionScope::Members(&memberships), &index);

        let hub_count = affected.iter().filter(|id| **id == hub.id).count();
        assert_eq!(hub_count, 1);
    }

    #[test]
    fn unknown_collection_id_still_expires_itself() {
        let index = Index::of(Vec::new());
        let orphan = CollectionId::new();

        let affected = affected_collections(CollectionScope::Member(Some(orphan)), &index);

        assert_eq!(affected.as_slice(), [orphan]);
    }

    #[test]
    fn unrelated_records_expire_nothing() {
        let index = Index::of(Vec::new());
        let affected = affected_collections(CollectionScope::None, &index);
        assert!(affected.is_empty());
    }

    #[test]
    fn sweeper_expires_blurb_and_profile_per_collection() {
        let solo = Collection::new("solo");
        let solo_id = solo.id;
        let index = Index::of(vec![solo.clone()]);
        let cache = RecordingCache::default();
        let sweeper = CollectionSweeper::new(cache.clone());

        sweeper.after_save(&solo, &index);

        assert_eq!(
            cache.expired(),
            vec![
                format!("collection-blurb-{solo_id}"),
                format!("collection-profile-{solo_id}"),
            ]
        );

        // destroy goes through the identical path
        sweeper.after_destroy(&solo, &index);
        assert_eq!(cache.expired().len(), 4);
    }
}
