//! Collections: hierarchical curated groupings of works.

use crate::ids::CollectionId;

/// A collection node. Hierarchy is one parent, many children; the sweeper
/// only ever walks one level from a starting collection.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub parent: Option<CollectionId>,
    pub children: Vec<CollectionId>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CollectionId::new(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Read-only collection lookup, resolved by the backing store.
pub trait Collections {
    fn collection(&self, id: CollectionId) -> Option<&Collection>;
}
