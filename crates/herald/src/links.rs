//! Per-work link statistics listing.
//!
//! Boundary-only concern: owners may page through the external link
//! records collected for their work, oldest first. Anyone else gets an
//! authorization error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LinksError;
use crate::ids::{UserId, WorkId, WorkLinkId};
use crate::store::CreationStore;

/// Listings page size.
pub const LINKS_PER_PAGE: usize = 20;

/// One inbound link record for a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLink {
    pub id: WorkLinkId,
    pub work_id: WorkId,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Link record lookup, resolved by the backing store.
pub trait WorkLinkStore {
    fn links_for(&self, work: WorkId) -> Vec<WorkLink>;
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub page: usize,
    pub total_pages: usize,
    pub total_entries: usize,
}

/// List the link records of `work_id`, ordered by creation time
/// ascending, paginated. Only the work's owner may look.
pub fn list_work_links(
    store: &dyn CreationStore,
    links: &dyn WorkLinkStore,
    viewer: UserId,
    work_id: WorkId,
    page: usize,
) -> Result<Paginated<WorkLink>, LinksError> {
    let work = store
        .creation(crate::ids::CreationId::Work(work_id))
        .and_then(|c| c.as_work())
        .ok_or(LinksError::NotFound(work_id))?;

    if !work.author_user_ids().contains(&viewer) {
        return Err(LinksError::Forbidden {
            user: viewer,
            work: work_id,
        });
    }

    let mut records = links.links_for(work_id);
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let total_entries = records.len();
    let total_pages = total_entries.div_ceil(LINKS_PER_PAGE).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * LINKS_PER_PAGE;
    let items = records
        .into_iter()
        .skip(start)
        .take(LINKS_PER_PAGE)
        .collect();

    Ok(Paginated {
        items,
        page,
        total_pages,
        total_entries,
    })
}
