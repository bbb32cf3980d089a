//! In-memory implementations of every Herald port, plus fixture builders.
//!
//! Everything here is synchronous and deterministic so tests can assert on
//! exact notice lists. The only concession to async is [`ChannelQueue`],
//! which hands subscription notices to a tokio channel the way a real
//! queue backend hands them to a delivery worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use herald_core::{
    BylineParser, Chapter, ChapterId, Collection, CollectionId, Collections, Creation,
    CreationId, CreationStore, Mailer, MailQueue, Notice, ParseOptions, ParsedBylines, Preferences,
    PreferenceFlag, Pseud, Series, SeriesId, Subscription, SubscriptionId, SubscriptionNotice,
    SubscriptionTarget, Subscriptions, UserId, Work, WorkId, WorkLink, WorkLinkStore,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Fresh pseud for a fresh user.
pub fn pseud(name: &str) -> Pseud {
    Pseud::new(UserId::new(), name)
}

/// A second pseud for an existing user.
pub fn alt_pseud(of: &Pseud, name: &str) -> Pseud {
    Pseud::new(of.user_id, name)
}

/// Fluent work construction.
///
/// ```
/// use herald_testing::{pseud, WorkBuilder};
///
/// let alice = pseud("alice");
/// let work = WorkBuilder::new("Ode to Joy")
///     .posted()
///     .credited(&alice)
///     .recipients("bob, carol")
///     .build();
/// assert!(work.posted);
/// ```
pub struct WorkBuilder {
    work: Work,
}

impl WorkBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            work: Work {
                id: WorkId::new(),
                title: title.to_string(),
                posted: false,
                authors: Vec::new(),
                pseuds: Vec::new(),
                authors_to_remove: Vec::new(),
                new_recipients: String::new(),
                in_unrevealed_collection: false,
                in_anon_collection: false,
                collections: Vec::new(),
                challenge_claims: Vec::new(),
                parent_works: Vec::new(),
                chapters: Vec::new(),
                series: Vec::new(),
            },
        }
    }

    pub fn posted(mut self) -> Self {
        self.work.posted = true;
        self
    }

    /// Already persisted credit: pseud appears in both `authors` and
    /// `pseuds`.
    pub fn credited(mut self, pseud: &Pseud) -> Self {
        self.work.authors.push(pseud.clone());
        self.work.pseuds.push(pseud.clone());
        self
    }

    /// Pending credit: pseud appears only in the `authors` list, as after
    /// an edit that has not reconciled yet.
    pub fn pending_author(mut self, pseud: &Pseud) -> Self {
        self.work.authors.push(pseud.clone());
        self
    }

    pub fn recipients(mut self, text: &str) -> Self {
        self.work.new_recipients = text.to_string();
        self
    }

    pub fn in_collection(mut self, collection: CollectionId) -> Self {
        self.work.collections.push(collection);
        self
    }

    pub fn unrevealed(mut self) -> Self {
        self.work.in_unrevealed_collection = true;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.work.in_anon_collection = true;
        self
    }

    pub fn build(self) -> Work {
        self.work
    }
}

/// A chapter attached to `work` at `position`, sharing its credit list,
/// registered on the work.
pub fn chapter_of(work: &mut Work, position: u32) -> Chapter {
    let chapter = Chapter {
        id: ChapterId::new(),
        work_id: work.id,
        position,
        posted: work.posted,
        authors: work.pseuds.clone(),
        pseuds: work.pseuds.clone(),
        authors_to_remove: Vec::new(),
    };
    work.chapters.push(chapter.id);
    chapter
}

/// A series containing `work`, sharing its credit list, registered on the
/// work.
pub fn series_with(title: &str, work: &mut Work) -> Series {
    let series = Series {
        id: SeriesId::new(),
        title: title.to_string(),
        posted: true,
        authors: work.pseuds.clone(),
        pseuds: work.pseuds.clone(),
        authors_to_remove: Vec::new(),
        works: vec![work.id],
    };
    work.series.push(series.id);
    series
}

// ============================================================================
// Stores
// ============================================================================

/// In-memory creation store.
#[derive(Default)]
pub struct MemoryStore {
    creations: HashMap<CreationId, Creation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, creation: impl Into<Creation>) {
        let creation = creation.into();
        self.creations.insert(creation.id(), creation);
    }

    pub fn get_work(&self, id: WorkId) -> Option<&Work> {
        self.creations
            .get(&CreationId::Work(id))
            .and_then(Creation::as_work)
    }
}

impl CreationStore for MemoryStore {
    fn creation(&self, id: CreationId) -> Option<&Creation> {
        self.creations.get(&id)
    }

    fn creation_mut(&mut self, id: CreationId) -> Option<&mut Creation> {
        self.creations.get_mut(&id)
    }
}

/// In-memory collection index.
#[derive(Default)]
pub struct MemoryCollections {
    collections: HashMap<CollectionId, Collection>,
}

impl MemoryCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: Collection) {
        self.collections.insert(collection.id, collection);
    }
}

impl Collections for MemoryCollections {
    fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(&id)
    }
}

/// In-memory link records.
#[derive(Default)]
pub struct MemoryLinks {
    links: Vec<WorkLink>,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, link: WorkLink) {
        self.links.push(link);
    }
}

impl WorkLinkStore for MemoryLinks {
    fn links_for(&self, work: WorkId) -> Vec<WorkLink> {
        self.links
            .iter()
            .filter(|l| l.work_id == work)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Mail ports
// ============================================================================

/// Mailer that records every notice for later assertion.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_of(&self, matches: impl Fn(&Notice) -> bool) -> Vec<Notice> {
        self.sent().into_iter().filter(|n| matches(n)).collect()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, notice: Notice) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notice);
        Ok(())
    }
}

/// Queue that records every enqueued subscription notice.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    enqueued: Arc<Mutex<Vec<SubscriptionNotice>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<SubscriptionNotice> {
        self.enqueued.lock().unwrap().clone()
    }
}

impl MailQueue for RecordingQueue {
    fn enqueue(&self, subscription: &Subscription, creation: CreationId) -> anyhow::Result<()> {
        self.enqueued
            .lock()
            .unwrap()
            .push(SubscriptionNotice::new(subscription, creation));
        Ok(())
    }
}

/// Queue backed by a tokio channel, the way a real backend hands notices
/// to a delivery worker. Enqueue never blocks.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: UnboundedSender<SubscriptionNotice>,
}

impl ChannelQueue {
    pub fn new() -> (Self, UnboundedReceiver<SubscriptionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MailQueue for ChannelQueue {
    fn enqueue(&self, subscription: &Subscription, creation: CreationId) -> anyhow::Result<()> {
        self.tx
            .send(SubscriptionNotice::new(subscription, creation))
            .map_err(|_| anyhow::anyhow!("delivery worker is gone"))
    }
}

// ============================================================================
// Lookup ports
// ============================================================================

/// Byline parser over a fixed pseud roster. Matches names exactly, or
/// case-insensitively when the caller assumes matching logins.
pub struct RosterBylines {
    roster: Vec<Pseud>,
}

impl RosterBylines {
    pub fn new(roster: Vec<Pseud>) -> Self {
        Self { roster }
    }
}

impl BylineParser for RosterBylines {
    fn parse(&self, text: &str, options: ParseOptions) -> ParsedBylines {
        let pseuds = text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| {
                self.roster
                    .iter()
                    .find(|p| {
                        p.name == name
                            || (options.assume_matching_login
                                && p.name.eq_ignore_ascii_case(name))
                    })
                    .cloned()
            })
            .collect();
        ParsedBylines { pseuds }
    }
}

/// Preference store keyed by user; flags default to off (mail wanted).
#[derive(Default)]
pub struct MemoryPreferences {
    flags: HashMap<(UserId, PreferenceFlag), bool>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&mut self, user: UserId, flag: PreferenceFlag) {
        self.flags.insert((user, flag), true);
    }
}

impl Preferences for MemoryPreferences {
    fn users_with_flag_off(&self, flag: PreferenceFlag, user_ids: &[UserId]) -> Vec<UserId> {
        user_ids
            .iter()
            .copied()
            .filter(|id| !self.flags.get(&(*id, flag)).copied().unwrap_or(false))
            .collect()
    }
}

/// Subscription lookup over a fixed registration list.
#[derive(Default)]
pub struct MemorySubscriptions {
    subscriptions: Vec<Subscription>,
}

impl MemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow_work(&mut self, subscriber: UserId, work: WorkId) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions.push(Subscription {
            id,
            subscriber,
            target: SubscriptionTarget::Work(work),
        });
        id
    }

    pub fn follow_user(&mut self, subscriber: UserId, author: UserId) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions.push(Subscription {
            id,
            subscriber,
            target: SubscriptionTarget::User(author),
        });
        id
    }
}

impl Subscriptions for MemorySubscriptions {
    fn for_work(&self, work: &Work) -> Vec<Subscription> {
        let authors = work.author_user_ids();
        self.subscriptions
            .iter()
            .filter(|s| match s.target {
                SubscriptionTarget::Work(id) => id == work.id,
                SubscriptionTarget::User(id) => authors.contains(&id),
            })
            .cloned()
            .collect()
    }

    fn for_users(&self, user_ids: &[UserId]) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| matches!(s.target, SubscriptionTarget::User(id) if user_ids.contains(&id)))
            .cloned()
            .collect()
    }
}

// ============================================================================
// Fragment cache
// ============================================================================

/// Concurrent in-memory fragment cache. Expiring an absent key is a no-op.
#[derive(Clone, Default)]
pub struct MemoryCache {
    fragments: Arc<DashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, rendered: &str) {
        self.fragments.insert(key.to_string(), rendered.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fragments.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl herald_core::FragmentCache for MemoryCache {
    fn expire(&self, key: &str) {
        self.fragments.remove(key);
    }
}
