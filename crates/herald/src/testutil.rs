//! Fixtures and recording fakes shared by the unit tests in this crate.
//! Public equivalents for downstream crates live in `herald-testing`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::byline::{BylineParser, ParseOptions, ParsedBylines};
use crate::creation::{Chapter, Creation, Pseud, Series, Work};
use crate::ids::{ChapterId, CreationId, SeriesId, UserId, WorkId};
use crate::mail::{Mailer, MailQueue, Notice, SubscriptionNotice};
use crate::prefs::{PreferenceFlag, Preferences};
use crate::store::CreationStore;
use crate::subscription::{Subscription, SubscriptionTarget, Subscriptions};

/// Fresh pseud for a fresh user.
pub(crate) fn pseud(name: &str) -> Pseud {
    Pseud::new(UserId::new(), name)
}

/// A draft work with no credits and no trimmings.
pub(crate) fn work(title: &str) -> Work {
    Work {
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
    }
}

/// A chapter attached to `work` at `position`, registered on the work.
pub(crate) fn chapter_of(work: &mut Work, position: u32, pseuds: Vec<Pseud>) -> Chapter {
    let chapter = Chapter {
        id: ChapterId::new(),
        work_id: work.id,
        position,
        posted: work.posted,
        authors: pseuds.clone(),
        pseuds,
        authors_to_remove: Vec::new(),
    };
    work.chapters.push(chapter.id);
    chapter
}

/// A series containing `work`, registered on the work.
pub(crate) fn series_with(title: &str, work: &mut Work, pseuds: Vec<Pseud>) -> Series {
    let series = Series {
        id: SeriesId::new(),
        title: title.to_string(),
        posted: true,
        authors: pseuds.clone(),
        pseuds,
        authors_to_remove: Vec::new(),
        works: vec![work.id],
    };
    work.series.push(series.id);
    series
}

/// In-memory creation store.
#[derive(Default)]
pub(crate) struct Library {
    creations: HashMap<CreationId, Creation>,
}

impl Library {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, creation: impl Into<Creation>) {
        let creation = creation.into();
        self.creations.insert(creation.id(), creation);
    }

    pub(crate) fn work(&self, id: WorkId) -> &Work {
        match self.creations.get(&CreationId::Work(id)) {
            Some(Creation::Work(w)) => w,
            _ => panic!("no such work in test library"),
        }
    }

    pub(crate) fn chapter(&self, id: ChapterId) -> &Chapter {
        match self.creations.get(&CreationId::Chapter(id)) {
            Some(Creation::Chapter(c)) => c,
            _ => panic!("no such chapter in test library"),
        }
    }

    pub(crate) fn series(&self, id: SeriesId) -> &Series {
        match self.creations.get(&CreationId::Series(id)) {
            Some(Creation::Series(s)) => s,
            _ => panic!("no such series in test library"),
        }
    }
}

impl CreationStore for Library {
    fn creation(&self, id: CreationId) -> Option<&Creation> {
        self.creations.get(&id)
    }

    fn creation_mut(&mut self, id: CreationId) -> Option<&mut Creation> {
        self.creations.get_mut(&id)
    }
}

/// Mailer that records every notice.
#[derive(Clone, Default)]
pub(crate) struct RecordingMailer {
    sent: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingMailer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
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
pub(crate) struct RecordingQueue {
    enqueued: Arc<Mutex<Vec<SubscriptionNotice>>>,
}

impl RecordingQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueued(&self) -> Vec<SubscriptionNotice> {
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

/// Byline parser over a fixed pseud roster; matches names exactly.
#[derive(Default)]
pub(crate) struct RosterBylines {
    roster: Vec<Pseud>,
}

impl RosterBylines {
    pub(crate) fn new(roster: Vec<Pseud>) -> Self {
        Self { roster }
    }
}

impl BylineParser for RosterBylines {
    fn parse(&self, text: &str, _options: ParseOptions) -> ParsedBylines {
        let pseuds = text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| self.roster.iter().find(|p| p.name == name).cloned())
            .collect();
        ParsedBylines { pseuds }
    }
}

/// Preferences fake: every flag is off except for the listed opt-outs.
#[derive(Default)]
pub(crate) struct OptOuts {
    opted_out: Vec<UserId>,
}

impl OptOuts {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn users(opted_out: Vec<UserId>) -> Self {
        Self { opted_out }
    }
}

impl Preferences for OptOuts {
    fn users_with_flag_off(&self, _flag: PreferenceFlag, user_ids: &[UserId]) -> Vec<UserId> {
        user_ids
            .iter()
            .copied()
            .filter(|id| !self.opted_out.contains(id))
            .collect()
    }
}

/// Subscription lookup over a fixed registration list.
#[derive(Default)]
pub(crate) struct SubscriptionBook {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn follow_work(&mut self, subscriber: UserId, work: WorkId) -> &mut Self {
        self.subscriptions.push(Subscription {
            id: crate::ids::SubscriptionId::new(),
            subscriber,
            target: SubscriptionTarget::Work(work),
        });
        self
    }

    pub(crate) fn follow_user(&mut self, subscriber: UserId, author: UserId) -> &mut Self {
        self.subscriptions.push(Subscription {
            id: crate::ids::SubscriptionId::new(),
            subscriber,
            target: SubscriptionTarget::User(author),
        });
        self
    }
}

impl Subscriptions for SubscriptionBook {
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
