//! The notification dispatcher.
//!
//! Called explicitly from the persistence layer at three points in a
//! creation's save lifecycle, with before-images passed in rather than
//! recovered from hidden diff tracking:
//!
//! - [`Dispatcher::after_create`] right after first persistence;
//! - [`Dispatcher::before_update`] right before a subsequent persistence
//!   of changed data;
//! - [`Dispatcher::after_save`] strictly after the write is durable.
//!
//! Co-author reconciliation runs on every hookable save. The posted
//! fan-out (`do_notify`) runs once per false→true flip of `posted`; a
//! posted work whose concealment flags flip instead goes down the reveal
//! path. Recipient mail is deliberately confined to `after_save` so a
//! preview pass (create/update hooks without a durable write) can never
//! send it.
//!
//! Each hook runs to completion on the calling thread. The first port
//! failure aborts the remaining fan-out and propagates; notices already
//! out stay out.

use tracing::debug;

use crate::byline::{BylineParser, ParseOptions};
use crate::creation::{ActingUser, Creation, PriorState, Work};
use crate::creatorship;
use crate::error::NotifyError;
use crate::ids::{CreationId, UserId};
use crate::mail::{Mailer, MailQueue, Notice};
use crate::prefs::{PreferenceFlag, Preferences};
use crate::store::CreationStore;
use crate::subscription::Subscriptions;

fn fetch<'a>(store: &'a dyn CreationStore, id: CreationId) -> Result<&'a Creation, NotifyError> {
    store.creation(id).ok_or(NotifyError::MissingCreation(id))
}

/// Notification fan-out over the five ports it may touch.
pub struct Dispatcher<M, Q, B, P, S> {
    mailer: M,
    queue: Q,
    bylines: B,
    prefs: P,
    subs: S,
}

impl<M, Q, B, P, S> Dispatcher<M, Q, B, P, S>
where
    M: Mailer,
    Q: MailQueue,
    B: BylineParser,
    P: Preferences,
    S: Subscriptions,
{
    pub fn new(mailer: M, queue: Q, bylines: B, prefs: P, subs: S) -> Self {
        Self {
            mailer,
            queue,
            bylines,
            prefs,
            subs,
        }
    }

    /// Hook for a creation that was just persisted for the first time.
    pub fn after_create(
        &self,
        store: &mut dyn CreationStore,
        id: CreationId,
        acting: &ActingUser,
    ) -> Result<(), NotifyError> {
        self.notify_co_authors(store, id, acting)?;
        let creation = fetch(store, id)?;
        if !creation.is_series() && creation.posted() {
            self.do_notify(store, creation)?;
        }
        Ok(())
    }

    /// Hook for a creation about to be re-persisted with changed data.
    /// `prior` is the before-image of the fields the decision compares.
    pub fn before_update(
        &self,
        store: &mut dyn CreationStore,
        id: CreationId,
        prior: &PriorState,
        acting: &ActingUser,
    ) -> Result<(), NotifyError> {
        self.notify_co_authors(store, id, acting)?;
        let creation = fetch(store, id)?;
        if creation.is_series() || !creation.is_valid() || !creation.posted() {
            return Ok(());
        }
        if !prior.posted {
            // posted just flipped false -> true
            self.do_notify(store, creation)
        } else {
            self.notify_on_reveal(creation, prior)
        }
    }

    /// Hook that runs only once the underlying write is durable. Recipient
    /// mail lives here and nowhere else: the create/update hooks also fire
    /// during non-committing previews.
    pub fn after_save(
        &self,
        store: &mut dyn CreationStore,
        id: CreationId,
    ) -> Result<(), NotifyError> {
        let notified = match fetch(store, id)? {
            Creation::Work(work) => self.notify_recipients(work)?,
            _ => false,
        };
        if notified {
            // recipients are a pending, one-shot attribute of this save
            if let Some(Creation::Work(work)) = store.creation_mut(id) {
                work.new_recipients.clear();
            }
        }
        Ok(())
    }

    /// The posted fan-out. Order-independent; each step idempotent within
    /// one call.
    fn do_notify(
        &self,
        store: &dyn CreationStore,
        creation: &Creation,
    ) -> Result<(), NotifyError> {
        match creation {
            Creation::Work(work) => {
                self.notify_parents(work)?;
                self.notify_subscribers(store, creation)?;
                self.notify_prompters(work)?;
            }
            // position 1 is the work's own first chapter; the work-level
            // notice already covers it
            Creation::Chapter(chapter) if chapter.position != 1 => {
                self.notify_subscribers(store, creation)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Mail each pseud newly credited by this save, then reconcile the
    /// persisted creatorship. Reconciliation is unconditional; the notice
    /// is conditional on actually being new to the author list.
    fn notify_co_authors(
        &self,
        store: &mut dyn CreationStore,
        id: CreationId,
        acting: &ActingUser,
    ) -> Result<(), NotifyError> {
        let delta = creatorship::new_coauthors(store, id, acting)?;
        for pseud in &delta.new_authors {
            debug!(creation = %delta.creation, user = %pseud.user_id, "co-author added");
            self.mailer
                .send(Notice::CoAuthorAdded {
                    user: pseud.user_id,
                    creation: delta.creation,
                })
                .map_err(NotifyError::Delivery)?;
        }
        creatorship::save_creatorships(store, id)
    }

    /// Gift recipients: posted, pending recipients present, not currently
    /// unrevealed. Returns whether any notice went out.
    fn notify_recipients(&self, work: &Work) -> Result<bool, NotifyError> {
        if !work.posted || work.new_recipients.trim().is_empty() || work.unrevealed() {
            return Ok(false);
        }
        let parsed = self.bylines.parse(
            &work.new_recipients,
            ParseOptions {
                assume_matching_login: true,
            },
        );
        // dedup by underlying user: two pseuds of one user get one notice
        let mut user_ids: Vec<UserId> = Vec::new();
        for pseud in &parsed.pseuds {
            if !user_ids.contains(&pseud.user_id) {
                user_ids.push(pseud.user_id);
            }
        }
        let wanted = self
            .prefs
            .users_with_flag_off(PreferenceFlag::RecipientEmailsOff, &user_ids);
        let collection = work.primary_collection();
        for user in &wanted {
            debug!(work = %work.id, user = %user, "recipient notice");
            self.mailer
                .send(Notice::Recipient {
                    user: *user,
                    work: work.id,
                    collection,
                })
                .map_err(NotifyError::Delivery)?;
        }
        Ok(!wanted.is_empty())
    }

    /// Queue one subscription notice per registration against the
    /// underlying work or its authors. Concealed works stay silent.
    fn notify_subscribers(
        &self,
        store: &dyn CreationStore,
        creation: &Creation,
    ) -> Result<(), NotifyError> {
        let work = match creation {
            Creation::Work(work) => work,
            Creation::Chapter(chapter) => {
                let id = CreationId::Work(chapter.work_id);
                fetch(store, id)?
                    .as_work()
                    .ok_or(NotifyError::MissingCreation(id))?
            }
            Creation::Series(_) => return Ok(()),
        };
        if work.unrevealed() || work.anonymous() {
            debug!(work = %work.id, "concealed, skipping subscriber notices");
            return Ok(());
        }
        for subscription in self.subs.for_work(work) {
            self.queue
                .enqueue(&subscription, creation.id())
                .map_err(NotifyError::Queue)?;
        }
        Ok(())
    }

    /// A posted work whose concealment flag just dropped: the creator was
    /// revealed, so people subscribed to the *authors* get a notice. The
    /// currently-concealed bail-out above the comparison means only a
    /// true→false flip can ever fire this.
    fn notify_on_reveal(&self, creation: &Creation, prior: &PriorState) -> Result<(), NotifyError> {
        let work = match creation.as_work() {
            Some(work) if work.posted => work,
            _ => return Ok(()),
        };
        if work.anonymous() || work.unrevealed() {
            return Ok(());
        }
        let anon_changed = prior.in_anon_collection != work.in_anon_collection;
        let unrevealed_changed = prior.in_unrevealed_collection != work.in_unrevealed_collection;
        if !(anon_changed || unrevealed_changed) {
            return Ok(());
        }
        debug!(work = %work.id, "creator revealed, queueing author subscriptions");
        for subscription in self.subs.for_users(&work.author_user_ids()) {
            self.queue
                .enqueue(&subscription, CreationId::Work(work.id))
                .map_err(NotifyError::Queue)?;
        }
        Ok(())
    }

    /// Prompt requesters get one notice per responding work.
    fn notify_prompters(&self, work: &Work) -> Result<(), NotifyError> {
        if work.challenge_claims.is_empty() || work.unrevealed() {
            return Ok(());
        }
        debug!(work = %work.id, "prompter notice");
        self.mailer
            .send(Notice::Prompter {
                work: work.id,
                collection: work.primary_collection(),
            })
            .map_err(NotifyError::Delivery)
    }

    /// Each parent-work relationship independently notifies the parent's
    /// owners.
    fn notify_parents(&self, work: &Work) -> Result<(), NotifyError> {
        if work.unrevealed() {
            return Ok(());
        }
        for relationship in &work.parent_works {
            debug!(work = %work.id, parent = %relationship.parent, "parent work notice");
            self.mailer
                .send(Notice::ParentWork {
                    parent: relationship.parent,
                    child: work.id,
                })
                .map_err(NotifyError::Delivery)?;
        }
        Ok(())
    }
}
