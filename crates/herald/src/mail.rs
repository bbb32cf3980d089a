//! Mail-facing ports.
//!
//! Two delivery paths, deliberately different:
//!
//! - [`Mailer`]: synchronous, fire-and-forget, one call per notice. Used
//!   for the low-volume kinds (co-author, recipient, prompter, parent
//!   work). A failure propagates to whoever triggered the save.
//! - [`MailQueue`]: hand-off of subscription notices to an external queue
//!   that owns batching and actual delivery. `enqueue` must not block the
//!   saving request; backends buffer internally (see
//!   `herald-queue-postgres`).

use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, CreationId, SubscriptionId, UserId, WorkId};
use crate::subscription::Subscription;

/// One notification to render and send.
///
/// Collection ids ride along where the template links back to the event's
/// primary collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A pseud was newly credited on a creation by someone else.
    CoAuthorAdded { user: UserId, creation: CreationId },
    /// A posted work names this user as a gift recipient.
    Recipient {
        user: UserId,
        work: WorkId,
        collection: Option<CollectionId>,
    },
    /// A work fulfilled a prompt this user requested.
    Prompter {
        work: WorkId,
        collection: Option<CollectionId>,
    },
    /// A new work declared itself a response to `parent`; goes to the
    /// parent work's owners.
    ParentWork { parent: WorkId, child: WorkId },
}

/// Synchronous mail dispatch.
pub trait Mailer {
    fn send(&self, notice: Notice) -> anyhow::Result<()>;
}

/// Payload a durable queue backend persists per enqueued subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionNotice {
    pub subscription: SubscriptionId,
    pub subscriber: UserId,
    pub creation: CreationId,
}

impl SubscriptionNotice {
    pub fn new(subscription: &Subscription, creation: CreationId) -> Self {
        Self {
            subscription: subscription.id,
            subscriber: subscription.subscriber,
            creation,
        }
    }
}

/// Queued subscription mail. At-least-once delivery, no cross-subscription
/// ordering guarantee.
pub trait MailQueue {
    fn enqueue(&self, subscription: &Subscription, creation: CreationId) -> anyhow::Result<()>;
}
