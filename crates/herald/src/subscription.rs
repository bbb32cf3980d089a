//! Subscriptions and their lookup port.

use serde::{Deserialize, Serialize};

use crate::creation::Work;
use crate::ids::{SubscriptionId, UserId, WorkId};

/// What a subscription is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SubscriptionTarget {
    /// Follow one specific work.
    Work(WorkId),
    /// Follow everything an author posts.
    User(UserId),
}

/// A (subscriber, subscribable) registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub subscriber: UserId,
    pub target: SubscriptionTarget,
}

/// Subscription lookup, resolved by the backing store.
pub trait Subscriptions {
    /// Every subscription that should hear about activity on this work:
    /// registered against the work itself, or against any of its credited
    /// authors.
    fn for_work(&self, work: &Work) -> Vec<Subscription>;

    /// Subscriptions registered against any of the given users.
    fn for_users(&self, user_ids: &[UserId]) -> Vec<Subscription>;
}
