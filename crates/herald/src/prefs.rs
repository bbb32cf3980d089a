//! Per-user notification preferences port.

use crate::ids::UserId;

/// Opt-out flags a user can set. One preference row per user, so filtering
/// through this port also deduplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceFlag {
    /// Suppress gift recipient notifications.
    RecipientEmailsOff,
}

pub trait Preferences {
    /// Of `user_ids`, the users who have `flag` switched off (i.e. who
    /// should still receive the corresponding mail).
    fn users_with_flag_off(&self, flag: PreferenceFlag, user_ids: &[UserId]) -> Vec<UserId>;
}
