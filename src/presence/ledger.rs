//! Remembers the last status seen for every user.
//!
//! The gateway only delivers the new presence and the cache is already updated by the
//! time the event arrives, so this is where the previous status comes from.

use std::collections::HashMap;

use serenity::OnlineStatus;
use serenity::UserId;

use crate::serenity;

#[derive(Debug, Default)]
pub struct StatusLedger {
    last_seen: HashMap<UserId, OnlineStatus>,
}

impl StatusLedger {
    /// Record `status` for `user` and return the status it replaces.
    /// Users never seen before count as offline.
    pub fn observe(&mut self, user: UserId, status: OnlineStatus) -> OnlineStatus {
        self.last_seen
            .insert(user, status)
            .unwrap_or(OnlineStatus::Offline)
    }

    /// Record the statuses of a guild snapshot without reporting anything.
    /// A status already observed is newer than the snapshot and is kept.
    pub fn seed(&mut self, statuses: impl IntoIterator<Item = (UserId, OnlineStatus)>) {
        for (user, status) in statuses {
            self.last_seen.entry(user).or_insert(status);
        }
    }
}
