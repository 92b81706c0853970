//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serenity::UserId;
use tokio::sync::Mutex;

use crate::presence::ledger::StatusLedger;
use crate::presence::notifier::NotificationState;
use crate::serenity;
use crate::setup::TrackingConfig;

/// The data kept between shards
#[derive(Debug)]
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Notice flags of the tracked roles.
    /// Held for the whole handling of a presence update, so updates are processed one at a time.
    pub notices: Mutex<NotificationState>,
    /// Last status seen per user.
    pub ledger: Mutex<StatusLedger>,
    /// Where notices go.
    pub tracking: TrackingConfig,
    /// Set when the bot starts shutting down.
    closing: Arc<AtomicBool>,
}

impl Data {
    pub fn new(
        notify_list: HashSet<UserId>,
        tracking: TrackingConfig,
        closing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            notify_list,
            notices: Mutex::default(),
            ledger: Mutex::default(),
            tracking,
            closing,
        }
    }

    /// Whether presence updates should be ignored because shutdown has begun.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}
