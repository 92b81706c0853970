//! Deduplicated online/offline notices for the tracked roles.

use std::collections::HashMap;

use serenity::OnlineStatus;

use super::NoticeSink;
use super::TrackedRole;
use crate::serenity;
use crate::HeraldError;

/// Whether each kind of notice has already been posted for a role.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoleFlags {
    pub online_sent: bool,
    pub offline_sent: bool,
}

/// The only statuses that produce notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Online,
    Offline,
}

impl Direction {
    fn of(status: OnlineStatus) -> Option<Self> {
        match status {
            OnlineStatus::Online => Some(Direction::Online),
            OnlineStatus::Offline => Some(Direction::Offline),
            _ => None,
        }
    }

    fn notice(self, role: TrackedRole) -> String {
        match self {
            Direction::Online => format!("🟢 Roles Online: `{role}` have bots online."),
            Direction::Offline => format!("🔴 Roles Offline: `{role}` have bots offline."),
        }
    }
}

/// A member's status moving from `before` to `after`.
#[derive(Debug, Clone)]
pub struct PresenceChange {
    pub before: OnlineStatus,
    pub after: OnlineStatus,
    /// Tracked roles the member holds.
    pub roles: Vec<TrackedRole>,
}

/// Notice flags for every tracked role.
///
/// `offline_sent` is cleared whenever a role's member comes online, but `online_sent`
/// is never cleared by going offline. Once a role has announced being online it stays
/// quiet about it until [NotificationState::reset].
#[derive(Debug)]
pub struct NotificationState {
    flags: HashMap<TrackedRole, RoleFlags>,
}

impl Default for NotificationState {
    fn default() -> Self {
        let flags = TrackedRole::ALL
            .into_iter()
            .map(|role| (role, RoleFlags::default()))
            .collect();
        Self { flags }
    }
}

impl NotificationState {
    pub fn flags(&self, role: TrackedRole) -> RoleFlags {
        self.flags.get(&role).copied().unwrap_or_default()
    }

    /// Forget every notice sent so far.
    pub fn reset(&mut self) {
        self.flags.values_mut().for_each(|f| *f = RoleFlags::default());
    }

    /// Post the notices `change` calls for and update the flags.
    /// Returns how many notices were posted.
    ///
    /// Without a `sink` nothing is posted and no flag changes.
    /// If posting fails the flags of that role stay as they were and the
    /// remaining roles are skipped.
    pub async fn apply(
        &mut self,
        change: &PresenceChange,
        sink: Option<&dyn NoticeSink>,
    ) -> Result<usize, HeraldError> {
        if change.before == change.after || change.roles.is_empty() {
            return Ok(0);
        }
        let Some(direction) = Direction::of(change.after) else {
            return Ok(0);
        };
        let Some(sink) = sink else {
            tracing::debug!("No notification channel, ignoring {direction:?} transition.");
            return Ok(0);
        };

        let mut sent = 0;
        for &role in &change.roles {
            let flags = self.flags.entry(role).or_default();
            match direction {
                Direction::Online => {
                    if !flags.online_sent {
                        sink.post(&direction.notice(role)).await?;
                        flags.online_sent = true;
                        sent += 1;
                    }
                    flags.offline_sent = false;
                }
                Direction::Offline => {
                    if !flags.offline_sent {
                        sink.post(&direction.notice(role)).await?;
                        flags.offline_sent = true;
                        sent += 1;
                    }
                }
            }
            tracing::debug!("{role} flags are now {:?}", self.flags(role));
        }

        Ok(sent)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::UserError;

    /// Keeps every posted notice, optionally failing instead.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NoticeSink for RecordingSink {
        async fn post(&self, content: &str) -> Result<(), HeraldError> {
            if self.fail {
                return Err(UserError::GuildOnly.into());
            }
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    const STALLIONS_ONLINE: &str = "🟢 Roles Online: `The Stallions` have bots online.";
    const STALLIONS_OFFLINE: &str = "🔴 Roles Offline: `The Stallions` have bots offline.";

    fn change(before: OnlineStatus, after: OnlineStatus, roles: &[TrackedRole]) -> PresenceChange {
        PresenceChange {
            before,
            after,
            roles: roles.to_vec(),
        }
    }

    fn stallions(before: OnlineStatus, after: OnlineStatus) -> PresenceChange {
        change(before, after, &[TrackedRole::Stallions])
    }

    #[tokio::test]
    async fn coming_online_posts_and_clears_offline_flag() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        state
            .apply(&stallions(OnlineStatus::Online, OnlineStatus::Offline), Some(&sink))
            .await
            .unwrap();
        assert!(state.flags(TrackedRole::Stallions).offline_sent);

        let sent = state
            .apply(&stallions(OnlineStatus::Offline, OnlineStatus::Online), Some(&sink))
            .await
            .unwrap();

        assert_eq!(sent, 1);
        assert_eq!(sink.sent(), vec![STALLIONS_OFFLINE, STALLIONS_ONLINE]);
        assert_eq!(
            state.flags(TrackedRole::Stallions),
            RoleFlags {
                online_sent: true,
                offline_sent: false
            }
        );
    }

    #[tokio::test]
    async fn repeated_online_is_posted_once() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        for before in [OnlineStatus::Offline, OnlineStatus::Idle] {
            state
                .apply(&stallions(before, OnlineStatus::Online), Some(&sink))
                .await
                .unwrap();
        }

        assert_eq!(sink.sent(), vec![STALLIONS_ONLINE]);
    }

    #[tokio::test]
    async fn online_is_never_announced_twice_across_offline_gap() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        let steps = [
            (OnlineStatus::Offline, OnlineStatus::Online),
            (OnlineStatus::Online, OnlineStatus::Offline),
            (OnlineStatus::Offline, OnlineStatus::Online),
        ];
        for (before, after) in steps {
            state
                .apply(&stallions(before, after), Some(&sink))
                .await
                .unwrap();
        }

        assert_eq!(
            sink.sent(),
            vec![STALLIONS_ONLINE, STALLIONS_OFFLINE],
            "online_sent is not cleared by going offline"
        );

        // The offline flag was cleared by the second online transition.
        state
            .apply(&stallions(OnlineStatus::Online, OnlineStatus::Offline), Some(&sink))
            .await
            .unwrap();
        assert_eq!(sink.sent().len(), 3);
    }

    #[tokio::test]
    async fn reset_allows_online_again() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();
        let online = stallions(OnlineStatus::Offline, OnlineStatus::Online);

        state.apply(&online, Some(&sink)).await.unwrap();
        state.reset();
        state.apply(&online, Some(&sink)).await.unwrap();

        assert_eq!(sink.sent(), vec![STALLIONS_ONLINE, STALLIONS_ONLINE]);
    }

    #[tokio::test]
    async fn untracked_members_are_ignored() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        for (before, after) in [
            (OnlineStatus::Offline, OnlineStatus::Online),
            (OnlineStatus::Online, OnlineStatus::Offline),
        ] {
            let sent = state
                .apply(&change(before, after, &[]), Some(&sink))
                .await
                .unwrap();
            assert_eq!(sent, 0);
        }

        assert!(sink.sent().is_empty());
        assert_eq!(state.flags(TrackedRole::Stallions), RoleFlags::default());
    }

    #[tokio::test]
    async fn other_statuses_are_ignored() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        let transitions = [
            (OnlineStatus::Idle, OnlineStatus::DoNotDisturb),
            (OnlineStatus::Online, OnlineStatus::Idle),
            (OnlineStatus::Offline, OnlineStatus::Invisible),
        ];
        for (before, after) in transitions {
            state
                .apply(&stallions(before, after), Some(&sink))
                .await
                .unwrap();
        }

        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn unchanged_status_is_ignored() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();

        let sent = state
            .apply(&stallions(OnlineStatus::Online, OnlineStatus::Online), Some(&sink))
            .await
            .unwrap();

        assert_eq!(sent, 0);
        assert!(!state.flags(TrackedRole::Stallions).online_sent);
    }

    #[tokio::test]
    async fn missing_channel_changes_nothing() {
        let mut state = NotificationState::default();

        state
            .apply(&stallions(OnlineStatus::Online, OnlineStatus::Offline), None)
            .await
            .unwrap();
        let sent = state
            .apply(&stallions(OnlineStatus::Offline, OnlineStatus::Online), None)
            .await
            .unwrap();

        assert_eq!(sent, 0);
        assert_eq!(state.flags(TrackedRole::Stallions), RoleFlags::default());
    }

    #[tokio::test]
    async fn both_roles_are_handled_independently() {
        let sink = RecordingSink::default();
        let mut state = NotificationState::default();
        let both = [TrackedRole::Stallions, TrackedRole::MemberAssignment];

        let sent = state
            .apply(&change(OnlineStatus::Offline, OnlineStatus::Online, &both), Some(&sink))
            .await
            .unwrap();
        assert_eq!(sent, 2);

        let sent = state
            .apply(
                &change(
                    OnlineStatus::Offline,
                    OnlineStatus::Online,
                    &[TrackedRole::MemberAssignment],
                ),
                Some(&sink),
            )
            .await
            .unwrap();
        assert_eq!(sent, 0);

        assert_eq!(
            sink.sent(),
            vec![
                STALLIONS_ONLINE,
                "🟢 Roles Online: `Member Assignment` have bots online.",
            ]
        );
    }

    #[tokio::test]
    async fn failed_post_leaves_flags_alone() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut state = NotificationState::default();

        let result = state
            .apply(&stallions(OnlineStatus::Online, OnlineStatus::Offline), Some(&sink))
            .await;

        assert!(result.is_err());
        assert_eq!(state.flags(TrackedRole::Stallions), RoleFlags::default());
    }
}
