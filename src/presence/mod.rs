//! Watches members of the tracked roles and posts notices about them.

pub mod ledger;
pub mod notifier;
pub mod shutdown;

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::ChannelType;
use serenity::Guild;
use serenity::Http;
use serenity::RoleId;

use crate::serenity;
use crate::HeraldError;

/// One of the two roles whose bots are watched.
/// Each role keeps its own notice flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedRole {
    Stallions,
    MemberAssignment,
}

impl TrackedRole {
    /// Every tracked role, in the order they are evaluated.
    pub const ALL: [TrackedRole; 2] = [TrackedRole::Stallions, TrackedRole::MemberAssignment];

    /// The role's name as it appears in the guild.
    pub fn name(self) -> &'static str {
        match self {
            TrackedRole::Stallions => "The Stallions",
            TrackedRole::MemberAssignment => "Member Assignment",
        }
    }

    /// The tracked roles among `member_roles`, matched by name against the guild's roles.
    /// A role missing from the guild is simply never held.
    pub fn held_by(guild: &Guild, member_roles: &[RoleId]) -> Vec<TrackedRole> {
        TrackedRole::ALL
            .into_iter()
            .filter(|tracked| {
                guild
                    .role_by_name(tracked.name())
                    .is_some_and(|role| member_roles.contains(&role.id))
            })
            .collect()
    }
}

impl Display for TrackedRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Somewhere notices can be posted to.
#[async_trait]
pub trait NoticeSink: Send + Sync {
    /// Post a single text message.
    async fn post(&self, content: &str) -> Result<(), HeraldError>;
}

/// Posts notices into a guild text channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    http: Arc<Http>,
    channel: ChannelId,
}

impl ChannelSink {
    pub fn new(http: Arc<Http>, channel: ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl NoticeSink for ChannelSink {
    async fn post(&self, content: &str) -> Result<(), HeraldError> {
        self.channel.say(&self.http, content).await?;
        tracing::debug!("Posted notice to {}: {content}", self.channel);
        Ok(())
    }
}

/// Find a text channel of `guild` by name.
/// Looked up fresh every time, a missing channel is not remembered.
pub fn find_channel(guild: &Guild, name: &str) -> Option<ChannelId> {
    guild
        .channels
        .values()
        .filter(|c| matches!(c.kind, ChannelType::Text | ChannelType::News))
        .find(|c| c.name == name)
        .map(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_fixed() {
        assert_eq!(TrackedRole::Stallions.name(), "The Stallions");
        assert_eq!(TrackedRole::MemberAssignment.name(), "Member Assignment");
        assert_eq!(TrackedRole::MemberAssignment.to_string(), "Member Assignment");
    }

    #[test]
    fn roles_are_evaluated_in_declaration_order() {
        assert_eq!(
            TrackedRole::ALL,
            [TrackedRole::Stallions, TrackedRole::MemberAssignment]
        );
    }
}
