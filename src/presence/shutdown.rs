//! Announcing which tracked bots go down with us, and the shutdown sequence around it.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use itertools::Itertools;
use serenity::Cache;
use serenity::Guild;
use serenity::Http;
use serenity::Member;
use serenity::OnlineStatus;
use serenity::ShardManager;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::find_channel;
use super::ChannelSink;
use super::NoticeSink;
use super::TrackedRole;
use crate::serenity;
use crate::HeraldError;

/// What the announcer needs to know about a guild member.
#[derive(Debug, Clone)]
pub struct BotSnapshot {
    pub name: String,
    pub bot: bool,
    pub roles: Vec<TrackedRole>,
    pub status: OnlineStatus,
}

impl BotSnapshot {
    /// Capture `member`, taking its status from the guild's presences.
    /// Members without a presence are offline.
    pub fn capture(guild: &Guild, member: &Member) -> Self {
        let status = guild
            .presences
            .get(&member.user.id)
            .map_or(OnlineStatus::Offline, |p| p.status);

        Self {
            name: member.user.name.clone(),
            bot: member.user.bot,
            roles: TrackedRole::held_by(guild, &member.roles),
            status,
        }
    }

    fn is_online_tracked_bot(&self) -> bool {
        self.bot && !self.roles.is_empty() && self.status != OnlineStatus::Offline
    }
}

/// Names of the tracked bots that are still online, in the given order.
pub fn online_tracked_bots(members: &[BotSnapshot]) -> Vec<&str> {
    members
        .iter()
        .filter(|m| m.is_online_tracked_bot())
        .map(|m| m.name.as_str())
        .collect()
}

/// The shutdown announcement for the given bot names.
pub fn summary(names: &[&str]) -> String {
    if names.is_empty() {
        "⚠️ No tracked bots are currently online.".to_string()
    } else {
        format!(
            "⚠️ The following bots are going offline: {}",
            names.iter().join(", ")
        )
    }
}

/// Post the shutdown announcement for `members` to `sink`.
pub async fn announce(sink: &dyn NoticeSink, members: &[BotSnapshot]) -> Result<(), HeraldError> {
    let names = online_tracked_bots(members);
    info!("Tracked bots still online: {}", names.len());
    sink.post(&summary(&names)).await
}

/// Scan the first guild's members and announce the online tracked bots.
/// Does nothing if there is no guild or no notification channel.
pub async fn scan_and_announce(
    http: &Arc<Http>,
    cache: &Cache,
    channel_name: &str,
) -> Result<(), HeraldError> {
    let Some(guild_id) = cache.guilds().first().copied() else {
        warn!("Not in any guild, skipping shutdown announcement.");
        return Ok(());
    };
    let channel = cache
        .guild(guild_id)
        .and_then(|guild| find_channel(&guild, channel_name));
    let Some(channel) = channel else {
        warn!("No '{channel_name}' channel, skipping shutdown announcement.");
        return Ok(());
    };

    let members: Vec<Member> = guild_id.members_iter(http).try_collect().await?;

    let snapshots: Vec<BotSnapshot> = match cache.guild(guild_id) {
        Some(guild) => members
            .iter()
            .map(|member| BotSnapshot::capture(&guild, member))
            .collect(),
        None => return Ok(()),
    };

    let sink = ChannelSink::new(http.clone(), channel);
    announce(&sink, &snapshots).await
}

/// Everything needed to shut down in order once a termination signal arrives.
pub struct Shutdown {
    /// Set once shutdown starts, the event handler stops taking presence updates.
    pub closing: Arc<AtomicBool>,
    pub http: Arc<Http>,
    pub cache: Arc<Cache>,
    pub shard_manager: Arc<ShardManager>,
    pub channel_name: String,
    /// Deadline for the announcement.
    pub grace: Duration,
}

impl Shutdown {
    /// Wait for SIGINT or SIGTERM, then stop intake, announce and close the shards.
    /// The shutdown runs once; a second signal while the shards close exits the process.
    pub async fn on_termination(self) {
        if let Err(e) = termination().await {
            error!("Couldn't listen for termination signals. {e}");
            return;
        }
        info!("Termination requested, shutting down.");
        self.run().await;
    }

    async fn run(self) {
        self.closing.store(true, Ordering::SeqCst);

        let announcement = scan_and_announce(&self.http, &self.cache, &self.channel_name);
        announce_within(self.grace, announcement).await;

        // A second signal forces the exit if the shards won't close.
        tokio::select! {
            _ = self.shard_manager.shutdown_all() => {}
            _ = termination() => {
                warn!("Second termination signal, exiting without closing shards.");
                std::process::exit(1);
            }
        }
    }
}

/// Run `announcement`, abandoning it once `grace` has passed.
/// Returns whether it was sent.
pub async fn announce_within<F>(grace: Duration, announcement: F) -> bool
where
    F: Future<Output = Result<(), HeraldError>>,
{
    match tokio::time::timeout(grace, announcement).await {
        Ok(Ok(())) => {
            info!("Shutdown announcement sent.");
            true
        }
        Ok(Err(e)) => {
            error!("Failed to send shutdown announcement. {e}");
            false
        }
        Err(_) => {
            warn!(
                "Shutdown announcement abandoned after {}s.",
                grace.as_secs_f32()
            );
            false
        }
    }
}

/// Resolves on the first interrupt or terminate signal.
#[cfg(unix)]
async fn termination() -> std::io::Result<()> {
    use tokio::signal::unix::signal;
    use tokio::signal::unix::SignalKind;

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
