//! Event handling

use poise::FrameworkContext;
use serenity::FullEvent;
use serenity::OnlineStatus;
use serenity::Presence;
use serenity::UserId;
use tracing::instrument;

use crate::presence::find_channel;
use crate::presence::notifier::PresenceChange;
use crate::presence::ChannelSink;
use crate::presence::NoticeSink;
use crate::presence::TrackedRole;
use crate::serenity;
use crate::Data;
use crate::HeraldError;

/// Dispatch the gateway events the bot cares about.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &FullEvent,
    _fw: FrameworkContext<'_, Data, HeraldError>,
    data: &Data,
) -> Result<(), HeraldError> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            let bot_name = &data_about_bot.user.name;
            tracing::info!("{bot_name} is ready!");
        }
        FullEvent::GuildCreate { guild, .. } => {
            let statuses = guild.presences.values().map(|p| (p.user.id, p.status));
            data.ledger.lock().await.seed(statuses);
            tracing::debug!(
                "Seeded {} presences from guild {}.",
                guild.presences.len(),
                guild.name
            );
        }
        FullEvent::PresenceUpdate { new_data } => presence_update(ctx, new_data, data).await?,
        _ => {}
    }
    Ok(())
}

/// Turn a presence update into notices for the tracked roles the member holds.
#[instrument(level = "debug", skip_all, fields(user = %presence.user.id))]
async fn presence_update(
    ctx: &serenity::Context,
    presence: &Presence,
    data: &Data,
) -> Result<(), HeraldError> {
    let Some(guild_id) = presence.guild_id else {
        return Ok(());
    };
    let user_id = presence.user.id;

    // Copy out of the cache, its guards can't be held across an await.
    let (roles, channel) = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Ok(());
        };
        let roles = guild
            .members
            .get(&user_id)
            .map(|member| TrackedRole::held_by(&guild, &member.roles))
            .unwrap_or_default();
        let channel = find_channel(&guild, data.tracking.notify_channel());
        (roles, channel)
    };

    let sink = channel.map(|channel| ChannelSink::new(ctx.http.clone(), channel));
    let sent = record_presence(
        data,
        user_id,
        presence.status,
        roles,
        sink.as_ref().map(|s| s as &dyn NoticeSink),
    )
    .await?;
    if sent > 0 {
        tracing::info!("Posted {sent} presence notice(s).");
    }

    Ok(())
}

/// Record `status` for `user` and post the notices the transition calls for.
/// Ignored once shutdown has begun. Returns how many notices were posted.
async fn record_presence(
    data: &Data,
    user: UserId,
    status: OnlineStatus,
    roles: Vec<TrackedRole>,
    sink: Option<&dyn NoticeSink>,
) -> Result<usize, HeraldError> {
    if data.is_closing() {
        return Ok(0);
    }

    // Locked until the notices are posted.
    let mut notices = data.notices.lock().await;
    let before = data.ledger.lock().await.observe(user, status);

    let change = PresenceChange {
        before,
        after: status,
        roles,
    };
    tracing::debug!("{:?} -> {:?} for {:?}", change.before, change.after, change.roles);

    notices.apply(&change, sink).await
}
