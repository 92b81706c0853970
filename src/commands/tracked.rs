//! Implements the `/tracked` command.
//!
//! Lists the tracked bots that are online right now, using the same rules as the
//! shutdown announcement.

use poise::CreateReply;
use tracing::instrument;

use crate::error::UserError;
use crate::presence::shutdown::online_tracked_bots;
use crate::presence::shutdown::BotSnapshot;
use crate::Context;
use crate::HeraldError;

/// Shows which tracked bots are online.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 5)]
pub async fn tracked(ctx: Context<'_>) -> Result<(), HeraldError> {
    let snapshots: Vec<BotSnapshot> = {
        let guild = ctx.guild().ok_or(UserError::GuildOnly)?;
        guild
            .members
            .values()
            .map(|member| BotSnapshot::capture(&guild, member))
            .collect()
    };

    let mut names = online_tracked_bots(&snapshots);
    names.sort_unstable();

    let content = if names.is_empty() {
        "No tracked bots are currently online.".to_string()
    } else {
        format!("Tracked bots online: {}", names.join(", "))
    };

    ctx.send(CreateReply::default().ephemeral(true).content(content))
        .await?;
    Ok(())
}
