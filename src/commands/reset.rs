//! Implements the `/reset_notices` command.
//!
//! Once a role has announced being online it won't do so again while the bot runs.
//! This clears every notice flag so the next transitions are announced.

use poise::CreateReply;
use tracing::instrument;

use crate::Context;
use crate::HeraldError;

/// Forget which presence notices were already sent.
#[instrument(skip(ctx))]
#[poise::command(slash_command, owners_only)]
pub async fn reset_notices(ctx: Context<'_>) -> Result<(), HeraldError> {
    ctx.data().notices.lock().await.reset();
    tracing::info!("Notice flags reset by {}.", ctx.author().name);

    let reply = CreateReply::default()
        .ephemeral(true)
        .content("Notice flags cleared, the next online and offline changes will be announced.");
    ctx.send(reply).await?;
    Ok(())
}
