//! Builds the discord client.

mod config;
mod framework;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::serenity;
use crate::HeraldError;

pub use config::Config;
pub use config::TrackingConfig;

/// Constructs a [serenity::Client] running the [poise::Framework].
/// `closing` is shared with the shutdown sequence.
pub(super) async fn client(
    config: Config,
    closing: Arc<AtomicBool>,
) -> Result<serenity::Client, HeraldError> {
    let token = config.token()?;

    // Member and presence intents are privileged and must be enabled in the developer portal.
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_PRESENCES;

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config, closing))
        .await?;

    Ok(client)
}
