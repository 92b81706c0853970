use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use poise::serenity_prelude as serenity;

mod commands;
mod data;
mod error;
mod events;
mod log;
mod presence;
mod setup;

pub use data::Data;
pub use error::HeraldError;
pub use setup::Config;

use presence::shutdown::Shutdown;

type Context<'a> = poise::Context<'a, Data, HeraldError>;

#[tokio::main]
async fn main() -> Result<(), HeraldError> {
    // Load before reading the config, DISCORD_TOKEN may live in .env
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Couldn't load .env: {e}");
        }
    }

    let config = Config::read()?;
    let _guard = log::install_tracing(&config);

    let shutdown_channel = config.tracking().notify_channel().to_string();
    let grace = config.tracking().shutdown_grace();
    let closing = Arc::new(AtomicBool::new(false));

    let mut client = setup::client(config, closing.clone()).await?;

    let shutdown = Shutdown {
        closing,
        http: client.http.clone(),
        cache: client.cache.clone(),
        shard_manager: client.shard_manager.clone(),
        channel_name: shutdown_channel,
        grace,
    };
    tokio::spawn(shutdown.on_termination());

    tracing::info!("Starting client...");
    // An invalid token ends up here and stops the bot.
    client.start().await?;
    tracing::info!("Client stopped.");

    Ok(())
}
