//! Error types used throughout the bot.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Top level error for anything that can go wrong while running the bot.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// Error that the user of a command caused and should be shown to them.
    #[error(transparent)]
    UserError(#[from] UserError),

    /// Failures while reading or validating `config.toml`.
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Anything the discord client reports (http, gateway, auth).
    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Command panicked: {}", .payload.as_deref().unwrap_or("no payload"))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Errors caused by the user of a command.
/// The [Display](std::fmt::Display) text is sent back to them as is.
#[derive(Error, Debug)]
pub enum UserError {
    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("Only the bot owners can use this command.")]
    NotOwner,

    #[error("Slow down! Try again in {} seconds.", .remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },
}

/// Errors while loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("No discord token. Set DISCORD_TOKEN or `discord_token` in config.toml.")]
    MissingToken,

    #[error("Couldn't access config file: {0}")]
    IoError(#[from] std::io::Error),
}
