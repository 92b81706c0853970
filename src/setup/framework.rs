//! Setup for [poise::Framework]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::commands;
use crate::serenity;
use crate::Config;
use crate::Data;
use crate::HeraldError;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, HeraldError>;

/// Construct a [poise::Framework]
pub(super) fn framework(config: Config, closing: Arc<AtomicBool>) -> Framework {
    poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config, closing))
        .build()
}

/// Configure options for the [Framework]
fn framework_options() -> poise::FrameworkOptions<Data, HeraldError> {
    poise::FrameworkOptions {
        commands: commands::list(),
        // Presence updates and guild snapshots
        event_handler: |ctx, event, fw, data| {
            Box::pin(crate::events::handle_event(ctx, event, fw, data))
        },
        on_error: |e| crate::log::handle_framework_error(e),
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    config: Config,
    closing: Arc<AtomicBool>,
) -> poise::BoxFuture<'a, Result<Data, HeraldError>> {
    Box::pin(async move {
        let commands = &commands::list();
        let app_commands = poise::builtins::create_application_commands(commands);

        serenity::Command::set_global_commands(&ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }

        tracing::info!(
            "{} is watching '{}' for tracked roles.",
            rdy.user.name,
            config.tracking().notify_channel()
        );

        let notify_list = config.notify_list(fw);
        Ok(Data::new(notify_list, config.tracking().clone(), closing))
    })
}
