//! Logging functionality and error reporting.
//! The logging library of choice is [tracing].

use poise::BoxFuture;
use poise::CreateReply;
use poise::FrameworkError;
use serenity::CreateMessage;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::serenity;
use crate::Config;
use crate::Context;
use crate::Data;
use crate::HeraldError;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Setup format layers, tracing subscribers, and installs tracing.
/// The returned guard must be kept alive for file logs to be flushed.
pub(super) fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    // Uses local time.
    let timer = fmt::time::ChronoLocal::rfc_3339();
    let debug = config.console_debug();

    // By default, all INFO traces and above are shown.
    let target = if debug {
        Targets::new()
            .with_default(LevelFilter::INFO)
            .with_target(THIS_CRATE, LevelFilter::DEBUG)
    } else {
        Targets::new().with_default(LevelFilter::INFO)
    };

    // Source locations are only worth the noise in debug mode.
    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_file(debug)
        .with_level(true)
        .with_line_number(debug)
        .with_target(true)
        .with_timer(timer.clone())
        .pretty()
        .with_filter(target.clone());

    // File logs go to "{log_dir}/{THIS_CRATE}.log.{TIMESTAMP}", rolled hourly.
    let (log_layer, guard) = if config.logs_enabled() {
        let appender =
            tracing_appender::rolling::hourly(config.log_dir(), format!("{THIS_CRATE}.log"));
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(debug)
            .with_level(true)
            .with_line_number(debug)
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .compact()
            .with_filter(target);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(log_layer)
        .init();

    guard
}

/// Defines how framework errors are handled.
/// [UserError]s are answered with an ephemeral reply, anything unexpected is
/// logged as an error and reported to the notify list.
pub fn handle_framework_error(err: FrameworkError<Data, HeraldError>) -> BoxFuture<()> {
    let handler = async move {
        match err {
            // Not visible to users.
            FrameworkError::Setup { error, .. } => error!("Error during startup: {error}"),
            FrameworkError::EventHandler { error, event, .. } => {
                error!("Error while handling event. Event: {event:?} Error: {error}")
            }

            // Users are told what went wrong, logged at debug.
            FrameworkError::Command {
                error: HeraldError::UserError(user_error),
                ctx,
                ..
            } => user_facing(&ctx, user_error).await,
            FrameworkError::CooldownHit {
                remaining_cooldown,
                ctx,
                ..
            } => user_facing(&ctx, UserError::OnCooldown { remaining_cooldown }).await,
            FrameworkError::NotAnOwner { ctx, .. } => user_facing(&ctx, UserError::NotOwner).await,
            FrameworkError::GuildOnly { ctx, .. } => user_facing(&ctx, UserError::GuildOnly).await,

            // Unexpected, logged as error! and reported.
            FrameworkError::Command { error, ctx, .. } => {
                Response::builder()
                    .ctx(&ctx)
                    .reply("Something went wrong... A bug report has been sent.")
                    .source(error)
                    .report(true)
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::CommandPanic { payload, ctx, .. } => {
                Response::builder()
                    .ctx(&ctx)
                    .reply("Something went horribly wrong... A bug report has been sent.")
                    .source(HeraldError::Panic { payload })
                    .report(true)
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::CommandStructureMismatch {
                description, ctx, ..
            } => {
                let error = HeraldError::CommandStructureMismatch {
                    description: description.to_string(),
                };

                Response::builder()
                    .ctx(&ctx.into())
                    .reply("Commands are out of date. Please wait until discord catches up to a bot update.")
                    .source(error)
                    .report(true)
                    .build()
                    .send()
                    .await;
            }

            other => error!("Unhandled framework error: {other}"),
        }
    };

    Box::pin(handler)
}

/// Tell the user what they did wrong.
async fn user_facing(ctx: &Context<'_>, user_error: UserError) {
    Response::builder()
        .ctx(ctx)
        .reply(user_error.to_string())
        .source(user_error)
        .build()
        .send()
        .await;
}

/// DM everyone on the notify list. Failures are logged, never retried.
async fn notify_bug(ctx: &Context<'_>, content: String) {
    let message = CreateMessage::new().content(content);

    for user in &ctx.data().notify_list {
        if let Err(e) = user.direct_message(ctx, message.clone()).await {
            error!("Failed to send bug notification to {user}. {e}");
        }
    }
}

/// Structured response to a framework error.
/// Logged at [debug level](tracing::debug) unless `report` is set, which logs at
/// [error level](tracing::error) and DMs the notify list.
#[derive(bon::Builder)]
#[builder(on(String, into))]
struct Response<'a> {
    ctx: &'a Context<'a>,
    /// The error causing the response.
    #[builder(into)]
    source: HeraldError,
    /// Ephemeral reply to the command's author.
    reply: String,
    #[builder(default = false)]
    report: bool,
}

impl Response<'_> {
    async fn send(&self) {
        let ctx = self.ctx;
        let source = &self.source;

        if self.report {
            error!("{source}");
            let invocation = format!(
                "{} used {}",
                ctx.author().name,
                ctx.invocation_string()
            );
            notify_bug(ctx, format!("{invocation}\n{source}")).await;
        } else {
            debug!("{source}");
        }

        let reply = CreateReply::default()
            .ephemeral(true)
            .content(self.reply.as_str());
        if let Err(e) = ctx.send(reply).await {
            error!("Failed to reply to {}. {e}", ctx.author().name)
        }
    }
}
