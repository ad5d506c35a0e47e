//! Bot layer - Discord-specific interface and command handlers
//!
//! This module exposes the group-buy engine to chat users through slash
//! commands and owns the bot context shared by all of them.

/// Discord command implementations (group buy, general)
pub mod commands;
/// Message formatting for command replies
pub mod format;

use crate::{core::GroupBuyEngine, errors::Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Engine every command talks to
    pub engine: GroupBuyEngine,
}

impl BotData {
    /// Creates a new `BotData` around an engine.
    #[must_use]
    pub const fn new(engine: GroupBuyEngine) -> Self {
        Self { engine }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
            if let Err(e) = ctx.say(format::error_reply(&error)).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Registers the slash commands and runs the Discord client until it stops.
///
/// # Errors
/// Returns an error if the client cannot be built or the gateway connection fails.
#[instrument(skip(token, engine))]
pub async fn run_bot(token: String, engine: GroupBuyEngine) -> Result<(), Error> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::groupbuy(), commands::ping(), commands::help()],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered globally");
                Ok(BotData::new(engine))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Starting bot client...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}
