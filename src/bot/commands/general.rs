//! General Discord commands - ping and help.
//! These commands don't touch the engine.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let settings = ctx.data().engine.settings();
        let help_text = format!(
            "**Group Buy Help**\n\
            Team up with other buyers: once a group reaches its target size, \
            every member gets a voucher.\n\n\
            **Group Buy Commands**\n\
            • `/groupbuy open <product> [discount]` - Joins the oldest open group for a product, or opens one.\n\
            • `/groupbuy join <group>` - Joins a specific open group.\n\
            • `/groupbuy list <product>` - Shows the groups for a product.\n\
            • `/groupbuy vouchers` - Shows your vouchers.\n\n\
            **Utility Commands**\n\
            • `/ping` - Checks if the bot is responsive.\n\
            • `/help` - Shows this help message.\n\n\
            New groups need {} members and give {}% off. Vouchers are valid for {} months.",
            settings.target_count, settings.default_discount_rate, settings.voucher_validity_months
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
