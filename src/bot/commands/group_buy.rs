//! Group-buy Discord commands - `/groupbuy open|join|list|vouchers`.
//!
//! Every command resolves the Discord author to an engine user first, so a
//! member's first command registers them with their Discord name as nickname.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format},
        core::listing::PRODUCT_PAGE_LIMIT,
        entities::user,
        errors::{Error, Result},
    };

    async fn author_user(ctx: poise::Context<'_, BotData, Error>) -> Result<user::Model> {
        let author = ctx.author();
        ctx.data()
            .engine
            .ensure_user(&author.id.to_string(), &author.name)
            .await
    }

    /// Parent command for group buys.
    #[poise::command(
        slash_command,
        subcommands("groupbuy_open", "groupbuy_join", "groupbuy_list", "groupbuy_vouchers")
    )]
    pub async fn groupbuy(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Group buy command. Available subcommands:\n\
            `/groupbuy open` - Join or open a group buy for a product\n\
            `/groupbuy join` - Join a specific group buy\n\
            `/groupbuy list` - List group buys for a product\n\
            `/groupbuy vouchers` - Show your vouchers";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Joins the oldest open group buy for a product, or opens a new one.
    #[poise::command(slash_command, rename = "open")]
    pub async fn groupbuy_open(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product to buy together"] product: i64,
        #[description = "Discount in percent for a new group (0-100)"] discount: Option<i32>,
    ) -> Result<()> {
        let user = author_user(ctx).await?;
        let reply = match ctx
            .data()
            .engine
            .create_or_join(product, user.id, discount)
            .await
        {
            Ok(outcome) => format::join_reply(&outcome),
            Err(err) => {
                tracing::warn!(product, user_id = user.id, error = %err, "open failed");
                format::error_reply(&err)
            }
        };

        ctx.say(reply).await?;
        Ok(())
    }

    /// Joins a specific open group buy.
    #[poise::command(slash_command, rename = "join")]
    pub async fn groupbuy_join(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group buy number from `/groupbuy list`"] group: i64,
    ) -> Result<()> {
        let user = author_user(ctx).await?;
        let reply = match ctx.data().engine.join(group, user.id).await {
            Ok(outcome) => format::join_reply(&outcome),
            Err(err) => {
                tracing::warn!(pool_id = group, user_id = user.id, error = %err, "join failed");
                format::error_reply(&err)
            }
        };

        ctx.say(reply).await?;
        Ok(())
    }

    /// Lists the group buys for a product, open ones first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn groupbuy_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product to look up"] product: i64,
    ) -> Result<()> {
        let summaries = ctx
            .data()
            .engine
            .pools_for_product(product, Some(PRODUCT_PAGE_LIMIT))
            .await?;

        ctx.say(format::pool_list_reply(product, &summaries)).await?;
        Ok(())
    }

    /// Shows the vouchers issued to you.
    #[poise::command(slash_command, rename = "vouchers", ephemeral)]
    pub async fn groupbuy_vouchers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = author_user(ctx).await?;
        let purchases = ctx.data().engine.purchases_for_user(user.id).await?;

        ctx.say(format::vouchers_reply(&purchases)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
