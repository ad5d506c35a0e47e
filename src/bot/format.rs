//! Reply text for group-buy commands.
//!
//! Kept apart from the command handlers so the wording can be tested without
//! a Discord context.

use crate::{
    core::{listing::PoolSummary, pool::JoinOutcome},
    entities::purchase,
    errors::Error,
};
use std::fmt::Write;

/// Message shown to the user when a command fails.
#[must_use]
pub fn error_reply(error: &Error) -> String {
    match error {
        Error::InvalidInput { message } => format!("❌ {message}"),
        Error::AlreadyJoined { pool_id, .. } => {
            format!("❌ You already joined group buy #{pool_id}.")
        }
        Error::PoolNotFound { pool_id } => {
            format!("❌ Group buy #{pool_id} is not open. Use `/groupbuy list` to find another.")
        }
        err if err.is_retryable() => {
            "⚠️ Too many people are joining right now. Please try again.".to_string()
        }
        err => format!("❌ Something went wrong (status {}).", err.status_code()),
    }
}

/// Confirmation after opening or joining a pool.
#[must_use]
pub fn join_reply(outcome: &JoinOutcome) -> String {
    if outcome.complete {
        format!(
            "🎉 Group buy #{} is complete! Your voucher is ready, see `/groupbuy vouchers`.",
            outcome.pool_id
        )
    } else {
        format!(
            "✅ You are in group buy #{}. Vouchers go out once the group is full.",
            outcome.pool_id
        )
    }
}

/// Pool cards for a product.
#[must_use]
pub fn pool_list_reply(product_id: i64, summaries: &[PoolSummary]) -> String {
    if summaries.is_empty() {
        return format!(
            "No group buys for product {product_id} yet. Start one with `/groupbuy open {product_id}`."
        );
    }

    let mut out = format!("**Group buys for product {product_id}**\n");
    for summary in summaries {
        let pool = &summary.pool;
        let status = if pool.is_open() { "open" } else { "complete" };
        let initials: String = summary.participants.iter().map(|b| b.initial).collect();
        let _ = writeln!(
            out,
            "• #{} - {}% off - {}/{} members [{}] ({status})",
            pool.id, pool.discount_rate, summary.participant_count, pool.target_count, initials
        );
    }
    out
}

/// A user's vouchers, newest first.
#[must_use]
pub fn vouchers_reply(purchases: &[purchase::Model]) -> String {
    if purchases.is_empty() {
        return "You have no vouchers yet.".to_string();
    }

    let mut out = String::from("**Your vouchers**\n");
    for purchase in purchases {
        let _ = writeln!(
            out,
            "• `{}` - product {} - valid until {}",
            purchase.voucher_code, purchase.product_id, purchase.expiry_date
        );
    }
    out
}
