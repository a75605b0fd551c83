//! Telegram update handlers.
//!
//! Each handler validates access, then delegates to the core fetcher /
//! monitor and renders with `abb_core::formatting`.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineQuery, Message},
};
use tracing::warn;

use crate::router::AppState;

mod commands;
mod inline;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64);

    if !state.cfg.is_authorized(user_id) {
        warn!(?user_id, chat_id = msg.chat.id.0, "unauthorized message");
        let _ = bot
            .send_message(msg.chat.id, "You do not have access to this bot.")
            .await;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    // Non-command messages are ignored (parity with the original bot).
    Ok(())
}

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;
    if !state.cfg.is_authorized(Some(user_id)) {
        warn!(user_id, "unauthorized inline query ignored");
        return Ok(());
    }

    inline::handle_inline_query(bot, q, state).await
}
