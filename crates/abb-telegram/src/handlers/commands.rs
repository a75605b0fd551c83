use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{info, warn};

use abb_core::{
    domain::{AccountRealm, ChatId},
    formatting::render_account_balance,
};

use crate::router::AppState;

const WELCOME_HTML: &str = "\u{1F916} <b>Welcome to the Aeza Balance Bot!</b>\n\n\
This bot shows your balances and automatically tracks referral balance changes.\n\n\
<b>Commands:</b>\n\
/balance - Show balances for all accounts\n\
/help - Show help\n\n\
<b>About:</b>\n\
The bot uses the official Aeza API (GET desktop endpoint) and checks the \
referral balance for changes every hour.";

const HELP_HTML: &str = "\u{1F198} <b>Help</b>\n\n\
/start - Welcome message\n\
/balance - Show balances for all accounts\n\
/help - Show this help\n\n\
Referral balance changes are reported automatically once monitoring has \
started (it starts on your first command).";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat = ChatId(msg.chat.id.0);
    let (cmd, _args) = parse_command(msg.text().unwrap_or(""));

    match cmd.as_str() {
        "start" => {
            let _ = state.messenger.send_html(chat, WELCOME_HTML).await;
            ensure_monitoring(&state, chat).await;
        }
        "balance" => {
            info!(chat_id = chat.0, "balance requested");
            ensure_monitoring(&state, chat).await;
            send_balances(&state, chat).await;
        }
        "help" => {
            let _ = state.messenger.send_html(chat, HELP_HTML).await;
        }
        _ => {
            let _ = state
                .messenger
                .send_html(chat, "\u{2753} Unknown command. Use /help to see commands.")
                .await;
        }
    }

    Ok(())
}

/// Start the background monitor lazily, on the first qualifying interaction.
async fn ensure_monitoring(state: &AppState, chat: ChatId) {
    state.monitor.start(chat).await;
}

async fn send_balances(state: &AppState, chat: ChatId) {
    let loading = state
        .messenger
        .send_html(chat, "\u{23F3} Fetching balance information...")
        .await
        .ok();

    let snapshots = state.fetcher.fetch_all().await;

    if let Some(loading) = loading {
        let _ = state.messenger.delete_message(loading).await;
    }

    // One message per configured realm, declaration order. Direct command
    // context: the id is shown unmasked.
    for realm in AccountRealm::ALL {
        let Some(snapshot) = snapshots.get(&realm) else {
            continue;
        };
        let html = render_account_balance(realm, snapshot, false);
        if let Err(e) = state.messenger.send_html(chat, &html).await {
            warn!(%realm, error = %e, "failed to send balance reply");
        }
    }
}
