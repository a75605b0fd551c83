use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{
        InlineQuery, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
        InputMessageContentText, ParseMode,
    },
};
use tracing::{debug, warn};

use abb_core::{
    billing::types::BalanceSnapshot,
    domain::AccountRealm,
    errors::Error,
    formatting::{inline_description, render_inline_balance},
};

use crate::router::AppState;

/// Answer `@bot ru` / `@bot net` style inline queries with a referral
/// summary article per matching realm (ids masked: inline results can land
/// in any chat).
pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let query = q.query.to_lowercase();
    debug!(user_id = q.from.id.0, query = %query, "inline query");

    let mut results: Vec<InlineQueryResult> = Vec::new();

    for realm in AccountRealm::ALL {
        if !realm_matches(realm, &query) {
            continue;
        }
        match state.fetcher.fetch_one(realm).await {
            Ok(snapshot) => results.push(realm_article(realm, &snapshot)),
            // Unconfigured realm: silently absent from inline results.
            Err(Error::Config(_)) => {}
            Err(e) => {
                warn!(%realm, error = %e, "inline balance fetch failed");
                results.push(error_article(realm));
            }
        }
    }

    if results.is_empty() {
        results.push(hint_article());
    }

    bot.answer_inline_query(q.id, results)
        .cache_time(state.cfg.inline_cache_secs)
        .await?;

    Ok(())
}

fn realm_matches(realm: AccountRealm, query: &str) -> bool {
    match realm {
        AccountRealm::Domestic => query.contains("ru"),
        AccountRealm::International => query.contains("net") || query.contains("international"),
    }
}

fn realm_article(realm: AccountRealm, snapshot: &BalanceSnapshot) -> InlineQueryResult {
    let profile = realm.profile();
    match snapshot {
        BalanceSnapshot::Success(b) => article(
            format!("{}_balance", profile.code),
            format!("{} {} balance", profile.flag, profile.code.to_uppercase()),
            inline_description(b, realm),
            render_inline_balance(realm, b),
        ),
        BalanceSnapshot::Failure(f) => {
            let text = if f.is_auth_error() {
                format!(
                    "{} <b>{}</b>\n\n\u{274C} Authorization failed: the API key is invalid",
                    profile.flag, profile.label
                )
            } else {
                format!(
                    "{} <b>{}</b>\n\n\u{274C} Error: {}",
                    profile.flag,
                    profile.label,
                    abb_core::formatting::escape_html(&f.message)
                )
            };
            article(
                format!("{}_error", profile.code),
                format!("{} {}", profile.flag, profile.label),
                "\u{274C} Fetch failed".to_string(),
                text,
            )
        }
    }
}

fn error_article(realm: AccountRealm) -> InlineQueryResult {
    let profile = realm.profile();
    article(
        format!("{}_error", profile.code),
        "\u{274C} Error".to_string(),
        "Could not fetch data".to_string(),
        "\u{274C} <b>Could not fetch data</b>\n\nTry again later.".to_string(),
    )
}

fn hint_article() -> InlineQueryResult {
    article(
        "unknown".to_string(),
        "\u{2753} Unknown query".to_string(),
        "Use: ru, net".to_string(),
        "\u{2753} <b>Unknown query</b>\n\nAvailable queries:\n\
         \u{2022} ru - domestic account\n\
         \u{2022} net - international account"
            .to_string(),
    )
}

fn article(
    id: String,
    title: String,
    description: String,
    message_html: String,
) -> InlineQueryResult {
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            id,
            title,
            InputMessageContent::Text(
                InputMessageContentText::new(message_html).parse_mode(ParseMode::Html),
            ),
        )
        .description(description),
    )
}
