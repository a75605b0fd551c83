//! Subscriber-facing message rendering (Telegram HTML).

use crate::{
    billing::types::{AccountBalance, BalanceSnapshot, ChangeNotification, FetchFailure},
    domain::AccountRealm,
};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Format a minor-unit amount as a two-decimal currency-unit string.
pub fn format_minor(minor: i64) -> String {
    format!("{:.2}", minor as f64 / 100.0)
}

/// Format an already-normalized currency-unit amount.
pub fn format_units(units: f64) -> String {
    format!("{units:.2}")
}

/// Partially redact an account id for user-facing text.
///
/// Ids of up to 4 characters become all asterisks of equal length; longer
/// ids keep the first 2 and last 2 characters. Missing/empty ids render as
/// `****`.
pub fn mask_account_id(id: Option<&str>) -> String {
    let id = id.unwrap_or("").trim();
    if id.is_empty() {
        return "****".to_string();
    }

    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }

    let first: String = chars[..2].iter().collect();
    let last: String = chars[chars.len() - 2..].iter().collect();
    let stars = "*".repeat(chars.len() - 4);
    format!("{first}{stars}{last}")
}

/// Render a referral-balance change for the subscriber.
pub fn render_change_notification(n: &ChangeNotification) -> String {
    let profile = n.realm.profile();
    let cur = profile.currency_symbol;
    let new = format_units(n.new);

    let mut message = "\u{1F514} <b>Your referral balance changed</b>\n\n".to_string();
    message.push_str(&format!("{} {} #{}\n", profile.flag, profile.code, n.masked_id));
    match n.old {
        Some(old) => {
            let old = format_units(old);
            message.push_str(&format!("<s>{old}{cur}</s> \u{2192} <b>{new}{cur}</b>"));
        }
        // First observation under notify-on-first: there is no old value.
        None => message.push_str(&format!("Baseline: <b>{new}{cur}</b>")),
    }
    message
}

/// Render one realm's `/balance` reply.
///
/// `mask_id` is false for direct commands (the subscriber already owns the
/// account) and true everywhere the message may leave the private chat.
pub fn render_account_balance(
    realm: AccountRealm,
    snapshot: &BalanceSnapshot,
    mask_id: bool,
) -> String {
    match snapshot {
        BalanceSnapshot::Success(b) => render_success(realm, b, mask_id),
        BalanceSnapshot::Failure(f) => render_failure(realm, f),
    }
}

fn render_success(realm: AccountRealm, b: &AccountBalance, mask_id: bool) -> String {
    let profile = realm.profile();
    let cur = profile.currency_symbol;
    let display_id = if mask_id {
        mask_account_id(b.id.as_deref())
    } else {
        b.id.clone().unwrap_or_else(|| "N/A".to_string())
    };

    let mut message = format!(
        "{} <b>{} #{}</b>\n\n",
        profile.flag,
        profile.label,
        escape_html(&display_id)
    );
    message.push_str(&format!(
        "\u{1F4B5} Main balance: <b>{} {cur}</b>\n",
        format_minor(b.balance)
    ));
    message.push_str(&format!(
        "\u{1F4B8} Referral balance: <b>{} {cur}</b>\n",
        format_minor(b.withdraw_balance)
    ));
    message.push_str(&format!(
        "\u{1F4C8} Total earned: <b>{} {cur}</b>\n",
        format_minor(b.month_earned)
    ));
    if b.bonus_balance > 0 {
        message.push_str(&format!(
            "\u{1F381} Bonus balance: <b>{} {cur}</b>\n",
            format_minor(b.bonus_balance)
        ));
    }
    if let Some(percent) = b.referral_percent {
        message.push_str(&format!(
            "\u{1F3AF} Referral rate: <b>{:.1}%</b>\n",
            percent * 100.0
        ));
    }
    let email = b.email.as_deref().unwrap_or("not set");
    message.push_str(&format!(
        "\u{1F4E7} Email: <tg-spoiler>{}</tg-spoiler>",
        escape_html(email)
    ));
    message
}

fn render_failure(realm: AccountRealm, f: &FetchFailure) -> String {
    let profile = realm.profile();
    let mut message = format!("{} <b>{}</b>\n\n", profile.flag, profile.label);
    if f.is_auth_error() {
        message.push_str("\u{274C} Authorization failed: the API key is invalid");
    } else {
        message.push_str(&format!("\u{274C} Error: {}", escape_html(&f.message)));
    }
    message
}

/// One-line referral summary used by inline query result descriptions.
pub fn inline_description(b: &AccountBalance, realm: AccountRealm) -> String {
    let cur = realm.profile().currency_symbol;
    let percent = b.referral_percent.unwrap_or(0.0) * 100.0;
    format!(
        "\u{1F4B8} {}{cur} | \u{1F4C8} {}{cur} | \u{1F3AF} {percent:.1}%",
        format_minor(b.withdraw_balance),
        format_minor(b.month_earned)
    )
}

/// Inline query result body: referral-focused subset of the balance reply.
pub fn render_inline_balance(realm: AccountRealm, b: &AccountBalance) -> String {
    let profile = realm.profile();
    let cur = profile.currency_symbol;
    let masked = mask_account_id(b.id.as_deref());
    let percent = b.referral_percent.unwrap_or(0.0) * 100.0;

    format!(
        "{} <b>{} #{}</b>\n\n\
         \u{1F4B8} Referral balance: <b>{} {cur}</b>\n\
         \u{1F4C8} Total earned: <b>{} {cur}</b>\n\
         \u{1F3AF} Referral rate: <b>{percent:.1}%</b>",
        profile.flag,
        profile.label,
        masked,
        format_minor(b.withdraw_balance),
        format_minor(b.month_earned)
    )
}
