use std::{env, fs, path::Path, time::Duration};

use crate::{domain::AccountRealm, errors::Error, Result};

/// Per-realm API credential: secret key + base endpoint.
///
/// A realm with no credential simply has no `RealmCredentials` entry and is
/// excluded from every operation; that is configuration, not an error.
#[derive(Clone, Debug)]
pub struct RealmCredentials {
    pub api_key: String,
    pub base_url: String,
}

/// Typed configuration for the bot.
///
/// This mirrors the environment surface of the original JS bot as closely as
/// possible (`TELEGRAM_BOT_TOKEN`, `AEZA_API_KEY_RU/NET`, `ALLOWED_USER_ID`),
/// with the polling knobs promoted from hard-coded constants to env vars.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// When set, only this Telegram user may interact with the bot.
    /// Unset means open access (original behavior).
    pub allowed_user_id: Option<i64>,

    pub domestic: Option<RealmCredentials>,
    pub international: Option<RealmCredentials>,

    /// Period of the background balance monitor.
    pub poll_interval: Duration,
    /// Bound on each individual balance fetch.
    pub fetch_timeout: Duration,
    /// Report the first observed balance instead of silently seeding history.
    pub notify_on_first_observation: bool,
    /// Telegram-side cache for inline query answers, seconds.
    pub inline_cache_secs: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let allowed_user_id = env_str("ALLOWED_USER_ID")
            .and_then(non_empty)
            .and_then(|s| s.trim().parse::<i64>().ok());

        let domestic = realm_credentials(
            env_str("AEZA_API_KEY_RU"),
            env_str("AEZA_BASE_URL_RU"),
            AccountRealm::Domestic,
        );
        let international = realm_credentials(
            env_str("AEZA_API_KEY_NET"),
            env_str("AEZA_BASE_URL_NET"),
            AccountRealm::International,
        );

        if domestic.is_none() && international.is_none() {
            return Err(Error::Config(
                "at least one API key is required (AEZA_API_KEY_RU or AEZA_API_KEY_NET)"
                    .to_string(),
            ));
        }

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(3600));
        let fetch_timeout = Duration::from_secs(env_u64("FETCH_TIMEOUT_SECS").unwrap_or(10));
        let notify_on_first_observation =
            env_bool("NOTIFY_ON_FIRST_OBSERVATION").unwrap_or(false);
        let inline_cache_secs = env_u32("INLINE_CACHE_SECS").unwrap_or(30);

        Ok(Self {
            telegram_bot_token,
            allowed_user_id,
            domestic,
            international,
            poll_interval,
            fetch_timeout,
            notify_on_first_observation,
            inline_cache_secs,
        })
    }

    pub fn credentials(&self, realm: AccountRealm) -> Option<&RealmCredentials> {
        match realm {
            AccountRealm::Domestic => self.domestic.as_ref(),
            AccountRealm::International => self.international.as_ref(),
        }
    }

    /// Realms with a registered credential, in declaration order.
    pub fn configured_realms(&self) -> Vec<AccountRealm> {
        AccountRealm::ALL
            .into_iter()
            .filter(|r| self.credentials(*r).is_some())
            .collect()
    }

    /// True when `user_id` may use the bot.
    pub fn is_authorized(&self, user_id: Option<i64>) -> bool {
        match self.allowed_user_id {
            None => true,
            Some(allowed) => user_id == Some(allowed),
        }
    }
}

fn realm_credentials(
    key: Option<String>,
    base_url: Option<String>,
    realm: AccountRealm,
) -> Option<RealmCredentials> {
    let api_key = key.and_then(non_empty)?;
    let base_url = base_url
        .and_then(non_empty)
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| realm.profile().default_base_url.to_string());
    Some(RealmCredentials { api_key, base_url })
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            telegram_bot_token: "token".to_string(),
            allowed_user_id: None,
            domestic: Some(RealmCredentials {
                api_key: "k".to_string(),
                base_url: "https://my.aeza.ru/api".to_string(),
            }),
            international: None,
            poll_interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(10),
            notify_on_first_observation: false,
            inline_cache_secs: 30,
        }
    }

    #[test]
    fn configured_realms_skip_missing_credentials() {
        let cfg = test_config();
        assert_eq!(cfg.configured_realms(), vec![AccountRealm::Domestic]);
        assert!(cfg.credentials(AccountRealm::International).is_none());
    }

    #[test]
    fn realm_credentials_default_base_url_and_trim_slash() {
        let c = realm_credentials(
            Some("key".to_string()),
            None,
            AccountRealm::International,
        )
        .unwrap();
        assert_eq!(c.base_url, "https://my.aeza.net/api");

        let c = realm_credentials(
            Some("key".to_string()),
            Some("https://example.test/api/".to_string()),
            AccountRealm::Domestic,
        )
        .unwrap();
        assert_eq!(c.base_url, "https://example.test/api");
    }

    #[test]
    fn empty_key_means_no_credentials() {
        assert!(realm_credentials(Some("  ".to_string()), None, AccountRealm::Domestic).is_none());
        assert!(realm_credentials(None, None, AccountRealm::Domestic).is_none());
    }

    #[test]
    fn authorization_is_open_without_allowed_user() {
        let mut cfg = test_config();
        assert!(cfg.is_authorized(Some(42)));
        assert!(cfg.is_authorized(None));

        cfg.allowed_user_id = Some(7);
        assert!(cfg.is_authorized(Some(7)));
        assert!(!cfg.is_authorized(Some(42)));
        assert!(!cfg.is_authorized(None));
    }
}
