//! Aeza billing API adapter (reqwest).
//!
//! Implements the `abb-core` BillingPort over `GET <base>/desktop` with
//! `X-API-Key` authentication. One client per realm; each carries its own
//! credential and base endpoint.
//!
//! Outcome classification (disjoint by design):
//! - response with an application error body -> failure snapshot (slug/message)
//! - response with a valid account payload  -> success snapshot
//! - no response (DNS/timeout/reset)        -> transport failure snapshot
//! - anything else (malformed payload)      -> `Err`, converted by the fetcher
//!
//! No retries here; retries, if any, belong to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;

use abb_core::{
    billing::{
        port::BillingPort,
        types::{AccountBalance, BalanceSnapshot, FetchFailure},
    },
    config::RealmCredentials,
    domain::AccountRealm,
    errors::Error,
    Result,
};

const BALANCE_ENDPOINT: &str = "/desktop";

pub struct AezaClient {
    realm: AccountRealm,
    base_url: String,
    http: reqwest::Client,
}

impl AezaClient {
    pub fn new(realm: AccountRealm, creds: &RealmCredentials, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&creds.api_key)
            .map_err(|_| Error::Config(format!("API key for realm {realm} is not a valid header value")))?;
        key.set_sensitive(true);
        headers.insert("X-API-Key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        Ok(Self {
            realm,
            base_url: creds.base_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl BillingPort for AezaClient {
    async fn fetch_balance(&self) -> Result<BalanceSnapshot> {
        let url = format!("{}{BALANCE_ENDPOINT}", self.base_url);
        debug!(realm = %self.realm, %url, "requesting balance");

        let resp = match self.http.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // DNS failure, connect refusal, timeout: no response at all.
                return Ok(BalanceSnapshot::Failure(FetchFailure::no_response(
                    transport_message(&e),
                )));
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(BalanceSnapshot::Failure(FetchFailure::no_response(
                    transport_message(&e),
                )));
            }
        };

        classify_response(status, &body)
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "no response from Aeza API: request timed out".to_string()
    } else {
        format!("no response from Aeza API: {e}")
    }
}

/// Classify a received response body into a snapshot.
///
/// Kept free of I/O so the wire contract is unit-testable.
fn classify_response(status: u16, body: &str) -> Result<BalanceSnapshot> {
    let envelope: DesktopEnvelope = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            if (200..300).contains(&status) {
                // A 2xx we cannot decode is an adapter-level surprise, not
                // an API error the subscriber should branch on.
                return Err(Error::External(format!(
                    "unexpected response shape from Aeza API: {e}"
                )));
            }
            return Ok(BalanceSnapshot::Failure(FetchFailure::application(
                status,
                None,
                format!("HTTP {status}"),
            )));
        }
    };

    if let Some(err) = envelope.error {
        let message = err
            .message
            .or_else(|| err.slug.clone())
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Ok(BalanceSnapshot::Failure(FetchFailure::application(
            status, err.slug, message,
        )));
    }

    let Some(account) = envelope.data.and_then(|d| d.account) else {
        return Err(Error::External(
            "unexpected response shape from Aeza API: missing data.account".to_string(),
        ));
    };

    Ok(BalanceSnapshot::Success(account.into()))
}

// ---- wire model -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DesktopEnvelope {
    #[serde(default)]
    data: Option<DesktopData>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct DesktopData {
    #[serde(default)]
    account: Option<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    /// The API has returned both numeric and string ids over time.
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    balance: i64,
    #[serde(default)]
    withdraw_balance: i64,
    #[serde(default)]
    bonus_balance: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    referral_state: Option<WireReferralState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReferralState {
    #[serde(default)]
    month_earned: i64,
    #[serde(default)]
    state: Option<WireTierState>,
}

#[derive(Debug, Deserialize)]
struct WireTierState {
    #[serde(default)]
    current: Option<WireTier>,
}

#[derive(Debug, Deserialize)]
struct WireTier {
    #[serde(default)]
    percent: Option<f64>,
}

impl From<WireAccount> for AccountBalance {
    fn from(w: WireAccount) -> Self {
        let (month_earned, referral_percent) = match w.referral_state {
            Some(rs) => (
                rs.month_earned,
                rs.state.and_then(|s| s.current).and_then(|c| c.percent),
            ),
            None => (0, None),
        };

        AccountBalance {
            id: w.id.and_then(id_string),
            balance: w.balance,
            withdraw_balance: w.withdraw_balance,
            bonus_balance: w.bonus_balance,
            month_earned,
            referral_percent,
            email: w.email.filter(|e| !e.trim().is_empty()),
        }
    }
}

fn id_string(v: serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abb_core::billing::types::FailureKind;

    #[test]
    fn decodes_success_payload() {
        let body = r#"{
          "data": {
            "account": {
              "id": 123456,
              "balance": 1000000,
              "withdrawBalance": 12345,
              "bonusBalance": 0,
              "email": "user@example.test",
              "referralState": {
                "monthEarned": 54321,
                "state": { "current": { "percent": 0.15 } }
              }
            }
          }
        }"#;

        let snap = classify_response(200, body).unwrap();
        let b = snap.success().unwrap();
        assert_eq!(b.id.as_deref(), Some("123456"));
        assert_eq!(b.balance, 1_000_000);
        assert_eq!(b.withdraw_balance, 12_345);
        assert_eq!(b.month_earned, 54_321);
        assert_eq!(b.referral_percent, Some(0.15));
        assert_eq!(b.email.as_deref(), Some("user@example.test"));
    }

    #[test]
    fn missing_monetary_fields_default_to_zero() {
        let body = r#"{ "data": { "account": { "id": "ab12" } } }"#;
        let snap = classify_response(200, body).unwrap();
        let b = snap.success().unwrap();
        assert_eq!(b.balance, 0);
        assert_eq!(b.withdraw_balance, 0);
        assert_eq!(b.month_earned, 0);
        assert_eq!(b.referral_percent, None);
    }

    #[test]
    fn decodes_error_body_as_application_failure() {
        let body = r#"{ "error": { "message": "Unauthorized", "slug": "not_auth" } }"#;
        let snap = classify_response(401, body).unwrap();
        let f = snap.failure().unwrap();
        assert_eq!(f.kind, FailureKind::Application);
        assert_eq!(f.status, Some(401));
        assert_eq!(f.slug.as_deref(), Some("not_auth"));
        assert!(f.is_auth_error());
        assert_eq!(f.message, "Unauthorized");
    }

    #[test]
    fn error_body_without_message_falls_back_to_slug() {
        let body = r#"{ "error": { "slug": "rate_limited" } }"#;
        let snap = classify_response(429, body).unwrap();
        let f = snap.failure().unwrap();
        assert_eq!(f.message, "rate_limited");
    }

    #[test]
    fn non_json_error_status_becomes_http_failure() {
        let snap = classify_response(502, "<html>Bad Gateway</html>").unwrap();
        let f = snap.failure().unwrap();
        assert_eq!(f.kind, FailureKind::Application);
        assert_eq!(f.message, "HTTP 502");
        assert_eq!(f.slug, None);
    }

    #[test]
    fn malformed_success_body_is_an_unexpected_error() {
        assert!(classify_response(200, "not json").is_err());
        assert!(classify_response(200, r#"{ "data": {} }"#).is_err());
    }

    #[test]
    fn string_and_numeric_ids_normalize() {
        assert_eq!(
            id_string(serde_json::json!("abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(id_string(serde_json::json!(42)), Some("42".to_string()));
        assert_eq!(id_string(serde_json::json!("")), None);
        assert_eq!(id_string(serde_json::json!(null)), None);
    }
}
