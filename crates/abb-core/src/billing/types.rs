use crate::domain::AccountRealm;

/// Result of one fetch attempt for one realm.
///
/// Application and transport failures are data, not errors: a failed realm
/// still produces a snapshot so callers branch without exception-style
/// control flow.
#[derive(Clone, Debug, PartialEq)]
pub enum BalanceSnapshot {
    Success(AccountBalance),
    Failure(FetchFailure),
}

impl BalanceSnapshot {
    pub fn is_success(&self) -> bool {
        matches!(self, BalanceSnapshot::Success(_))
    }

    pub fn success(&self) -> Option<&AccountBalance> {
        match self {
            BalanceSnapshot::Success(b) => Some(b),
            BalanceSnapshot::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            BalanceSnapshot::Success(_) => None,
            BalanceSnapshot::Failure(f) => Some(f),
        }
    }
}

/// Decoded `GET /desktop` account payload.
///
/// All monetary fields are integers in minor units (kopecks / euro cents);
/// divide by 100 for display. Missing fields decode to their defaults, the
/// API omits zeroes for some accounts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountBalance {
    pub id: Option<String>,
    /// Main spendable balance, minor units.
    pub balance: i64,
    /// Withdrawable referral balance, minor units. This is the value the
    /// change detector tracks.
    pub withdraw_balance: i64,
    /// Bonus balance, minor units.
    pub bonus_balance: i64,
    /// Cumulative referral earnings, minor units.
    pub month_earned: i64,
    /// Current referral tier fraction (0.0..=1.0).
    pub referral_percent: Option<f64>,
    pub email: Option<String>,
}

impl AccountBalance {
    /// Referral balance normalized to currency units.
    pub fn referral_units(&self) -> f64 {
        self.withdraw_balance as f64 / 100.0
    }
}

/// Why a fetch produced no usable payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The API answered with a structured error body (e.g. invalid key).
    Application,
    /// No response at all: DNS, timeout, connection reset.
    Transport,
    /// Anything else, converted at the fetcher boundary.
    Unexpected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    /// Machine-readable slug from the error body (`not_auth`, ...).
    pub slug: Option<String>,
    pub message: String,
}

impl FetchFailure {
    pub fn application(status: u16, slug: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Application,
            status: Some(status),
            slug,
            message: message.into(),
        }
    }

    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            status: None,
            slug: None,
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unexpected,
            status: None,
            slug: None,
            message: message.into(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        self.slug.as_deref() == Some("not_auth")
    }
}

/// Produced by the change detector when a realm's referral balance moves.
///
/// `old` is absent only for a first observation reported under the
/// notify-on-first-observation option; the default behavior never emits one
/// without a prior baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeNotification {
    pub realm: AccountRealm,
    /// Previous referral balance, currency units.
    pub old: Option<f64>,
    /// Observed referral balance, currency units.
    pub new: f64,
    /// Account id already masked for display.
    pub masked_id: String,
}
