/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One of the two independent Aeza account contexts.
///
/// The set is fixed and the declaration order is the canonical realm order:
/// everything that iterates realms (fetching, notification emission, the
/// `/balance` reply sequence) follows `AccountRealm::ALL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountRealm {
    /// `my.aeza.ru`, billed in rubles.
    Domestic,
    /// `my.aeza.net`, billed in euros.
    International,
}

impl AccountRealm {
    pub const ALL: [AccountRealm; 2] = [AccountRealm::Domestic, AccountRealm::International];

    pub fn profile(self) -> &'static RealmProfile {
        match self {
            AccountRealm::Domestic => &DOMESTIC_PROFILE,
            AccountRealm::International => &INTERNATIONAL_PROFILE,
        }
    }
}

impl std::fmt::Display for AccountRealm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.profile().code)
    }
}

/// Static per-realm presentation + endpoint data.
///
/// Keeping this in one table avoids the per-realm conditional chains the
/// original bot repeated across fetch and formatting code.
#[derive(Debug)]
pub struct RealmProfile {
    pub code: &'static str,
    pub label: &'static str,
    pub flag: &'static str,
    pub currency_symbol: &'static str,
    pub default_base_url: &'static str,
}

static DOMESTIC_PROFILE: RealmProfile = RealmProfile {
    code: "ru",
    label: "Domestic account (.ru)",
    flag: "\u{1F1F7}\u{1F1FA}",
    currency_symbol: "\u{20BD}",
    default_base_url: "https://my.aeza.ru/api",
};

static INTERNATIONAL_PROFILE: RealmProfile = RealmProfile {
    code: "net",
    label: "International account (.net)",
    flag: "\u{1F30D}",
    currency_symbol: "\u{20AC}",
    default_base_url: "https://my.aeza.net/api",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_order_is_domestic_first() {
        assert_eq!(
            AccountRealm::ALL,
            [AccountRealm::Domestic, AccountRealm::International]
        );
        assert!(AccountRealm::Domestic < AccountRealm::International);
    }

    #[test]
    fn profiles_carry_distinct_endpoints_and_currencies() {
        let ru = AccountRealm::Domestic.profile();
        let net = AccountRealm::International.profile();
        assert_eq!(ru.code, "ru");
        assert_eq!(net.code, "net");
        assert_ne!(ru.default_base_url, net.default_base_url);
        assert_ne!(ru.currency_symbol, net.currency_symbol);
    }
}
