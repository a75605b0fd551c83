//! Referral-balance change detection.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::{
    billing::types::{BalanceSnapshot, ChangeNotification},
    domain::AccountRealm,
    formatting::mask_account_id,
};

/// Last-known referral balance per realm, currency units.
///
/// `None`-equivalent (absent key) means "not yet observed". Lifetime is the
/// process lifetime; nothing is persisted across restarts.
#[derive(Clone, Debug, Default)]
pub struct BalanceHistory {
    last: BTreeMap<AccountRealm, f64>,
}

impl BalanceHistory {
    pub fn get(&self, realm: AccountRealm) -> Option<f64> {
        self.last.get(&realm).copied()
    }

    fn set(&mut self, realm: AccountRealm, value: f64) {
        self.last.insert(realm, value);
    }
}

/// Compares each cycle's snapshots against the history baseline.
///
/// The detector owns the history; it is the only place that mutates it, and
/// the monitor guarantees cycles never overlap, so no lock is needed here.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    history: BalanceHistory,
    notify_on_first: bool,
}

impl ChangeDetector {
    pub fn new(notify_on_first: bool) -> Self {
        Self {
            history: BalanceHistory::default(),
            notify_on_first,
        }
    }

    pub fn history(&self) -> &BalanceHistory {
        &self.history
    }

    /// Fold one cycle's snapshots into the history and emit notifications.
    ///
    /// Only successful snapshots participate: a failure snapshot leaves the
    /// prior history value untouched and emits nothing for that realm this
    /// cycle (transient outages are logged, not surfaced to the subscriber).
    /// Emission order follows realm declaration order.
    pub fn observe(
        &mut self,
        snapshots: &BTreeMap<AccountRealm, BalanceSnapshot>,
    ) -> Vec<ChangeNotification> {
        let mut notifications = Vec::new();

        for realm in AccountRealm::ALL {
            let Some(snapshot) = snapshots.get(&realm) else {
                continue;
            };
            let balance = match snapshot {
                BalanceSnapshot::Success(b) => b,
                BalanceSnapshot::Failure(f) => {
                    debug!(%realm, kind = ?f.kind, message = %f.message, "skipping failed realm this cycle");
                    continue;
                }
            };

            let observed = balance.referral_units();
            match self.history.get(realm) {
                None => {
                    info!(%realm, balance = observed, "referral balance baseline recorded");
                    if self.notify_on_first {
                        notifications.push(ChangeNotification {
                            realm,
                            old: None,
                            new: observed,
                            masked_id: mask_account_id(balance.id.as_deref()),
                        });
                    }
                    self.history.set(realm, observed);
                }
                Some(stored) if stored != observed => {
                    info!(%realm, old = stored, new = observed, "referral balance changed");
                    notifications.push(ChangeNotification {
                        realm,
                        old: Some(stored),
                        new: observed,
                        masked_id: mask_account_id(balance.id.as_deref()),
                    });
                    self.history.set(realm, observed);
                }
                Some(_) => {}
            }
        }

        notifications
    }
}
