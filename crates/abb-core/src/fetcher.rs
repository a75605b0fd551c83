//! Parallel balance fetching across all configured realms.

use std::{collections::BTreeMap, sync::Arc};

use tracing::warn;

use crate::{
    billing::{
        port::BillingPort,
        types::{BalanceSnapshot, FetchFailure},
    },
    domain::AccountRealm,
    errors::Error,
    Result,
};

/// Orchestrates per-realm billing clients.
///
/// Realms are independent: each fetch runs on its own task so one realm's
/// latency never delays the other, and a per-realm failure of any kind is
/// folded into a failure snapshot rather than aborting the aggregate.
pub struct BalanceFetcher {
    clients: BTreeMap<AccountRealm, Arc<dyn BillingPort>>,
}

impl BalanceFetcher {
    pub fn new(clients: BTreeMap<AccountRealm, Arc<dyn BillingPort>>) -> Self {
        Self { clients }
    }

    /// Realms that have a registered client, in declaration order.
    pub fn realms(&self) -> impl Iterator<Item = AccountRealm> + '_ {
        self.clients.keys().copied()
    }

    /// Fetch one realm on demand.
    ///
    /// A realm with no registered credential is a configuration error,
    /// distinct from API/transport failures (which come back as failure
    /// snapshots). It is never treated as a zero balance.
    pub async fn fetch_one(&self, realm: AccountRealm) -> Result<BalanceSnapshot> {
        let client = self
            .clients
            .get(&realm)
            .ok_or_else(|| Error::Config(format!("no API key configured for realm {realm}")))?;
        client.fetch_balance().await
    }

    /// Fetch every configured realm concurrently.
    ///
    /// The aggregate is always returned: per-realm errors (including
    /// panicked fetch tasks) become unexpected-failure snapshots. Realms
    /// with no credential are absent from the result entirely.
    pub async fn fetch_all(&self) -> BTreeMap<AccountRealm, BalanceSnapshot> {
        let mut tasks = Vec::with_capacity(self.clients.len());
        for (&realm, client) in &self.clients {
            let client = Arc::clone(client);
            tasks.push((realm, tokio::spawn(async move { client.fetch_balance().await })));
        }

        let mut out = BTreeMap::new();
        for (realm, task) in tasks {
            let snapshot = match task.await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    warn!(%realm, error = %e, "balance fetch failed unexpectedly");
                    BalanceSnapshot::Failure(FetchFailure::unexpected(e.to_string()))
                }
                Err(e) => {
                    warn!(%realm, error = %e, "balance fetch task aborted");
                    BalanceSnapshot::Failure(FetchFailure::unexpected(format!(
                        "fetch task aborted: {e}"
                    )))
                }
            };
            out.insert(realm, snapshot);
        }
        out
    }
}
