use async_trait::async_trait;

use crate::{billing::types::BalanceSnapshot, Result};

/// Hexagonal port for one realm of the billing API.
///
/// A port instance is bound to a single realm at construction time; the
/// credential lives inside the adapter. API and transport failures come back
/// as `Ok(BalanceSnapshot::Failure(..))` — `Err` is reserved for unexpected
/// conditions (malformed payloads), which the fetcher converts into failure
/// snapshots at its boundary. No retries at this layer.
#[async_trait]
pub trait BillingPort: Send + Sync {
    /// One authenticated balance fetch with a bounded timeout.
    async fn fetch_balance(&self) -> Result<BalanceSnapshot>;
}
