use std::{collections::BTreeMap, sync::Arc};

use tracing::info;

use abb_aeza::AezaClient;
use abb_core::{
    billing::port::BillingPort, config::Config, domain::AccountRealm, fetcher::BalanceFetcher,
};

#[tokio::main]
async fn main() -> Result<(), abb_core::Error> {
    abb_core::logging::init("abb")?;

    let cfg = Arc::new(Config::load()?);

    let mut clients: BTreeMap<AccountRealm, Arc<dyn BillingPort>> = BTreeMap::new();
    for realm in AccountRealm::ALL {
        let Some(creds) = cfg.credentials(realm) else {
            continue;
        };
        let client = AezaClient::new(realm, creds, cfg.fetch_timeout)?;
        info!(%realm, base_url = %creds.base_url, "billing client created");
        clients.insert(realm, Arc::new(client));
    }
    let fetcher = Arc::new(BalanceFetcher::new(clients));

    abb_telegram::router::run_polling(cfg, fetcher)
        .await
        .map_err(|e| abb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
