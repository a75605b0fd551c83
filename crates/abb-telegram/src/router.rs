use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::info;

use abb_core::{
    config::Config, fetcher::BalanceFetcher, messaging::port::MessagingPort,
    monitor::BalanceMonitor,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub fetcher: Arc<BalanceFetcher>,
    pub messenger: Arc<dyn MessagingPort>,
    pub monitor: BalanceMonitor,
}

/// Run the bot in long-polling mode until ctrl-c, then stop the monitor.
pub async fn run_polling(cfg: Arc<Config>, fetcher: Arc<BalanceFetcher>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(username = me.username(), "bot started");
    }
    info!(
        realms = ?fetcher.realms().collect::<Vec<_>>(),
        restricted = cfg.allowed_user_id.is_some(),
        "configured realms"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let monitor = BalanceMonitor::new(cfg.clone(), fetcher.clone(), messenger.clone());

    let state = Arc::new(AppState {
        cfg,
        fetcher,
        messenger,
        monitor: monitor.clone(),
    });

    let handler = dptree::entry()
        .branch(Update::filter_inline_query().endpoint(handlers::handle_inline_query))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // Dispatcher returned (ctrl-c): cancel the monitor timer; an in-flight
    // cycle is allowed to finish on its own.
    monitor.stop().await;

    Ok(())
}
