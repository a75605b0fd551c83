//! Background balance monitor.
//!
//! Drives the poll → detect → notify cycle on a fixed interval:
//! - `start(chat)` is idempotent and performs an immediate baseline fetch
//!   (history seeding, silent unless notify-on-first is enabled) before
//!   arming the timer.
//! - Cycles are serialized by construction: the whole cycle runs inside one
//!   owned task before the next tick is awaited, and missed ticks are
//!   delayed rather than bursted. The detector (and its history) is owned by
//!   that task, so no lock guards the history.
//! - `stop()` cancels only future firings; an in-flight cycle completes.

use std::sync::Arc;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    detector::ChangeDetector,
    domain::ChatId,
    fetcher::BalanceFetcher,
    formatting::render_change_notification,
    messaging::port::MessagingPort,
};

#[derive(Clone)]
pub struct BalanceMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    cfg: Arc<Config>,
    fetcher: Arc<BalanceFetcher>,
    messenger: Arc<dyn MessagingPort>,
    state: tokio::sync::Mutex<MonitorState>,
}

#[derive(Default)]
struct MonitorState {
    running: bool,
    chat: Option<ChatId>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl BalanceMonitor {
    pub fn new(
        cfg: Arc<Config>,
        fetcher: Arc<BalanceFetcher>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                cfg,
                fetcher,
                messenger,
                state: tokio::sync::Mutex::new(MonitorState::default()),
            }),
        }
    }

    /// Start monitoring for `chat`. Returns whether a new monitor loop was
    /// started; a second call while running is a no-op (exactly one timer).
    pub async fn start(&self, chat: ChatId) -> bool {
        let mut st = self.inner.state.lock().await;
        if st.running {
            debug!("balance monitor already running");
            return false;
        }

        st.running = true;
        st.chat = Some(chat);

        let cancel = CancellationToken::new();
        st.cancel = Some(cancel.clone());

        let monitor = self.clone();
        st.task = Some(tokio::spawn(async move {
            monitor.run_loop(chat, cancel).await;
        }));

        info!(
            chat_id = chat.0,
            interval_secs = self.inner.cfg.poll_interval.as_secs(),
            "balance monitor started"
        );
        true
    }

    /// Stop the monitor. Idempotent; an in-flight cycle runs to completion
    /// because only the timer wait is cancelled.
    pub async fn stop(&self) {
        let mut st = self.inner.state.lock().await;
        if !st.running {
            return;
        }
        st.running = false;
        st.chat = None;
        if let Some(cancel) = st.cancel.take() {
            cancel.cancel();
        }
        // Dropping the handle detaches the loop task; it exits at the
        // cancelled select arm.
        st.task.take();
        info!("balance monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.running
    }

    async fn run_loop(&self, chat: ChatId, cancel: CancellationToken) {
        let mut detector = ChangeDetector::new(self.inner.cfg.notify_on_first_observation);

        // Baseline cycle: populates history before the first timer tick.
        self.run_cycle(&mut detector, chat).await;

        let mut tick = tokio::time::interval(self.inner.cfg.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; the baseline already covered that.
        tick.tick().await;

        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                self.run_cycle(&mut detector, chat).await;
              }
            }
        }
    }

    /// One full poll → detect → notify cycle. Returns the number of
    /// notifications delivered. All failures are contained: fetch failures
    /// become failure snapshots upstream, delivery failures are logged per
    /// message without aborting the remaining deliveries.
    async fn run_cycle(&self, detector: &mut ChangeDetector, chat: ChatId) -> usize {
        debug!("checking referral balances");
        let snapshots = self.inner.fetcher.fetch_all().await;
        let notifications = detector.observe(&snapshots);

        if notifications.is_empty() {
            debug!("no balance changes detected");
            return 0;
        }

        info!(count = notifications.len(), "balance changes detected");
        let mut delivered = 0usize;
        for n in &notifications {
            let html = render_change_notification(n);
            match self.inner.messenger.send_html(chat, &html).await {
                Ok(_) => {
                    delivered += 1;
                    info!(realm = %n.realm, "change notification delivered");
                }
                Err(e) => {
                    warn!(realm = %n.realm, error = %e, "failed to deliver change notification");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::{BTreeMap, VecDeque},
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use crate::{
        billing::{
            port::BillingPort,
            types::{AccountBalance, BalanceSnapshot},
        },
        config::RealmCredentials,
        domain::{AccountRealm, MessageId, MessageRef},
        errors::Error,
        Result,
    };

    struct ScriptedBilling {
        responses: std::sync::Mutex<VecDeque<BalanceSnapshot>>,
    }

    impl ScriptedBilling {
        fn new(responses: Vec<BalanceSnapshot>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl BillingPort for ScriptedBilling {
        async fn fetch_balance(&self) -> Result<BalanceSnapshot> {
            let mut q = self.responses.lock().unwrap();
            Ok(q.pop_front().unwrap_or_else(|| {
                BalanceSnapshot::Success(AccountBalance::default())
            }))
        }
    }

    struct RecordingMessenger {
        sent: std::sync::Mutex<Vec<String>>,
        fail_first_n: AtomicUsize,
    }

    impl RecordingMessenger {
        fn new(fail_first_n: usize) -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
                fail_first_n: AtomicUsize::new(fail_first_n),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for RecordingMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            if self
                .fail_first_n
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::External("telegram error: 500".to_string()));
            }
            self.sent.lock().unwrap().push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn delete_message(&self, _msg: MessageRef) -> Result<()> {
            Ok(())
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
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
        })
    }

    fn fetcher_for(
        realm: AccountRealm,
        responses: Vec<BalanceSnapshot>,
    ) -> Arc<BalanceFetcher> {
        let mut clients: BTreeMap<AccountRealm, Arc<dyn BillingPort>> = BTreeMap::new();
        clients.insert(realm, Arc::new(ScriptedBilling::new(responses)));
        Arc::new(BalanceFetcher::new(clients))
    }

    fn success(withdraw_balance: i64) -> BalanceSnapshot {
        BalanceSnapshot::Success(AccountBalance {
            id: Some("123456".to_string()),
            withdraw_balance,
            ..AccountBalance::default()
        })
    }

    #[tokio::test]
    async fn start_twice_keeps_a_single_loop() {
        let messenger = Arc::new(RecordingMessenger::new(0));
        let monitor = BalanceMonitor::new(
            test_config(),
            fetcher_for(AccountRealm::Domestic, vec![success(500)]),
            messenger,
        );

        assert!(monitor.start(ChatId(1)).await);
        assert!(!monitor.start(ChatId(1)).await);
        assert!(monitor.is_running().await);

        monitor.stop().await;
        assert!(!monitor.is_running().await);
        // Second stop is a no-op.
        monitor.stop().await;
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn restart_after_stop_is_allowed() {
        let messenger = Arc::new(RecordingMessenger::new(0));
        let monitor = BalanceMonitor::new(
            test_config(),
            fetcher_for(AccountRealm::Domestic, vec![success(500)]),
            messenger,
        );

        assert!(monitor.start(ChatId(1)).await);
        monitor.stop().await;
        assert!(monitor.start(ChatId(1)).await);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn baseline_cycle_is_silent_then_change_is_delivered() {
        let messenger = Arc::new(RecordingMessenger::new(0));
        let monitor = BalanceMonitor::new(
            test_config(),
            fetcher_for(AccountRealm::Domestic, vec![success(500), success(700)]),
            messenger.clone(),
        );

        let mut detector = ChangeDetector::new(false);
        let delivered = monitor.run_cycle(&mut detector, ChatId(1)).await;
        assert_eq!(delivered, 0);

        let delivered = monitor.run_cycle(&mut detector, ChatId(1)).await;
        assert_eq!(delivered, 1);

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<s>5.00"));
        assert!(sent[0].contains("<b>7.00"));
    }

    #[tokio::test]
    async fn delivery_failure_does_not_abort_remaining_notifications() {
        let messenger = Arc::new(RecordingMessenger::new(1));
        let mut clients: BTreeMap<AccountRealm, Arc<dyn BillingPort>> = BTreeMap::new();
        clients.insert(
            AccountRealm::Domestic,
            Arc::new(ScriptedBilling::new(vec![success(100), success(200)])),
        );
        clients.insert(
            AccountRealm::International,
            Arc::new(ScriptedBilling::new(vec![success(300), success(400)])),
        );
        let monitor = BalanceMonitor::new(
            test_config(),
            Arc::new(BalanceFetcher::new(clients)),
            messenger.clone(),
        );

        let mut detector = ChangeDetector::new(false);
        monitor.run_cycle(&mut detector, ChatId(1)).await;
        // Both realms changed; the first delivery fails, the second lands.
        let delivered = monitor.run_cycle(&mut detector, ChatId(1)).await;
        assert_eq!(delivered, 1);

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("net"));
    }
}
