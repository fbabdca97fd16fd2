//! Bot session
//!
//! Owns every component plus the operator settings. The dashboard and the CLI only
//! ever talk to a [`BotSession`]; nothing else holds global state.

#[cfg(test)]
pub(crate) mod fake;

use crate::agent::protocol::{AgentEvent, PageReport};
use crate::config::Config;
use crate::driver::{Browser, LoginOutcome, PageDriver, TabReport};
use crate::error::{BotError, Result};
use crate::ingester::{BetParser, Classification, MessageClassifier, MessageSource, UpdatePoller};
use crate::monitor::LogBuffer;
use crate::notify::{result_text, Notifier};
use crate::queue::{BetExecutor, DrainOutcome, JobQueue};
use crate::storage::StateRepository;
use crate::telegram::TelegramClient;
use crate::types::{BetResult, BotSettings, IncomingMessage, LogEntry, LogLevel, SettingsUpdate};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch, Notify, RwLock};

/// Characters of each recent message shown by the Telegram probe
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub active: bool,
    pub running: bool,
    pub logged_in: bool,
    pub telegram_configured: bool,
    pub default_stake: Decimal,
    pub queued: usize,
    pub in_flight: Option<String>,
    pub cursor: i64,
    pub pending_results: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelegramProbe {
    pub bot_name: String,
    pub username: Option<String>,
    pub recent: Vec<String>,
}

pub struct BotSession {
    config: Config,
    repo: StateRepository,
    settings: RwLock<BotSettings>,
    notifier: Notifier,
    queue: Arc<JobQueue>,
    driver: Arc<PageDriver>,
    classifier: MessageClassifier,
    parser: BetParser,
    wake: Arc<Notify>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    /// Set once the first start has checked for a marker left by a previous process
    recovered: AtomicBool,
}

impl BotSession {
    pub async fn new(config: Config, repo: StateRepository, browser: Arc<dyn Browser>) -> Result<Arc<Self>> {
        let settings = match repo.load_settings().await? {
            Some(saved) => saved,
            None => config.initial_settings(),
        };

        let log = Arc::new(LogBuffer::load(repo.clone(), config.log.buffer_len).await);
        let notifier = match telegram_channel(&config, &settings) {
            Some((client, chat_id)) => Notifier::new(client, chat_id, log),
            None => {
                tracing::warn!("Telegram not configured, notifications disabled");
                Notifier::disabled(log)
            }
        };

        let (driver, events) = PageDriver::new(
            browser,
            config.driver.clone(),
            config.agent.clone(),
            config.bookmaker.clone(),
        );
        let driver = Arc::new(driver);
        spawn_event_pump(Arc::downgrade(&driver), notifier.clone(), events);

        let executor: Arc<dyn BetExecutor> = driver.clone();
        let queue = JobQueue::new(config.queue.clone(), repo.clone(), executor, notifier.clone()).await?;

        Ok(Arc::new(Self {
            classifier: MessageClassifier::from_config(&config.bookmaker)?,
            parser: BetParser::new(&config.bookmaker.site_hosts)?,
            settings: RwLock::new(settings),
            queue: Arc::new(queue),
            wake: Arc::new(Notify::new()),
            shutdown: Mutex::new(None),
            recovered: AtomicBool::new(false),
            config,
            repo,
            notifier,
            driver,
        }))
    }

    pub async fn settings(&self) -> BotSettings {
        self.settings.read().await.clone()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    async fn update_settings(&self, change: impl FnOnce(&mut BotSettings)) -> Result<BotSettings> {
        let mut settings = self.settings.write().await;
        change(&mut settings);
        self.repo.save_settings(&settings).await?;
        Ok(settings.clone())
    }

    /// Poll the configured Telegram bot and execute alerts until [`stop`](Self::stop)
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let settings = self.settings().await;
        if !settings.has_telegram() {
            return Err(BotError::InvalidConfig(
                "Telegram bot token and chat id are required to start".into(),
            ));
        }
        let client = TelegramClient::from_config(&self.config.telegram, &settings.bot_token);
        self.start_with(Arc::new(client)).await
    }

    pub async fn start_with(self: &Arc<Self>, source: Arc<dyn MessageSource>) -> Result<()> {
        if self.is_running() {
            tracing::warn!("Bot already running");
            return Ok(());
        }

        let poller = UpdatePoller::new(source, self.repo.clone()).await?;
        if self.config.polling.skip_backlog_on_start {
            if let Err(e) = poller.skip_backlog().await {
                tracing::warn!("Could not skip backlog: {}", e);
            }
        }
        // Later starts in this process may find the marker of a job that is still running
        if !self.recovered.swap(true, Ordering::SeqCst) {
            self.queue.report_stale_marker().await?;
        }

        let (tx, rx) = watch::channel(false);
        self.spawn_poll_loop(poller, rx.clone());
        self.spawn_drain_loop(rx);
        *self.shutdown.lock() = Some(tx);

        self.update_settings(|s| s.active = true).await?;
        if let Err(e) = self.notifier.startup().await {
            tracing::warn!("Could not send startup notice: {}", e);
        }
        tracing::info!("Bot started");
        Ok(())
    }

    fn spawn_poll_loop(self: &Arc<Self>, poller: UpdatePoller, mut shutdown: watch::Receiver<bool>) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(session.config.polling.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {
                        for message in poller.tick().await {
                            if let Err(e) = session.handle_message(&message).await {
                                tracing::warn!("Message {} not handled: {}", message.message_id, e);
                            }
                        }
                    }
                }
            }
            tracing::debug!("Poll loop stopped");
        });
    }

    fn spawn_drain_loop(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let queue = Arc::clone(&self.queue);
        let wake = Arc::clone(&self.wake);
        let notifier = self.notifier.clone();
        let period = self.config.queue.drain_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = wake.notified() => {}
                    _ = interval.tick() => {}
                }
                match queue.drain().await {
                    Ok(DrainOutcome::Processed(results)) if !results.is_empty() => {
                        tracing::debug!("Drained {} jobs", results.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if let Err(send_err) = notifier.error("Queue", &e.to_string()).await {
                            tracing::warn!("Could not report queue error: {}", send_err);
                        }
                    }
                }
            }
            tracing::debug!("Drain loop stopped");
        });
    }

    /// End the poll and drain tasks, leaving queue and settings untouched
    pub fn halt(&self) {
        let shutdown = self.shutdown.lock().take();
        if let Some(tx) = shutdown {
            let _ = tx.send(true);
        }
    }

    /// Stop polling, drop pending bets and waiters. A bet already inside a page finishes.
    pub async fn stop(&self) -> Result<()> {
        self.halt();
        let dropped = self.queue.clear();
        self.driver.shutdown();
        self.update_settings(|s| s.active = false).await?;

        let message = if dropped > 0 {
            format!("Bot stopped, {} pending bets dropped", dropped)
        } else {
            "Bot stopped".to_string()
        };
        self.notifier.log(LogLevel::Info, message).await;
        Ok(())
    }

    /// Classify, parse and queue one message. Returns whether a bet was queued.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<bool> {
        match self.classifier.classify(&message.text) {
            Classification::Irrelevant => {
                if rand::random::<f64>() < self.config.polling.irrelevant_log_sample {
                    tracing::debug!("Ignoring message {}: not an alert", message.message_id);
                }
                return Ok(false);
            }
            Classification::MissingLink => {
                self.notifier
                    .log(
                        LogLevel::Warn,
                        format!("Alert {} has no bookmaker link, skipped", message.message_id),
                    )
                    .await;
                return Ok(false);
            }
            Classification::Actionable => {}
        }

        let stake = self.settings.read().await.default_stake;
        let bet = match self.parser.parse(message, stake) {
            Ok(bet) => bet,
            Err(e) => {
                self.notifier
                    .log(
                        LogLevel::Warn,
                        format!("Could not parse alert {}: {}", message.message_id, e),
                    )
                    .await;
                return Ok(false);
            }
        };

        let summary = format!("{} '{}' @ {}", bet.market_type, bet.pick(), bet.target_odds);
        if !self.queue.enqueue(bet).await? {
            return Ok(false);
        }
        self.notifier
            .log(
                LogLevel::Info,
                format!("Queued alert {}: {}", message.message_id, summary),
            )
            .await;
        self.wake.notify_one();
        Ok(true)
    }

    pub async fn save_settings(self: &Arc<Self>, update: SettingsUpdate) -> Result<BotSettings> {
        let previous_token = self.settings.read().await.bot_token.clone();
        let settings = self.update_settings(|s| update.apply(s)).await?;

        self.notifier
            .reconfigure(telegram_channel(&self.config, &settings))
            .await;
        self.notifier.log(LogLevel::Info, "Settings saved").await;

        if settings.bot_token != previous_token && self.is_running() {
            tracing::info!("Bot token changed, restarting polling");
            self.halt();
            self.start().await?;
        }
        Ok(settings)
    }

    pub async fn login(&self) -> Result<LoginOutcome> {
        let credentials = self.settings.read().await.credentials.clone();
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(BotError::InvalidConfig(
                "bookmaker email and password are required".into(),
            ));
        }

        let outcome = self.driver.login(&credentials).await?;
        self.update_settings(|s| s.logged_in = outcome.success).await?;
        if outcome.success {
            self.notifier.log(LogLevel::Success, "Logged in").await;
        } else {
            self.notifier
                .log(
                    LogLevel::Error,
                    format!(
                        "Login failed: {}",
                        outcome.error.as_deref().unwrap_or("unknown error")
                    ),
                )
                .await;
        }
        Ok(outcome)
    }

    /// Check the bot token and show what the bot currently sees
    pub async fn test_telegram(&self) -> Result<TelegramProbe> {
        let settings = self.settings().await;
        if settings.bot_token.is_empty() {
            return Err(BotError::InvalidConfig("Telegram bot token is not set".into()));
        }
        let client = TelegramClient::from_config(&self.config.telegram, &settings.bot_token);

        let me = client.get_me().await?;
        let recent = client
            .recent_updates(5)
            .await?
            .into_iter()
            .filter_map(|u| u.into_incoming())
            .map(|m| m.text.chars().take(PREVIEW_CHARS).collect())
            .collect();

        self.notifier
            .log(LogLevel::Success, format!("Telegram connected as {}", me.first_name))
            .await;
        Ok(TelegramProbe {
            bot_name: me.first_name,
            username: me.username,
            recent,
        })
    }

    /// Stake on the current basket selection; `None` uses the default stake
    pub async fn manual_bet(&self, amount: Option<Decimal>) -> Result<BetResult> {
        let amount = match amount {
            Some(amount) => amount,
            None => self.settings.read().await.default_stake,
        };
        if amount <= Decimal::ZERO {
            return Err(BotError::InvalidConfig(format!("invalid stake {}", amount)));
        }

        let result = self.driver.manual_bet(amount).await?;
        self.notifier.bet_result(&result).await;
        Ok(result)
    }

    pub async fn debug_tabs(&self) -> Result<Vec<TabReport>> {
        self.driver.debug_tabs().await
    }

    pub async fn debug_page(&self) -> Result<PageReport> {
        self.driver.debug_page().await
    }

    pub async fn clear_marker(&self) -> Result<Option<String>> {
        let cleared = self.queue.clear_marker().await?;
        if let Some(key) = &cleared {
            self.notifier
                .log(LogLevel::Info, format!("Released queue slot held by job {}", key))
                .await;
            self.wake.notify_one();
        }
        Ok(cleared)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let settings = self.settings().await;
        Ok(StatusReport {
            active: settings.active,
            running: self.is_running(),
            logged_in: settings.logged_in,
            telegram_configured: settings.has_telegram(),
            default_stake: settings.default_stake,
            queued: self.queue.len(),
            in_flight: self.queue.in_flight().await?,
            cursor: self.repo.cursor().await?,
            pending_results: self.driver.pending_results(),
        })
    }

    pub async fn logs(&self, limit: usize) -> Vec<LogEntry> {
        self.notifier.log_buffer().recent(limit).await
    }
}

fn telegram_channel(config: &Config, settings: &BotSettings) -> Option<(TelegramClient, String)> {
    settings.has_telegram().then(|| {
        (
            TelegramClient::from_config(&config.telegram, &settings.bot_token),
            settings.chat_id.clone(),
        )
    })
}

/// Route agent events to their waiters; the rest end up in the operator log
fn spawn_event_pump(
    driver: Weak<PageDriver>,
    notifier: Notifier,
    mut events: mpsc::UnboundedReceiver<AgentEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(driver) = driver.upgrade() else {
                break;
            };
            match driver.dispatch(event) {
                None => {}
                Some(AgentEvent::DetailedLog { message, level }) => notifier.log(level, message).await,
                Some(AgentEvent::ContentReady { url }) => tracing::debug!("Agent ready on {}", url),
                Some(AgentEvent::BetResult(result)) => {
                    notifier
                        .log(
                            LogLevel::Warn,
                            format!("Late result for {}: {}", result.message_id, result_text(&result)),
                        )
                        .await
                }
                Some(AgentEvent::LoginResult { success, .. }) => {
                    tracing::debug!("Login result with nobody waiting (success: {})", success)
                }
            }
        }
    });
}
