//! Page agent
//!
//! One agent runs per browser tab. It owns the DOM matching heuristics: confirm the
//! event is live, open the right market section, find the control for the selection,
//! check the odds and submit the stake. Requests arrive through an [`AgentHandle`];
//! results and progress go back as [`AgentEvent`]s.

pub mod dom;
pub mod matcher;
pub mod odds;
pub mod protocol;
pub mod sections;

#[cfg(test)]
pub(crate) mod fake;

use crate::config::{AgentConfig, BookmakerConfig};
use crate::error::{BotError, Result};
use crate::types::{BetResult, Credentials, LogLevel, ParsedBet};
use dom::{Dom, Element, ElementQuery, Locator};
use matcher::{BetMatcher, Candidate, Decision};
use protocol::{AgentEvent, AgentRequest, BetControlInfo, Envelope, PageReport, PageType, SubmenuInfo};
use rust_decimal::Decimal;
use sections::SectionTable;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;

const ELEMENT_POLL: Duration = Duration::from_millis(300);
const DEBUG_BET_LIMIT: usize = 10;

pub struct PageAgent {
    dom: Arc<dyn Dom>,
    config: AgentConfig,
    bookmaker: BookmakerConfig,
    sections: SectionTable,
    matcher: BetMatcher,
    events: mpsc::UnboundedSender<AgentEvent>,
    /// Serializes page work; pings are answered without it
    work: Mutex<()>,
}

impl PageAgent {
    pub fn new(
        dom: Arc<dyn Dom>,
        config: AgentConfig,
        bookmaker: BookmakerConfig,
        events: mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<Self> {
        let sections = SectionTable::new(&config.sections, config.weights.clone())?;
        let matcher = BetMatcher::new(config.similarity_threshold);
        Ok(Self {
            dom,
            config,
            bookmaker,
            sections,
            matcher,
            events,
            work: Mutex::new(()),
        })
    }

    fn emit(&self, event: AgentEvent) {
        let _ = self.events.send(event);
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            _ => tracing::info!("{}", message),
        }
        self.emit(AgentEvent::DetailedLog { message, level });
    }

    async fn pause(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Tell the coordinator this tab has an agent
    pub async fn announce(&self) {
        let url = self.dom.url().await.unwrap_or_default();
        self.emit(AgentEvent::ContentReady { url });
    }

    pub async fn handle(self: &Arc<Self>, request: AgentRequest) -> Envelope {
        match request {
            AgentRequest::Ping => self.ping().await,
            AgentRequest::ArbitrageBet { bet_data } => {
                let agent = Arc::clone(self);
                tokio::spawn(async move {
                    let result = agent.place_arbitrage_bet(&bet_data).await;
                    agent.emit(AgentEvent::BetResult(result));
                });
                Envelope::received()
            }
            AgentRequest::ManualBet { amount, message_id } => {
                let agent = Arc::clone(self);
                tokio::spawn(async move {
                    let result = agent.manual_bet(amount, &message_id).await;
                    agent.emit(AgentEvent::BetResult(result));
                });
                Envelope::received()
            }
            AgentRequest::Login { credentials } => {
                let agent = Arc::clone(self);
                tokio::spawn(async move {
                    let event = agent.login(&credentials).await;
                    agent.emit(event);
                });
                Envelope::received()
            }
            AgentRequest::DebugPage => match self.debug_page().await {
                Ok(report) => Envelope::page(report),
                Err(e) => Envelope::error(e.to_string()),
            },
        }
    }

    async fn ping(&self) -> Envelope {
        let url = match self.dom.url().await {
            Ok(url) => url,
            Err(e) => return Envelope::error(e.to_string()),
        };
        match self.dom.ready_state().await {
            Ok(state) if state == "complete" => Envelope::ready(url),
            Ok(_) => Envelope::loading(url),
            Err(e) => Envelope::error(e.to_string()),
        }
    }

    /// Run the whole bet flow; never panics, every failure becomes a result
    pub async fn place_arbitrage_bet(&self, bet: &ParsedBet) -> BetResult {
        let _guard = self.work.lock().await;
        let key = bet.job_key();
        self.log(
            LogLevel::Info,
            format!(
                "Processing {} '{}' at {}+ (stake {})",
                bet.market_type,
                bet.pick(),
                bet.target_odds,
                bet.stake
            ),
        );

        match self.try_place(bet).await {
            Ok(amount) => {
                self.log(
                    LogLevel::Success,
                    format!("Bet submitted (unconfirmed): '{}' for {}", bet.pick(), amount),
                );
                BetResult::placed(key, amount)
            }
            Err(e) => {
                let reason = failure_reason(e);
                self.log(LogLevel::Error, format!("Bet '{}' failed: {}", bet.pick(), reason));
                BetResult::failed(key, reason)
            }
        }
    }

    async fn try_place(&self, bet: &ParsedBet) -> Result<Decimal> {
        self.ensure_event_page().await?;
        self.pause(self.config.settle_ms).await;

        self.open_section(bet).await?;
        let expanded = self.expand_section().await?;
        if expanded > 0 {
            self.log(LogLevel::Info, format!("Expanded {} selection groups", expanded));
        }
        if self.switch_to_table_view().await? {
            self.log(LogLevel::Info, "Switched to table layout");
        }

        let candidate = self.find_control(bet).await?;
        self.dom.click(&candidate.element).await?;
        self.pause(self.config.click_wait_ms).await;

        self.submit_stake(bet.stake).await?;
        Ok(bet.stake)
    }

    async fn ensure_event_page(&self) -> Result<()> {
        let url = self.dom.url().await?;
        if !self.bookmaker.is_event_url(&url) {
            return Err(BotError::Agent(format!("not an event page: {}", url)));
        }

        let body = self.dom.body_text().await?.to_lowercase();
        if let Some(marker) = self
            .bookmaker
            .unavailable_markers
            .iter()
            .find(|m| body.contains(&m.to_lowercase()))
        {
            return Err(BotError::Agent(format!("event unavailable: {}", marker)));
        }
        Ok(())
    }

    async fn open_section(&self, bet: &ParsedBet) -> Result<()> {
        let profile = self
            .sections
            .profile(bet)
            .ok_or_else(|| BotError::Agent("no section rules configured".into()))?;
        self.log(
            LogLevel::Info,
            format!("Target section: {} (score {})", profile.section, profile.score),
        );

        let tabs = self
            .dom
            .query(&ElementQuery::new(Locator::parse(&self.config.selectors.submenu)))
            .await?;

        let Some((tab, score)) = self
            .sections
            .best_tab(&profile, &tabs, self.config.min_section_score)
        else {
            let available: Vec<&str> = tabs
                .iter()
                .map(|t| t.text.trim())
                .filter(|t| !t.is_empty())
                .collect();
            tracing::debug!("Available submenus: {:?}", available);
            return Err(BotError::Agent(format!("market section not found: {}", profile.section)));
        };

        if tab.selected {
            tracing::debug!("Section '{}' already open", tab.text.trim());
            return Ok(());
        }

        self.log(
            LogLevel::Info,
            format!("Opening section '{}' (score {})", tab.text.trim(), score),
        );
        self.dom.click(tab).await?;
        self.pause(self.config.section_wait_ms).await;
        Ok(())
    }

    /// Click every "more selections" control; returns how many were expanded
    async fn expand_section(&self) -> Result<usize> {
        let controls = self
            .dom
            .query(&ElementQuery::new(Locator::parse(&self.config.selectors.expand)))
            .await?;

        let mut expanded = 0;
        for control in controls.iter().filter(|c| c.usable) {
            let text = control.text.to_lowercase();
            if self.config.expand_markers.iter().any(|m| text.contains(m.as_str())) {
                self.dom.click(control).await?;
                self.pause(self.config.expand_wait_ms).await;
                expanded += 1;
            }
        }
        Ok(expanded)
    }

    async fn switch_to_table_view(&self) -> Result<bool> {
        let toggles = self
            .dom
            .query(&ElementQuery::new(Locator::parse(&self.config.selectors.layout_toggle)))
            .await?;

        let Some(toggle) = toggles
            .iter()
            .find(|t| t.usable && !t.selected && t.has_table_icon)
        else {
            return Ok(false);
        };

        self.dom.click(toggle).await?;
        self.pause(self.config.expand_wait_ms).await;
        Ok(true)
    }

    async fn find_control(&self, bet: &ParsedBet) -> Result<Candidate> {
        let query = ElementQuery::new(Locator::parse(&self.config.selectors.bet_controls))
            .with_context(&self.config.selectors.bet_context);
        let controls = self.dom.query(&query).await?;
        let candidates = self.matcher.candidates(&bet.selection, &controls);
        tracing::debug!(
            "{} bet controls, {} candidates for '{}'",
            controls.len(),
            candidates.len(),
            bet.pick()
        );

        match BetMatcher::decide(candidates, bet.target_odds) {
            Decision::Accept(candidate) => {
                self.log(
                    LogLevel::Success,
                    format!(
                        "Found '{}' at {} via {}",
                        candidate.element.text.trim(),
                        candidate.odds,
                        candidate.strategy.as_str()
                    ),
                );
                Ok(candidate)
            }
            Decision::Insufficient(best) => Err(BotError::Agent(format!(
                "insufficient odds: found {} < target {}",
                best.odds, bet.target_odds
            ))),
            Decision::NotFound => Err(BotError::Agent(format!("selection not found: {}", bet.pick()))),
        }
    }

    /// Type the stake into the basket and submit it
    async fn submit_stake(&self, amount: Decimal) -> Result<()> {
        let input = self.wait_for(&self.config.selectors.stake_input).await?;
        self.dom.type_text(&input, &amount.to_string()).await?;
        self.pause(self.config.click_wait_ms).await;

        let submit = self.wait_for(&self.config.selectors.submit).await?;
        self.dom.click(&submit).await?;
        self.pause(self.config.click_wait_ms).await;
        Ok(())
    }

    /// First usable element of the first locator that has one, polling until timeout
    async fn wait_for(&self, locators: &[String]) -> Result<Element> {
        let deadline = Instant::now() + Duration::from_millis(self.config.element_timeout_ms);
        loop {
            for raw in locators {
                let found = self.dom.query(&ElementQuery::new(Locator::parse(raw))).await?;
                if let Some(element) = found.into_iter().find(|e| e.usable) {
                    tracing::debug!("Matched '{}'", raw);
                    return Ok(element);
                }
            }
            if Instant::now() >= deadline {
                return Err(BotError::Agent(format!("elements not found: {}", locators.join(", "))));
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }

    /// Stake and submit whatever selection is already in the basket
    pub async fn manual_bet(&self, amount: Decimal, message_id: &str) -> BetResult {
        let _guard = self.work.lock().await;
        self.log(LogLevel::Info, format!("Manual bet of {}", amount));

        let outcome = async {
            let url = self.dom.url().await?;
            if !self.bookmaker.is_site_url(&url) {
                return Err(BotError::Agent(format!("not a bookmaker page: {}", url)));
            }
            self.submit_stake(amount).await
        }
        .await;

        match outcome {
            Ok(()) => {
                self.log(LogLevel::Success, format!("Manual bet of {} submitted", amount));
                BetResult::placed(message_id, amount)
            }
            Err(e) => {
                let reason = failure_reason(e);
                self.log(LogLevel::Error, format!("Manual bet failed: {}", reason));
                BetResult::failed(message_id, reason)
            }
        }
    }

    /// Fill and submit the login form
    pub async fn login(&self, credentials: &Credentials) -> AgentEvent {
        let _guard = self.work.lock().await;
        self.log(LogLevel::Info, format!("Logging in as {}", credentials.email));

        let outcome = async {
            let selectors = &self.config.selectors;
            let email = self.wait_for(&selectors.login_email).await?;
            self.dom.type_text(&email, &credentials.email).await?;
            let password = self.wait_for(&selectors.login_password).await?;
            self.dom.type_text(&password, &credentials.password).await?;
            let submit = self.wait_for(&selectors.login_submit).await?;
            self.dom.click(&submit).await?;
            self.pause(self.config.section_wait_ms).await;

            if self.has_usable(&selectors.login_password).await? {
                return Err(BotError::Agent("login form still shown after submit".into()));
            }
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.log(LogLevel::Success, "Login successful");
                AgentEvent::LoginResult {
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                let reason = failure_reason(e);
                self.log(LogLevel::Error, format!("Login failed: {}", reason));
                AgentEvent::LoginResult {
                    success: false,
                    error: Some(reason),
                }
            }
        }
    }

    async fn has_usable(&self, locators: &[String]) -> Result<bool> {
        for raw in locators {
            let found = self.dom.query(&ElementQuery::new(Locator::parse(raw))).await?;
            if found.iter().any(|e| e.usable) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn debug_page(&self) -> Result<PageReport> {
        let url = self.dom.url().await?;
        let page_type = if self.bookmaker.is_event_url(&url) {
            PageType::Event
        } else if self.bookmaker.is_login_url(&url)
            || self.has_usable(&self.config.selectors.login_password).await?
        {
            PageType::Login
        } else {
            PageType::General
        };

        let available = page_type == PageType::Event && self.ensure_event_page().await.is_ok();

        let submenus = self
            .dom
            .query(&ElementQuery::new(Locator::parse(&self.config.selectors.submenu)))
            .await?
            .into_iter()
            .filter(|t| !t.text.trim().is_empty())
            .map(|t| SubmenuInfo {
                text: t.text.trim().to_string(),
                active: t.selected,
            })
            .collect();

        let bets = self
            .dom
            .query(&ElementQuery::new(Locator::parse(&self.config.selectors.bet_controls)))
            .await?
            .into_iter()
            .filter(|b| b.usable && !b.text.trim().is_empty())
            .take(DEBUG_BET_LIMIT)
            .map(|b| BetControlInfo {
                odds: odds::element_odds(&b, None),
                text: b.text.trim().chars().take(50).collect(),
            })
            .collect();

        Ok(PageReport {
            url,
            page_type,
            available,
            submenus,
            bets,
        })
    }
}

/// Operator-facing reason for a failed step
fn failure_reason(e: BotError) -> String {
    match e {
        BotError::Agent(reason) => reason,
        other => other.to_string(),
    }
}

struct AgentCall {
    request: AgentRequest,
    reply: oneshot::Sender<Envelope>,
}

/// Request channel to a running agent task
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<AgentCall>,
}

impl AgentHandle {
    /// Start the agent's request loop on the runtime
    pub fn spawn(agent: Arc<PageAgent>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AgentCall>(16);
        tokio::spawn(async move {
            agent.announce().await;
            while let Some(call) = rx.recv().await {
                let envelope = agent.handle(call.request).await;
                let _ = call.reply.send(envelope);
            }
            tracing::debug!("Agent request loop finished");
        });
        Self { tx }
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Send one request and wait for its envelope
    pub async fn call(&self, request: AgentRequest, timeout: Duration) -> Result<Envelope> {
        let name = request.name();
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentCall { request, reply })
            .await
            .map_err(|_| BotError::AgentUnavailable("agent task stopped".into()))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(_)) => Err(BotError::AgentUnavailable(format!("no answer to {}", name))),
            Err(_) => Err(BotError::Timeout(format!("{} request", name))),
        }
    }
}
