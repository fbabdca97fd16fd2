//! Page driver
//!
//! Brings a bookmaker tab to the bet link, makes sure a page agent is answering on it,
//! hands the bet over and waits for the correlated result.

pub mod browser;
pub mod cdp;
pub mod correlation;


pub use browser::{Browser, TabInfo};
pub use cdp::CdpBrowser;
pub use correlation::{CorrelationTable, Waiter};

use crate::agent::protocol::{AgentEvent, AgentRequest, Envelope, PageReport, PageType};
use crate::agent::{AgentHandle, PageAgent};
use crate::config::{AgentConfig, BookmakerConfig, DriverConfig};
use crate::error::{BotError, Result};
use crate::queue::BetExecutor;
use crate::types::{BetResult, Credentials, ParsedBet, MANUAL_KEY_PREFIX};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

const LOGIN_KEY: &str = "login";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub error: Option<String>,
}

/// One open tab as seen by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabReport {
    pub id: String,
    pub title: String,
    pub url: String,
    pub page_type: PageType,
    pub bookmaker: bool,
    pub has_agent: bool,
}

pub struct PageDriver {
    browser: Arc<dyn Browser>,
    config: DriverConfig,
    agent_config: AgentConfig,
    bookmaker: BookmakerConfig,
    agents: Mutex<HashMap<String, AgentHandle>>,
    results: CorrelationTable<BetResult>,
    logins: CorrelationTable<LoginOutcome>,
    events: mpsc::UnboundedSender<AgentEvent>,
}

impl PageDriver {
    /// The receiver carries every agent event; feed it back through
    /// [`dispatch`](Self::dispatch)
    pub fn new(
        browser: Arc<dyn Browser>,
        config: DriverConfig,
        agent_config: AgentConfig,
        bookmaker: BookmakerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Self {
            browser,
            config,
            agent_config,
            bookmaker,
            agents: Mutex::new(HashMap::new()),
            results: CorrelationTable::new(),
            logins: CorrelationTable::new(),
            events,
        };
        (driver, rx)
    }

    /// Hand results to their waiters. Events nobody claims are returned.
    pub fn dispatch(&self, event: AgentEvent) -> Option<AgentEvent> {
        match event {
            AgentEvent::BetResult(result) => {
                let key = result.message_id.clone();
                if self.results.resolve(&key, result.clone()) {
                    None
                } else {
                    tracing::warn!("Result for message {} arrived with no waiter", key);
                    Some(AgentEvent::BetResult(result))
                }
            }
            AgentEvent::LoginResult { success, error } => {
                let outcome = LoginOutcome {
                    success,
                    error: error.clone(),
                };
                if self.logins.resolve(LOGIN_KEY, outcome) {
                    None
                } else {
                    Some(AgentEvent::LoginResult { success, error })
                }
            }
            other => Some(other),
        }
    }

    /// Drop pending waiters and agents
    pub fn shutdown(&self) {
        self.results.clear();
        self.logins.clear();
        self.agents.lock().clear();
    }

    pub fn pending_results(&self) -> usize {
        self.results.len()
    }

    #[cfg(test)]
    pub(crate) fn event_sender(&self) -> mpsc::UnboundedSender<AgentEvent> {
        self.events.clone()
    }

    async fn site_tab(&self) -> Result<Option<TabInfo>> {
        Ok(self
            .browser
            .tabs()
            .await?
            .into_iter()
            .find(|t| self.bookmaker.is_site_url(&t.url)))
    }

    /// Point a bookmaker tab at `url`, opening one if none exists
    async fn open_on(&self, url: &str) -> Result<TabInfo> {
        let tab = match self.site_tab().await? {
            Some(tab) => {
                if tab.url != url {
                    tracing::info!("Navigating tab {} to {}", tab.id, url);
                    self.browser.navigate(&tab.id, url).await?;
                }
                self.browser.activate(&tab.id).await?;
                tab
            }
            None => {
                tracing::info!("No bookmaker tab open, opening {}", url);
                self.browser.open(url).await?
            }
        };

        tokio::time::sleep(self.config.page_load_wait()).await;
        Ok(tab)
    }

    async fn agent_for(&self, tab_id: &str) -> Result<AgentHandle> {
        if let Some(handle) = self.agents.lock().get(tab_id) {
            if handle.is_alive() {
                return Ok(handle.clone());
            }
        }

        let dom = self.browser.attach(tab_id).await?;
        let agent = PageAgent::new(
            dom,
            self.agent_config.clone(),
            self.bookmaker.clone(),
            self.events.clone(),
        )?;
        let handle = AgentHandle::spawn(Arc::new(agent));
        self.agents.lock().insert(tab_id.to_string(), handle.clone());
        tracing::debug!("Attached agent to tab {}", tab_id);
        Ok(handle)
    }

    /// Ping until the agent reports the page ready, reloading between rounds
    async fn ready_agent(&self, tab_id: &str) -> Result<AgentHandle> {
        let policy = &self.config.ready;

        for round in 0..=policy.reloads {
            for attempt in 0..policy.max_attempts {
                match self.agent_for(tab_id).await {
                    Ok(handle) => match handle.call(AgentRequest::Ping, self.config.call_timeout()).await {
                        Ok(envelope) if envelope.is_ready() => return Ok(handle),
                        Ok(envelope) => tracing::debug!(
                            "Tab {} not ready ({}), attempt {}",
                            tab_id,
                            envelope.status.as_deref().or(envelope.error.as_deref()).unwrap_or("no status"),
                            attempt + 1
                        ),
                        Err(e) => {
                            tracing::debug!("Ping to tab {} failed: {}", tab_id, e);
                            self.agents.lock().remove(tab_id);
                        }
                    },
                    Err(e) => tracing::debug!("Could not attach to tab {}: {}", tab_id, e),
                }
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }

            if round < policy.reloads {
                tracing::warn!("Agent on tab {} not ready, reloading", tab_id);
                self.browser.reload(tab_id).await?;
                tokio::time::sleep(policy.reload_wait()).await;
            }
        }

        Err(BotError::AgentUnavailable(format!(
            "tab {} not ready after {} attempts and {} reloads",
            tab_id, policy.max_attempts, policy.reloads
        )))
    }

    async fn site_agent(&self) -> Result<AgentHandle> {
        let tab = self
            .site_tab()
            .await?
            .ok_or_else(|| BotError::Browser("no bookmaker tab open".into()))?;
        self.ready_agent(&tab.id).await
    }

    /// Send a request that is answered later with a result; a non-`received` envelope fails
    async fn submit(&self, agent: &AgentHandle, request: AgentRequest) -> Result<()> {
        let envelope = agent.call(request, self.config.call_timeout()).await?;
        if envelope.is_received() {
            Ok(())
        } else {
            Err(rejected(envelope))
        }
    }

    async fn await_result(&self, agent: &AgentHandle, key: String, request: AgentRequest) -> Result<BetResult> {
        let waiter = self.results.register(key.clone(), self.config.result_timeout());
        self.submit(agent, request).await?;
        waiter.wait().await.ok_or_else(|| {
            BotError::Timeout(format!(
                "no result for {} within {}s",
                key, self.config.result_timeout_secs
            ))
        })
    }

    /// Stake `amount` on whatever is in the bookmaker tab's basket
    pub async fn manual_bet(&self, amount: Decimal) -> Result<BetResult> {
        let agent = self.site_agent().await?;
        let key = format!("{}{}", MANUAL_KEY_PREFIX, uuid::Uuid::new_v4().simple());
        let request = AgentRequest::ManualBet {
            amount,
            message_id: key.clone(),
        };
        self.await_result(&agent, key, request).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let tab = self.open_on(&self.bookmaker.login_url).await?;
        let agent = self.ready_agent(&tab.id).await?;

        let waiter = self.logins.register(LOGIN_KEY, self.config.result_timeout());
        self.submit(
            &agent,
            AgentRequest::Login {
                credentials: credentials.clone(),
            },
        )
        .await?;
        waiter
            .wait()
            .await
            .ok_or_else(|| BotError::Timeout("no login result".into()))
    }

    pub async fn debug_tabs(&self) -> Result<Vec<TabReport>> {
        let tabs = self.browser.tabs().await?;
        let agents = self.agents.lock();
        Ok(tabs
            .into_iter()
            .map(|t| {
                let page_type = if self.bookmaker.is_event_url(&t.url) {
                    PageType::Event
                } else if self.bookmaker.is_login_url(&t.url) {
                    PageType::Login
                } else {
                    PageType::General
                };
                TabReport {
                    bookmaker: self.bookmaker.is_site_url(&t.url),
                    has_agent: agents.get(&t.id).is_some_and(AgentHandle::is_alive),
                    page_type,
                    id: t.id,
                    title: t.title,
                    url: t.url,
                }
            })
            .collect())
    }

    pub async fn debug_page(&self) -> Result<PageReport> {
        let agent = self.site_agent().await?;
        // Page dumps walk the whole DOM
        let timeout = self.config.call_timeout() * 3;
        let envelope = agent.call(AgentRequest::DebugPage, timeout).await?;
        match envelope.page {
            Some(report) => Ok(report),
            None => Err(rejected(envelope)),
        }
    }
}

fn rejected(envelope: Envelope) -> BotError {
    BotError::Agent(
        envelope
            .error
            .unwrap_or_else(|| "request not acknowledged".to_string()),
    )
}

#[async_trait]
impl BetExecutor for PageDriver {
    async fn execute(&self, bet: &ParsedBet) -> Result<BetResult> {
        let tab = self.open_on(&bet.link).await?;
        let agent = self.ready_agent(&tab.id).await?;
        let request = AgentRequest::ArbitrageBet {
            bet_data: bet.clone(),
        };
        self.await_result(&agent, bet.job_key(), request).await
    }
}
