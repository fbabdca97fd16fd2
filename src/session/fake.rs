//! Session wiring with no browser behind it

use super::BotSession;
use crate::agent::dom::Dom;
use crate::config::Config;
use crate::driver::{Browser, TabInfo};
use crate::error::{BotError, Result};
use crate::storage::StateRepository;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) struct OfflineBrowser;

#[async_trait]
impl Browser for OfflineBrowser {
    async fn tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(Vec::new())
    }

    async fn open(&self, _url: &str) -> Result<TabInfo> {
        Err(BotError::Browser("browser offline".into()))
    }

    async fn navigate(&self, _tab_id: &str, _url: &str) -> Result<()> {
        Err(BotError::Browser("browser offline".into()))
    }

    async fn activate(&self, _tab_id: &str) -> Result<()> {
        Ok(())
    }

    async fn reload(&self, _tab_id: &str) -> Result<()> {
        Ok(())
    }

    async fn attach(&self, tab_id: &str) -> Result<Arc<dyn Dom>> {
        Err(BotError::Browser(format!("tab {} not found", tab_id)))
    }
}

pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.polling.interval_ms = 10;
    config.polling.irrelevant_log_sample = 0.0;
    config.queue.inter_job_delay_ms = 0;
    config.queue.drain_interval_ms = 10;
    config.driver.page_load_wait_ms = 0;
    config
}

pub(crate) async fn offline_session(repo: StateRepository) -> Arc<BotSession> {
    BotSession::new(test_config(), repo, Arc::new(OfflineBrowser))
        .await
        .unwrap()
}
