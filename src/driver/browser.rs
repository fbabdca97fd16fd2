//! Browser control seam

use crate::agent::dom::Dom;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Tab management for the controlled browser
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open page tabs
    async fn tabs(&self) -> Result<Vec<TabInfo>>;

    /// New tab on `url`
    async fn open(&self, url: &str) -> Result<TabInfo>;

    async fn navigate(&self, tab_id: &str, url: &str) -> Result<()>;

    /// Bring the tab to the front
    async fn activate(&self, tab_id: &str) -> Result<()>;

    async fn reload(&self, tab_id: &str) -> Result<()>;

    /// Page access for an agent on this tab
    async fn attach(&self, tab_id: &str) -> Result<Arc<dyn Dom>>;
}
