//! Page access seam
//!
//! The agent never touches the browser directly; it sees the page through [`Dom`],
//! which the CDP backend implements with `Runtime.evaluate` and tests implement with
//! an in-memory page.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How to find elements. `tag:contains("Text")` selects by visible text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Locator {
    Css { selector: String },
    TextContains { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some((tag, rest)) = raw.split_once(":contains(") {
            let text = rest
                .trim_end_matches(')')
                .trim_matches(|c| c == '"' || c == '\'');
            if !text.is_empty() {
                let tag = if tag.is_empty() { "*" } else { tag };
                return Locator::TextContains {
                    tag: tag.to_string(),
                    text: text.to_string(),
                };
            }
        }
        Locator::css(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementQuery {
    pub locator: Locator,
    /// Ancestor selector whose text becomes [`Element::context`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ElementQuery {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            context: None,
        }
    }

    pub fn css(selector: &str) -> Self {
        Self::new(Locator::css(selector))
    }

    pub fn with_context(mut self, selector: &str) -> Self {
        self.context = Some(selector.to_string());
        self
    }
}

/// Snapshot of one element at query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Element {
    /// Handle valid until the next navigation
    pub id: String,
    pub tag: String,
    pub text: String,
    pub context: String,
    pub data_odds: Option<String>,
    /// Text of a child whose class mentions "odd"
    pub odds_text: Option<String>,
    /// Text of a child whose class mentions "price"
    pub price_text: Option<String>,
    pub classes: Vec<String>,
    /// Active/selected/aria-selected
    pub selected: bool,
    /// Visible, sized and enabled
    pub usable: bool,
    pub has_table_icon: bool,
    pub input_type: Option<String>,
}

impl Element {
    pub fn has_class_containing(&self, needle: &str) -> bool {
        self.classes.iter().any(|c| c.contains(needle))
    }
}

#[async_trait]
pub trait Dom: Send + Sync {
    async fn url(&self) -> Result<String>;

    /// `document.readyState`
    async fn ready_state(&self) -> Result<String>;

    async fn body_text(&self) -> Result<String>;

    /// Elements matching the query in document order
    async fn query(&self, query: &ElementQuery) -> Result<Vec<Element>>;

    async fn click(&self, element: &Element) -> Result<()>;

    /// Replace the element's value with `text`
    async fn type_text(&self, element: &Element, text: &str) -> Result<()>;
}
