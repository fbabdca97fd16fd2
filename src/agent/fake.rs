//! In-memory [`Dom`] for tests

use super::dom::{Dom, Element, ElementQuery, Locator};
use crate::error::Result;
use parking_lot::Mutex as SyncMutex;

/// In-memory page: elements per locator, with optional changes triggered by clicks
pub(crate) struct FakeDom {
    pub(crate) url: SyncMutex<String>,
    pub(crate) ready_state: SyncMutex<String>,
    pub(crate) body: String,
    elements: SyncMutex<Vec<(Locator, Vec<Element>)>>,
    on_click: Vec<(String, Locator, Vec<Element>)>,
    clicks: SyncMutex<Vec<String>>,
    typed: SyncMutex<Vec<(String, String)>>,
}

impl FakeDom {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: SyncMutex::new(url.to_string()),
            ready_state: SyncMutex::new("complete".to_string()),
            body: "Real Madrid - Barcelona".to_string(),
            elements: SyncMutex::new(Vec::new()),
            on_click: Vec::new(),
            clicks: SyncMutex::new(Vec::new()),
            typed: SyncMutex::new(Vec::new()),
        }
    }

    pub(crate) fn with(self, selector: &str, elements: Vec<Element>) -> Self {
        self.elements.lock().push((Locator::parse(selector), elements));
        self
    }

    pub(crate) fn on_click(mut self, id: &str, selector: &str, elements: Vec<Element>) -> Self {
        self.on_click.push((id.to_string(), Locator::parse(selector), elements));
        self
    }

    pub(crate) fn clicks(&self) -> Vec<String> {
        self.clicks.lock().clone()
    }

    pub(crate) fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().clone()
    }
}

#[async_trait::async_trait]
impl Dom for FakeDom {
    async fn url(&self) -> Result<String> {
        Ok(self.url.lock().clone())
    }

    async fn ready_state(&self) -> Result<String> {
        Ok(self.ready_state.lock().clone())
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.body.clone())
    }

    async fn query(&self, query: &ElementQuery) -> Result<Vec<Element>> {
        Ok(self
            .elements
            .lock()
            .iter()
            .filter(|(locator, _)| *locator == query.locator)
            .flat_map(|(_, elements)| elements.clone())
            .collect())
    }

    async fn click(&self, element: &Element) -> Result<()> {
        self.clicks.lock().push(element.id.clone());
        for (id, locator, replacement) in &self.on_click {
            if *id == element.id {
                let mut elements = self.elements.lock();
                elements.retain(|(l, _)| l != locator);
                elements.push((locator.clone(), replacement.clone()));
            }
        }
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        self.typed.lock().push((element.id.clone(), text.to_string()));
        Ok(())
    }
}

pub(crate) fn el(id: &str, text: &str) -> Element {
    Element {
        id: id.to_string(),
        tag: "button".to_string(),
        text: text.to_string(),
        usable: true,
        ..Default::default()
    }
}
