//! Chrome DevTools Protocol backend
//!
//! Tabs are listed and opened through the DevTools HTTP endpoints; page work goes over
//! one websocket per tab. Elements returned by [`CdpDom::query`] are tagged with a
//! `data-sbid` attribute so later clicks can find them again.

use super::browser::{Browser, TabInfo};
use crate::agent::dom::{Dom, Element, ElementQuery};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdpTarget {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    web_socket_debugger_url: Option<String>,
}

impl From<&CdpTarget> for TabInfo {
    fn from(t: &CdpTarget) -> Self {
        TabInfo {
            id: t.id.clone(),
            url: t.url.clone(),
            title: t.title.clone(),
        }
    }
}

pub struct CdpBrowser {
    http: reqwest::Client,
    base_url: String,
    call_timeout: Duration,
    pages: Mutex<HashMap<String, Arc<CdpPage>>>,
}

impl CdpBrowser {
    pub fn new(base_url: &str, call_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            call_timeout,
            pages: Mutex::new(HashMap::new()),
        }
    }

    async fn targets(&self) -> Result<Vec<CdpTarget>> {
        let url = format!("{}/json/list", self.base_url);
        let targets: Vec<CdpTarget> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(targets.into_iter().filter(|t| t.kind == "page").collect())
    }

    /// Websocket session for a tab, connecting on first use
    async fn page(&self, tab_id: &str) -> Result<Arc<CdpPage>> {
        if let Some(page) = self.pages.lock().get(tab_id) {
            if page.is_alive() {
                return Ok(Arc::clone(page));
            }
        }

        let target = self
            .targets()
            .await?
            .into_iter()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| BotError::Browser(format!("tab {} not found", tab_id)))?;
        let ws_url = target
            .web_socket_debugger_url
            .ok_or_else(|| BotError::Browser(format!("tab {} is attached elsewhere", tab_id)))?;

        let page = Arc::new(CdpPage::connect(&ws_url, self.call_timeout).await?);
        self.pages.lock().insert(tab_id.to_string(), Arc::clone(&page));
        Ok(page)
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    async fn tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(self.targets().await?.iter().map(TabInfo::from).collect())
    }

    async fn open(&self, url: &str) -> Result<TabInfo> {
        let endpoint = format!("{}/json/new?{}", self.base_url, url);
        let target: CdpTarget = self
            .http
            .put(&endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::info!("Opened tab {} on {}", target.id, url);
        Ok(TabInfo::from(&target))
    }

    async fn navigate(&self, tab_id: &str, url: &str) -> Result<()> {
        let page = self.page(tab_id).await?;
        let result = page.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(BotError::Browser(format!("navigation to {} failed: {}", url, error)));
        }
        Ok(())
    }

    async fn activate(&self, tab_id: &str) -> Result<()> {
        let endpoint = format!("{}/json/activate/{}", self.base_url, tab_id);
        self.http.get(&endpoint).send().await?.error_for_status()?;
        Ok(())
    }

    async fn reload(&self, tab_id: &str) -> Result<()> {
        let page = self.page(tab_id).await?;
        page.call("Page.reload", json!({ "ignoreCache": false })).await?;
        Ok(())
    }

    async fn attach(&self, tab_id: &str) -> Result<Arc<dyn Dom>> {
        let page = self.page(tab_id).await?;
        Ok(Arc::new(CdpDom { page }))
    }
}

type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// One DevTools websocket session
pub struct CdpPage {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingCalls,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
    call_timeout: Duration,
}

impl CdpPage {
    pub async fn connect(ws_url: &str, call_timeout: Duration) -> Result<Self> {
        let (stream, _) = connect_async(ws_url).await?;
        tracing::debug!("DevTools session open: {}", ws_url);
        let (mut write, mut read) = stream.split();

        let (outgoing, mut rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::warn!("DevTools write failed: {}", e);
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_alive = Arc::clone(&alive);
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch_reply(&reader_pending, text.as_str()),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("DevTools read failed: {}", e);
                        break;
                    }
                }
            }
            reader_alive.store(false, Ordering::SeqCst);
            reader_pending.lock().clear();
            tracing::debug!("DevTools session closed");
        });

        Ok(Self {
            outgoing,
            pending,
            next_id: AtomicU64::new(1),
            alive,
            call_timeout,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.outgoing.is_closed()
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let request = json!({ "id": id, "method": method, "params": params });
        if self.outgoing.send(Message::Text(request.to_string().into())).is_err() {
            self.pending.lock().remove(&id);
            return Err(BotError::Browser("DevTools session closed".into()));
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BotError::Browser(format!("{} dropped: session closed", method))),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(BotError::Timeout(method.to_string()))
            }
        }
    }

    /// `Runtime.evaluate` with the value returned by value
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("script exception");
            return Err(BotError::Browser(text.to_string()));
        }
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }
}

fn dispatch_reply(pending: &PendingCalls, text: &str) {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        tracing::debug!("Unreadable DevTools frame");
        return;
    };
    // Frames without an id are protocol events
    let Some(id) = frame.get("id").and_then(Value::as_u64) else {
        return;
    };
    let Some(tx) = pending.lock().remove(&id) else {
        return;
    };

    let reply = match frame.get("error") {
        Some(error) => Err(BotError::Browser(
            error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("protocol error")
                .to_string(),
        )),
        None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
    };
    let _ = tx.send(reply);
}

const QUERY_SCRIPT: &str = r#"
(q => {
  const usable = el => {
    const r = el.getBoundingClientRect();
    const s = getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden' && !el.disabled;
  };
  const nodes = q.locator.kind === 'css'
    ? Array.from(document.querySelectorAll(q.locator.selector))
    : Array.from(document.querySelectorAll(q.locator.tag)).filter(el => (el.textContent || '').includes(q.locator.text));
  return nodes.map(el => {
    let id = el.getAttribute('data-sbid');
    if (!id) {
      window.__sbSeq = (window.__sbSeq || 0) + 1;
      id = 'sb' + window.__sbSeq;
      el.setAttribute('data-sbid', id);
    }
    const child = part => {
      const c = el.querySelector('[class*="' + part + '"]');
      return c ? c.textContent.trim() : null;
    };
    const ctx = q.context ? el.closest(q.context) : null;
    const classes = typeof el.className === 'string' ? el.className.split(/\s+/).filter(Boolean) : [];
    return {
      id,
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.textContent || '').trim(),
      context: ctx ? (ctx.innerText || '').trim().slice(0, 500) : '',
      dataOdds: el.getAttribute('data-odds'),
      oddsText: child('odd'),
      priceText: child('price'),
      classes,
      selected: classes.some(c => /active|selected/i.test(c)) || el.getAttribute('aria-selected') === 'true',
      usable: usable(el),
      hasTableIcon: !!el.querySelector('svg[class*="table"], [class*="table"], [data-icon*="table"]'),
      inputType: el.tagName === 'INPUT' ? el.type : null,
    };
  });
})
"#;

const CLICK_SCRIPT: &str = r#"
(async (id, delays) => {
  const el = document.querySelector('[data-sbid="' + id + '"]');
  if (!el) return false;
  const wait = ms => new Promise(r => setTimeout(r, ms));
  const fire = type => el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
  el.scrollIntoView({ block: 'center' });
  fire('mouseover');
  await wait(delays[0]);
  fire('mousedown');
  await wait(delays[1]);
  fire('mouseup');
  el.click();
  return true;
})
"#;

const TYPE_SCRIPT: &str = r#"
(async (id, text, delays) => {
  const el = document.querySelector('[data-sbid="' + id + '"]');
  if (!el) return false;
  const proto = Object.getPrototypeOf(el);
  const desc = Object.getOwnPropertyDescriptor(proto, 'value');
  const set = v => (desc && desc.set ? desc.set.call(el, v) : (el.value = v));
  el.focus();
  set('');
  el.dispatchEvent(new Event('input', { bubbles: true }));
  let value = '';
  for (let i = 0; i < text.length; i++) {
    value += text[i];
    el.dispatchEvent(new KeyboardEvent('keydown', { key: text[i], bubbles: true }));
    set(value);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new KeyboardEvent('keyup', { key: text[i], bubbles: true }));
    await new Promise(r => setTimeout(r, delays[i] || 0));
  }
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})
"#;

/// Script call expression `(<fn>)(arg, ...)` with JSON-encoded arguments
fn invoke(script: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("{}({})", script.trim(), args.join(", "))
}

/// Pauses between mouse events, in ms
fn click_delays() -> Vec<u64> {
    let mut rng = rand::rng();
    vec![rng.random_range(25..=50), rng.random_range(25..=50)]
}

/// Pause after each typed character, in ms
fn typing_delays(len: usize) -> Vec<u64> {
    let mut rng = rand::rng();
    (0..len).map(|_| rng.random_range(30..=70)).collect()
}

pub struct CdpDom {
    page: Arc<CdpPage>,
}

impl CdpDom {
    async fn eval_string(&self, expression: &str) -> Result<String> {
        Ok(self
            .page
            .evaluate(expression)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl Dom for CdpDom {
    async fn url(&self) -> Result<String> {
        self.eval_string("location.href").await
    }

    async fn ready_state(&self) -> Result<String> {
        self.eval_string("document.readyState").await
    }

    async fn body_text(&self) -> Result<String> {
        self.eval_string("document.body ? document.body.innerText : ''").await
    }

    async fn query(&self, query: &ElementQuery) -> Result<Vec<Element>> {
        let expression = invoke(QUERY_SCRIPT, &[serde_json::to_value(query)?]);
        let value = self.page.evaluate(&expression).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        let delays = click_delays();
        let expression = invoke(CLICK_SCRIPT, &[json!(element.id), json!(delays)]);
        match self.page.evaluate(&expression).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(BotError::Browser(format!("element {} is gone", element.id))),
        }
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        let delays = typing_delays(text.chars().count());
        let expression = invoke(TYPE_SCRIPT, &[json!(element.id), json!(text), json!(delays)]);
        match self.page.evaluate(&expression).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(BotError::Browser(format!("element {} is gone", element.id))),
        }
    }
}
