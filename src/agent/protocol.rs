//! Coordinator <-> page agent message bus
//!
//! Requests flow to the agent and are answered with an [`Envelope`]; long-running work
//! reports back later as an [`AgentEvent`]. Both sides are tagged by `action`.

use crate::types::{BetResult, Credentials, LogLevel, ParsedBet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AgentRequest {
    Ping,
    ArbitrageBet { bet_data: ParsedBet },
    ManualBet { amount: Decimal, message_id: String },
    Login { credentials: Credentials },
    DebugPage,
}

impl AgentRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AgentRequest::Ping => "ping",
            AgentRequest::ArbitrageBet { .. } => "arbitrageBet",
            AgentRequest::ManualBet { .. } => "manualBet",
            AgentRequest::Login { .. } => "login",
            AgentRequest::DebugPage => "debugPage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    BetResult(BetResult),
    ContentReady { url: String },
    DetailedLog { message: String, level: LogLevel },
    LoginResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Event,
    Login,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmenuInfo {
    pub text: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetControlInfo {
    pub text: String,
    pub odds: Option<Decimal>,
}

/// Structure dump of the page an agent is attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub url: String,
    pub page_type: PageType,
    pub available: bool,
    pub submenus: Vec<SubmenuInfo>,
    pub bets: Vec<BetControlInfo>,
}

/// Immediate answer to a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageReport>,
}

pub const STATUS_READY: &str = "ready";
pub const STATUS_LOADING: &str = "loading";

impl Envelope {
    pub fn ready(url: impl Into<String>) -> Self {
        Self {
            status: Some(STATUS_READY.to_string()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn loading(url: impl Into<String>) -> Self {
        Self {
            status: Some(STATUS_LOADING.to_string()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn received() -> Self {
        Self {
            received: Some(true),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn page(report: PageReport) -> Self {
        Self {
            success: Some(true),
            page: Some(report),
            ..Default::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some(STATUS_READY)
    }

    pub fn is_received(&self) -> bool {
        self.received == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_value(AgentRequest::ManualBet {
            amount: dec!(10),
            message_id: "manual_1".to_string(),
        })
        .unwrap();
        assert_eq!(json["action"], "manualBet");
        assert_eq!(json["messageId"], "manual_1");

        let ping: AgentRequest = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(ping, AgentRequest::Ping);
    }

    #[test]
    fn test_bet_result_event_is_flat() {
        let event: AgentEvent = serde_json::from_str(
            r#"{"action":"betResult","success":false,"error":"insufficient odds","messageId":"42"}"#,
        )
        .unwrap();
        match event {
            AgentEvent::BetResult(r) => {
                assert!(!r.success);
                assert_eq!(r.message_id, "42");
                assert_eq!(r.reply_to(), Some(42));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_string(&Envelope::received()).unwrap();
        assert_eq!(json, r#"{"received":true}"#);
        assert!(Envelope::ready("https://x").is_ready());
        assert!(!Envelope::loading("https://x").is_ready());
    }
}
