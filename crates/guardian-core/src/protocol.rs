//! Message protocol between page analyzers, the coordinator and the popup.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extract::{PageDocument, PageSnapshot};
use crate::verdict::{Badge, RiskAssessment};

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An assessment produced in the page, optionally with the features it saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessedPage {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PageSnapshot>,
}

/// Payload of `analyzePage`: a finished assessment or raw features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PagePayload {
    Assessment(AssessedPage),
    Snapshot(PageSnapshot),
}

/// Inbound request to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Message {
    AnalyzePage(PagePayload),
    UpdateBadge(Badge),
    GetFeatures,
    RefreshAnalysis,
}

/// Coordinator response to one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "camelCase")]
pub enum Reply {
    Ack,
    Features(PageSnapshot),
    Assessment(RiskAssessment),
    /// No page is attached to the tab.
    Unavailable,
    Error(String),
}

/// One line of the stdio coordinator: a tab-scoped protocol message or a tab
/// lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub tab: TabId,
    pub event: TabEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    Message(Message),
    /// The tab navigated to a page; `data` is `{url, html}`.
    Attached(PageDocument),
    Closed,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    tab: TabId,
    action: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    /// Parse `{"tab": <id>, "action": ..., "data": ...}`.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let header = EnvelopeHeader::deserialize(&value)?;
        let event = match header.action.as_str() {
            "tabClosed" => TabEvent::Closed,
            "attachPage" => TabEvent::Attached(serde_json::from_value(header.data)?),
            _ => TabEvent::Message(serde_json::from_value(value)?),
        };
        Ok(Envelope {
            tab: header.tab,
            event,
        })
    }
}
