//! Popup view over the stored verdict.
use std::fmt::Write;

use crate::coordinator::Coordinator;
use crate::extract::PageDocument;
use crate::protocol::TabId;
use crate::store::{PersistedVerdict, VerdictStore};
use crate::verdict::{RiskAssessment, RiskStatus};

pub const NO_DATA_MESSAGE: &str = "No analysis yet. Open a page and wait for the scan, or re-run it.";

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    NoData,
    Verdict(PersistedVerdict),
}

/// Stateless renderer: reads the store once when opened.
#[derive(Debug, Clone, PartialEq)]
pub struct Presenter {
    tab: Option<TabId>,
    view: View,
}

impl Presenter {
    /// Read the active tab's verdict, falling back to `lastResult`.
    /// An unreadable store shows the no-data view.
    pub fn open(store: &VerdictStore, tab: Option<TabId>) -> Self {
        let verdict = match tab {
            Some(t) => store
                .for_tab(t)
                .and_then(|v| match v {
                    Some(v) => Ok(Some(v)),
                    None => store.last_result(),
                }),
            None => store.last_result(),
        };
        let view = match verdict {
            Ok(Some(v)) => View::Verdict(v),
            Ok(None) => View::NoData,
            Err(e) => {
                tracing::warn!("verdict store unavailable: {e}");
                View::NoData
            }
        };
        Self { tab, view }
    }

    /// The no-data view, for when there is no store to read at all.
    pub fn empty() -> Self {
        Self {
            tab: None,
            view: View::NoData,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Re-run local analysis on the page and record it like an automatic run.
    pub fn rerun(&mut self, coordinator: &Coordinator, doc: &PageDocument) -> RiskAssessment {
        let assessment = coordinator.analyze_and_record(self.tab, doc);
        *self = Self::open(coordinator.store(), self.tab);
        assessment
    }

    pub fn render(&self) -> String {
        let verdict = match &self.view {
            View::NoData => return format!("{NO_DATA_MESSAGE}\n"),
            View::Verdict(v) => v,
        };

        let headline = match verdict.status {
            RiskStatus::Safe => "SAFE",
            RiskStatus::Suspicious => "SUSPICIOUS",
            RiskStatus::Phishing => "PHISHING",
        };
        let mut out = String::new();
        let _ = writeln!(out, "{headline}  {}/100", verdict.score);
        if !verdict.layer.is_empty() {
            let _ = writeln!(out, "Checked by: {}", verdict.layer);
        }
        for reason in &verdict.reasons {
            let _ = writeln!(out, "  - {reason}");
        }
        if let Some(data) = &verdict.data {
            if !data.url.is_empty() {
                let _ = writeln!(out, "URL: {}", data.url);
            }
        }
        out
    }
}
