//! Remote escalation: the request sent to the deep-analysis service, its
//! response, and the background threads that carry it.
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::extract::PageSnapshot;
use crate::verdict::{RiskAssessment, RiskStatus, MAX_SCORE};

/// Layer name used when the service does not report one.
pub const REMOTE_LAYER: &str = "Remote";
/// Reason recorded when the service reports a non-safe verdict without any.
pub const REMOTE_FLAGGED_REASON: &str = "Flagged by remote analysis";
/// Reason recorded when the service clears a page without giving reasons.
pub const REMOTE_CLEARED_REASON: &str = "Remote analysis found no issues";

#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRequest {
    pub url: String,
    pub hostname: String,
    pub title: String,
    pub local_score: u8,
    pub local_status: RiskStatus,
    pub local_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<PageSnapshot>,
}

impl EscalationRequest {
    pub fn new(assessment: &RiskAssessment, features: Option<&PageSnapshot>) -> Self {
        let (url, hostname, title) = features
            .map(|f| (f.url.clone(), f.hostname.clone(), f.title.clone()))
            .unwrap_or_default();
        Self {
            url,
            hostname,
            title,
            local_score: assessment.score,
            local_status: assessment.status,
            local_reasons: assessment.reasons.clone(),
            features: features.cloned(),
        }
    }
}

/// Verdict returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVerdict {
    pub status: RiskStatus,
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

impl RemoteVerdict {
    /// The remote status is kept as reported; the score is clamped and an
    /// empty reason list gets a fallback entry.
    pub fn into_assessment(self) -> RiskAssessment {
        let score = self.score.clamp(0.0, f64::from(MAX_SCORE)).round() as u8;
        let mut reasons: Vec<String> = self
            .reasons
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .collect();
        if reasons.is_empty() {
            let fallback = match self.status {
                RiskStatus::Safe => REMOTE_CLEARED_REASON,
                RiskStatus::Suspicious | RiskStatus::Phishing => REMOTE_FLAGGED_REASON,
            };
            reasons.push(fallback.to_string());
        }
        RiskAssessment {
            status: self.status,
            score,
            reasons,
            layer: self
                .layer
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| REMOTE_LAYER.to_string()),
        }
    }
}

/// A deep-analysis service.
pub trait AnalysisBackend: Send + Sync {
    fn analyze(&self, request: &EscalationRequest) -> Result<RemoteVerdict, EscalationError>;
}

/// Blocking HTTP client for `POST {base}/analyze`.
///
/// Uses a 5s connect timeout and a 10s total timeout. No auth, no retry.
pub struct HttpBackend {
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, allow_insecure_http: bool) -> Result<Self, EscalationError> {
        let base = crate::url_validate::validate_endpoint(base_url, allow_insecure_http)
            .map_err(EscalationError::InvalidEndpoint)?;
        let endpoint_str = format!("{}/analyze", base.as_str().trim_end_matches('/'));
        let endpoint =
            Url::parse(&endpoint_str).map_err(|e| EscalationError::InvalidEndpoint(e.to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EscalationError::Network(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl AnalysisBackend for HttpBackend {
    fn analyze(&self, request: &EscalationRequest) -> Result<RemoteVerdict, EscalationError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .map_err(|e| EscalationError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EscalationError::Status(status.as_u16()));
        }
        resp.json::<RemoteVerdict>()
            .map_err(|e| EscalationError::InvalidResponse(e.to_string()))
    }
}

/// Tracks background escalation threads.
///
/// Call `flush()` (or let the dispatcher drop) to join all pending requests.
#[derive(Default)]
pub struct EscalationDispatcher {
    handles: Vec<JoinHandle<()>>,
}

impl EscalationDispatcher {
    pub fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(std::thread::spawn(job));
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Block until all pending escalations have completed.
    pub fn flush(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("escalation thread panicked");
            }
        }
    }
}

impl Drop for EscalationDispatcher {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn local(score: u8) -> RiskAssessment {
        RiskAssessment {
            status: RiskStatus::from_score(score),
            score,
            reasons: vec!["Phishing keyword found: 'OTP'".into()],
            layer: "Bouncer".into(),
        }
    }

    #[test]
    fn test_request_field_names() {
        let snapshot = PageSnapshot {
            url: "https://a.xyz/login".into(),
            hostname: "a.xyz".into(),
            title: "Login".into(),
            ..Default::default()
        };
        let req = EscalationRequest::new(&local(30), Some(&snapshot));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["localScore"], 30);
        assert_eq!(json["localStatus"], "Suspicious");
        assert_eq!(json["localReasons"][0], "Phishing keyword found: 'OTP'");
        assert_eq!(json["hostname"], "a.xyz");
        assert_eq!(json["features"]["title"], "Login");
    }

    #[test]
    fn test_request_without_features() {
        let req = EscalationRequest::new(&local(40), None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["url"], "");
        assert!(json.get("features").is_none());
    }

    #[test]
    fn test_remote_verdict_clamps_score() {
        let v: RemoteVerdict =
            serde_json::from_str(r#"{"status":"Phishing","score":140,"reasons":["Fake KBank"]}"#)
                .unwrap();
        let a = v.into_assessment();
        assert_eq!(a.score, 100);
        assert_eq!(a.status, RiskStatus::Phishing);
        assert_eq!(a.layer, REMOTE_LAYER);

        let v: RemoteVerdict =
            serde_json::from_str(r#"{"status":"Safe","score":-5,"layer":"Judge"}"#).unwrap();
        let a = v.into_assessment();
        assert_eq!(a.score, 0);
        assert_eq!(a.reasons, vec![REMOTE_CLEARED_REASON]);
        assert_eq!(a.layer, "Judge");

        let v: RemoteVerdict =
            serde_json::from_str(r#"{"status":"Suspicious","score":40,"reasons":[]}"#).unwrap();
        assert_eq!(v.into_assessment().reasons, vec![REMOTE_FLAGGED_REASON]);
    }

    #[test]
    fn test_remote_verdict_unknown_status_rejected() {
        assert!(serde_json::from_str::<RemoteVerdict>(r#"{"status":"Maybe","score":50}"#).is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(EscalationError::Status(502).to_string(), "server returned HTTP 502");
        assert_eq!(
            EscalationError::Network("timeout".into()).to_string(),
            "network error: timeout"
        );
    }

    #[test]
    fn test_backend_rejects_invalid_endpoint() {
        let err = HttpBackend::new("http://example.com", false).err().unwrap();
        assert!(matches!(err, EscalationError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_backend_endpoint_path() {
        let backend = HttpBackend::new("https://guardian.example.th/api/", false).unwrap();
        assert_eq!(
            backend.endpoint().as_str(),
            "https://guardian.example.th/api/analyze"
        );
    }

    #[test]
    fn test_unreachable_backend_is_network_error() {
        // Non-routable address should fail quickly
        let backend = HttpBackend::new("http://192.0.2.1:1", true).unwrap();
        match backend.analyze(&EscalationRequest::new(&local(30), None)) {
            Err(EscalationError::Network(_)) => {}
            other => panic!("expected network error, got: {other:?}"),
        }
    }

    #[test]
    fn test_dispatcher_flush_joins() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EscalationDispatcher::default();
        for _ in 0..4 {
            let count = Arc::clone(&count);
            dispatcher.spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        dispatcher.flush();
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(dispatcher.pending(), 0);
    }
}
