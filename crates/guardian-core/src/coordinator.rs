//! Escalation coordinator: the single authority over stored verdicts and the
//! badge. Everything reaches it through `handle`.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::engine;
use crate::escalation::{AnalysisBackend, EscalationDispatcher, EscalationRequest, HttpBackend};
use crate::extract::{self, PageDocument, PageSnapshot};
use crate::profile::ScoringProfile;
use crate::protocol::{AssessedPage, Message, PagePayload, Reply, TabId};
use crate::store::{PersistedVerdict, VerdictSource, VerdictStore};
use crate::surface::{BadgeSurface, Notifier, PHISHING_NOTIFICATION_TITLE};
use crate::verdict::{RiskAssessment, RiskStatus};

/// Access to the page currently shown in a tab.
pub trait PageContext: Send + Sync {
    /// Serialize the live document, or `None` if it is gone.
    fn capture(&self) -> Option<PageDocument>;
}

/// A page whose document never changes.
#[derive(Debug, Clone)]
pub struct StaticPage(pub PageDocument);

impl PageContext for StaticPage {
    fn capture(&self) -> Option<PageDocument> {
        Some(self.0.clone())
    }
}

struct Shared {
    profile: ScoringProfile,
    store: VerdictStore,
    badge: Arc<dyn BadgeSurface>,
    notifier: Arc<dyn Notifier>,
    backend: Option<Arc<dyn AnalysisBackend>>,
    /// Held across persist and badge so the two never disagree.
    record_lock: Mutex<()>,
    /// Tabs closed while an escalation for them may still be running.
    closed: Mutex<HashSet<TabId>>,
}

impl Shared {
    fn lock_record(&self) -> MutexGuard<'_, ()> {
        self.record_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn closed_tabs(&self) -> MutexGuard<'_, HashSet<TabId>> {
        self.closed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(
        &self,
        tab: Option<TabId>,
        assessment: &RiskAssessment,
        data: Option<PageSnapshot>,
        source: VerdictSource,
    ) -> PersistedVerdict {
        let _guard = self.lock_record();
        self.record_locked(tab, assessment, data, source)
    }

    /// Caller holds `record_lock`.
    fn record_locked(
        &self,
        tab: Option<TabId>,
        assessment: &RiskAssessment,
        data: Option<PageSnapshot>,
        source: VerdictSource,
    ) -> PersistedVerdict {
        let verdict = PersistedVerdict::new(assessment, data, tab, source);
        if let Err(e) = self.store.write(&verdict) {
            tracing::warn!("failed to persist verdict: {e}");
        }
        self.badge.set_badge(tab, &assessment.status.badge());
        tracing::info!(
            tab = tab.map(|t| t.0),
            status = %assessment.status,
            score = assessment.score,
            layer = %assessment.layer,
            "verdict recorded"
        );
        verdict
    }

    fn run_escalation(&self, tab: TabId, request: EscalationRequest, data: Option<PageSnapshot>) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        match backend.analyze(&request) {
            Ok(remote) => {
                let assessment = remote.into_assessment();
                {
                    let _guard = self.lock_record();
                    if self.closed_tabs().contains(&tab) {
                        tracing::debug!(tab = tab.0, "tab closed, remote verdict dropped");
                        return;
                    }
                    self.record_locked(Some(tab), &assessment, data, VerdictSource::Remote);
                }
                if assessment.status == RiskStatus::Phishing {
                    if let Some(reason) = assessment.reasons.first() {
                        self.notifier.notify(PHISHING_NOTIFICATION_TITLE, reason);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(tab = tab.0, "escalation failed, keeping local verdict: {e}");
            }
        }
    }
}

pub struct Coordinator {
    shared: Arc<Shared>,
    pages: Mutex<HashMap<TabId, Arc<dyn PageContext>>>,
    dispatcher: Mutex<EscalationDispatcher>,
}

impl Coordinator {
    /// Without a backend, escalation is skipped and the local verdict is final.
    pub fn new(
        profile: ScoringProfile,
        store: VerdictStore,
        badge: Arc<dyn BadgeSurface>,
        notifier: Arc<dyn Notifier>,
        backend: Option<Arc<dyn AnalysisBackend>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                profile,
                store,
                badge,
                notifier,
                backend,
                record_lock: Mutex::new(()),
                closed: Mutex::new(HashSet::new()),
            }),
            pages: Mutex::new(HashMap::new()),
            dispatcher: Mutex::new(EscalationDispatcher::default()),
        }
    }

    /// Build a coordinator from configuration. An unusable `remote_url` is
    /// reported and the coordinator runs local-only.
    pub fn from_config(
        config: &Config,
        store: VerdictStore,
        badge: Arc<dyn BadgeSurface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let backend: Option<Arc<dyn AnalysisBackend>> = match config.remote_url.as_deref() {
            Some(url) => match HttpBackend::new(url, config.allow_insecure_http) {
                Ok(backend) => Some(Arc::new(backend) as Arc<dyn AnalysisBackend>),
                Err(e) => {
                    tracing::warn!("remote analysis disabled: {e}");
                    None
                }
            },
            None => None,
        };
        Self::new(config.scoring_profile(), store, badge, notifier, backend)
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.shared.profile
    }

    pub fn store(&self) -> &VerdictStore {
        &self.shared.store
    }

    pub fn has_backend(&self) -> bool {
        self.shared.backend.is_some()
    }

    /// Handle one inbound message. Never fails: problems become replies or logs.
    pub fn handle(&self, tab: TabId, message: Message) -> Reply {
        match message {
            Message::AnalyzePage(PagePayload::Assessment(AssessedPage { assessment, data })) => {
                self.commit_local(tab, assessment, data);
                Reply::Ack
            }
            Message::AnalyzePage(PagePayload::Snapshot(snapshot)) => {
                let assessment = engine::assess(&snapshot, &self.shared.profile);
                self.commit_local(tab, assessment, Some(snapshot));
                Reply::Ack
            }
            Message::UpdateBadge(badge) => {
                self.shared.badge.set_badge(Some(tab), &badge);
                Reply::Ack
            }
            Message::GetFeatures => match self.capture(tab) {
                Some(doc) => Reply::Features(extract::extract(&doc, &self.shared.profile)),
                None => Reply::Unavailable,
            },
            Message::RefreshAnalysis => match self.capture(tab) {
                Some(doc) => Reply::Assessment(self.analyze_and_record(Some(tab), &doc)),
                None => Reply::Unavailable,
            },
        }
    }

    /// Persist a verdict and apply its badge as one step.
    pub fn record(
        &self,
        tab: Option<TabId>,
        assessment: &RiskAssessment,
        data: Option<PageSnapshot>,
        source: VerdictSource,
    ) -> PersistedVerdict {
        self.shared.record(tab, assessment, data, source)
    }

    /// Score a document locally and record the result.
    pub fn analyze_and_record(&self, tab: Option<TabId>, doc: &PageDocument) -> RiskAssessment {
        if let Some(tab) = tab {
            self.reopen(tab);
        }
        let analysis = engine::analyze(doc, &self.shared.profile);
        self.record(
            tab,
            &analysis.assessment,
            Some(analysis.snapshot),
            VerdictSource::Local,
        );
        analysis.assessment
    }

    /// Ask the remote service for a second opinion on a non-safe verdict.
    /// The request runs in the background; the current verdict stands until
    /// it succeeds.
    pub fn escalate(&self, tab: TabId, assessment: &RiskAssessment, data: Option<PageSnapshot>) {
        if assessment.status == RiskStatus::Safe {
            return;
        }
        if self.shared.backend.is_none() {
            tracing::debug!(tab = tab.0, "no remote endpoint configured; escalation skipped");
            return;
        }

        let request = EscalationRequest::new(assessment, data.as_ref());
        let shared = Arc::clone(&self.shared);
        let job = move || shared.run_escalation(tab, request, data);
        match self.dispatcher.lock() {
            Ok(mut dispatcher) => dispatcher.spawn(job),
            Err(_) => tracing::warn!("escalation dispatcher unavailable"),
        }
    }

    pub fn attach_page(&self, tab: TabId, page: Arc<dyn PageContext>) {
        self.reopen(tab);
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(tab, page);
        }
    }

    /// Forget a closed tab and drop its stored verdict. A remote verdict that
    /// arrives for it afterwards is discarded.
    pub fn close_tab(&self, tab: TabId) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.remove(&tab);
        }
        let _guard = self.shared.lock_record();
        self.shared.closed_tabs().insert(tab);
        if let Err(e) = self.shared.store.evict_tab(tab) {
            tracing::warn!(tab = tab.0, "failed to evict tab verdict: {e}");
        }
    }

    /// Wait for all in-flight escalations.
    pub fn flush(&self) {
        if let Ok(mut dispatcher) = self.dispatcher.lock() {
            dispatcher.flush();
            // Nothing is in flight, so no late verdict can target a closed tab.
            self.shared.closed_tabs().clear();
        }
    }

    /// Inbound verdicts are normalized before they are stored or escalated.
    fn commit_local(&self, tab: TabId, assessment: RiskAssessment, data: Option<PageSnapshot>) {
        let assessment = assessment.normalized();
        self.reopen(tab);
        self.record(Some(tab), &assessment, data.clone(), VerdictSource::Local);
        self.escalate(tab, &assessment, data);
    }

    /// New activity on a tab id makes it live again.
    fn reopen(&self, tab: TabId) {
        self.shared.closed_tabs().remove(&tab);
    }

    fn capture(&self, tab: TabId) -> Option<PageDocument> {
        let page = self.pages.lock().ok()?.get(&tab).cloned()?;
        page.capture()
    }
}
