use crate::extract::{self, PageDocument, PageSnapshot};
use crate::profile::ScoringProfile;
use crate::rules;
use crate::verdict::{RiskAssessment, RuleTrace};

/// Result of one local analysis pass over a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnalysis {
    pub snapshot: PageSnapshot,
    pub assessment: RiskAssessment,
}

/// Run every rule against a snapshot and return the ordered trace.
///
/// The whitelist runs first and ends the pass; the remaining rules run in a
/// fixed order, which only affects the order of reasons.
pub fn evaluate(snapshot: &PageSnapshot, profile: &ScoringProfile) -> RuleTrace {
    let mut trace = RuleTrace::default();

    if rules::hostname::is_trusted(snapshot, profile) {
        trace.trusted = true;
        return trace;
    }

    rules::form::check(snapshot, profile, &mut trace);
    rules::content::check(snapshot, profile, &mut trace);
    rules::hostname::check(snapshot, profile, &mut trace);

    trace
}

/// Score a snapshot. Pure: no I/O, same input gives the same assessment.
pub fn assess(snapshot: &PageSnapshot, profile: &ScoringProfile) -> RiskAssessment {
    RiskAssessment::from_trace(&evaluate(snapshot, profile))
}

/// Extract features from the live document and score them in one pass.
pub fn analyze(doc: &PageDocument, profile: &ScoringProfile) -> PageAnalysis {
    let snapshot = extract::extract(doc, profile);
    let assessment = assess(&snapshot, profile);
    PageAnalysis {
        snapshot,
        assessment,
    }
}
