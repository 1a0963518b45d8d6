use guardian_core::config::Config;
use guardian_core::engine;
use guardian_core::extract::{self, PageDocument};
use guardian_core::protocol::{AssessedPage, Message, PagePayload, TabId};
use guardian_core::verdict::RiskAssessment;

pub fn run(config: &Config, file: &str, url: &str, json: bool, record: bool, tab: u32) -> i32 {
    let html = match super::read_html(file) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("guardian: {e}");
            return 1;
        }
    };
    let doc = PageDocument::new(url, html);

    let assessment = if record {
        match record_and_escalate(config, &doc, TabId(tab)) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("guardian: {e}");
                return 1;
            }
        }
    } else {
        engine::analyze(&doc, &config.scoring_profile()).assessment
    };

    if json {
        let _ = serde_json::to_writer_pretty(std::io::stdout().lock(), &assessment);
        println!();
    } else {
        eprintln!(
            "guardian: {url}: {} (score: {}/100, {})",
            assessment.status, assessment.score, assessment.layer
        );
        for reason in &assessment.reasons {
            eprintln!("  - {reason}");
        }
    }

    0
}

/// Send the local verdict through the coordinator and wait for escalation.
/// Returns whichever verdict ended up authoritative for the tab.
fn record_and_escalate(config: &Config, doc: &PageDocument, tab: TabId) -> Result<RiskAssessment, String> {
    let coordinator = super::open_coordinator(config)?;
    let analysis = engine::analyze(doc, coordinator.profile());
    coordinator.handle(
        tab,
        Message::AnalyzePage(PagePayload::Assessment(AssessedPage {
            assessment: analysis.assessment.clone(),
            data: Some(analysis.snapshot),
        })),
    );
    coordinator.flush();

    match coordinator.store().for_tab(tab) {
        Ok(Some(verdict)) => Ok(verdict.assessment()),
        Ok(None) => Ok(analysis.assessment),
        Err(e) => {
            tracing::warn!("cannot read back verdict: {e}");
            Ok(analysis.assessment)
        }
    }
}

pub fn features(config: &Config, file: &str, url: &str) -> i32 {
    let html = match super::read_html(file) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("guardian: {e}");
            return 1;
        }
    };
    let snapshot = extract::extract(&PageDocument::new(url, html), &config.scoring_profile());
    let _ = serde_json::to_writer_pretty(std::io::stdout().lock(), &snapshot);
    println!();
    0
}
