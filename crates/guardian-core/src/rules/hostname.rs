use crate::extract::PageSnapshot;
use crate::profile::ScoringProfile;
use crate::verdict::{RuleId, RuleTrace};

/// Whitelist check, run before every other rule.
pub fn is_trusted(snapshot: &PageSnapshot, profile: &ScoringProfile) -> bool {
    profile.is_trusted(&snapshot.hostname)
}

/// Run the URL-shape rules against the snapshot's hostname.
pub fn check(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    let host = snapshot.hostname.as_str();
    if host.is_empty() {
        return;
    }
    check_suspicious_tld(host, profile, trace);
    check_hyphenated_hostname(host, profile, trace);
}

fn check_suspicious_tld(host: &str, profile: &ScoringProfile, trace: &mut RuleTrace) {
    let weight = profile.weights.suspicious_tld;
    if weight == 0 {
        return;
    }
    if let Some(tld) = profile.suspicious_tld(host) {
        trace.push(
            RuleId::SuspiciousTld,
            weight,
            format!("Suspicious top-level domain: {tld}"),
        );
    }
}

fn check_hyphenated_hostname(host: &str, profile: &ScoringProfile, trace: &mut RuleTrace) {
    let weight = profile.weights.hyphenated_hostname;
    if weight == 0 {
        return;
    }
    let parts = host.split('-').count();
    if parts > 2 {
        trace.push(
            RuleId::HyphenatedHostname,
            weight,
            format!(
                "Hostname '{host}' contains {} hyphens",
                parts - 1
            ),
        );
    }
}
