use crate::extract::PageSnapshot;
use crate::profile::ScoringProfile;
use crate::verdict::{RuleId, RuleTrace};

/// Page-content rules: keyword dictionary, then brand imagery.
pub fn check(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    check_thai_keywords(snapshot, profile, trace);
    check_brand_visuals(snapshot, profile, trace);
}

/// Every matched keyword contributes its own weight, in dictionary order.
fn check_thai_keywords(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    for entry in &profile.keywords {
        if entry.weight == 0 || !snapshot.thai_keywords_found.contains(&entry.keyword) {
            continue;
        }
        trace.push(
            RuleId::ThaiKeyword,
            entry.weight,
            format!("Phishing keyword found: '{}'", entry.keyword),
        );
    }
}

fn check_brand_visuals(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    let weight = profile.weights.brand_visual;
    if weight == 0 || snapshot.brand_visual_hits.is_empty() {
        return;
    }
    let brands: Vec<&str> = snapshot.brand_visual_hits.iter().map(String::as_str).collect();
    trace.push(
        RuleId::BrandImpersonation,
        weight,
        format!("Brand imagery on an unofficial site: {}", brands.join(", ")),
    );
}
