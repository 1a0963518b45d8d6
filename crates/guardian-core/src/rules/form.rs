use crate::extract::PageSnapshot;
use crate::profile::ScoringProfile;
use crate::verdict::{RuleId, RuleTrace};

/// Credential-form rules: external password forms, then any password input.
pub fn check(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    check_external_password_forms(snapshot, profile, trace);
    check_password_input(snapshot, profile, trace);
}

fn check_external_password_forms(
    snapshot: &PageSnapshot,
    profile: &ScoringProfile,
    trace: &mut RuleTrace,
) {
    let weight = profile.weights.external_password_form;
    if weight == 0 {
        return;
    }
    for form in &snapshot.forms {
        if form.is_external_action && form.has_password_field {
            trace.push(
                RuleId::ExternalPasswordForm,
                weight,
                format!(
                    "Password form submits to an external site: {}",
                    form.action
                ),
            );
        }
    }
}

fn check_password_input(snapshot: &PageSnapshot, profile: &ScoringProfile, trace: &mut RuleTrace) {
    let weight = profile.weights.password_input;
    let has_password = snapshot.sensitive_input_count > 0
        || snapshot.forms.iter().any(|f| f.has_password_field);
    if weight > 0 && has_password {
        trace.push(
            RuleId::PasswordInput,
            weight,
            "Page asks for a password",
        );
    }
}
