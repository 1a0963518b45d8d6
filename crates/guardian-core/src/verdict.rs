use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or above this value are at least `Suspicious`.
pub const SUSPICIOUS_THRESHOLD: u8 = 25;
/// Scores at or above this value are `Phishing`.
pub const PHISHING_THRESHOLD: u8 = 60;
/// Upper bound of the risk score.
pub const MAX_SCORE: u8 = 100;

/// Reason reported when the host matches the trusted-domain list.
pub const TRUSTED_DOMAIN_REASON: &str = "Known trusted domain";
/// Reason reported when no rule fired.
pub const CLEAN_REASON: &str = "Local checks passed";
/// Layer name of the local scorer.
pub const LOCAL_LAYER: &str = "Bouncer";

/// Unique identifier for each local scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    TrustedDomain,
    ExternalPasswordForm,
    PasswordInput,
    ThaiKeyword,
    BrandImpersonation,
    SuspiciousTld,
    HyphenatedHostname,
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{self:?}"));
        write!(f, "{s}")
    }
}

/// Risk classification of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    Safe,
    Suspicious,
    Phishing,
}

impl RiskStatus {
    /// Classify a clamped score. Boundary values belong to the upper band.
    pub fn from_score(score: u8) -> Self {
        if score >= PHISHING_THRESHOLD {
            RiskStatus::Phishing
        } else if score >= SUSPICIOUS_THRESHOLD {
            RiskStatus::Suspicious
        } else {
            RiskStatus::Safe
        }
    }

    pub fn badge(self) -> Badge {
        match self {
            RiskStatus::Safe => BadgeState::Ok.badge(),
            RiskStatus::Suspicious => BadgeState::Warning.badge(),
            RiskStatus::Phishing => BadgeState::Danger.badge(),
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskStatus::Safe => write!(f, "Safe"),
            RiskStatus::Suspicious => write!(f, "Suspicious"),
            RiskStatus::Phishing => write!(f, "Phishing"),
        }
    }
}

/// One fired rule and what it added to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub rule_id: RuleId,
    pub weight: u32,
    pub reason: String,
}

/// Ordered record of every rule that fired during one scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTrace {
    pub contributions: Vec<Contribution>,
    /// Set when the whitelist short-circuit ended the pass.
    pub trusted: bool,
}

impl RuleTrace {
    pub fn push(&mut self, rule_id: RuleId, weight: u32, reason: impl Into<String>) {
        self.contributions.push(Contribution {
            rule_id,
            weight,
            reason: reason.into(),
        });
    }

    /// Sum of all contributions, clamped to `[0, MAX_SCORE]`.
    pub fn score(&self) -> u8 {
        let total: u64 = self.contributions.iter().map(|c| u64::from(c.weight)).sum();
        total.min(u64::from(MAX_SCORE)) as u8
    }
}

/// Output of scoring a page snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub status: RiskStatus,
    pub score: u8,
    pub reasons: Vec<String>,
    #[serde(default = "default_layer")]
    pub layer: String,
}

fn default_layer() -> String {
    LOCAL_LAYER.to_string()
}

impl RiskAssessment {
    /// Derive the assessment from a rule trace. Nothing else feeds into it.
    pub fn from_trace(trace: &RuleTrace) -> Self {
        if trace.trusted {
            return Self::trusted();
        }
        let score = trace.score();
        let mut reasons: Vec<String> = trace
            .contributions
            .iter()
            .map(|c| c.reason.clone())
            .collect();
        if reasons.is_empty() {
            reasons.push(CLEAN_REASON.to_string());
        }
        Self {
            status: RiskStatus::from_score(score),
            score,
            reasons,
            layer: default_layer(),
        }
    }

    /// Whitelist short-circuit result.
    pub fn trusted() -> Self {
        Self {
            status: RiskStatus::Safe,
            score: 0,
            reasons: vec![TRUSTED_DOMAIN_REASON.to_string()],
            layer: default_layer(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.layer == LOCAL_LAYER
    }

    /// Restore the invariants on an assessment that arrived from outside the
    /// engine: score within `[0, MAX_SCORE]`, at least one reason, a layer
    /// name, and for local verdicts a status that matches the score.
    pub fn normalized(mut self) -> Self {
        self.score = self.score.min(MAX_SCORE);
        if self.layer.trim().is_empty() {
            self.layer = default_layer();
        }
        if self.is_local() {
            self.status = RiskStatus::from_score(self.score);
        }
        if self.reasons.is_empty() {
            self.reasons.push(CLEAN_REASON.to_string());
        }
        self
    }
}

/// Finite set of indicator states rendered on the extension icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeState {
    Ok,
    Warning,
    Danger,
}

pub const SUCCESS_COLOR: &str = "#22C55E";
pub const WARNING_COLOR: &str = "#F59E0B";
pub const DANGER_COLOR: &str = "#EF4444";

impl BadgeState {
    pub fn text(self) -> &'static str {
        match self {
            BadgeState::Ok => "OK",
            BadgeState::Warning => "?",
            BadgeState::Danger => "!",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            BadgeState::Ok => SUCCESS_COLOR,
            BadgeState::Warning => WARNING_COLOR,
            BadgeState::Danger => DANGER_COLOR,
        }
    }

    pub fn badge(self) -> Badge {
        Badge {
            text: self.text().to_string(),
            color: self.color().to_string(),
        }
    }
}

/// Concrete text and background color applied to the icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: String,
}
