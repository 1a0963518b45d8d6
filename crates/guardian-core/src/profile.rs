use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data;

/// Named feature set of the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Every rule, full keyword dictionary.
    #[default]
    Full,
    /// Degraded feature set: URL and form rules only.
    Basic,
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ProfileKind::Full),
            "basic" => Ok(ProfileKind::Basic),
            other => Err(format!("unknown profile '{other}' (expected full or basic)")),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Full => write!(f, "full"),
            ProfileKind::Basic => write!(f, "basic"),
        }
    }
}

/// Per-rule weights. A weight of 0 disables the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub external_password_form: u32,
    pub password_input: u32,
    pub brand_visual: u32,
    pub suspicious_tld: u32,
    pub hyphenated_hostname: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            external_password_form: 40,
            password_input: 15,
            brand_visual: 10,
            suspicious_tld: 20,
            hyphenated_hostname: 10,
        }
    }
}

/// Partial weight overrides read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightOverrides {
    pub external_password_form: Option<u32>,
    pub password_input: Option<u32>,
    pub brand_visual: Option<u32>,
    pub suspicious_tld: Option<u32>,
    pub hyphenated_hostname: Option<u32>,
}

impl Weights {
    fn apply(&mut self, o: &WeightOverrides) {
        if let Some(w) = o.external_password_form {
            self.external_password_form = w;
        }
        if let Some(w) = o.password_input {
            self.password_input = w;
        }
        if let Some(w) = o.brand_visual {
            self.brand_visual = w;
        }
        if let Some(w) = o.suspicious_tld {
            self.suspicious_tld = w;
        }
        if let Some(w) = o.hyphenated_hostname {
            self.hyphenated_hostname = w;
        }
    }
}

/// A dictionary entry: phrase and the score it adds when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: u32,
}

/// The single weight table driving the local scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringProfile {
    pub kind: ProfileKind,
    pub weights: Weights,
    pub keywords: Vec<KeywordWeight>,
    pub trusted_domains: Vec<String>,
    pub suspicious_tlds: Vec<String>,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::full()
    }
}

impl ScoringProfile {
    pub fn full() -> Self {
        Self {
            kind: ProfileKind::Full,
            weights: Weights::default(),
            keywords: data::THAI_KEYWORDS
                .iter()
                .map(|(k, w)| KeywordWeight {
                    keyword: (*k).to_string(),
                    weight: *w,
                })
                .collect(),
            trusted_domains: data::TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            suspicious_tlds: data::SUSPICIOUS_TLDS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Same engine with the content rules switched off.
    pub fn basic() -> Self {
        let mut profile = Self::full();
        profile.kind = ProfileKind::Basic;
        profile.weights.brand_visual = 0;
        profile.keywords.clear();
        profile
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Full => Self::full(),
            ProfileKind::Basic => Self::basic(),
        }
    }

    /// Layer configuration on top of the built-in tables.
    pub fn with_overrides(
        mut self,
        weights: &WeightOverrides,
        additional_trusted_domains: &[String],
        additional_keywords: &[KeywordWeight],
    ) -> Self {
        self.weights.apply(weights);
        for domain in additional_trusted_domains {
            let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
            if !domain.is_empty() && !self.trusted_domains.contains(&domain) {
                self.trusted_domains.push(domain);
            }
        }
        // The basic profile never matches content, extra keywords included.
        if self.kind == ProfileKind::Full {
            for kw in additional_keywords {
                if kw.keyword.trim().is_empty() {
                    continue;
                }
                if !self
                    .keywords
                    .iter()
                    .any(|k| k.keyword.to_lowercase() == kw.keyword.to_lowercase())
                {
                    self.keywords.push(kw.clone());
                }
            }
        }
        self
    }

    pub fn is_trusted(&self, hostname: &str) -> bool {
        data::matches_domain_suffix(hostname, self.trusted_domains.iter().map(String::as_str))
    }

    /// The high-risk TLD the hostname ends with, if any.
    pub fn suspicious_tld(&self, hostname: &str) -> Option<&str> {
        let host = hostname.trim_end_matches('.').to_ascii_lowercase();
        self.suspicious_tlds
            .iter()
            .map(String::as_str)
            .find(|tld| host.ends_with(&tld.to_ascii_lowercase()))
    }

    pub fn keyword_weight(&self, keyword: &str) -> Option<u32> {
        self.keywords
            .iter()
            .find(|k| k.keyword == keyword)
            .map(|k| k.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_profile_disables_content_rules() {
        let basic = ScoringProfile::basic();
        assert!(basic.keywords.is_empty());
        assert_eq!(basic.weights.brand_visual, 0);
        assert_eq!(basic.weights.external_password_form, 40);
        assert_eq!(basic.trusted_domains, ScoringProfile::full().trusted_domains);
    }

    #[test]
    fn test_overrides_apply() {
        let profile = ScoringProfile::full().with_overrides(
            &WeightOverrides {
                suspicious_tld: Some(30),
                ..Default::default()
            },
            &[".Example-Bank.co.th".to_string()],
            &[KeywordWeight {
                keyword: "รีบด่วน".into(),
                weight: 5,
            }],
        );
        assert_eq!(profile.weights.suspicious_tld, 30);
        assert_eq!(profile.weights.password_input, 15);
        assert!(profile.is_trusted("www.example-bank.co.th"));
        assert_eq!(profile.keyword_weight("รีบด่วน"), Some(5));
    }

    #[test]
    fn test_duplicate_keyword_not_added() {
        let before = ScoringProfile::full().keywords.len();
        let profile = ScoringProfile::full().with_overrides(
            &WeightOverrides::default(),
            &[],
            &[KeywordWeight {
                keyword: "otp".into(),
                weight: 50,
            }],
        );
        assert_eq!(profile.keywords.len(), before);
        assert_eq!(profile.keyword_weight("OTP"), Some(15));
    }

    #[test]
    fn test_suspicious_tld_lookup() {
        let profile = ScoringProfile::full();
        assert_eq!(profile.suspicious_tld("kbank-verify.xyz"), Some(".xyz"));
        assert_eq!(profile.suspicious_tld("example.com"), None);
    }

    #[test]
    fn test_profile_kind_parse() {
        assert_eq!("Basic".parse::<ProfileKind>(), Ok(ProfileKind::Basic));
        assert!("paranoid".parse::<ProfileKind>().is_err());
    }
}
