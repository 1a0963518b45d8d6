//! Feature extraction: turn a captured page into a `PageSnapshot`.
//!
//! Every accessor degrades to an empty/default value on malformed markup.
//! Extraction never fails and never touches the network.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::data;
use crate::profile::ScoringProfile;

/// Visible text considered for keyword matching is capped at this many bytes.
pub const MAX_TEXT_BYTES: usize = 5000;

/// The live page as seen by the analyzer: its URL and serialized DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub url: String,
    pub html: String,
}

impl PageDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInfo {
    pub action: String,
    pub is_external_action: bool,
    pub has_password_field: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub total: usize,
    pub external: usize,
    pub external_ratio: f64,
}

impl LinkStats {
    pub fn new(total: usize, external: usize) -> Self {
        let external_ratio = if total > 0 {
            external as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total,
            external,
            external_ratio,
        }
    }
}

/// Features captured from one page in one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub hostname: String,
    pub title: String,
    #[serde(default)]
    pub forms: Vec<FormInfo>,
    #[serde(default)]
    pub links: LinkStats,
    #[serde(default)]
    pub sensitive_input_count: usize,
    #[serde(default)]
    pub thai_keywords_found: BTreeSet<String>,
    #[serde(default)]
    pub brand_visual_hits: BTreeSet<String>,
}

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static FORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)(?:</form\s*>|$)").unwrap());
static INPUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<input\b([^>]*)>").unwrap());
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>").unwrap());
static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b([^>]*)>").unwrap());
static BODY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)").unwrap());
static HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head\b.*?</head\s*>").unwrap());
static HIDDEN_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->")
        .unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static ACTION_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("action"));
static HREF_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("href"));
static TYPE_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("type"));
static ALT_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("alt"));

fn attr_regex(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?is)(?:^|\s){name}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#
    ))
    .unwrap()
}

fn attr_value(attrs: &str, re: &Regex) -> Option<String> {
    let caps = re.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| decode_entities(m.as_str().trim()))
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Lowercased host of a URL with any trailing dot removed; empty if the URL
/// has no host or does not parse.
pub fn hostname_of(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Resolve `target` against the page and report whether it leaves the page's host.
fn is_external(target: &str, base: Option<&Url>, page_host: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return false;
    }
    let resolved = match base {
        Some(base) => base.join(target).ok(),
        None => Url::parse(target).ok(),
    };
    let Some(resolved) = resolved else {
        return false;
    };
    if !matches!(resolved.scheme(), "http" | "https") {
        return false;
    }
    match resolved.host_str() {
        Some(host) => host.trim_end_matches('.').to_ascii_lowercase() != page_host,
        None => false,
    }
}

fn is_password_input(attrs: &str) -> bool {
    attr_value(attrs, &TYPE_ATTR)
        .map(|t| t.eq_ignore_ascii_case("password"))
        .unwrap_or(false)
}

/// Cut `s` to at most `max_bytes` without splitting a UTF-8 sequence.
fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    let mut end = max_bytes.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Visible body text with markup, scripts and styles removed, whitespace
/// collapsed, capped at `MAX_TEXT_BYTES`.
pub fn visible_text(html: &str) -> String {
    let body = match BODY_RE.captures(html).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => HEAD_RE.replace_all(html, " ").into_owned(),
    };
    let without_hidden = HIDDEN_BLOCK_RE.replace_all(&body, " ");
    let without_tags = TAG_RE.replace_all(&without_hidden, " ");
    let decoded = decode_entities(&without_tags);
    let collapsed = WS_RE.replace_all(decoded.trim(), " ");
    truncate_bytes(&collapsed, MAX_TEXT_BYTES)
}

/// Extract a fresh feature snapshot. The keyword dictionary comes from the
/// profile so that extraction and scoring agree on what counts.
pub fn extract(doc: &PageDocument, profile: &ScoringProfile) -> PageSnapshot {
    let html = doc.html.as_str();
    let base = Url::parse(doc.url.trim()).ok();
    let hostname = hostname_of(&doc.url);

    let title = TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| {
            let text = TAG_RE.replace_all(m.as_str(), " ");
            WS_RE
                .replace_all(decode_entities(&text).trim(), " ")
                .into_owned()
        })
        .unwrap_or_default();

    let forms: Vec<FormInfo> = FORM_RE
        .captures_iter(html)
        .map(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let inner = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let action = attr_value(attrs, &ACTION_ATTR).unwrap_or_default();
            FormInfo {
                is_external_action: is_external(&action, base.as_ref(), &hostname),
                has_password_field: INPUT_RE
                    .captures_iter(inner)
                    .any(|c| c.get(1).map(|m| is_password_input(m.as_str())).unwrap_or(false)),
                action,
            }
        })
        .collect();

    let sensitive_input_count = INPUT_RE
        .captures_iter(html)
        .filter(|c| c.get(1).map(|m| is_password_input(m.as_str())).unwrap_or(false))
        .count();

    let (mut total, mut external) = (0usize, 0usize);
    for caps in ANCHOR_RE.captures_iter(html) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if let Some(href) = attr_value(attrs, &HREF_ATTR) {
            total += 1;
            if is_external(&href, base.as_ref(), &hostname) {
                external += 1;
            }
        }
    }

    let text = visible_text(html).to_lowercase();
    let thai_keywords_found: BTreeSet<String> = profile
        .keywords
        .iter()
        .filter(|k| text.contains(&k.keyword.to_lowercase()))
        .map(|k| k.keyword.clone())
        .collect();

    let mut brand_visual_hits = BTreeSet::new();
    for caps in IMG_RE.captures_iter(html) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(alt) = attr_value(attrs, &ALT_ATTR) else {
            continue;
        };
        let alt = alt.to_lowercase();
        for (brand, aliases) in data::BRANDS {
            if aliases.iter().any(|a| alt.contains(a)) {
                brand_visual_hits.insert((*brand).to_string());
            }
        }
    }

    PageSnapshot {
        url: doc.url.clone(),
        hostname,
        title,
        forms,
        links: LinkStats::new(total, external),
        sensitive_input_count,
        thai_keywords_found,
        brand_visual_hits,
    }
}
