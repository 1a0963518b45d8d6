//! Built-in tables: trusted domains, high-risk TLDs, the weighted Thai
//! keyword dictionary and the brand aliases used for image alt-text hits.

/// Registrable domains that bypass scoring entirely.
pub const TRUSTED_DOMAINS: &[&str] = &[
    "kbank.com",
    "kasikornbank.com",
    "scb.co.th",
    "scbeasy.com",
    "krungthai.com",
    "bangkokbank.com",
    "krungsri.com",
    "ttbbank.com",
    "gsb.or.th",
    "baac.or.th",
    "truemoney.com",
    "line.me",
    "shopee.co.th",
    "lazada.co.th",
    "bot.or.th",
    "google.com",
    "facebook.com",
    "apple.com",
    "microsoft.com",
    "netflix.com",
];

/// TLDs disproportionately used by phishing kits. Leading dot included.
pub const SUSPICIOUS_TLDS: &[&str] = &[
    ".xyz", ".top", ".loan", ".click", ".icu", ".site", ".info", ".club", ".online", ".work",
    ".link", ".buzz", ".live", ".store", ".space", ".fun", ".pw", ".cc", ".tk", ".ml", ".ga",
    ".cf", ".gq", ".cam", ".rest", ".monster", ".sbs", ".cfd",
];

/// Weighted keyword dictionary matched case-insensitively against visible
/// body text. No entry may be a substring of another entry, otherwise one
/// phrase would be counted twice.
pub const THAI_KEYWORDS: &[(&str, u32)] = &[
    ("OTP", 15),
    ("ระงับบัญชี", 15),
    ("ยืนยันตัวตน", 10),
    ("กสิกร", 10),
    ("ไทยพาณิชย์", 10),
    ("กรุงไทย", 10),
    ("กรุงศรี", 10),
    ("ออมสิน", 10),
    ("ล็อกอิน", 5),
    ("ความปลอดภัย", 5),
];

/// Brand name and the lowercase aliases that identify it in `alt` text.
pub const BRANDS: &[(&str, &[&str])] = &[
    ("Kasikornbank", &["kbank", "kasikorn", "กสิกร"]),
    ("Siam Commercial Bank", &["scb", "ไทยพาณิชย์"]),
    ("Krungthai Bank", &["krungthai", "กรุงไทย"]),
    ("Bangkok Bank", &["bangkok bank", "bualuang", "ธนาคารกรุงเทพ"]),
    ("Krungsri", &["krungsri", "กรุงศรี"]),
    ("TTB", &["ttb", "tmbthanachart"]),
    ("Government Savings Bank", &["gsb", "ออมสิน"]),
    ("TrueMoney", &["truemoney", "true wallet"]),
    ("LINE", &["line pay", "linepay"]),
];

/// Check whether `host` belongs to one of `domains`, anchored on a label
/// boundary: `host == domain` or `host` ends with `"." + domain`.
pub fn matches_domain_suffix<'a, I>(host: &str, domains: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }
    domains.into_iter().any(|domain| {
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        host == domain
            || (host.len() > domain.len()
                && host.ends_with(domain.as_str())
                && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
    })
}
