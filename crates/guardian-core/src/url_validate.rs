/// Validation of the remote analysis endpoint before any request is sent.
use std::net::IpAddr;

use url::Url;

/// Check a remote analysis base URL.
///
/// Accepts `https`, or `http` on loopback hosts. Plain HTTP elsewhere needs
/// `allow_insecure_http`. Credentials in the URL, cloud metadata hosts and
/// link-local addresses are always rejected.
pub fn validate_endpoint(url: &str, allow_insecure_http: bool) -> Result<Url, String> {
    let parsed = Url::parse(url.trim()).map_err(|e| format!("invalid URL: {e}"))?;

    let host = parsed
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase())
        .ok_or_else(|| "endpoint URL has no host".to_string())?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&host) {
                if allow_insecure_http {
                    tracing::warn!("remote analysis over plain HTTP to {host}");
                } else {
                    return Err(format!(
                        "endpoint must use HTTPS (got http://{host}); set allow_insecure_http to override"
                    ));
                }
            }
        }
        other => return Err(format!("unsupported scheme '{other}'")),
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("endpoint URL must not embed credentials".to_string());
    }

    if host == "metadata.google.internal" || host == "metadata.google.com" || host.ends_with(".internal") {
        return Err(format!("refusing to connect to cloud metadata endpoint: {host}"));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_link_local(&ip) {
            return Err(format!("refusing to connect to link-local address: {host}"));
        }
    }

    Ok(parsed)
}

fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        // 169.254.0.0/16 includes the 169.254.169.254 metadata service
        IpAddr::V4(v4) => v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast(),
        IpAddr::V6(v6) => v6.is_unspecified() || (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}
