use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::profile::{KeywordWeight, ProfileKind, ScoringProfile, WeightOverrides};

/// Default delay between page load and the local analysis pass.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Runtime configuration loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path this config was loaded from.
    #[serde(skip)]
    pub path: Option<String>,

    /// Scoring profile: "full" (default) or "basic".
    pub profile: ProfileKind,

    /// Per-rule weight overrides. Classification thresholds are not configurable.
    pub weights: WeightOverrides,

    /// Extra trusted domains (extends the built-in list).
    pub additional_trusted_domains: Vec<String>,

    /// Extra keyword dictionary entries (full profile only).
    pub additional_keywords: Vec<KeywordWeight>,

    /// Base URL of the remote analysis service. Unset means local-only.
    pub remote_url: Option<String>,

    /// Permit plain-HTTP remote URLs on non-loopback hosts.
    pub allow_insecure_http: bool,

    /// Delay before the page analyzer runs, letting dynamic content settle.
    pub settle_delay_ms: u64,

    /// Location of the verdict store file. Defaults to the data directory.
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            profile: ProfileKind::Full,
            weights: WeightOverrides::default(),
            additional_trusted_domains: Vec::new(),
            additional_keywords: Vec::new(),
            remote_url: None,
            allow_insecure_http: false,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            store_path: None,
        }
    }
}

/// Try both `.yaml` and `.yml` extensions in a directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let yaml = dir.join("config.yaml");
    if yaml.exists() {
        return Some(yaml);
    }
    let yml = dir.join("config.yml");
    if yml.exists() {
        return Some(yml);
    }
    None
}

impl Config {
    /// Load a config file strictly.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.path = Some(path.display().to_string());
        Ok(config)
    }

    /// Resolve the effective config: explicit path, then `GUARDIAN_CONFIG`,
    /// then the user config directory. A broken file is reported and
    /// replaced by defaults. Environment overrides are applied last.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::var("GUARDIAN_CONFIG")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| config_dir().and_then(|d| find_config_in_dir(&d)));

        let mut config = match path {
            Some(path) => match Self::load(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("{e}; using defaults");
                    Config::default()
                }
            },
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `GUARDIAN_REMOTE_URL` and `GUARDIAN_PROFILE` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("GUARDIAN_REMOTE_URL") {
            let url = url.trim().to_string();
            self.remote_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(profile) = lookup("GUARDIAN_PROFILE") {
            match profile.parse::<ProfileKind>() {
                Ok(kind) => self.profile = kind,
                Err(e) => tracing::warn!("ignoring GUARDIAN_PROFILE: {e}"),
            }
        }
    }

    /// Build the scoring profile this config selects.
    pub fn scoring_profile(&self) -> ScoringProfile {
        ScoringProfile::for_kind(self.profile).with_overrides(
            &self.weights,
            &self.additional_trusted_domains,
            &self.additional_keywords,
        )
    }

    /// Verdict store file: configured path or `<data dir>/verdicts.json`.
    pub fn store_file(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| data_dir().map(|d| d.join("verdicts.json")))
    }
}

/// Get guardian data directory.
pub fn data_dir() -> Option<PathBuf> {
    let base = etcetera::choose_base_strategy().ok()?;
    Some(base.data_dir().join("guardian"))
}

/// Get guardian config directory.
pub fn config_dir() -> Option<PathBuf> {
    let base = etcetera::choose_base_strategy().ok()?;
    Some(base.config_dir().join("guardian"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_local_only() {
        let c = Config::default();
        assert_eq!(c.profile, ProfileKind::Full);
        assert!(c.remote_url.is_none());
        assert_eq!(c.settle_delay_ms, DEFAULT_SETTLE_DELAY_MS);
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "profile: basic\nremote_url: https://api.example.th\nweights:\n  suspicious_tld: 35\nadditional_trusted_domains:\n  - mybank.co.th\n",
        )
        .unwrap();

        let c = Config::load(&path).unwrap();
        assert_eq!(c.profile, ProfileKind::Basic);
        assert_eq!(c.remote_url.as_deref(), Some("https://api.example.th"));
        assert_eq!(c.path.as_deref(), Some(path.display().to_string().as_str()));

        let profile = c.scoring_profile();
        assert_eq!(profile.kind, ProfileKind::Basic);
        assert_eq!(profile.weights.suspicious_tld, 35);
        assert!(profile.is_trusted("login.mybank.co.th"));
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "profile: [not, a, profile]\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/guardian/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_discover_explicit_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "profile: [unclosed\n").unwrap();
        let c = Config::discover(Some(&path));
        assert_eq!(c.profile, ProfileKind::Full);
        assert!(c.path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut c = Config::default();
        c.apply_env(|key| match key {
            "GUARDIAN_REMOTE_URL" => Some("http://localhost:5000".into()),
            "GUARDIAN_PROFILE" => Some("basic".into()),
            _ => None,
        });
        assert_eq!(c.remote_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(c.profile, ProfileKind::Basic);

        c.apply_env(|key| match key {
            "GUARDIAN_REMOTE_URL" => Some("  ".into()),
            "GUARDIAN_PROFILE" => Some("bogus".into()),
            _ => None,
        });
        assert!(c.remote_url.is_none());
        assert_eq!(c.profile, ProfileKind::Basic);
    }

    #[test]
    fn test_find_config_prefers_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yml"), "").unwrap();
        std::fs::write(dir.path().join("config.yaml"), "").unwrap();
        assert_eq!(
            find_config_in_dir(dir.path()),
            Some(dir.path().join("config.yaml"))
        );
    }
}
