//! Shared key-value store and the persisted verdict records kept in it.
//!
//! The store serializes individual operations; nothing spans two operations.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::PageSnapshot;
use crate::protocol::TabId;
use crate::verdict::{RiskAssessment, RiskStatus};

/// Global slot, last write wins across all tabs.
pub const LAST_RESULT_KEY: &str = "lastResult";

pub fn tab_key(tab: TabId) -> String {
    format!("tab:{}", tab.0)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("corrupt store data: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value store shared between contexts.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object on disk. Every operation takes an
/// advisory lock on the file, so separate processes can share it.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn open(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        let mut opts = OpenOptions::new();
        opts.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        opts.open(&self.path).map_err(|e| self.io_err(e))
    }

    fn read_map(&self, file: &mut File) -> Result<BTreeMap<String, String>, StoreError> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| self.io_err(e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_map(&self, file: &mut File, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io_err(e))?;
        file.set_len(0).map_err(|e| self.io_err(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.io_err(e))?;
        file.sync_all().map_err(|e| self.io_err(e))
    }

    /// Read-modify-write under an exclusive lock.
    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut file = self.open()?;
        file.lock_exclusive().map_err(|e| self.io_err(e))?;
        let result = self.read_map(&mut file).and_then(|mut map| {
            f(&mut map);
            self.write_map(&mut file, &map)
        });
        let _ = FileExt::unlock(&file);
        result
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut file = self.open()?;
        file.lock_shared().map_err(|e| self.io_err(e))?;
        let result = self.read_map(&mut file);
        let _ = FileExt::unlock(&file);
        Ok(result?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|map| {
            map.remove(key);
        })
    }
}

/// Where a persisted verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Local,
    Remote,
}

/// The record written by the coordinator and read by the popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedVerdict {
    pub status: RiskStatus,
    pub score: u8,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PageSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    pub source: VerdictSource,
    pub recorded_at: String,
}

impl PersistedVerdict {
    pub fn new(
        assessment: &RiskAssessment,
        data: Option<PageSnapshot>,
        tab_id: Option<TabId>,
        source: VerdictSource,
    ) -> Self {
        Self {
            status: assessment.status,
            score: assessment.score,
            reasons: assessment.reasons.clone(),
            layer: assessment.layer.clone(),
            data,
            tab_id,
            source,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment {
            status: self.status,
            score: self.score,
            reasons: self.reasons.clone(),
            layer: self.layer.clone(),
        }
    }
}

/// Typed view of the verdict slots in a `KvStore`.
#[derive(Clone)]
pub struct VerdictStore {
    kv: Arc<dyn KvStore>,
}

impl VerdictStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Write the tab's slot (when the verdict has a tab) and `lastResult`.
    pub fn write(&self, verdict: &PersistedVerdict) -> Result<(), StoreError> {
        let json = serde_json::to_string(verdict)?;
        if let Some(tab) = verdict.tab_id {
            self.kv.set(&tab_key(tab), &json)?;
        }
        self.kv.set(LAST_RESULT_KEY, &json)
    }

    pub fn last_result(&self) -> Result<Option<PersistedVerdict>, StoreError> {
        self.read(LAST_RESULT_KEY)
    }

    pub fn for_tab(&self, tab: TabId) -> Result<Option<PersistedVerdict>, StoreError> {
        self.read(&tab_key(tab))
    }

    /// Drop a closed tab's slot. `lastResult` is left alone.
    pub fn evict_tab(&self, tab: TabId) -> Result<(), StoreError> {
        self.kv.remove(&tab_key(tab))
    }

    fn read(&self, key: &str) -> Result<Option<PersistedVerdict>, StoreError> {
        match self.kv.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
