//! Persisted client settings.
//!
//! A small JSON file stands in for the browser's local storage. The cached
//! base URL lives under the same `apiBaseUrl` key the core uses; other keys
//! set through `KeyValueStore` are kept verbatim.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use posts_core::{KeyValueStore, API_BASE_URL_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "apiBaseUrl", default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// List posts when started without a command and a URL is saved.
    #[serde(default)]
    pub auto_load: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// `Settings` bound to the file they were loaded from. Every `set` writes
/// through.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// `$POSTS_CONFIG_DIR/settings.json`, falling back to the platform config
    /// directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dir = match std::env::var_os("POSTS_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .context("could not determine config directory")?
                .join("posts-client"),
        };
        Ok(dir.join(FILE_NAME))
    }

    /// A missing file yields default settings.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Settings::default()
        };
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.path, json + "\n")
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

impl KeyValueStore for SettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        if key == API_BASE_URL_KEY {
            return self.settings.api_base_url.clone();
        }
        self.settings
            .other
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    // The trait is infallible; a failed write only costs the cached value.
    fn set(&mut self, key: &str, value: &str) {
        if key == API_BASE_URL_KEY {
            if self.settings.api_base_url.as_deref() == Some(value) {
                return;
            }
            self.settings.api_base_url = Some(value.to_string());
        } else {
            self.settings
                .other
                .insert(key.to_string(), Value::String(value.to_string()));
        }
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "could not persist settings");
        }
    }
}
