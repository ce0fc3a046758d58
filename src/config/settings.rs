// Application settings
// Loaded from <config dir>/settings.json

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::edit::editable_value::ValueTiming;

const SETTINGS_FILE: &str = "settings.json";
const DB_FILE: &str = "inventory.sqlite";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "inventory-desk", "inventory-desk")
        .ok_or_else(|| anyhow!("unable to resolve application directories"))
}

/// Timing and confirmation behaviour of the edit engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSettings {
    /// Quiet period before a quick-edit field saves itself
    pub debounce_ms: u64,

    /// How long the "saved" indicator stays up
    pub saved_indicator_ms: u64,

    /// Auto-save interval while editing all rows
    pub backstop_interval_secs: u64,

    /// Ask before throwing away unsaved rows
    pub confirm_discard: bool,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            saved_indicator_ms: 2000,
            backstop_interval_secs: 60,
            confirm_discard: true,
        }
    }
}

impl EditSettings {
    pub fn value_timing(&self) -> ValueTiming {
        ValueTiming {
            debounce: Duration::from_millis(self.debounce_ms),
            saved_reset: Duration::from_millis(self.saved_indicator_ms),
        }
    }

    pub fn backstop_interval(&self) -> Duration {
        Duration::from_secs(self.backstop_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Database location; the platform data directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// `tracing` filter used when RUST_LOG is not set
    pub log_filter: String,

    pub edit: EditSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            log_filter: "info".to_string(),
            edit: EditSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(SETTINGS_FILE))
    }

    /// Loads from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write settings: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_local_dir().join(DB_FILE)),
        }
    }
}

fn ensure_webview_data_dir(base_data_dir: &Path) -> Result<PathBuf> {
    let dir = base_data_dir.join("webview");
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create webview dir: {}", dir.display()))?;
    Ok(dir)
}

/// Directory handed to the desktop webview for its own profile data.
pub fn webview_data_dir() -> Result<PathBuf> {
    ensure_webview_data_dir(project_dirs()?.data_local_dir())
}
