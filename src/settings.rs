use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::DB_FILE;
use crate::error::Result;
use crate::permissions::BusinessRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
    /// Profile role name; anything unrecognized resolves to the most
    /// restrictive role.
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    BusinessRole::MOST_RESTRICTIVE.name().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_name: String::new(),
            role: default_role(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("compliance-desk")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("compliance-desk")
}

pub fn load_settings() -> Settings {
    read_settings(&settings_path())
}

/// Defaults when `path` is absent. A present but unreadable or malformed
/// file also falls back to defaults, which demotes the profile role, so it
/// is reported.
fn read_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
    match parsed {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), "ignoring unusable settings file: {e}");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.user_name.is_empty());
        assert_eq!(s.role, "Dealer");
        assert!(s.data_dir.ends_with("compliance-desk"));
        assert!(s.db_path().ends_with("desk.db"));
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/desk"}"#).unwrap();
        assert_eq!(s.role, "Dealer");
        assert_eq!(s.db_path(), PathBuf::from("/tmp/desk/desk.db"));
    }

    #[test]
    fn test_roundtrip() {
        let settings = Settings {
            data_dir: "/tmp/desk".to_string(),
            user_name: "alice".to_string(),
            role: "Accountant".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.user_name, "alice");
        assert_eq!(loaded.role, "Accountant");
    }

    #[test]
    fn test_read_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(read_settings(&path).role, "Dealer");

        std::fs::write(&path, r#"{"data_dir": "/tmp/desk", "role": "Accountant"}"#).unwrap();
        assert_eq!(read_settings(&path).role, "Accountant");

        std::fs::write(&path, "{ not json").unwrap();
        let fallback = read_settings(&path);
        assert_eq!(fallback.role, "Dealer");
        assert!(fallback.user_name.is_empty());
    }

    #[test]
    fn test_shellexpand_tilde() {
        let expanded = shellexpand_path("~/desk");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("desk"));
    }
}
