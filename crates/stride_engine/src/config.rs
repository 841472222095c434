//! Engine configuration.
//!
//! Loads settings from /etc/stride/engine.toml or uses defaults.
//! Every field has a serde default so partial files are fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use stride_common::leveling::XP_PER_LESSON;

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/stride/engine.toml";

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// XP granted per newly completed lesson
    #[serde(default = "default_xp_per_lesson")]
    pub xp_per_lesson: u32,
}

fn default_db_path() -> String {
    crate::db::PROGRESS_DB_PATH.to_string()
}

fn default_xp_per_lesson() -> u32 {
    XP_PER_LESSON
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            xp_per_lesson: default_xp_per_lesson(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from the default path, falling back to defaults on any
    /// failure (missing file, bad TOML).
    pub fn load_or_default() -> Self {
        match Self::load_from(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to load {}: {} - using defaults", CONFIG_PATH, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.xp_per_lesson, XP_PER_LESSON);
        assert!(config.db_path.ends_with("progress.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "xp_per_lesson = 25").unwrap();

        let config = EngineConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.xp_per_lesson, 25);
        assert_eq!(config.db_path, default_db_path());
    }

    #[test]
    fn test_bad_toml_errors() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "xp_per_lesson = {{").unwrap();
        assert!(EngineConfig::load_from(tmp.path()).is_err());
    }
}
