//! INI settings layer for site-specific behavior.
//!
//! Cleanup behavior can be tuned per machine without touching the calling
//! code: extensions listed under `[cleanup] preserve_extensions` survive a
//! level-`Most` cleanup in addition to the built-in keep-list. Settings are
//! looked up with local-first precedence:
//!
//! 1. `./qmlink.cfg`
//! 2. `~/.config/qmlink/qmlink.cfg`
//! 3. Built-in defaults (nothing extra preserved)
//!
//! ```ini
//! [cleanup]
//! preserve_extensions = gbw,densities
//! ```

use crate::error::{QmError, Result};
use configparser::ini::Ini;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Settings file name searched for in each location.
pub const SETTINGS_FILE: &str = "qmlink.cfg";

/// Cleanup-related settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSettings {
    /// Extensions preserved by a level-`Most` cleanup on top of the
    /// built-in keep-list.
    pub preserve_extensions: Vec<String>,
}

/// All user-tunable settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Cleanup tuning.
    pub cleanup: CleanupSettings,
}

impl Settings {
    /// Loads settings from the first file found in the search path, falling
    /// back to defaults when none exists.
    pub fn load_or_default() -> Self {
        for path in search_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(settings) => {
                        debug!("loaded settings from {}", path.display());
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("ignoring unreadable settings {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Parses a settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| QmError::Configuration(format!("bad settings file: {}", e)))?;
        let preserve_extensions = ini
            .get("cleanup", "preserve_extensions")
            .map(|value| {
                value
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_string())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            cleanup: CleanupSettings {
                preserve_extensions,
            },
        })
    }
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SETTINGS_FILE)];
    if let Ok(home) = env::var("HOME") {
        paths.push(
            Path::new(&home)
                .join(".config")
                .join("qmlink")
                .join(SETTINGS_FILE),
        );
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_preserve_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "[cleanup]\npreserve_extensions = gbw, .densities,\n").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.cleanup.preserve_extensions, vec!["gbw", "densities"]);
    }

    #[test]
    fn test_missing_section_defaults_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "[other]\nkey = value\n").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert!(settings.cleanup.preserve_extensions.is_empty());
    }
}
