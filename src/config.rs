//! Configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMEENTITY_CONFIG` (environment variable)
//! 2. `~/.config/mimeentity/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimeentity\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::charset::DEFAULT_CANDIDATES;
use crate::error::{EntityError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Charset and transfer-encoding behavior.
    pub decoding: DecodingConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Charset and transfer-encoding behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Charsets tried, in order, when bytes are not valid UTF-8.
    pub detect_candidates: Vec<String>,
    /// Guess a charset from the transfer encoding when none is declared
    /// (`8bit` → windows-1252, `7bit` → iso-8859-1).
    pub assume_charset_from_transfer_encoding: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            detect_candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            assume_charset_from_transfer_encoding: false,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| EntityError::io(path, e))?;
    toml::from_str::<Config>(&contents).map_err(|e| EntityError::Config(e.to_string()))
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMEENTITY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mimeentity").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(
            cfg.decoding.detect_candidates,
            vec!["windows-1252", "iso-8859-1", "gb2312", "gb18030"]
        );
        assert!(!cfg.decoding.assume_charset_from_transfer_encoding);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.decoding.detect_candidates, cfg.decoding.detect_candidates);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[decoding]
assume_charset_from_transfer_encoding = true
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(cfg.decoding.assume_charset_from_transfer_encoding);
        assert_eq!(cfg.decoding.detect_candidates.len(), 4);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_load_config_from_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[decoding\nbroken").unwrap();
        assert!(matches!(load_config_from(&path), Err(EntityError::Config(_))));
    }
}
