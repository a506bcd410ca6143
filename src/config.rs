//! Configuration management for crackbox
//!
//! Module settings load from environment variables with defaults matching the
//! modules' documented configuration. CLI flags override individual values.
//!
//! # Environment Variables
//!
//! ## Extraction
//! - `CRACKBOX_PASSWORD_CANDIDATES`: passwords to try, one per line - default:
//!   "virus\ninfected". A value without any real newline is split on the
//!   two-character sequence `\n` instead, so single-line values cannot carry a
//!   password containing a backslash followed by `n`; use real newlines or
//!   `--passwords-file` for those.
//! - `CRACKBOX_MAX_EXTRACTED_FILES`: extraction ceiling - default: "5"
//! - `CRACKBOX_MAX_AUTOMATIC_ANALYSES`: follow-up analysis ceiling - default: "1"
//! - `CRACKBOX_WORKER_IMAGE`: extraction worker image - default: "fame/extract"
//! - `CRACKBOX_WORKER_TIMEOUT`: worker timeout in seconds - default: "300"
//! - `CRACKBOX_STAGING_DIR`: parent directory for staging dirs - default: system temp dir
//!
//! ## QR scanning
//! - `CRACKBOX_SKIP_SAFE_FILE_REVIEW`: skip review when nothing is decoded - default: "false"
//!
//! ## Logging
//! - `CRACKBOX_LOG_LEVEL` / `CRACKBOX_LOG_JSON`: see [`crate::util::logging`]

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PASSWORD_CANDIDATES: &str = "virus\ninfected";
pub const DEFAULT_MAX_EXTRACTED_FILES: u32 = 5;
pub const DEFAULT_MAX_AUTOMATIC_ANALYSES: u32 = 1;
pub const DEFAULT_WORKER_IMAGE: &str = "fame/extract";
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 300;

const MAX_WORKER_TIMEOUT_SECS: u64 = 3600;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Settings for the archive extraction module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Passwords handed to the worker, one per line, tried in order
    pub password_candidates: String,

    /// Above this many files in the archive, nothing is extracted
    pub maximum_extracted_files: u32,

    /// Above this many files, no follow-up analyses are requested
    pub maximum_automatic_analyses: u32,

    /// Container image running the extraction worker
    pub worker_image: String,

    pub worker_timeout_secs: u64,

    /// Where staging directories are allocated; system temp dir when unset
    pub staging_root: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            password_candidates: DEFAULT_PASSWORD_CANDIDATES.to_string(),
            maximum_extracted_files: DEFAULT_MAX_EXTRACTED_FILES,
            maximum_automatic_analyses: DEFAULT_MAX_AUTOMATIC_ANALYSES,
            worker_image: DEFAULT_WORKER_IMAGE.to_string(),
            worker_timeout_secs: DEFAULT_WORKER_TIMEOUT_SECS,
            staging_root: None,
        }
    }
}

// Real newlines win; the `\n` escape only applies to single-line values.
fn unescape_passwords(value: &str) -> String {
    if value.contains('\n') {
        value.to_string()
    } else {
        value.replace("\\n", "\n")
    }
}

impl ExtractConfig {
    /// Loads settings from `CRACKBOX_*` variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` when a numeric variable is set but malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let password_candidates = env::var("CRACKBOX_PASSWORD_CANDIDATES")
            .map(|v| unescape_passwords(&v))
            .unwrap_or(defaults.password_candidates);

        Ok(Self {
            password_candidates,
            maximum_extracted_files: parse_env(
                "CRACKBOX_MAX_EXTRACTED_FILES",
                defaults.maximum_extracted_files,
            )?,
            maximum_automatic_analyses: parse_env(
                "CRACKBOX_MAX_AUTOMATIC_ANALYSES",
                defaults.maximum_automatic_analyses,
            )?,
            worker_image: env::var("CRACKBOX_WORKER_IMAGE").unwrap_or(defaults.worker_image),
            worker_timeout_secs: parse_env("CRACKBOX_WORKER_TIMEOUT", defaults.worker_timeout_secs)?,
            staging_root: env::var("CRACKBOX_STAGING_DIR").ok().map(PathBuf::from),
        })
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maximum_extracted_files == 0 {
            return Err(ConfigError::ValidationFailed(
                "maximum_extracted_files must be at least 1".to_string(),
            ));
        }
        if self.worker_image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "worker image cannot be empty".to_string(),
            ));
        }
        if self.worker_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Worker timeout must be at least 1 second".to_string(),
            ));
        }
        if self.worker_timeout_secs > MAX_WORKER_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Worker timeout cannot exceed 1 hour".to_string(),
            ));
        }
        Ok(())
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// Non-empty password lines, in the order the worker tries them
    pub fn passwords(&self) -> Vec<&str> {
        self.password_candidates
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Settings as display strings; passwords are counted, not shown
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "password_candidates".to_string(),
            format!("{} entries", self.passwords().len()),
        );
        map.insert(
            "maximum_extracted_files".to_string(),
            self.maximum_extracted_files.to_string(),
        );
        map.insert(
            "maximum_automatic_analyses".to_string(),
            self.maximum_automatic_analyses.to_string(),
        );
        map.insert("worker_image".to_string(), self.worker_image.clone());
        map.insert(
            "worker_timeout".to_string(),
            format!("{}s", self.worker_timeout_secs),
        );
        map.insert(
            "staging_root".to_string(),
            self.staging_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| env::temp_dir().display().to_string()),
        );
        map
    }
}

/// Settings for the QR code module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QrConfig {
    /// Mark the target as not needing review when no code is found
    pub skip_safe_file_review: bool,
}

impl QrConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            skip_safe_file_review: parse_env("CRACKBOX_SKIP_SAFE_FILE_REVIEW", false)?,
        })
    }
}

fn parse_env<T>(field: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(field) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
            field: field.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "CRACKBOX_PASSWORD_CANDIDATES",
            "CRACKBOX_MAX_EXTRACTED_FILES",
            "CRACKBOX_MAX_AUTOMATIC_ANALYSES",
            "CRACKBOX_WORKER_IMAGE",
            "CRACKBOX_WORKER_TIMEOUT",
            "CRACKBOX_STAGING_DIR",
            "CRACKBOX_SKIP_SAFE_FILE_REVIEW",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ExtractConfig::default();
        assert_eq!(config.password_candidates, "virus\ninfected");
        assert_eq!(config.maximum_extracted_files, 5);
        assert_eq!(config.maximum_automatic_analyses, 1);
        assert_eq!(config.worker_image, "fame/extract");
        assert_eq!(config.worker_timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_passwords_skip_blank_lines() {
        let config = ExtractConfig {
            password_candidates: "virus\n\ninfected\r\n".to_string(),
            ..Default::default()
        };
        assert_eq!(config.passwords(), vec!["virus", "infected"]);
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let config = ExtractConfig {
            maximum_extracted_files: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let zero = ExtractConfig {
            worker_timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let huge = ExtractConfig {
            worker_timeout_secs: 7200,
            ..Default::default()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_image() {
        let config = ExtractConfig {
            worker_image: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_automatic_analyses_may_be_zero() {
        let config = ExtractConfig {
            maximum_automatic_analyses: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_display_map_hides_passwords() {
        let map = ExtractConfig::default().to_display_map();
        assert_eq!(map.get("password_candidates").unwrap(), "2 entries");
        assert!(!map.values().any(|v| v.contains("infected")));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("CRACKBOX_PASSWORD_CANDIDATES", "a\\nb\\nc");
        env::set_var("CRACKBOX_MAX_EXTRACTED_FILES", "12");
        env::set_var("CRACKBOX_WORKER_IMAGE", "local/extract:dev");
        env::set_var("CRACKBOX_STAGING_DIR", "/var/tmp/crackbox");

        let config = ExtractConfig::from_env().unwrap();
        assert_eq!(config.passwords(), vec!["a", "b", "c"]);
        assert_eq!(config.maximum_extracted_files, 12);
        assert_eq!(config.maximum_automatic_analyses, 1);
        assert_eq!(config.worker_image, "local/extract:dev");
        assert_eq!(config.staging_root, Some(PathBuf::from("/var/tmp/crackbox")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_multiline_passwords_keep_backslash_n() {
        clear_env();
        env::set_var("CRACKBOX_PASSWORD_CANDIDATES", "c:\\new\ninfected");

        let config = ExtractConfig::from_env().unwrap();
        assert_eq!(config.passwords(), vec!["c:\\new", "infected"]);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_parse_error() {
        clear_env();
        env::set_var("CRACKBOX_WORKER_TIMEOUT", "soon");

        let err = ExtractConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { ref field, .. } if field == "CRACKBOX_WORKER_TIMEOUT"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_qr_config_from_env() {
        clear_env();
        assert!(!QrConfig::from_env().unwrap().skip_safe_file_review);

        env::set_var("CRACKBOX_SKIP_SAFE_FILE_REVIEW", "true");
        assert!(QrConfig::from_env().unwrap().skip_safe_file_review);

        clear_env();
    }
}
