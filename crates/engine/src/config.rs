//! Fixture store configuration via `replay.toml`
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Environment variables override file settings:
//!
//! | variable | field |
//! |---|---|
//! | `REPLAY_DIR` | `directory` |
//! | `REPLAY_PREFIX` | `prefix` |
//! | `REPLAY_KEYSUFFIX` | `key_suffix` |
//! | `REPLAY_VALSUFFIX` | `value_suffix` |
//! | `REPLAY_WRITE_LIVE` | `write_live` |
//! | `REPLAY_EXTERNAL_VALUES` | `use_external_value_storage` |

use fixture_core::Error;
use fixture_durability::NamingScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name conventionally placed next to the test suite.
pub const CONFIG_FILE_NAME: &str = "replay.toml";

/// Widest ordinal pad accepted (u64::MAX has 20 digits).
pub const MAX_ORDINAL_PAD: usize = 20;

/// Fixture store configuration.
///
/// # Example
///
/// ```toml
/// directory = "replay"
/// prefix = "e2e"
/// key_suffix = "-key"
/// value_suffix = "-val"
/// extension = "json"
/// use_external_value_storage = true
/// write_live = true
/// key_ordinal_pad = 5
/// value_ordinal_pad = 6
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Root directory for fixture blobs
    pub directory: PathBuf,
    /// Filename prefix for generated blobs
    pub prefix: String,
    /// Suffix before the extension for key blobs
    pub key_suffix: String,
    /// Suffix before the extension for value blobs
    pub value_suffix: String,
    /// File extension, without the dot
    pub extension: String,
    /// Store recorded values in their own blobs instead of inline
    pub use_external_value_storage: bool,
    /// Persist on `record`; when false, recordings live in memory only
    pub write_live: bool,
    /// Zero-padding width for key ordinals
    pub key_ordinal_pad: usize,
    /// Zero-padding width for value ordinals
    pub value_ordinal_pad: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        let naming = NamingScheme::default();
        ReplayConfig {
            directory: PathBuf::from("replay"),
            prefix: naming.prefix,
            key_suffix: naming.key_suffix,
            value_suffix: naming.value_suffix,
            extension: naming.extension,
            use_external_value_storage: true,
            write_live: true,
            key_ordinal_pad: naming.key_pad,
            value_ordinal_pad: naming.value_pad,
        }
    }
}

impl ReplayConfig {
    /// Config for unit tests of the engine: nothing is persisted
    pub fn in_memory() -> Self {
        ReplayConfig {
            write_live: false,
            ..Default::default()
        }
    }

    /// Set the fixture directory
    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    /// Set the filename prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the key and value blob suffixes
    pub fn with_suffixes(
        mut self,
        key_suffix: impl Into<String>,
        value_suffix: impl Into<String>,
    ) -> Self {
        self.key_suffix = key_suffix.into();
        self.value_suffix = value_suffix.into();
        self
    }

    /// Store values inline in key blobs (false) or in their own blobs (true)
    pub fn with_external_value_storage(mut self, enabled: bool) -> Self {
        self.use_external_value_storage = enabled;
        self
    }

    /// Persist recordings (true) or keep them in memory (false)
    pub fn with_write_live(mut self, enabled: bool) -> Self {
        self.write_live = enabled;
        self
    }

    /// Set the ordinal padding widths
    pub fn with_ordinal_pads(mut self, key_pad: usize, value_pad: usize) -> Self {
        self.key_ordinal_pad = key_pad;
        self.value_ordinal_pad = value_pad;
        self
    }

    /// Naming scheme derived from this config
    pub fn naming(&self) -> NamingScheme {
        NamingScheme {
            prefix: self.prefix.clone(),
            key_suffix: self.key_suffix.clone(),
            value_suffix: self.value_suffix.clone(),
            extension: self.extension.clone(),
            key_pad: self.key_ordinal_pad,
            value_pad: self.value_ordinal_pad,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::Invalid("prefix must not be empty".to_string()));
        }
        if self.extension.is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".to_string()));
        }
        if self.key_suffix.is_empty() || self.value_suffix.is_empty() {
            return Err(ConfigError::Invalid("suffixes must not be empty".to_string()));
        }
        if self.key_suffix == self.value_suffix {
            return Err(ConfigError::Invalid(format!(
                "key and value suffix are both '{}'",
                self.key_suffix
            )));
        }
        for (field, pad) in [
            ("key_ordinal_pad", self.key_ordinal_pad),
            ("value_ordinal_pad", self.value_ordinal_pad),
        ] {
            if pad == 0 || pad > MAX_ORDINAL_PAD {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 1 and {}, got {}",
                    field, MAX_ORDINAL_PAD, pad
                )));
            }
        }
        Ok(())
    }

    /// Read and parse config from a TOML file.
    ///
    /// Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: ReplayConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_vars(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup("REPLAY_DIR") {
            self.directory = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("REPLAY_PREFIX") {
            self.prefix = prefix;
        }
        if let Some(suffix) = lookup("REPLAY_KEYSUFFIX") {
            self.key_suffix = suffix;
        }
        if let Some(suffix) = lookup("REPLAY_VALSUFFIX") {
            self.value_suffix = suffix;
        }
        if let Some(flag) = lookup("REPLAY_WRITE_LIVE") {
            self.write_live = parse_flag("REPLAY_WRITE_LIVE", &flag)?;
        }
        if let Some(flag) = lookup("REPLAY_EXTERNAL_VALUES") {
            self.use_external_value_storage = parse_flag("REPLAY_EXTERNAL_VALUES", &flag)?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" => Ok(true),
        "0" | "f" | "false" | "n" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config file '{}': {reason}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Config file cannot be written
    #[error("Cannot write config file '{}': {reason}", path.display())]
    Write {
        /// Config file path
        path: PathBuf,
        /// I/O error message
        reason: String,
    },

    /// Config file is not valid TOML for this config
    #[error("Cannot parse config file '{}': {reason}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Boolean environment variable with an unrecognized value
    #[error("Invalid value '{value}' for {var}, expected true/false")]
    InvalidFlag {
        /// Variable name
        var: String,
        /// Value found
        value: String,
    },

    /// Setting out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ReplayConfig::default();
        assert_eq!(config.directory, PathBuf::from("replay"));
        assert_eq!(config.prefix, "e2e");
        assert_eq!(config.key_suffix, "-key");
        assert_eq!(config.value_suffix, "-val");
        assert!(config.use_external_value_storage);
        assert!(config.write_live);
        assert_eq!(config.key_ordinal_pad, 5);
        assert_eq!(config.value_ordinal_pad, 6);
        config.validate().unwrap();
    }

    #[test]
    fn test_in_memory_disables_writes() {
        assert!(!ReplayConfig::in_memory().write_live);
    }

    #[test]
    fn test_naming_follows_config() {
        let config = ReplayConfig::default()
            .with_prefix("api")
            .with_ordinal_pads(3, 4);
        let naming = config.naming();
        assert_eq!(naming.base_name(1, 2), "api-001-0002");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(ReplayConfig::default().with_prefix("").validate().is_err());
        assert!(ReplayConfig::default()
            .with_suffixes("-x", "-x")
            .validate()
            .is_err());
        assert!(ReplayConfig::default()
            .with_ordinal_pads(0, 6)
            .validate()
            .is_err());
        assert!(ReplayConfig::default()
            .with_ordinal_pads(5, 21)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_file_with_missing_fields_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "prefix = \"api\"\nwrite_live = false\n").unwrap();

        let config = ReplayConfig::from_file(&path).unwrap();
        assert_eq!(config.prefix, "api");
        assert!(!config.write_live);
        assert_eq!(config.key_suffix, "-key");
        assert_eq!(config.directory, PathBuf::from("replay"));
    }

    #[test]
    fn test_from_file_missing_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ReplayConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_bad_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "write_live = \"maybe\"\n").unwrap();
        let err = ReplayConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ReplayConfig::default()
            .with_directory(dir.path().join("fixtures"))
            .with_external_value_storage(false);
        config.write_to_file(&path).unwrap();
        assert_eq!(ReplayConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_write_to_missing_parent_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join(CONFIG_FILE_NAME);
        let err = ReplayConfig::default().write_to_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert!(err.to_string().starts_with("Cannot write config file"));
    }

    #[test]
    fn test_env_overrides() {
        let config = ReplayConfig::default()
            .apply_vars(vars(&[
                ("REPLAY_DIR", "/tmp/fixtures"),
                ("REPLAY_PREFIX", "int"),
                ("REPLAY_KEYSUFFIX", "-k"),
                ("REPLAY_VALSUFFIX", "-v"),
                ("REPLAY_WRITE_LIVE", "No"),
                ("REPLAY_EXTERNAL_VALUES", "0"),
            ]))
            .unwrap();
        assert_eq!(config.directory, PathBuf::from("/tmp/fixtures"));
        assert_eq!(config.prefix, "int");
        assert_eq!(config.key_suffix, "-k");
        assert_eq!(config.value_suffix, "-v");
        assert!(!config.write_live);
        assert!(!config.use_external_value_storage);
    }

    #[test]
    fn test_env_flag_values() {
        for truthy in ["1", "t", "TRUE", "y", "Yes"] {
            assert!(parse_flag("X", truthy).unwrap());
        }
        for falsy in ["0", "f", "False", "n", "NO"] {
            assert!(!parse_flag("X", falsy).unwrap());
        }
        assert!(matches!(
            parse_flag("X", "maybe"),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }

    #[test]
    fn test_env_overrides_are_validated() {
        let result = ReplayConfig::default().apply_vars(vars(&[("REPLAY_PREFIX", "")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::Invalid("bad".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}
