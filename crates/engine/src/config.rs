use std::{env, io, path::Path, path::PathBuf};

use dirs_next::config_dir;
use fieldscout_util::expand_tilde;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classify::ClassifierConfig;
use crate::messages::MessageCatalog;
use crate::scenario::ScenarioConfig;

pub const CONFIG_PATH_ENV: &str = "FIELDSCOUT_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Behaviour of a discovery session when the selection changes mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Abort the superseded run's task instead of letting it finish and be discarded.
    pub abort_superseded: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { abort_superseded: true }
    }
}

/// Static configuration for the engine. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldscoutConfig {
    pub scenarios: ScenarioConfig,
    pub messages: MessageCatalog,
    pub classifier: ClassifierConfig,
    pub session: SessionConfig,
    /// Overrides `FIELDSCOUT_ARM_BASE` when set.
    pub arm_base: Option<String>,
    /// Overrides `FIELDSCOUT_SERVICE_HOST` when set.
    pub service_host: Option<String>,
}

impl FieldscoutConfig {
    /// Load the configuration from [`default_config_path`]. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        load_config_from_path(&default_config_path())
    }
}

/// Get the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldscout")
        .join("config.json")
}

pub fn load_config_from_path(path: &Path) -> Result<FieldscoutConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(FieldscoutConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MixedCausePrecedence;
    use crate::scenario::ScenarioStatus;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json")).expect("config");
        assert_eq!(config, FieldscoutConfig::default());
        assert!(config.session.abort_superseded);
    }

    #[test]
    fn partial_file_overrides_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "scenarios": {"azure_blob_mount": "enabled"},
                "classifier": {"mixed_cause_precedence": "catch_all"},
                "session": {"abort_superseded": false},
                "messages": {"noBlobs": "empty"}
            }"#,
        )
        .expect("write");
        let config = load_config_from_path(&path).expect("config");
        assert_eq!(config.scenarios.azure_blob_mount, ScenarioStatus::Enabled);
        assert_eq!(config.classifier.mixed_cause_precedence, MixedCausePrecedence::CatchAll);
        assert!(!config.session.abort_superseded);
        assert_eq!(config.messages.no_blobs, "empty");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").expect("write");
        assert!(matches!(load_config_from_path(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_override_selects_path() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/fieldscout-test.json"), || {
            assert_eq!(default_config_path(), PathBuf::from("/tmp/fieldscout-test.json"));
        });
    }
}
