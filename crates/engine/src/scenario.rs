//! Scenario flags: feature toggles resolved from static configuration plus
//! the descriptor of the site the form is opened for.

use serde::{Deserialize, Serialize};

/// Configured status of a scenario. `Default` defers to the site-based rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Enabled,
    Disabled,
    #[default]
    Default,
}

impl ScenarioStatus {
    fn resolve(self, fallback: bool) -> bool {
        match self {
            ScenarioStatus::Enabled => true,
            ScenarioStatus::Disabled => false,
            ScenarioStatus::Default => fallback,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub azure_blob_mount: ScenarioStatus,
    pub storage_mount_warning_banner: ScenarioStatus,
}

/// Read-only description of the site that owns the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub is_linux: bool,
    #[serde(default)]
    pub is_container: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFlags {
    /// Blob containers are offered as an alternative to file shares.
    pub alternate_storage_mode: bool,
    /// The read-only blob warning is shown when blob mode is selected.
    pub show_warning_banner: bool,
}

impl Default for ScenarioFlags {
    fn default() -> Self {
        Self {
            alternate_storage_mode: true,
            show_warning_banner: false,
        }
    }
}

impl ScenarioFlags {
    /// Resolve flags for a site.
    ///
    /// Without an explicit status, blob mounts are available to Linux and
    /// container sites, and the read-only warning accompanies them.
    pub fn resolve(config: &ScenarioConfig, site: &SiteDescriptor) -> Self {
        let alternate_storage_mode = config.azure_blob_mount.resolve(site.is_linux || site.is_container);
        let show_warning_banner = config.storage_mount_warning_banner.resolve(alternate_storage_mode);
        Self {
            alternate_storage_mode,
            show_warning_banner,
        }
    }
}
