//! Read-only inputs of a form: storage accounts, function templates and the
//! site descriptor. Files may be JSON or YAML.

use std::path::{Path, PathBuf};

use fieldscout_types::{FunctionTemplate, StorageAccount};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::scenario::SiteDescriptor;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub fn load_accounts(path: &Path) -> Result<Vec<StorageAccount>, CatalogError> {
    load(path)
}

pub fn load_templates(path: &Path) -> Result<Vec<FunctionTemplate>, CatalogError> {
    load(path)
}

pub fn load_site(path: &Path) -> Result<SiteDescriptor, CatalogError> {
    load(path)
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // YAML is a superset of JSON, so one parser covers both formats.
    let value = serde_yaml::from_str(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded catalog");
    Ok(value)
}
