//! Runtime configuration
//!
//! Read from `netizmo.json` in the data directory when present; every field
//! has a default so the file is optional and may be partial.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Config file name looked up inside the data directory
pub const CONFIG_FILE_NAME: &str = "netizmo.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Database file name, relative to the data directory
    pub database_file: String,
    /// Maximum accepted profile image size in bytes
    pub max_image_bytes: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            database_file: "netizmo.redb".to_string(),
            max_image_bytes: 5 * 1024 * 1024, // 5MB
        }
    }
}

impl ProfileConfig {
    /// Load config from `data_dir`, falling back to defaults if no file exists.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = data_dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Full path of the database inside `data_dir`
    pub fn database_path(&self, data_dir: impl AsRef<Path>) -> PathBuf {
        data_dir.as_ref().join(&self.database_file)
    }
}
