//! Durable annotation log configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where broadcast annotations are appended on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the annotation log. `None` disables persistence.
    #[serde(default)]
    pub store_directory: Option<PathBuf>,
    /// File name of the log inside `store_directory`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            store_directory: None,
            file_name: default_file_name(),
        }
    }
}

fn default_file_name() -> String {
    "annotations.json".to_string()
}
