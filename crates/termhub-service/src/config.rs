//! Runtime configuration.

use std::path::PathBuf;

use termhub_loader::TableConfig;

/// Environment variable naming the dataset directory.
pub const DATA_PATH_VAR: &str = "TERMHUB_DATA_PATH";
/// Environment variable holding a pipe-delimited selection to score on startup.
pub const CODESET_IDS_VAR: &str = "TERMHUB_CODESET_IDS";

const DEFAULT_DATA_PATH: &str = "termhub-csets/datasets";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the source tables.
    pub data_path: PathBuf,
    /// Selection to score on startup, as given (`"1|2|3"`).
    pub codeset_ids: Option<String>,
    /// Parsing options.
    pub tables: TableConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            codeset_ids: None,
            tables: TableConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_path: lookup(DATA_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.data_path),
            codeset_ids: lookup(CODESET_IDS_VAR).filter(|ids| !ids.trim().is_empty()),
            tables: defaults.tables,
        }
    }
}
