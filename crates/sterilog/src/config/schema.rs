use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub removable_media: RemovableMediaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Builds a configuration with every path rooted under `root`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            version: CONFIG_VERSION.to_string(),
            database_path: root.join("data").join("sterilog.db"),
            storage: StorageConfig::rooted(root),
            removable_media: RemovableMediaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_root(data_root())
    }
}

/// Directories the importer and report generator write into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Stable copies of imported raw reports, keyed by original file name.
    #[serde(default = "default_reports_directory")]
    pub reports_directory: PathBuf,
    /// Generated compliance protocols.
    #[serde(default = "default_generated_directory")]
    pub generated_directory: PathBuf,
    /// Scratch space for reports delivered as bytes rather than files.
    #[serde(default = "default_staging_directory")]
    pub staging_directory: PathBuf,
}

impl StorageConfig {
    fn rooted(root: &Path) -> Self {
        Self {
            reports_directory: root.join("storage").join("autoclave_reports"),
            generated_directory: root.join("storage").join("protocols"),
            staging_directory: root.join("tmp_agent_import"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::rooted(&data_root())
    }
}

/// Removable-media scanning is opt-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemovableMediaConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Env-filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Returns `~/.sterilog`, or a relative `.sterilog` when no home directory is known.
pub fn data_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".sterilog"))
        .unwrap_or_else(|| PathBuf::from(".sterilog"))
}

fn default_database_path() -> PathBuf {
    data_root().join("data").join("sterilog.db")
}

fn default_reports_directory() -> PathBuf {
    StorageConfig::default().reports_directory
}

fn default_generated_directory() -> PathBuf {
    StorageConfig::default().generated_directory
}

fn default_staging_directory() -> PathBuf {
    StorageConfig::default().staging_directory
}

fn default_log_level() -> String {
    "info".to_string()
}
