use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;

    config.database_path = expand_home(&config.database_path);
    config.storage.reports_directory = expand_home(&config.storage.reports_directory);
    config.storage.generated_directory = expand_home(&config.storage.generated_directory);
    config.storage.staging_directory = expand_home(&config.storage.staging_directory);

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let paths = [
        ("database_path", &config.database_path),
        ("storage.reports_directory", &config.storage.reports_directory),
        ("storage.generated_directory", &config.storage.generated_directory),
        ("storage.staging_directory", &config.storage.staging_directory),
    ];
    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("'{}' must not be empty", name),
            });
        }
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.level) {
        return Err(ConfigError::Validation {
            message: format!("Invalid log level '{}': {}", config.logging.level, e),
        });
    }

    Ok(())
}

/// Expands a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();

        assert_eq!(config.version, "1.0");
        assert!(!config.removable_media.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(config.database_path.ends_with("sterilog.db"));
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "database_path": "/var/lib/sterilog/sterilog.db",
            "storage": {
                "reports_directory": "/srv/reports",
                "generated_directory": "/srv/protocols",
                "staging_directory": "/tmp/staging"
            },
            "removable_media": { "enabled": true },
            "logging": { "level": "sterilog=debug,warn", "json": true }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/sterilog/sterilog.db")
        );
        assert_eq!(config.storage.reports_directory, PathBuf::from("/srv/reports"));
        assert!(config.removable_media.enabled);
        assert!(config.logging.json);
    }

    #[test]
    fn test_unsupported_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_missing_version_is_parse_error() {
        let result = load_config_from_str(r#"{ "database_path": "/x.db" }"#);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = load_config_from_str(r#"{ "version": "1.0", "database_path": "" }"#);
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("database_path")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let result =
            load_config_from_str(r#"{ "version": "1.0", "logging": { "level": "sterilog=notalevel" } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_home_expansion() {
        let expanded = expand_home(Path::new("~/reports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("reports"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_read_missing_file() {
        let result = load_config("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
