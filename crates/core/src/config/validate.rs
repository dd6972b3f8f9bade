use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Retention window and sweep interval are positive
/// - Working directories are outside the public downloads directory
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.retention.max_age_secs == 0 {
        return Err(ConfigError::ValidationError(
            "retention.max_age_secs must be greater than 0".to_string(),
        ));
    }

    if config.retention.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "retention.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }

    // Everything under downloads_dir is served as-is.
    if config.storage.work_dir.starts_with(&config.storage.downloads_dir) {
        return Err(ConfigError::ValidationError(
            "storage.work_dir must be outside storage.downloads_dir".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetentionConfig, ServerConfig, StorageConfig};
    use std::net::IpAddr;
    use std::path::PathBuf;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_retention_fails() {
        let config = Config {
            retention: RetentionConfig {
                max_age_secs: 0,
                sweep_interval_secs: 60,
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_shared_work_dir_fails() {
        let config = Config {
            storage: StorageConfig {
                downloads_dir: PathBuf::from("downloads"),
                work_dir: PathBuf::from("downloads"),
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_nested_work_dir_fails() {
        let config = Config {
            storage: StorageConfig {
                downloads_dir: PathBuf::from("/srv/downloads"),
                work_dir: PathBuf::from("/srv/downloads/.work"),
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("outside")));
    }
}
