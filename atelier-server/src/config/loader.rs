//! Configuration loader

use std::path::Path;

use atelier_utils::{config_file, AtelierError, Result};

use super::{AppConfig, SCRIPT_PLACEHOLDER};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| AtelierError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| AtelierError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.bridge.outbound_queue == 0 {
            return Err(AtelierError::config("bridge.outbound_queue must be at least 1"));
        }

        // Port 0 asks the OS for an ephemeral port, so two zeros never collide
        if config.bridge.port != 0
            && config.bridge.port == config.assets.port
            && config.bridge.host == config.assets.host
        {
            return Err(AtelierError::config(format!(
                "bridge and asset server cannot share port {}",
                config.bridge.port
            )));
        }

        let host = &config.tools.script_host;
        if host.program.trim().is_empty() {
            return Err(AtelierError::config("tools.script_host.program is empty"));
        }
        if !host.template.contains(SCRIPT_PLACEHOLDER) {
            return Err(AtelierError::config(format!(
                "tools.script_host.template must contain {}",
                SCRIPT_PLACEHOLDER
            )));
        }

        if let Some(url) = &config.assets.public_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AtelierError::config(
                    "assets.public_base_url must be an http(s) URL",
                ));
            }
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<AppConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file() {
        let config = ConfigLoader::load();
        assert!(config.is_ok());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
            [bridge]
            port = 9080

            [assets]
            root = "/srv/generated"

            [tools]
            generation_delay_ms = 10
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.bridge.port, 9080);
        assert_eq!(config.bridge.host, "127.0.0.1");
        assert_eq!(config.assets.port, 8081);
        assert_eq!(
            config.assets.root.as_deref(),
            Some(Path::new("/srv/generated"))
        );
        assert_eq!(config.tools.generation_delay_ms, 10);
    }

    #[test]
    fn test_load_from_missing_path_is_read_error() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_from_path(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(AtelierError::FileRead { .. })));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("test.toml"));
        assert!(matches!(result, Err(AtelierError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_validate_defaults() {
        ConfigLoader::validate(&AppConfig::default()).unwrap();
    }

    #[test]
    fn test_validate_zero_queue() {
        let mut config = AppConfig::default();
        config.bridge.outbound_queue = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_port_clash() {
        let mut config = AppConfig::default();
        config.assets.port = config.bridge.port;
        assert!(ConfigLoader::validate(&config).is_err());

        config.bridge.port = 0;
        config.assets.port = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_template_placeholder() {
        let mut config = AppConfig::default();
        config.tools.script_host.template = "echo hi".into();
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_public_base_url() {
        let mut config = AppConfig::default();
        config.assets.public_base_url = Some("localhost:8081".into());
        assert!(ConfigLoader::validate(&config).is_err());
    }
}
