//! Configuration loading from files.
//!
//! This module handles reading and parsing configuration files, then layering
//! `NOTESMITH__*` environment overrides on top.

use std::path::{Path, PathBuf};

use super::{ConfigError, DEFAULT_CONFIG_FILE, SiteConfig};

const ENV_PREFIX: &str = "NOTESMITH";

impl SiteConfig {
    /// Load the config from the command line argument, defaulting to `notesmith.yaml`.
    ///
    /// Returns the config together with the absolute path it was read from.
    pub async fn load_from_arg(config_file: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        let config = Self::load_from_file(&config_file).await?;
        Ok((config, config_file))
    }

    /// Load the config from a file path
    pub(crate) async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `NOTESMITH__DEV__PORT` and `NOTESMITH__DEV__LIVE_RELOAD`.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let env = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        if let Some(port) = optional(env.get::<u16>("dev.port"))? {
            self.dev.port = port;
        }
        if let Some(live_reload) = optional(env.get::<bool>("dev.live_reload"))? {
            self.dev.live_reload = live_reload;
        }

        Ok(())
    }
}

/// Treat a missing key as `None`; any other lookup failure is an error.
fn optional<T>(value: Result<T, config::ConfigError>) -> Result<Option<T>, ConfigError> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/site/notesmith.yaml")),
            PathBuf::from("/site")
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notesmith.yaml");
        std::fs::write(&path, "source: content\ndestination: public\n").unwrap();

        let config = SiteConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.source, PathBuf::from("content"));
        assert_eq!(config.destination, PathBuf::from("public"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SiteConfig::load_from_file(&dir.path().join("nope.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notesmith.yaml");
        std::fs::write(&path, "default_layouts: 12\n").unwrap();

        let err = SiteConfig::load_from_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
