use std::path::{Path, PathBuf};

use crate::{
    InitArgs,
    config::{DEFAULT_CONFIG_FILE, SiteConfig},
};

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    let config_file = init_site(&path, args.create).await?;
    tracing::info!("Created config file {}", config_file.display());

    Ok(())
}

/// Write the starter `notesmith.yaml` into `path`.
///
/// Refuses to overwrite an existing config file.
async fn init_site(path: &Path, create: bool) -> Result<PathBuf, anyhow::Error> {
    if !path.exists() {
        if create {
            tokio::fs::create_dir_all(path).await?;
            tracing::info!("Created directory {}", path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() {
        return Err(anyhow::anyhow!(
            "Config file already exists: {}",
            config_file.display()
        ));
    }

    tracing::info!("Initializing site in {}", path.display());

    let config_text = serde_yaml::to_string(&SiteConfig::starter())?;
    tokio::fs::write(&config_file, config_text).await?;

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("blog");

        let config_file = init_site(&site, true).await.unwrap();
        let (config, _) = SiteConfig::load_from_arg(Some(config_file.as_path())).await.unwrap();

        assert_eq!(config.collections["lastPosts"].limit, Some(10));
        assert_eq!(config.default_layouts.len(), 2);
        assert_eq!(config.assets.len(), 3);
    }

    #[tokio::test]
    async fn test_init_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_site(&dir.path().join("missing"), false).await.is_err());
    }

    #[tokio::test]
    async fn test_init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "site: {}").unwrap();
        assert!(init_site(dir.path(), false).await.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap(),
            "site: {}"
        );
    }
}
