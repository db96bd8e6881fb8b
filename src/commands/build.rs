use crate::{
    BuildArgs,
    build::Builder,
    config::{SiteConfig, base_path_from_config},
};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = SiteConfig::load_from_arg(args.config_file.as_deref()).await?;

    // Relative paths in the config resolve against its directory
    let base_path = base_path_from_config(&config_path);

    let builder = Builder::new(config, base_path)?;
    let result = builder.build().await?;

    tracing::info!(
        "Built {} file(s) to {}",
        result.files,
        result.output_dir.display()
    );

    Ok(())
}
