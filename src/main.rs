use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod build;
mod commands;
mod config;
mod logging;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: NotesmithCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the site in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file (default: notesmith.yaml)
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// The port to bind to (default: `dev.port` from the config, 3000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Open the site in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file (default: notesmith.yaml)
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Whether to watch for changes and rebuild automatically
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    watch: bool,
}

#[derive(Subcommand)]
enum NotesmithCommand {
    /// Write a starter notesmith.yaml
    Init(InitArgs),

    /// Build the site once
    Build(BuildArgs),

    /// Build, serve and rebuild the site on changes
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    match args.command {
        NotesmithCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        NotesmithCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        NotesmithCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
    }

    Ok(())
}
