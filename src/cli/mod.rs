use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ConfigLoader;
use crate::remote::HttpPlatformClient;

pub mod commands;

use self::commands::{ClearMediaArgs, ItemArgs, ItemsArgs, SaveArgs, UploadArgs};

#[derive(Parser, Debug)]
#[command(
    name = "draftboard",
    version,
    about = "Compose social-post previews from work-management board items"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over DRAFTBOARD_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over DRAFTBOARD_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// API token (takes precedence over [api].token and DRAFTBOARD_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch an item and show its prompts, hooks, preview and media
    Item(ItemArgs),
    /// List the first page of items on a board
    Items(ItemsArgs),
    /// Compose the preview and write it to the item's preview column
    Save(SaveArgs),
    /// Upload media files to the item's media column
    Upload(UploadArgs),
    /// Empty the item's media column
    ClearMedia(ClearMediaArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("DRAFTBOARD_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("DRAFTBOARD_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let Some(token) = cli.token.clone().or_else(|| config.api.resolve_token()) else {
        bail!("no API token configured; set [api].token in the config file or DRAFTBOARD_TOKEN");
    };
    let client = HttpPlatformClient::new(config.api.endpoint.clone(), token);
    let config = Arc::new(config);

    let runtime = tokio::runtime::Runtime::new().context("building async runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Item(args) => commands::show_item(config.clone(), &client, args).await,
            Commands::Items(args) => commands::list_items(config.clone(), &client, args).await,
            Commands::Save(args) => commands::save_preview(config.clone(), &client, args).await,
            Commands::Upload(args) => commands::upload_media(config.clone(), &client, args).await,
            Commands::ClearMedia(args) => commands::clear_media(config, &client, args).await,
        }
    })
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
