use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedkeep_core::{AppConfig, Store};

mod commands;

#[derive(Parser)]
#[command(name = "feedkeep")]
#[command(author, version, about = "A local-first RSS and Atom reader")]
struct Cli {
    /// Use this config file instead of ~/.config/feedkeep/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage feed subscriptions
    Feed {
        #[command(subcommand)]
        action: FeedAction,
    },
    /// Refresh all active feeds
    Refresh,
    /// List stored items
    Items {
        /// Only unread items
        #[arg(long, conflicts_with = "starred")]
        unread: bool,
        /// Only starred items
        #[arg(long)]
        starred: bool,
    },
    /// Search item titles (case-insensitive)
    Search { query: String },
    /// Mark an item as read
    Read { id: u64 },
    /// Mark an item as unread
    Unread { id: u64 },
    /// Mark every item from a site as read
    ReadSite {
        /// Site name, matched exactly
        site: String,
    },
    /// Toggle the starred flag of an item
    Star { id: u64 },
    /// Delete an item
    DeleteItem { id: u64 },
    /// Delete all items, keeping feeds
    ClearItems,
    /// Write a backup of all data
    Export {
        /// Output file (default: ./rss-reader-backup-<date>.json)
        path: Option<PathBuf>,
    },
    /// Replace all data with a backup
    Import { path: PathBuf },
    /// Refresh feeds in the background until Ctrl+C
    Watch,
}

#[derive(Subcommand)]
enum FeedAction {
    /// Subscribe to a feed and fetch its items
    Add {
        /// Feed URL
        url: String,
        /// Display name, also used as the site of its items
        #[arg(short = 'n', long)]
        title: String,
        /// Keep the feed out of batch refresh
        #[arg(long)]
        inactive: bool,
    },
    /// List all subscriptions
    List,
    /// Change a subscription
    Edit {
        id: u64,
        #[arg(short = 'n', long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Include the feed in batch refresh
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Exclude the feed from batch refresh
        #[arg(long)]
        disable: bool,
    },
    /// Remove a subscription (its items are kept)
    Remove { id: u64 },
    /// Refresh a single feed
    Refresh { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging, RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Arc::new(config);
    let store = Arc::new(Store::open(&config)?);

    match cli.command {
        Commands::Feed { action } => match action {
            FeedAction::Add {
                url,
                title,
                inactive,
            } => commands::feed::add(&store, &config, &url, &title, !inactive).await,
            FeedAction::List => commands::feed::list(&store),
            FeedAction::Edit {
                id,
                title,
                url,
                enable,
                disable,
            } => {
                let is_active = match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                commands::feed::edit(&store, id, title, url, is_active)
            }
            FeedAction::Remove { id } => commands::feed::remove(&store, id),
            FeedAction::Refresh { id } => commands::feed::refresh(&store, &config, id).await,
        },
        Commands::Refresh => commands::refresh::run(&store, &config).await,
        Commands::Items { unread, starred } => commands::items::list(&store, unread, starred),
        Commands::Search { query } => commands::items::search(&store, &query),
        Commands::Read { id } => commands::items::mark_read(&store, id, true),
        Commands::Unread { id } => commands::items::mark_read(&store, id, false),
        Commands::ReadSite { site } => commands::items::read_site(&store, &site),
        Commands::Star { id } => commands::items::star(&store, id),
        Commands::DeleteItem { id } => commands::items::delete(&store, id),
        Commands::ClearItems => commands::items::clear(&store),
        Commands::Export { path } => commands::backup::export(&store, path),
        Commands::Import { path } => commands::backup::import(&store, &path),
        Commands::Watch => commands::watch::run(store, config).await,
    }
}
