use std::io::{self, Write};

use anyhow::Result;
use tokio::sync::mpsc;

use feedkeep_core::{
    feed::FeedFetcher,
    storage::Store,
    sync::{refresh_all_feeds, SyncEvent},
    AppConfig,
};

pub async fn run(store: &Store, config: &AppConfig) -> Result<()> {
    println!("Refreshing all feeds...\n");

    let fetcher = FeedFetcher::new(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let summary = refresh_all_feeds(store, &fetcher, config, Some(&tx)).await;
    drop(tx);
    printer.await?;

    println!(
        "\nRefresh complete. {} new items from {} feeds ({} failed).",
        summary.new_items, summary.refreshed, summary.failed
    );

    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::Progress {
            current,
            total,
            feed_title,
        } => {
            print!("[{}/{}] {} ... ", current, total, feed_title);
            io::stdout().flush().ok();
        }
        SyncEvent::FeedRefreshed { new_items, .. } => println!("{} new", new_items),
        SyncEvent::FeedFailed { message, .. } => println!("failed: {}", message),
        SyncEvent::Completed { .. } => {}
    }
}
