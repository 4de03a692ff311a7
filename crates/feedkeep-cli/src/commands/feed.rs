use anyhow::Result;
use chrono::DateTime;

use feedkeep_core::{
    feed::{FeedFetcher, FeedUpdate, NewFeed},
    storage::{FeedRepository, ItemRepository, Store},
    sync::refresh_feed,
    AppConfig, Error,
};

pub async fn add(
    store: &Store,
    config: &AppConfig,
    url: &str,
    title: &str,
    is_active: bool,
) -> Result<()> {
    println!("Subscribing to feed: {}", url);

    let feed_repo = FeedRepository::new(store);
    if let Some(existing) = feed_repo.find_by_url(url) {
        println!("Already subscribed as '{}' ({}).", existing.title, existing.id);
        return Ok(());
    }

    let feed = feed_repo.create(&NewFeed {
        title: title.to_string(),
        url: url.to_string(),
        is_active,
    })?;
    println!("Created subscription: {} ({})", feed.title, feed.id);

    // Fetch initial items
    println!("Fetching items...");
    let fetcher = FeedFetcher::new(config)?;
    match refresh_feed(store, &fetcher, &feed).await {
        Ok(count) => println!("Stored {} items from '{}'", count, feed.title),
        Err(e) => {
            println!("Warning: Failed to fetch items: {}", e);
            println!("The subscription was created, but the initial fetch failed.");
            println!("Try running 'feedkeep feed refresh {}' later.", feed.id);
        }
    }

    Ok(())
}

pub fn list(store: &Store) -> Result<()> {
    let feeds = FeedRepository::new(store).list_all();

    if feeds.is_empty() {
        println!("No subscriptions yet.");
        println!("\nTo subscribe to a feed, run:");
        println!("  feedkeep feed add <url> -n <title>");
        return Ok(());
    }

    let items = ItemRepository::new(store).list_all();

    println!("Subscriptions ({}):\n", feeds.len());

    for feed in &feeds {
        let unread = items
            .iter()
            .filter(|item| item.site == feed.title && !item.is_read)
            .count();
        let unread = if unread > 0 {
            format!(" ({} unread)", unread)
        } else {
            String::new()
        };
        let paused = if feed.is_active { "" } else { " [paused]" };

        println!("  [{}] {}{}{}", feed.id, feed.title, unread, paused);
        println!("    URL: {}", feed.url);
        if let Some(created) = DateTime::from_timestamp_millis(feed.created_at) {
            println!("    Added: {}", created.format("%Y-%m-%d %H:%M"));
        }
        println!();
    }

    Ok(())
}

pub fn edit(
    store: &Store,
    id: u64,
    title: Option<String>,
    url: Option<String>,
    is_active: Option<bool>,
) -> Result<()> {
    let update = FeedUpdate {
        title,
        url,
        is_active,
    };

    match FeedRepository::new(store).update(id, &update)? {
        Some(feed) => {
            println!("Updated subscription [{}] {}", feed.id, feed.title);
            println!("    URL: {}", feed.url);
            println!("    Active: {}", feed.is_active);
        }
        None => println!("Feed {} not found.", id),
    }

    Ok(())
}

pub fn remove(store: &Store, id: u64) -> Result<()> {
    let feed_repo = FeedRepository::new(store);

    match feed_repo.find_by_id(id) {
        Some(feed) => {
            feed_repo.delete(id)?;
            println!("Unsubscribed from: {}", feed.title);
        }
        None => {
            println!("Feed {} not found.", id);
            println!("\nAvailable subscriptions:");
            for feed in feed_repo.list_all() {
                println!("  [{}] {}", feed.id, feed.title);
            }
        }
    }

    Ok(())
}

pub async fn refresh(store: &Store, config: &AppConfig, id: u64) -> Result<()> {
    let feed = FeedRepository::new(store)
        .find_by_id(id)
        .ok_or(Error::FeedNotFound(id))?;
    let fetcher = FeedFetcher::new(config)?;

    println!("Refreshing {}...", feed.title);
    let count = refresh_feed(store, &fetcher, &feed).await?;
    println!("{} new items.", count);

    Ok(())
}
