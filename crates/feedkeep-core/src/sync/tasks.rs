use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::feed::{Feed, FeedFetcher};
use crate::storage::{FeedRepository, ItemRepository, Store};
use crate::Result;

/// Events emitted while feeds are refreshed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A feed is about to be fetched; `current` is 1-based
    Progress {
        current: usize,
        total: usize,
        feed_title: String,
    },
    /// A feed was fetched and its new items stored
    FeedRefreshed { feed_title: String, new_items: u32 },
    /// Every access path failed for a feed
    FeedFailed { feed_title: String, message: String },
    /// The batch finished, whether or not any feed succeeded
    Completed {
        refreshed: usize,
        failed: usize,
        new_items: u32,
    },
}

/// Outcome of a batch refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    pub new_items: u32,
}

/// Fetch one feed and store the items not seen before.
///
/// An entry is new when no stored item has the same (title, site) pair.
/// Stored items are never updated, so repeat entries are dropped entirely.
pub async fn refresh_feed(store: &Store, fetcher: &FeedFetcher, feed: &Feed) -> Result<u32> {
    let parsed = fetcher.fetch(feed).await?;
    let item_repo = ItemRepository::new(store);
    let mut added = 0;

    for candidate in parsed.items {
        // Checked per entry so duplicates inside one document collapse too
        if item_repo.exists(&candidate.title, &candidate.site) {
            continue;
        }
        item_repo.add(candidate)?;
        added += 1;
    }

    tracing::info!("Feed '{}': {} new items", feed.title, added);
    Ok(added)
}

fn send_event(events: Option<&mpsc::UnboundedSender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = events {
        if tx.send(event).is_err() {
            tracing::warn!("Failed to send sync event: receiver dropped");
        }
    }
}

/// Refresh every active feed in stored order.
///
/// Feeds run one after another with `sync.feed_delay_ms` between them. A
/// failing feed is logged and reported through `events`; it never stops the
/// batch.
pub async fn refresh_all_feeds(
    store: &Store,
    fetcher: &FeedFetcher,
    config: &AppConfig,
    events: Option<&mpsc::UnboundedSender<SyncEvent>>,
) -> RefreshSummary {
    let feeds = FeedRepository::new(store).list_active();
    let total = feeds.len();
    let delay = Duration::from_millis(config.sync.feed_delay_ms);
    let mut summary = RefreshSummary::default();

    tracing::info!("Refreshing {} active feeds", total);

    for (index, feed) in feeds.iter().enumerate() {
        send_event(
            events,
            SyncEvent::Progress {
                current: index + 1,
                total,
                feed_title: feed.title.clone(),
            },
        );

        match refresh_feed(store, fetcher, feed).await {
            Ok(new_items) => {
                summary.refreshed += 1;
                summary.new_items += new_items;
                send_event(
                    events,
                    SyncEvent::FeedRefreshed {
                        feed_title: feed.title.clone(),
                        new_items,
                    },
                );
            }
            Err(e) => {
                tracing::error!("Failed to refresh feed '{}': {}", feed.title, e);
                summary.failed += 1;
                send_event(
                    events,
                    SyncEvent::FeedFailed {
                        feed_title: feed.title.clone(),
                        message: e.to_string(),
                    },
                );
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        refreshed = summary.refreshed,
        failed = summary.failed,
        new_items = summary.new_items,
        "Refresh finished"
    );

    send_event(
        events,
        SyncEvent::Completed {
            refreshed: summary.refreshed,
            failed: summary.failed,
            new_items: summary.new_items,
        },
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_with_no_feeds_still_completes() {
        let store = Store::in_memory();
        let config = AppConfig::default();
        let fetcher = FeedFetcher::new(&config).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let summary = refresh_all_feeds(&store, &fetcher, &config, Some(&tx)).await;

        assert_eq!(summary, RefreshSummary::default());
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::Completed {
                refreshed: 0,
                failed: 0,
                new_items: 0
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_abort_batch() {
        let store = Store::in_memory();
        let config = AppConfig::default();
        let fetcher = FeedFetcher::new(&config).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let summary = refresh_all_feeds(&store, &fetcher, &config, Some(&tx)).await;
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_feed() {
        use crate::config::AccessPathConfig;
        use crate::feed::NewFeed;
        use std::sync::Arc;
        use tokio::time::Instant;

        let mut config = AppConfig::default();
        config.sync.feed_delay_ms = 500;
        config.transport.access_paths = vec![AccessPathConfig::Direct];

        let store = Arc::new(Store::in_memory());
        for title in ["A", "B"] {
            // Unparseable URLs fail inside the client without touching the network
            FeedRepository::new(&store)
                .create(&NewFeed {
                    title: title.to_string(),
                    url: format!("not a url {}", title),
                    is_active: true,
                })
                .unwrap();
        }

        let fetcher = Arc::new(FeedFetcher::new(&config).unwrap());
        let config = Arc::new(config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let batch = tokio::spawn({
            let store = Arc::clone(&store);
            async move { refresh_all_feeds(&store, &fetcher, &config, Some(&tx)).await }
        });

        let mut progress_at = Vec::new();
        let mut completed_at = None;
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::Progress { .. } => progress_at.push(start.elapsed()),
                SyncEvent::Completed { .. } => completed_at = Some(start.elapsed()),
                _ => {}
            }
        }

        let summary = batch.await.unwrap();
        assert_eq!(summary.failed, 2);
        let ms = Duration::from_millis;
        assert_eq!(progress_at.len(), 2);
        assert!(progress_at[0] < ms(100), "{:?}", progress_at);
        assert!(
            progress_at[1] >= ms(500) && progress_at[1] < ms(600),
            "{:?}",
            progress_at
        );
        let completed_at = completed_at.unwrap();
        assert!(
            completed_at >= ms(1000) && completed_at < ms(1100),
            "{:?}",
            completed_at
        );
    }
}
