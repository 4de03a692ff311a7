use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::feed::FeedFetcher;
use crate::storage::Store;
use crate::Result;

use super::tasks::{refresh_all_feeds, RefreshSummary, SyncEvent};

/// Background service that refreshes all active feeds on an interval
pub struct SyncService {
    store: Arc<Store>,
    config: Arc<AppConfig>,
    event_tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncService {
    pub fn new(store: Arc<Store>, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            config,
            event_tx: None,
        }
    }

    /// Set the event sender for progress notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run one batch refresh immediately
    pub async fn refresh_now(&self) -> Result<RefreshSummary> {
        let fetcher = FeedFetcher::new(&self.config)?;
        Ok(self.refresh_with(&fetcher).await)
    }

    async fn refresh_with(&self, fetcher: &FeedFetcher) -> RefreshSummary {
        refresh_all_feeds(&self.store, fetcher, &self.config, self.event_tx.as_ref()).await
    }

    /// Refresh on every interval tick until the shutdown signal flips to true.
    ///
    /// A batch in progress runs to completion; shutdown is observed between
    /// batches.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let refresh_secs = self.config.sync.refresh_interval_secs;

        if refresh_secs == 0 {
            info!("Background refresh disabled (refresh_interval_secs = 0)");
            let _ = shutdown.changed().await;
            return;
        }

        let fetcher = match FeedFetcher::new(&self.config) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!("Cannot start background refresh: {}", e);
                return;
            }
        };

        info!("Sync service started: refresh every {}s", refresh_secs);

        let mut refresh_interval = tokio::time::interval(Duration::from_secs(refresh_secs));
        // The first tick fires immediately
        refresh_interval.tick().await;

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Sync service received shutdown signal");
                        break;
                    }
                }

                _ = refresh_interval.tick() => {
                    debug!("Running scheduled feed refresh");
                    let summary = self.refresh_with(&fetcher).await;
                    if summary.new_items > 0 {
                        info!("Scheduled refresh: {} new items", summary.new_items);
                    }
                }
            }
        }

        info!("Sync service stopped");
    }
}
