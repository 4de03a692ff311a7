use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use feedkeep_core::{storage::Store, sync::SyncService, AppConfig};

/// Refresh on the configured interval until Ctrl+C
pub async fn run(store: Arc<Store>, config: Arc<AppConfig>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let service = SyncService::new(store, config.clone());

    // Start with a fresh batch instead of waiting a whole interval
    let summary = service.refresh_now().await?;
    println!(
        "Initial refresh: {} new items ({} feeds failed).",
        summary.new_items, summary.failed
    );

    println!("Watching feeds. Press Ctrl+C to stop.");
    println!("  Refresh interval: {} seconds", config.sync.refresh_interval_secs);

    service.run(shutdown_rx).await;
    println!("Stopped.");

    Ok(())
}
