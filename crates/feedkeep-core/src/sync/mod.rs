mod service;
mod tasks;

pub use service::SyncService;
pub use tasks::{refresh_all_feeds, refresh_feed, RefreshSummary, SyncEvent};
