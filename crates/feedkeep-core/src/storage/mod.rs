mod backend;
mod feed_repo;
mod item_repo;
mod snapshot;
mod store;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use feed_repo::FeedRepository;
pub use item_repo::ItemRepository;
pub use snapshot::Snapshot;
pub use store::{export_file_name, Store, SNAPSHOT_FILE_NAME};
