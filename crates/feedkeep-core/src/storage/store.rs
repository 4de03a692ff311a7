use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use super::backend::{FileBackend, MemoryBackend, SnapshotBackend};
use super::snapshot::Snapshot;
use crate::config::AppConfig;
use crate::Result;

/// Name of the durable snapshot file inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "rss_reader_data.json";

/// Single source of truth for items, feeds and id counters.
///
/// Every mutation rewrites the whole snapshot through the backend before it
/// returns, so persist cost grows with the total stored size. That is fine for
/// a single user's reading list and is the known scalability limit of this
/// store. A failed persist rolls the in-memory snapshot back.
pub struct Store {
    backend: Box<dyn SnapshotBackend>,
    snapshot: Mutex<Snapshot>,
}

impl Store {
    /// Open the file-backed store under the configured data directory
    pub fn open(config: &AppConfig) -> Result<Self> {
        Self::with_backend(Box::new(FileBackend::new(config.snapshot_path())))
    }

    /// Create an isolated store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Open a store over any backend, loading what it holds
    pub fn with_backend(backend: Box<dyn SnapshotBackend>) -> Result<Self> {
        tracing::info!("Opening store: {}", backend.describe());

        let snapshot = match backend.load()? {
            Some(contents) => Snapshot::from_json(&contents)?,
            None => Snapshot::default(),
        };

        tracing::info!(
            items = snapshot.rss_items.len(),
            feeds = snapshot.feeds.len(),
            "Store loaded"
        );

        Ok(Self {
            backend,
            snapshot: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let contents = snapshot.to_json()?;
        self.backend.save(&contents)?;
        tracing::debug!(bytes = contents.len(), "Snapshot persisted");
        Ok(())
    }

    fn commit(&self, current: &mut Snapshot, backup: Snapshot) -> Result<()> {
        if let Err(e) = self.persist(current) {
            tracing::error!("Failed to persist snapshot, rolling back: {}", e);
            *current = backup;
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        f(&*self.lock())
    }

    /// Apply a mutation and persist it
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Snapshot) -> T) -> Result<T> {
        let mut guard = self.lock();
        let backup = guard.clone();
        let out = f(&mut *guard);
        self.commit(&mut *guard, backup)?;
        Ok(out)
    }

    /// Apply a mutation that may refuse; on `Err` nothing changes or persists
    pub(crate) fn try_write<T>(&self, f: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let backup = guard.clone();
        match f(&mut *guard) {
            Ok(out) => {
                self.commit(&mut *guard, backup)?;
                Ok(out)
            }
            Err(e) => {
                *guard = backup;
                Err(e)
            }
        }
    }

    /// Apply a mutation that may find nothing to change; persists only on `Some`
    pub(crate) fn write_if<T>(&self, f: impl FnOnce(&mut Snapshot) -> Option<T>) -> Result<Option<T>> {
        let mut guard = self.lock();
        let backup = guard.clone();
        match f(&mut *guard) {
            Some(out) => {
                self.commit(&mut *guard, backup)?;
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.read(Snapshot::clone)
    }

    /// Serialize the whole snapshot for a backup file
    pub fn export_data(&self) -> Result<String> {
        self.read(Snapshot::to_json_pretty)
    }

    /// Replace the whole snapshot with serialized `data`.
    ///
    /// Nothing changes unless `data` parses, validates and persists.
    pub fn import_data(&self, data: &str) -> Result<()> {
        let imported = Snapshot::from_json(data)?;

        let mut guard = self.lock();
        self.persist(&imported)?;

        tracing::info!(
            items = imported.rss_items.len(),
            feeds = imported.feeds.len(),
            "Snapshot imported"
        );
        *guard = imported;

        Ok(())
    }
}

/// File name for a backup taken on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("rss-reader-backup-{}.json", date.format("%Y-%m-%d"))
}
