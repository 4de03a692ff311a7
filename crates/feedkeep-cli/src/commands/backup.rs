use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use feedkeep_core::storage::{export_file_name, Store};

pub fn export(store: &Store, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));

    let data = store.export_data()?;
    fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;

    let snapshot = store.snapshot();
    println!(
        "Exported {} feeds and {} items to {}",
        snapshot.feeds.len(),
        snapshot.rss_items.len(),
        path.display()
    );

    Ok(())
}

pub fn import(store: &Store, path: &Path) -> Result<()> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    store.import_data(&data)?;

    let snapshot = store.snapshot();
    println!(
        "Imported {} feeds and {} items from {}",
        snapshot.feeds.len(),
        snapshot.rss_items.len(),
        path.display()
    );

    Ok(())
}
