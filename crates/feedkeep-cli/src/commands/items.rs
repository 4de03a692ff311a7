use anyhow::Result;
use chrono::DateTime;

use feedkeep_core::{
    feed::Item,
    storage::{ItemRepository, Store},
};

fn print_items(items: &[Item]) {
    for item in items {
        let read = if item.is_read { " " } else { "*" };
        let star = if item.is_starred { "★" } else { " " };
        let added = DateTime::from_timestamp_millis(item.date_added)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        println!("{}{} [{}] {} ({}, {})", read, star, item.id, item.title, item.site, added);
        println!("      {}", item.url);
        if let Some(comments) = &item.comments {
            println!("      comments: {}", comments);
        }
    }
}

pub fn list(store: &Store, unread: bool, starred: bool) -> Result<()> {
    let repo = ItemRepository::new(store);
    let items = if unread {
        repo.list_unread()
    } else if starred {
        repo.list_starred()
    } else {
        repo.list_all()
    };

    if items.is_empty() {
        println!("No items.");
        return Ok(());
    }

    println!("Items ({}):\n", items.len());
    print_items(&items);

    Ok(())
}

pub fn search(store: &Store, query: &str) -> Result<()> {
    let items = ItemRepository::new(store).search(query);

    if items.is_empty() {
        println!("No items match '{}'.", query);
        return Ok(());
    }

    println!("{} items match '{}':\n", items.len(), query);
    print_items(&items);

    Ok(())
}

pub fn mark_read(store: &Store, id: u64, is_read: bool) -> Result<()> {
    let repo = ItemRepository::new(store);
    let found = if is_read {
        repo.mark_as_read(id)?
    } else {
        repo.mark_as_unread(id)?
    };

    if found {
        println!("Item {} marked as {}.", id, if is_read { "read" } else { "unread" });
    } else {
        println!("Item {} not found.", id);
    }

    Ok(())
}

pub fn read_site(store: &Store, site: &str) -> Result<()> {
    let changed = ItemRepository::new(store).mark_site_as_read(site)?;
    println!("Marked {} items from '{}' as read.", changed, site);
    Ok(())
}

pub fn star(store: &Store, id: u64) -> Result<()> {
    match ItemRepository::new(store).toggle_star(id)? {
        Some(true) => println!("Item {} starred.", id),
        Some(false) => println!("Item {} unstarred.", id),
        None => println!("Item {} not found.", id),
    }
    Ok(())
}

pub fn delete(store: &Store, id: u64) -> Result<()> {
    if ItemRepository::new(store).delete(id)? {
        println!("Item {} deleted.", id);
    } else {
        println!("Item {} not found.", id);
    }
    Ok(())
}

pub fn clear(store: &Store) -> Result<()> {
    let removed = ItemRepository::new(store).clear_all()?;
    println!("Deleted {} items.", removed);
    Ok(())
}
