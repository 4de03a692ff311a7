use super::Store;
use crate::feed::{Item, NewItem};
use crate::{Error, Result};

/// Repository for item operations
pub struct ItemRepository<'a> {
    store: &'a Store,
}

impl<'a> ItemRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Append a new item under the next item id.
    ///
    /// The id counter advances even if the item is deleted later, so ids are
    /// never handed out twice.
    pub fn add(&self, new_item: NewItem) -> Result<Item> {
        self.store.try_write(|snapshot| {
            let id = snapshot.next_item_id;
            snapshot.next_item_id = id
                .checked_add(1)
                .ok_or_else(|| Error::InvalidSnapshot("item id counter exhausted".to_string()))?;
            let item = new_item.into_item(id);
            snapshot.rss_items.push(item.clone());
            Ok(item)
        })
    }

    /// Whether an item with this exact (title, site) pair is stored
    pub fn exists(&self, title: &str, site: &str) -> bool {
        self.store
            .read(|snapshot| snapshot.rss_items.iter().any(|item| item.matches_key(title, site)))
    }

    /// Find an item by ID
    pub fn find_by_id(&self, id: u64) -> Option<Item> {
        self.store
            .read(|snapshot| snapshot.rss_items.iter().find(|item| item.id == id).cloned())
    }

    /// All items in insertion order
    pub fn list_all(&self) -> Vec<Item> {
        self.store.read(|snapshot| snapshot.rss_items.clone())
    }

    pub fn list_unread(&self) -> Vec<Item> {
        self.filter(|item| !item.is_read)
    }

    pub fn list_starred(&self) -> Vec<Item> {
        self.filter(|item| item.is_starred)
    }

    /// Case-insensitive substring match against titles
    pub fn search(&self, query: &str) -> Vec<Item> {
        let query = query.to_lowercase();
        self.filter(|item| item.title.to_lowercase().contains(&query))
    }

    fn filter(&self, predicate: impl Fn(&Item) -> bool) -> Vec<Item> {
        self.store.read(|snapshot| {
            snapshot
                .rss_items
                .iter()
                .filter(|item| predicate(item))
                .cloned()
                .collect()
        })
    }

    /// Mark an item as read; returns false if no such item exists
    pub fn mark_as_read(&self, id: u64) -> Result<bool> {
        self.set_read(id, true)
    }

    /// Mark an item as unread; returns false if no such item exists
    pub fn mark_as_unread(&self, id: u64) -> Result<bool> {
        self.set_read(id, false)
    }

    fn set_read(&self, id: u64, is_read: bool) -> Result<bool> {
        let updated = self.store.write_if(|snapshot| {
            let item = snapshot.rss_items.iter_mut().find(|item| item.id == id)?;
            item.is_read = is_read;
            Some(())
        })?;
        Ok(updated.is_some())
    }

    /// Mark every item of `site` (exact match) as read, returning how many changed
    pub fn mark_site_as_read(&self, site: &str) -> Result<usize> {
        self.store.write(|snapshot| {
            let mut changed = 0;
            for item in snapshot.rss_items.iter_mut().filter(|item| item.site == site) {
                if !item.is_read {
                    item.is_read = true;
                    changed += 1;
                }
            }
            changed
        })
    }

    /// Flip the starred flag; returns the new state, or `None` if no such item exists
    pub fn toggle_star(&self, id: u64) -> Result<Option<bool>> {
        self.store.write_if(|snapshot| {
            let item = snapshot.rss_items.iter_mut().find(|item| item.id == id)?;
            item.is_starred = !item.is_starred;
            Some(item.is_starred)
        })
    }

    /// Delete an item; its id is not reused
    pub fn delete(&self, id: u64) -> Result<bool> {
        let removed = self.store.write_if(|snapshot| {
            let index = snapshot.rss_items.iter().position(|item| item.id == id)?;
            Some(snapshot.rss_items.remove(index))
        })?;
        Ok(removed.is_some())
    }

    /// Delete all items, keeping feeds and counters
    pub fn clear_all(&self) -> Result<usize> {
        self.store
            .write(|snapshot| std::mem::take(&mut snapshot.rss_items).len())
    }

    pub fn count(&self) -> usize {
        self.store.read(|snapshot| snapshot.rss_items.len())
    }
}
