use chrono::Utc;

use super::Store;
use crate::feed::{Feed, FeedUpdate, NewFeed};
use crate::{Error, Result};

/// Repository for feed CRUD operations
pub struct FeedRepository<'a> {
    store: &'a Store,
}

impl<'a> FeedRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create a new feed subscription
    pub fn create(&self, new_feed: &NewFeed) -> Result<Feed> {
        let now = Utc::now().timestamp_millis();

        self.store.try_write(|snapshot| {
            let id = snapshot.next_feed_id;
            snapshot.next_feed_id = id
                .checked_add(1)
                .ok_or_else(|| Error::InvalidSnapshot("feed id counter exhausted".to_string()))?;
            let feed = Feed {
                id,
                title: new_feed.title.clone(),
                url: new_feed.url.clone(),
                is_active: new_feed.is_active,
                created_at: now,
            };
            snapshot.feeds.push(feed.clone());
            Ok(feed)
        })
    }

    /// Find a feed by ID
    pub fn find_by_id(&self, id: u64) -> Option<Feed> {
        self.store
            .read(|snapshot| snapshot.feeds.iter().find(|feed| feed.id == id).cloned())
    }

    /// Find a feed by URL
    pub fn find_by_url(&self, url: &str) -> Option<Feed> {
        self.store
            .read(|snapshot| snapshot.feeds.iter().find(|feed| feed.url == url).cloned())
    }

    /// All feeds in stored order
    pub fn list_all(&self) -> Vec<Feed> {
        self.store.read(|snapshot| snapshot.feeds.clone())
    }

    /// Feeds included in batch refresh, in stored order
    pub fn list_active(&self) -> Vec<Feed> {
        self.store.read(|snapshot| {
            snapshot
                .feeds
                .iter()
                .filter(|feed| feed.is_active)
                .cloned()
                .collect()
        })
    }

    /// Merge the set fields of `update` into a feed; id and created_at never change
    pub fn update(&self, id: u64, update: &FeedUpdate) -> Result<Option<Feed>> {
        self.store.write_if(|snapshot| {
            let feed = snapshot.feeds.iter_mut().find(|feed| feed.id == id)?;
            if let Some(title) = &update.title {
                feed.title = title.clone();
            }
            if let Some(url) = &update.url {
                feed.url = url.clone();
            }
            if let Some(is_active) = update.is_active {
                feed.is_active = is_active;
            }
            Some(feed.clone())
        })
    }

    /// Delete a feed; its items stay in the store
    pub fn delete(&self, id: u64) -> Result<bool> {
        let removed = self.store.write_if(|snapshot| {
            let index = snapshot.feeds.iter().position(|feed| feed.id == id)?;
            Some(snapshot.feeds.remove(index))
        })?;
        Ok(removed.is_some())
    }

    /// Get total feed count
    pub fn count(&self) -> usize {
        self.store.read(|snapshot| snapshot.feeds.len())
    }
}
