use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::feed::{Feed, Item};
use crate::{Error, Result};

/// Complete durable state: items, feeds and the two id counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Insertion order; ids are assigned in this order
    pub rss_items: Vec<Item>,
    pub feeds: Vec<Feed>,
    pub next_item_id: u64,
    pub next_feed_id: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            rss_items: Vec::new(),
            feeds: Vec::new(),
            next_item_id: 1,
            next_feed_id: 1,
        }
    }
}

impl Snapshot {
    /// Parse and validate serialized snapshot text.
    ///
    /// Syntax errors yield [`Error::InvalidJson`]; well-formed JSON of the
    /// wrong shape or violating snapshot invariants yields
    /// [`Error::InvalidSnapshot`].
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(Error::InvalidJson)?;
        let snapshot: Snapshot =
            serde_json::from_value(value).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validated()
    }

    /// Compact form used for the durable record
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented form used for exports
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ids and dedup keys, and advance counters past the highest id
    pub fn validated(mut self) -> Result<Self> {
        let mut item_ids = HashSet::new();
        let mut keys = HashSet::new();
        for item in &self.rss_items {
            if item.id == 0 {
                return Err(Error::InvalidSnapshot(format!(
                    "item '{}' has id 0",
                    item.title
                )));
            }
            if !item_ids.insert(item.id) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            if !keys.insert((item.title.as_str(), item.site.as_str())) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate item '{}' for site '{}'",
                    item.title, item.site
                )));
            }
        }

        let mut feed_ids = HashSet::new();
        for feed in &self.feeds {
            if feed.id == 0 {
                return Err(Error::InvalidSnapshot(format!(
                    "feed '{}' has id 0",
                    feed.title
                )));
            }
            if !feed_ids.insert(feed.id) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate feed id {}",
                    feed.id
                )));
            }
        }

        // The highest id must leave room for the counter to point past it
        let max_item_id = item_ids.into_iter().max().unwrap_or(0);
        let min_next_item_id = max_item_id
            .checked_add(1)
            .ok_or_else(|| Error::InvalidSnapshot("item id overflow".to_string()))?;
        if self.next_item_id < min_next_item_id {
            tracing::warn!(
                next_item_id = self.next_item_id,
                max_item_id,
                "Item counter behind highest id, advancing"
            );
            self.next_item_id = min_next_item_id;
        }

        let max_feed_id = feed_ids.into_iter().max().unwrap_or(0);
        let min_next_feed_id = max_feed_id
            .checked_add(1)
            .ok_or_else(|| Error::InvalidSnapshot("feed id overflow".to_string()))?;
        if self.next_feed_id < min_next_feed_id {
            tracing::warn!(
                next_feed_id = self.next_feed_id,
                max_feed_id,
                "Feed counter behind highest id, advancing"
            );
            self.next_feed_id = min_next_feed_id;
        }

        self.next_item_id = self.next_item_id.max(1);
        self.next_feed_id = self.next_feed_id.max(1);

        Ok(self)
    }
}
