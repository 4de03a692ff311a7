use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents a subscribed feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: u64,
    /// Display name, also stamped on every item as its `site`
    pub title: String,
    pub url: String,
    /// Inactive feeds are skipped by batch refresh
    pub is_active: bool,
    /// Epoch milliseconds
    pub created_at: i64,
}

/// Data required to create a new feed
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub title: String,
    pub url: String,
    pub is_active: bool,
}

/// Partial update of a feed; `None` fields are left as they are
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub is_active: Option<bool>,
}

/// Represents an item fetched from a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    pub title: String,
    pub url: String,
    #[serde(
        default,
        serialize_with = "serialize_comments",
        deserialize_with = "deserialize_comments"
    )]
    pub comments: Option<String>,
    pub site: String,
    pub is_read: bool,
    pub is_starred: bool,
    /// Epoch milliseconds
    pub date_added: i64,
}

/// Data required to create a new item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub url: String,
    pub comments: Option<String>,
    pub site: String,
    pub is_read: bool,
    pub is_starred: bool,
    pub date_added: i64,
}

impl NewItem {
    pub(crate) fn into_item(self, id: u64) -> Item {
        Item {
            id,
            title: self.title,
            url: self.url,
            comments: self.comments,
            site: self.site,
            is_read: self.is_read,
            is_starred: self.is_starred,
            date_added: self.date_added,
        }
    }
}

impl Item {
    /// Whether this item carries the given dedup key
    pub fn matches_key(&self, title: &str, site: &str) -> bool {
        self.title == title && self.site == site
    }
}

// An absent comments link is stored as "" for compatibility with existing backups.
fn serialize_comments<S>(comments: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(comments.as_deref().unwrap_or(""))
}

fn deserialize_comments<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|c| !c.is_empty()))
}
