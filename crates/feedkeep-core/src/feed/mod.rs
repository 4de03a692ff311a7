mod fetcher;
mod models;
mod parser;

pub use fetcher::{AccessPath, FeedFetcher};
pub use models::{Feed, FeedUpdate, Item, NewFeed, NewItem};
pub use parser::{parse_feed, Dialect, ParsedFeed};
