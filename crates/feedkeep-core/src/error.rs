use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Failed to fetch {feed} after trying all access paths: {message}")]
    FetchFailed { feed: String, message: String },

    #[error("Invalid JSON data: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(u64),
}

impl Error {
    /// True for failures caused by the shape of imported or stored data
    pub fn is_data_format(&self) -> bool {
        matches!(self, Error::InvalidJson(_) | Error::InvalidSnapshot(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
