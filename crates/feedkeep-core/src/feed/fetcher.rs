use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::models::Feed;
use super::parser::{parse_feed, ParsedFeed};
use crate::config::{AccessPathConfig, AppConfig};
use crate::{Error, Result};

/// Bytes escaped when embedding a URL as a query component, the same set
/// JavaScript's `encodeURIComponent` escapes
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const FEED_ACCEPT: &str =
    "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.8";

/// One way of reaching a feed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// Request the subscription URL as-is
    Direct,
    /// Request `prefix` followed by the percent-encoded subscription URL
    Proxy { name: String, prefix: String },
}

impl AccessPath {
    /// Build the request URL for `feed_url` on this path
    pub fn resolve(&self, feed_url: &str) -> String {
        match self {
            AccessPath::Direct => feed_url.to_string(),
            AccessPath::Proxy { prefix, .. } => {
                format!("{}{}", prefix, utf8_percent_encode(feed_url, URI_COMPONENT))
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AccessPath::Direct => "direct",
            AccessPath::Proxy { name, .. } => name,
        }
    }
}

impl From<&AccessPathConfig> for AccessPath {
    fn from(config: &AccessPathConfig) -> Self {
        match config {
            AccessPathConfig::Direct => AccessPath::Direct,
            AccessPathConfig::Proxy { name, prefix } => AccessPath::Proxy {
                name: name.clone(),
                prefix: prefix.clone(),
            },
        }
    }
}

/// Fetches feed documents, falling back through the configured access paths
pub struct FeedFetcher {
    client: Client,
    access_paths: Vec<AccessPath>,
}

impl FeedFetcher {
    /// Create a new feed fetcher with configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let access_paths: Vec<AccessPath> = config
            .transport
            .access_paths
            .iter()
            .map(AccessPath::from)
            .collect();

        if access_paths.is_empty() {
            return Err(Error::Config(
                "transport.access_paths must list at least one access path".to_string(),
            ));
        }

        let client = Self::build_client(config.sync.request_timeout_secs, &config.sync.user_agent)?;

        Ok(Self {
            client,
            access_paths,
        })
    }

    /// Build HTTP client; every attempt is bounded by `timeout_secs`
    fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(Error::Http)
    }

    pub fn access_paths(&self) -> &[AccessPath] {
        &self.access_paths
    }

    /// GET a document, treating any non-2xx status as a failure
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Fetch and parse a feed, trying each access path in order.
    ///
    /// A path fails on a network error, a non-2xx status, or a body that is
    /// not well-formed XML; the next path is tried after logging. The first
    /// path that yields a parseable document wins. When every path fails the
    /// error names the feed and carries the last failure's message.
    pub async fn fetch(&self, feed: &Feed) -> Result<ParsedFeed> {
        let mut last_error: Option<Error> = None;

        for path in &self.access_paths {
            let request_url = path.resolve(&feed.url);

            tracing::info!(
                "Fetching {} from {} using access path: {}",
                feed.title,
                feed.url,
                path.label()
            );

            let attempt = match self.fetch_document(&request_url).await {
                Ok(body) => parse_feed(&body, &feed.title),
                Err(e) => Err(e),
            };

            match attempt {
                Ok(parsed) => {
                    tracing::info!("Found {} items for {}", parsed.items.len(), feed.title);
                    return Ok(parsed);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to fetch {} with access path {}: {}",
                        feed.title,
                        path.label(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::FetchFailed {
            feed: feed.title.clone(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no access path attempted".to_string()),
        })
    }
}
