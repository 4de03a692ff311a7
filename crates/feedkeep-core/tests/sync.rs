use feedkeep_core::feed::{FeedFetcher, NewFeed};
use feedkeep_core::storage::{FeedRepository, ItemRepository};
use feedkeep_core::sync::{refresh_all_feeds, refresh_feed, SyncEvent};
use feedkeep_core::{AccessPathConfig, AppConfig, Store};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|title| {
            format!(
                "<item><title>{title}</title><link>https://example.com/{}</link></item>",
                title.replace(' ', "-")
            )
        })
        .collect();
    format!("<rss version=\"2.0\"><channel><title>t</title>{items}</channel></rss>")
}

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.request_timeout_secs = 5;
    config.sync.feed_delay_ms = 0;
    config.transport.access_paths = vec![
        AccessPathConfig::Direct,
        AccessPathConfig::Proxy {
            name: "proxy".to_string(),
            prefix: format!("{}/proxy?url=", server.uri()),
        },
    ];
    config
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn subscribe(store: &Store, server: &MockServer, title: &str, route: &str, is_active: bool) {
    FeedRepository::new(store)
        .create(&NewFeed {
            title: title.to_string(),
            url: format!("{}{}", server.uri(), route),
            is_active,
        })
        .unwrap();
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", rss(&["one", "two", "one"])).await;

    let store = Store::in_memory();
    subscribe(&store, &server, "Alpha", "/a.xml", true);
    let feed = FeedRepository::new(&store).find_by_id(1).unwrap();
    let fetcher = FeedFetcher::new(&config_for(&server)).unwrap();

    // The repeated "one" inside the document collapses to a single item
    assert_eq!(refresh_feed(&store, &fetcher, &feed).await.unwrap(), 2);
    assert_eq!(refresh_feed(&store, &fetcher, &feed).await.unwrap(), 0);

    let items = ItemRepository::new(&store);
    assert_eq!(items.count(), 2);
    assert!(items.exists("one", "Alpha"));
    assert!(items.exists("two", "Alpha"));
}

#[tokio::test]
async fn test_refresh_keeps_user_state() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", rss(&["one"])).await;

    let store = Store::in_memory();
    subscribe(&store, &server, "Alpha", "/a.xml", true);
    let feed = FeedRepository::new(&store).find_by_id(1).unwrap();
    let fetcher = FeedFetcher::new(&config_for(&server)).unwrap();

    refresh_feed(&store, &fetcher, &feed).await.unwrap();
    let items = ItemRepository::new(&store);
    let stored = items.list_all().remove(0);
    items.mark_as_read(stored.id).unwrap();
    items.toggle_star(stored.id).unwrap();

    refresh_feed(&store, &fetcher, &feed).await.unwrap();

    let after = items.find_by_id(stored.id).unwrap();
    assert!(after.is_read);
    assert!(after.is_starred);
    assert_eq!(after.date_added, stored.date_added);
}

#[tokio::test]
async fn test_batch_continues_past_failing_feed() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", rss(&["a1", "a2"])).await;
    serve(&server, "/c.xml", rss(&["c1"])).await;
    Mock::given(method("GET"))
        .and(path("/b.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Store::in_memory();
    subscribe(&store, &server, "A", "/a.xml", true);
    subscribe(&store, &server, "B", "/b.xml", true);
    subscribe(&store, &server, "C", "/c.xml", true);

    let config = config_for(&server);
    let fetcher = FeedFetcher::new(&config).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary = refresh_all_feeds(&store, &fetcher, &config, Some(&tx)).await;

    assert_eq!(summary.refreshed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.new_items, 3);

    let events = drain(&mut rx);
    let progress: Vec<(usize, usize, String)> = events
        .iter()
        .filter_map(|event| match event {
            SyncEvent::Progress {
                current,
                total,
                feed_title,
            } => Some((*current, *total, feed_title.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress,
        vec![
            (1, 3, "A".to_string()),
            (2, 3, "B".to_string()),
            (3, 3, "C".to_string()),
        ]
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, SyncEvent::FeedFailed { feed_title, .. } if feed_title == "B")));
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Completed {
            refreshed: 2,
            failed: 1,
            new_items: 3
        })
    );

    let sites: Vec<String> = ItemRepository::new(&store)
        .list_all()
        .into_iter()
        .map(|item| item.site)
        .collect();
    assert_eq!(sites, vec!["A", "A", "C"]);
}

#[tokio::test]
async fn test_inactive_feeds_are_skipped() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", rss(&["a1"])).await;
    Mock::given(method("GET"))
        .and(path("/paused.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&["p1"])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Store::in_memory();
    subscribe(&store, &server, "Paused", "/paused.xml", false);
    subscribe(&store, &server, "A", "/a.xml", true);

    let config = config_for(&server);
    let fetcher = FeedFetcher::new(&config).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary = refresh_all_feeds(&store, &fetcher, &config, Some(&tx)).await;

    assert_eq!(summary.refreshed, 1);
    assert_eq!(
        drain(&mut rx)[0],
        SyncEvent::Progress {
            current: 1,
            total: 1,
            feed_title: "A".to_string()
        }
    );
    assert!(!ItemRepository::new(&store).exists("p1", "Paused"));
}

#[tokio::test]
async fn test_refreshed_items_survive_reopen() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", rss(&["one", "two"])).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server);
    config.general.data_dir = dir.path().join("data");

    {
        let store = Store::open(&config).unwrap();
        subscribe(&store, &server, "Alpha", "/a.xml", true);
        let fetcher = FeedFetcher::new(&config).unwrap();
        refresh_all_feeds(&store, &fetcher, &config, None).await;
    }

    assert!(config.snapshot_path().exists());

    let reopened = Store::open(&config).unwrap();
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.feeds.len(), 1);
    assert_eq!(snapshot.rss_items.len(), 2);
    assert_eq!(snapshot.next_item_id, 3);
    assert_eq!(snapshot.next_feed_id, 2);
}
