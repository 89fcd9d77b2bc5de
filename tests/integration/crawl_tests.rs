//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use page_extractor::config::{Config, TextEncoding};
use page_extractor::crawler::{FailureKind, Notification, NotificationReceiver};
use page_extractor::{ExtractionResult, ResultRecord, Spider, SpiderError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `root_url`
fn create_test_config(root_url: &str) -> Config {
    let mut config = Config::default();
    config.spider.root_url = Some(root_url.to_string());
    config.spider.request_timeout_ms = 5_000;
    config.spider.completion_poll_ms = 50;
    config
}

/// Builds a result page with an optional next-page link and result anchors
fn result_page(next: Option<&str>, results: &[(&str, &str)]) -> String {
    let mut body = String::from("<html><head><title>Results</title></head><body>\n");
    for (name, href) in results {
        body.push_str(&format!(
            "<div class=\"result\"><h3 class=\"t\"><a href=\"{}\">{}</a></h3></div>\n",
            href, name
        ));
    }
    if let Some(next) = next {
        body.push_str(&format!("<p id=\"page\"><a href=\"{}\">下一页&gt;</a></p>\n", next));
    }
    body.push_str("</body></html>");
    body
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html"))
        .mount(server)
        .await;
}

/// Receives notifications up to and including DownloadFinish
async fn collect_until_finish(events: &mut NotificationReceiver) -> Vec<Notification> {
    let mut seen = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(15), events.recv())
            .await
            .expect("Timed out waiting for notifications")
            .expect("Notification channel closed");
        let finished = matches!(next, Notification::DownloadFinish { .. });
        seen.push(next);
        if finished {
            return seen;
        }
    }
}

fn finish_count(notifications: &[Notification]) -> Vec<usize> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::DownloadFinish { total_pages } => Some(*total_pages),
            _ => None,
        })
        .collect()
}

fn data_saved(notifications: &[Notification]) -> Vec<(String, String)> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::DataSaved { name, url } => Some((name.clone(), url.clone())),
            _ => None,
        })
        .collect()
}

fn failures(notifications: &[Notification]) -> Vec<FailureKind> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Error(failure) => Some(failure.kind),
            _ => None,
        })
        .collect()
}

fn count_files(dir: &Path, prefix: &str) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .count()
}

#[tokio::test]
async fn test_two_page_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/page1",
        result_page(
            Some("/page2"),
            &[("First", "/result/1"), ("Second", "/result/2")],
        ),
    )
    .await;
    mount_page(&server, "/page2", result_page(None, &[("Third", "/result/3")])).await;

    let mut config = create_test_config(&format!("{}/page1", base));
    config.spider.max_depth = 10;
    config.spider.max_connections = 1;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();

    assert!(spider.download(temp.path()).unwrap());
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![2]);
    assert_eq!(count_files(temp.path(), "Page_"), 2);
    assert_eq!(count_files(temp.path(), "Data_Page_"), 2);

    let records = data_saved(&notifications);
    assert_eq!(
        records,
        vec![
            ("NO.1 Page0(0):First".to_string(), format!("{}/result/1", base)),
            ("NO.2 Page0(1):Second".to_string(), format!("{}/result/2", base)),
            ("NO.3 Page1(0):Third".to_string(), format!("{}/result/3", base)),
        ]
    );

    let data = std::fs::read_to_string(temp.path().join("Data_Page_0.txt")).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("Name:NO.1 Page0(0):First        Url:{}/result/1", base),
            format!("Name:NO.2 Page0(1):Second        Url:{}/result/2", base),
        ]
    );

    let page = std::fs::read_to_string(temp.path().join("Page_1.txt")).unwrap();
    assert!(page.contains("Third"));

    assert_eq!(spider.wait().await, Some(2));
    assert!(!spider.is_running());
}

#[tokio::test]
async fn test_contents_saved_before_records() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/start", result_page(None, &[("Only", "/result/1")])).await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    match &notifications[0] {
        Notification::ContentsSaved { path, url } => {
            assert_eq!(path, &temp.path().join("Page_0.txt"));
            assert_eq!(url, &format!("{}/start", base));
        }
        other => panic!("Expected ContentsSaved first, got {:?}", other),
    }
    assert!(matches!(notifications[1], Notification::DataSaved { .. }));
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(result_page(Some("/page2"), &[]).into_bytes(), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Page 2 links back to page 1 and to itself.
    let page2 = format!(
        "<html><body><a href=\"/page1\">下一页</a><a href=\"{}/page2/\">下一页</a></body></html>",
        base
    );
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page2.into_bytes(), "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/page1", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![2]);
}

#[tokio::test]
async fn test_shared_link_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    let hub = "<html><body><a href=\"/a\">下一页</a><a href=\"/b\">下一页</a></body></html>";
    mount_page(&server, "/hub", hub.to_string()).await;

    // Both siblings are in flight together and discover the same page.
    for route in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(result_page(Some("/p3"), &[]).into_bytes(), "text/html")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/p3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(result_page(None, &[]).into_bytes(), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/hub", base));
    config.spider.max_depth = 10;
    config.spider.max_connections = 2;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![4]);
    assert_eq!(count_files(temp.path(), "Page_"), 4);
    assert!(failures(&notifications).is_empty());
}

#[tokio::test]
async fn test_depth_bound() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/page1", result_page(Some("/page2"), &[("a", "/r/a")])).await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/page1", base));
    config.spider.max_depth = 1;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![1]);
    assert_eq!(count_files(temp.path(), "Page_"), 1);
}

#[tokio::test]
async fn test_chain_of_three_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/p1", result_page(Some("/p2"), &[("one", "/r/1")])).await;
    mount_page(&server, "/p2", result_page(Some("/p3"), &[("two", "/r/2")])).await;
    mount_page(&server, "/p3", result_page(None, &[("three", "/r/3")])).await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/p1", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![3]);
    for index in 0..3 {
        assert!(temp.path().join(format!("Page_{}.txt", index)).exists());
        assert!(temp.path().join(format!("Data_Page_{}.txt", index)).exists());
    }
    assert!(failures(&notifications).is_empty());
}

#[tokio::test]
async fn test_excluded_resources_not_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    let page = "<html><body><a href=\"/logo.png\">下一页</a><a href=\"/style.css?v=2\">下一页</a></body></html>";
    mount_page(&server, "/start", page.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![1]);
}

#[tokio::test]
async fn test_http_error_reported() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/broken", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(failures(&notifications), vec![FailureKind::Network]);
    assert_eq!(finish_count(&notifications), vec![0]);
    assert_eq!(count_files(temp.path(), "Page_"), 0);
}

#[tokio::test]
async fn test_failed_page_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    let page = format!(
        "<html><body><a href=\"/missing\">下一页</a><a href=\"{}/ok\">下一页</a></body></html>",
        base
    );
    mount_page(&server, "/start", page).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", result_page(None, &[("kept", "/r/1")])).await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(failures(&notifications), vec![FailureKind::Network]);
    assert_eq!(finish_count(&notifications), vec![2]);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/slow", base));
    config.spider.request_timeout_ms = 200;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(failures(&notifications), vec![FailureKind::Timeout]);
    assert_eq!(finish_count(&notifications), vec![0]);
}

#[tokio::test]
async fn test_empty_body_saves_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/empty", base))).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(notifications.len(), 1);
    assert_eq!(finish_count(&notifications), vec![0]);
    assert_eq!(count_files(temp.path(), ""), 0);
}

#[tokio::test]
async fn test_gb18030_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    let html = result_page(Some("/p2"), &[("吉林大学", "/r/1")]);
    let (encoded, _, _) = encoding_rs::GB18030.encode(&html);
    Mock::given(method("GET"))
        .and(path("/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(encoded.into_owned(), "text/html"))
        .mount(&server)
        .await;

    let html = result_page(None, &[("长春", "/r/2")]);
    let (encoded, _, _) = encoding_rs::GB18030.encode(&html);
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(encoded.into_owned(), "text/html"))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/p1", base));
    config.spider.encoding = TextEncoding::Gb18030;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![2]);
    let names: Vec<String> = data_saved(&notifications).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["NO.1 Page0(0):吉林大学", "NO.2 Page1(0):长春"]);

    let page = std::fs::read_to_string(temp.path().join("Page_0.txt")).unwrap();
    assert!(page.contains("吉林大学"));
}

#[tokio::test]
async fn test_redirect_resolution() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/start", result_page(None, &[("tracked", "/link/1")])).await;
    Mock::given(method("GET"))
        .and(path("/link/1"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/final/1", base).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("landing"))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/start", base));
    config.extraction.resolve_redirects = true;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(
        data_saved(&notifications),
        vec![("NO.1 Page0(0):tracked".to_string(), format!("{}/final/1", base))]
    );
}

#[tokio::test]
async fn test_failed_redirect_keeps_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/start", result_page(None, &[("gone", "/link/404")])).await;
    Mock::given(method("GET"))
        .and(path("/link/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/start", base));
    config.extraction.resolve_redirects = true;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(failures(&notifications), vec![FailureKind::Redirect]);
    assert_eq!(
        data_saved(&notifications),
        vec![("NO.1 Page0(0):gone".to_string(), format!("{}/link/404", base))]
    );
}

#[tokio::test]
async fn test_slow_redirect_times_out() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/start", result_page(None, &[("stalled", "/slowresult")])).await;
    Mock::given(method("GET"))
        .and(path("/slowresult"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/start", base));
    config.spider.request_timeout_ms = 500;
    config.extraction.resolve_redirects = true;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(config).unwrap();
    let started = std::time::Instant::now();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(failures(&notifications), vec![FailureKind::Redirect]);
    assert_eq!(finish_count(&notifications), vec![1]);
    assert_eq!(
        data_saved(&notifications),
        vec![("NO.1 Page0(0):stalled".to_string(), format!("{}/slowresult", base))]
    );
}

#[tokio::test]
async fn test_custom_strategy() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/a", "<html>a</html>".to_string()).await;
    mount_page(&server, "/b", "<html>b</html>".to_string()).await;

    let next = format!("{}/b", base);
    let strategy = move |page_url: &str, _text: &str| {
        if page_url.ends_with("/a") {
            ExtractionResult {
                next_urls: vec![next.clone()],
                records: vec![ResultRecord::new("from a", "https://example.com/x")],
            }
        } else {
            ExtractionResult::default()
        }
    };

    let temp = TempDir::new().unwrap();
    let (spider, mut events) =
        Spider::with_strategy(create_test_config(&format!("{}/a", base)), Arc::new(strategy)).unwrap();
    spider.download(temp.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;

    assert_eq!(finish_count(&notifications), vec![2]);
    assert_eq!(data_saved(&notifications).len(), 1);
}

#[tokio::test]
async fn test_download_creates_output_dir() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/start", result_page(None, &[])).await;

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("nested").join("pages");

    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();
    spider.download(&output).unwrap();
    collect_until_finish(&mut events).await;

    assert!(output.join("Page_0.txt").exists());
    assert!(output.join("Data_Page_0.txt").exists());
}

#[tokio::test]
async fn test_abort_before_download_and_twice() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/start", result_page(None, &[])).await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();

    spider.abort();
    spider.abort();

    assert!(spider.download(temp.path()).unwrap());
    let notifications = collect_until_finish(&mut events).await;
    assert_eq!(finish_count(&notifications), vec![1]);

    spider.abort();
    spider.abort();
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_abort_mid_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    for index in 0..10 {
        let next = format!("/p{}", index + 1);
        Mock::given(method("GET"))
            .and(path(format!("/p{}", index).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(result_page(Some(&next), &[("r", "/r")]).into_bytes(), "text/html")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/p0", base))).unwrap();
    spider.download(temp.path()).unwrap();

    // Wait for the first page, then stop.
    loop {
        let next = tokio::time::timeout(Duration::from_secs(15), events.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(next, Notification::ContentsSaved { .. }) {
            break;
        }
    }
    spider.abort();
    spider.abort();

    let notifications = collect_until_finish(&mut events).await;
    let total = finish_count(&notifications)[0];
    assert!(total >= 1 && total < 10);
    assert_eq!(spider.wait().await, Some(total));

    // Leftover requests must not produce more pages.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(count_files(temp.path(), "Page_"), total);
    while let Ok(late) = events.try_recv() {
        assert!(
            !matches!(late, Notification::ContentsSaved { .. } | Notification::DownloadFinish { .. }),
            "unexpected notification after finish: {:?}",
            late
        );
    }
}

#[tokio::test]
async fn test_download_while_running() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>slow</html>")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/slow", base))).unwrap();

    assert!(spider.download(temp.path()).unwrap());
    assert!(spider.is_running());
    assert!(matches!(
        spider.download(temp.path()),
        Err(SpiderError::CrawlInProgress)
    ));

    spider.abort();
    collect_until_finish(&mut events).await;
    assert!(!spider.is_running());
}

#[tokio::test]
async fn test_restart_after_finish() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/start", result_page(None, &[("x", "/r/x")])).await;

    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let (spider, mut events) = Spider::new(create_test_config(&format!("{}/start", base))).unwrap();

    spider.download(first.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;
    assert_eq!(finish_count(&notifications), vec![1]);

    // A new crawl starts with a fresh frontier and fresh counters.
    spider.download(second.path()).unwrap();
    let notifications = collect_until_finish(&mut events).await;
    assert_eq!(finish_count(&notifications), vec![1]);
    assert_eq!(
        data_saved(&notifications)[0].0,
        "NO.1 Page0(0):x".to_string()
    );
    assert!(second.path().join("Page_0.txt").exists());
}

#[tokio::test]
async fn test_download_without_root_url() {
    let temp = TempDir::new().unwrap();
    let (spider, _events) = Spider::new(Config::default()).unwrap();

    assert!(!spider.download(temp.path()).unwrap());
    assert_eq!(count_files(temp.path(), ""), 0);
}
