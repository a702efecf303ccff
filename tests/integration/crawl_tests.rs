//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including checkpoint and resume.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tidemark::config::{
    Config, CrawlerConfig, DomainConfig, ExcludedConfig, FilesConfig, PdfConfig, TimeoutConfig,
};
use tidemark::crawler::{crawl, BatchStatus, Coordinator, CrawlOutcome, MediaKind, StopReason};
use tidemark::state::{CheckpointStore, CrawlState, EngineState};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server
fn create_test_config(server: &MockServer, max_workers: usize, max_queue_size: usize) -> Config {
    let host = url::Url::parse(&server.uri())
        .expect("Failed to parse mock server URI")
        .host_str()
        .expect("Mock server URI has no host")
        .to_string();

    Config {
        domain: DomainConfig {
            name: host,
            start_url: format!("{}/", server.uri()),
        },
        excluded: ExcludedConfig {
            patterns: vec!["/logout".to_string()],
            extensions: vec![".css".to_string()],
        },
        timeouts: TimeoutConfig {
            connect: 5,
            read: 5,
            max_retries: 2,
            backoff_base: 1, // Very short for testing
        },
        crawler: CrawlerConfig {
            max_workers,
            max_queue_size,
            delay_min: 0.0,
            delay_max: 0.0,
            checkpoint_interval: 1,
        },
        files: FilesConfig {
            output_dir: "crawls".to_string(),
            max_length: 100,
            max_url_length: 2000,
            log_dir: None,
            max_log_files: 5,
        },
        pdf: PdfConfig {
            ocr_enabled: false,
            ..PdfConfig::default()
        },
    }
}

async fn mount_html(server: &MockServer, route: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Index page: two in-scope pages, an image, an excluded link and an external one
    mount_html(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <p>Welcome home</p>
        <a href="/page1">Page 1</a>
        <a href="missing">Missing</a>
        <a href="/logo.png">Logo</a>
        <a href="/logout">Logout</a>
        <a href="/style.css">Style</a>
        <a href="https://elsewhere.example.org/">Elsewhere</a>
        <a href="mailto:someone@example.org">Mail</a>
        </body></html>"#,
        2,
    )
    .await;

    // Page 1 links back to the index, which is already saved
    mount_html(
        &mock_server,
        "/page1",
        r#"<html><body><p>Content 1</p><a href="/">Home</a></body></html>"#,
        2,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89u8, b'P', b'N', b'G'], "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 2, 100);

    let report = crawl(config, output.path(), false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(
        report.outcome,
        CrawlOutcome::Completed(StopReason::FrontierExhausted)
    );

    let stats = &report.statistics;
    assert_eq!(stats.saved(MediaKind::Html), 2);
    assert_eq!(stats.saved(MediaKind::Image), 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.storage_errors, 0);

    // Artifacts land under <output>/<output-dir>/<domain>
    assert!(report.crawl_root.starts_with(output.path().join("crawls")));
    assert_eq!(list_files(&report.crawl_root.join("text")).len(), 2);

    let images = list_files(&report.crawl_root.join("files").join("image"));
    assert_eq!(images.len(), 1);
    assert!(images[0].starts_with("logo_"));
    assert!(images[0].ends_with(".png"));

    let home = list_files(&report.crawl_root.join("text"))
        .into_iter()
        .find(|name| name.starts_with("home_"))
        .expect("No artifact for the index page");
    let content = std::fs::read_to_string(report.crawl_root.join("text").join(home)).unwrap();
    assert!(content.starts_with(&format!("URL: {}/\n", base_url)));
    assert!(content.contains("Content Type: html"));
    assert!(content.contains("Welcome home"));
    assert!(!content.contains("<title>"));
    assert!(content.ends_with(&format!("End of content: {}/", base_url)));

    // The final checkpoint holds everything saved and an empty queue
    let state = CheckpointStore::new(&report.crawl_root)
        .load()
        .unwrap()
        .expect("No checkpoint written");
    let expected: BTreeSet<String> = [
        format!("{}/", base_url),
        format!("{}/page1", base_url),
        format!("{}/logo.png", base_url),
    ]
    .into_iter()
    .collect();
    assert_eq!(state.seen_urls, expected);
    assert!(state.queue.is_empty());
}

#[tokio::test]
async fn test_pdf_saved_as_text_and_original() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let pdf_bytes = include_bytes!("../fixtures/text_layer.pdf").to_vec();

    mount_html(
        &mock_server,
        "/",
        r#"<html><body><a href="/report.pdf">Annual report</a></body></html>"#,
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pdf_bytes.clone(), "application/pdf"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 2, 100);

    let report = crawl(config, output.path(), false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let stats = &report.statistics;
    assert_eq!(stats.saved(MediaKind::Html), 1);
    assert_eq!(stats.saved(MediaKind::Pdf), 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.storage_errors, 0);

    let text_dir = report.crawl_root.join("text");
    let report_text = list_files(&text_dir)
        .into_iter()
        .find(|name| name.starts_with("report_"))
        .expect("No text artifact for the PDF");
    let content = std::fs::read_to_string(text_dir.join(report_text)).unwrap();
    assert!(content.starts_with(&format!("URL: {}/report.pdf\n", base_url)));
    assert!(content.contains("Content Type: pdf"));

    // Text layers may split words into separate runs
    let squashed: String = content.split_whitespace().collect();
    assert!(squashed.contains("HelloTidemark"), "{}", content);

    let documents = list_files(&report.crawl_root.join("files").join("document"));
    assert_eq!(documents.len(), 1);
    assert!(documents[0].starts_with("report_"));
    assert!(documents[0].ends_with(".pdf"));
    let saved = std::fs::read(report.crawl_root.join("files").join("document").join(&documents[0])).unwrap();
    assert_eq!(saved, pdf_bytes);
}

#[tokio::test]
async fn test_resume_skips_seen_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // A is fetched once for content and once for links
    mount_html(
        &mock_server,
        "/a",
        r#"<html><body><a href="/b">B</a><a href="/c">C</a></body></html>"#,
        2,
    )
    .await;
    mount_html(&mock_server, "/b", "<p>B</p>", 0).await;
    mount_html(&mock_server, "/c", "<p>C</p>", 0).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 1, 100);
    let crawl_root = config.crawl_root(output.path());

    let mut state = CrawlState::new();
    state.seen_urls.insert(format!("{}/b", base_url));
    state.queue.push(format!("{}/a", base_url));
    CheckpointStore::new(&crawl_root).save(&state).unwrap();

    let mut coordinator =
        Coordinator::new(config, &crawl_root, true, CancellationToken::new()).unwrap();
    coordinator.start().unwrap();

    let status = coordinator.run_batch().await.unwrap();
    assert_eq!(status, BatchStatus::Completed { dispatched: 1 });

    let seen: Vec<&str> = coordinator.frontier().seen_urls().collect();
    assert_eq!(seen, vec![format!("{}/a", base_url), format!("{}/b", base_url)]);

    let queued: Vec<&str> = coordinator.frontier().queued_urls().collect();
    assert_eq!(queued, vec![format!("{}/c", base_url)]);
}

#[tokio::test]
async fn test_seen_limit_stops_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        r#"<html><body><a href="/c">C</a></body></html>"#,
        2,
    )
    .await;
    mount_html(&mock_server, "/c", "<p>C</p>", 0).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 4, 1);

    let report = crawl(config, output.path(), false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        CrawlOutcome::Completed(StopReason::SeenLimitReached)
    );

    // The unvisited link survives in the checkpoint for a later run
    let state = CheckpointStore::new(&report.crawl_root)
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(state.seen_urls.len(), 1);
    assert_eq!(state.queue, vec![format!("{}/c", base_url)]);
}

#[tokio::test]
async fn test_corrupt_checkpoint_falls_back_to_start_url() {
    let mock_server = MockServer::start().await;

    mount_html(&mock_server, "/", "<p>Fresh start</p>", 2).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 2, 100);
    let crawl_root = config.crawl_root(output.path());

    let store = CheckpointStore::new(&crawl_root);
    std::fs::create_dir_all(&crawl_root).unwrap();
    std::fs::write(store.path(), "{ this is not json").unwrap();

    let report = crawl(config, output.path(), true, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        CrawlOutcome::Completed(StopReason::FrontierExhausted)
    );
    assert_eq!(report.statistics.saved(MediaKind::Html), 1);

    // The corrupt file is replaced by a valid one
    let state = store.load().unwrap().unwrap();
    assert_eq!(state.seen_urls.len(), 1);
}

#[tokio::test]
async fn test_resume_after_completed_crawl_fetches_nothing() {
    let mock_server = MockServer::start().await;

    mount_html(&mock_server, "/", "<p>Only page</p>", 2).await;

    let output = TempDir::new().unwrap();

    let first = crawl(
        create_test_config(&mock_server, 2, 100),
        output.path(),
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.statistics.total_saved(), 1);

    // Queue is empty in the checkpoint, so the resumed run ends immediately
    let second = crawl(
        create_test_config(&mock_server, 2, 100),
        output.path(),
        true,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(
        second.outcome,
        CrawlOutcome::Completed(StopReason::FrontierExhausted)
    );
    assert_eq!(second.statistics.total_saved(), 0);
    assert_eq!(second.statistics.batches, 0);
}

#[tokio::test]
async fn test_cancelled_before_start_writes_checkpoint() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/", "<p>Never fetched</p>", 0).await;

    let output = TempDir::new().unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let report = crawl(
        create_test_config(&mock_server, 2, 100),
        output.path(),
        false,
        token,
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Interrupted);

    let state = CheckpointStore::new(&report.crawl_root)
        .load()
        .unwrap()
        .expect("No checkpoint written on shutdown");
    assert!(state.seen_urls.is_empty());
    assert_eq!(state.queue, vec![format!("{}/", base_url)]);
}

#[tokio::test]
async fn test_shutdown_drops_in_flight_urls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>Slow</p>", "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, 2, 100);
    let crawl_root = config.crawl_root(output.path());

    let token = CancellationToken::new();
    let mut coordinator = Coordinator::new(config, &crawl_root, false, token.clone()).unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("Shutdown did not interrupt the batch")
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome, CrawlOutcome::Interrupted);
    assert_eq!(coordinator.state(), EngineState::Stopped);

    // The in-flight start URL is neither saved nor requeued
    let state = coordinator.checkpoint_store().load().unwrap().unwrap();
    assert!(state.seen_urls.is_empty());
    assert!(state.queue.is_empty());
}
