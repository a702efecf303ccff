//! Integration tests for the fetch client
//!
//! These tests use wiremock to check retry, classification and redirect
//! handling against a real HTTP server.

use tidemark::config::TimeoutConfig;
use tidemark::crawler::{FetchClient, MediaKind, USER_AGENTS};
use tidemark::{AttemptError, FetchError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Short timeouts and a 1ms backoff base so retries finish quickly
fn create_test_timeouts(max_retries: u32) -> TimeoutConfig {
    TimeoutConfig {
        connect: 5,
        read: 5,
        max_retries,
        backoff_base: 1,
    }
}

#[tokio::test]
async fn test_fetch_html_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Hello</body></html>", "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(3)).unwrap();
    let url = format!("{}/", mock_server.uri());
    let response = client.fetch(&url).await.unwrap();

    assert_eq!(response.kind, MediaKind::Html);
    assert_eq!(response.status, 200);
    assert_eq!(response.url, url);
    assert_eq!(&response.body[..], b"<html><body>Hello</body></html>");
}

#[tokio::test]
async fn test_fetch_sends_pooled_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/html"))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(1)).unwrap();
    client.fetch(&format!("{}/", mock_server.uri())).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let user_agent = requests[0]
        .headers
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(USER_AGENTS.contains(&user_agent.as_str()));
    assert_eq!(user_agent, client.user_agent());
}

#[tokio::test]
async fn test_server_error_retried_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(3)).unwrap();
    let url = format!("{}/flaky", mock_server.uri());
    let result = client.fetch(&url).await;

    match result {
        Err(FetchError::RetriesExhausted {
            url: failed_url,
            attempts,
            source: AttemptError::Status(status),
        }) => {
            assert_eq!(failed_url, url);
            assert_eq!(attempts, 3);
            assert_eq!(status, 500);
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recovers_after_transient_error() {
    let mock_server = MockServer::start().await;

    // First request fails, the mock below answers the retry
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ready</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(3)).unwrap();
    let response = client
        .fetch(&format!("{}/busy", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.kind, MediaKind::Html);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(5)).unwrap();
    let url = format!("{}/gone", mock_server.uri());
    let result = client.fetch(&url).await;

    assert!(matches!(result, Err(FetchError::NotFound { url: ref u }) if *u == url));
}

#[tokio::test]
async fn test_redirect_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new(&create_test_timeouts(1)).unwrap();
    let url = format!("{}/old", mock_server.uri());
    let response = client.fetch(&url).await.unwrap();

    assert_eq!(response.url, url);
    assert_eq!(response.final_url, format!("{}/new", mock_server.uri()));
    assert_eq!(response.kind, MediaKind::Html);
}

#[tokio::test]
async fn test_media_classification() {
    let mock_server = MockServer::start().await;

    let cases = [
        ("/doc.pdf", "application/pdf", MediaKind::Pdf),
        ("/logo.png", "image/png", MediaKind::Image),
        ("/report.doc", "application/msword", MediaKind::Document),
        ("/blob", "application/octet-stream", MediaKind::Unsupported),
        ("/style", "text/css", MediaKind::Unsupported),
    ];

    for (route, mime, _) in &cases {
        Mock::given(method("GET"))
            .and(path(*route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], mime))
            .mount(&mock_server)
            .await;
    }

    let client = FetchClient::new(&create_test_timeouts(1)).unwrap();
    for (route, mime, expected) in cases {
        let response = client
            .fetch(&format!("{}{}", mock_server.uri(), route))
            .await
            .unwrap();
        assert_eq!(response.kind, expected, "{} served as {}", route, mime);
        assert_eq!(response.mime(), mime);
    }
}
