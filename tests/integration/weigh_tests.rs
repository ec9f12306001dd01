//! Integration tests for page weighing
//!
//! These tests use wiremock to serve a small site and weigh it end-to-end
//! over real HTTP in every concurrency mode.

use pageweight::config::{ConcurrencyMode, Config};
use pageweight::engine::weigh;
use pageweight::output::write_report;
use pageweight::{PageError, ResolveState, ResourceType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODES: [ConcurrencyMode; 4] = [
    ConcurrencyMode::Sequential,
    ConcurrencyMode::PerPage,
    ConcurrencyMode::PerRequest,
    ConcurrencyMode::PerRequestPerHost,
];

fn test_config(mode: ConcurrencyMode) -> Config {
    let mut config = Config::default();
    config.fetcher.mode = mode;
    config.fetcher.pool_size = 2;
    config.fetcher.request_timeout_ms = 5_000;
    config.fetcher.connect_timeout_ms = 1_000;
    config
}

async fn mount(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serves `/blog/index.html` referencing one stylesheet, one script, two
/// images (one of them twice, one document-relative) and an asset on an
/// unreachable host
async fn start_site() -> MockServer {
    let server = MockServer::start().await;

    let index = r#"<html><head>
        <link rel="stylesheet" href="/style.css">
        <script src="/app.js"></script>
        </head><body>
        <img src="/logo.png">
        <img src="/logo.png">
        <img src="photo.jpg">
        <script src="http://127.0.0.1:1/gone.js"></script>
        </body></html>"#;

    mount(&server, "/blog/index.html", index.as_bytes().to_vec()).await;
    mount(&server, "/style.css", vec![b'c'; 100]).await;
    mount(&server, "/app.js", vec![b'j'; 200]).await;
    mount(&server, "/logo.png", vec![0u8; 300]).await;
    mount(&server, "/blog/photo.jpg", vec![0u8; 400]).await;
    mount(&server, "/plain", b"<p>nothing to load</p>".to_vec()).await;

    server
}

fn index_address(server: &MockServer) -> String {
    format!("{}/blog/index.html", server.uri())
}

#[tokio::test]
async fn test_every_mode_weighs_the_same() {
    let server = start_site().await;
    let index = index_address(&server);
    let expected_bytes = {
        let body = reqwest::get(&index).await.unwrap().bytes().await.unwrap();
        body.len() + 100 + 200 + 300 + 400
    };

    for mode in MODES {
        let report = weigh(&test_config(mode), &[index.clone()]).await.unwrap();
        assert_eq!(report.pages.len(), 1, "mode {}", mode);

        let page = &report.pages[0];
        assert_eq!(page.state(), ResolveState::Done, "mode {}", mode);
        assert!(page.error().is_none(), "mode {}", mode);
        assert_eq!(page.num_assets(), 5, "mode {}", mode);
        assert_eq!(page.total_bytes(), expected_bytes, "mode {}", mode);

        let failed: Vec<_> = page.asset_resources().filter(|r| !r.succeeded()).collect();
        assert_eq!(failed.len(), 1, "mode {}", mode);
        assert_eq!(failed[0].url, "http://127.0.0.1:1/gone.js");
        assert_eq!(failed[0].size, 0);
    }
}

#[tokio::test]
async fn test_assets_are_grouped_by_type() {
    let server = start_site().await;
    let index = index_address(&server);

    let report = weigh(&test_config(ConcurrencyMode::Sequential), &[index])
        .await
        .unwrap();
    let assets = report.pages[0].assets();

    assert_eq!(assets[&ResourceType::Stylesheet].len(), 1);
    assert_eq!(assets[&ResourceType::Script].len(), 2);
    assert_eq!(assets[&ResourceType::Image].len(), 2);
    assert!(assets[&ResourceType::Image]
        .contains_key(&format!("{}/blog/photo.jpg", server.uri())));
    assert!(assets[&ResourceType::Image].values().all(|r| r.succeeded()));
}

#[tokio::test]
async fn test_duplicate_references_fetched_once() {
    let server = start_site().await;
    let index = index_address(&server);

    weigh(&test_config(ConcurrencyMode::PerRequest), &[index])
        .await
        .unwrap();

    let logo_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/logo.png")
        .count();
    assert_eq!(logo_requests, 1);
}

#[tokio::test]
async fn test_document_failure_ends_page() {
    for mode in MODES {
        let report = weigh(
            &test_config(mode),
            &["http://127.0.0.1:1/".to_string()],
        )
        .await
        .unwrap();

        let page = &report.pages[0];
        assert_eq!(page.state(), ResolveState::Done, "mode {}", mode);
        assert!(matches!(page.error(), Some(PageError::Fetch(_))), "mode {}", mode);
        assert_eq!(page.num_assets(), 0);
        assert_eq!(page.total_bytes(), 0);
    }
}

#[tokio::test]
async fn test_error_status_body_is_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let report = weigh(
        &test_config(ConcurrencyMode::Sequential),
        &[format!("{}/missing", server.uri())],
    )
    .await
    .unwrap();

    let page = &report.pages[0];
    assert!(page.error().is_none());
    assert_eq!(page.total_bytes(), "not found".len());
}

#[tokio::test]
async fn test_several_pages_and_bad_addresses() {
    let server = start_site().await;
    let addresses = vec![
        index_address(&server),
        "ftp://example.com/file".to_string(),
        format!("{}/plain", server.uri()),
    ];

    for mode in MODES {
        let report = weigh(&test_config(mode), &addresses).await.unwrap();

        assert_eq!(report.pages.len(), 2, "mode {}", mode);
        assert_eq!(report.skipped.len(), 1, "mode {}", mode);
        if mode == ConcurrencyMode::PerRequestPerHost {
            assert_eq!(report.hosts.len(), 2);
        }
    }
}

#[tokio::test]
async fn test_report_output() {
    let server = start_site().await;
    let report = weigh(
        &test_config(ConcurrencyMode::PerPage),
        &[format!("{}/plain", server.uri())],
    )
    .await
    .unwrap();

    let mut out = Vec::new();
    write_report(&mut out, &report.pages, true, false).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("URL"));
    assert!(text.contains("    parse"));
    assert!(text.lines().last().unwrap().starts_with("Total"));
}

#[tokio::test]
async fn test_trace_counts_connections_by_name() {
    let server = start_site().await;
    let mut config = test_config(ConcurrencyMode::PerRequest);
    config.output.trace = true;

    // IP literals skip name resolution, so go through localhost
    let address = format!("http://localhost:{}/plain", server.address().port());
    let report = weigh(&config, &[address]).await.unwrap();

    assert!(report.pages[0].error().is_none());
    let trace = report.trace.expect("tracing was enabled");
    assert!(trace.total() >= 1);
    assert!(trace.iter().all(|(label, _)| label.starts_with("localhost <")));
}
