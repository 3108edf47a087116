//! Integration tests for URL discovery
//!
//! These tests use wiremock to serve small sites and run the full discovery
//! cycle against them.

use ux_sweep::crawler::{discover, DiscoveryOptions};
use ux_sweep::output::{read_url_list, write_discovery, UrlsFile, URLS_FILE};
use ux_sweep::state::PageState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves `body` as HTML at `route`
async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

fn test_options() -> DiscoveryOptions {
    DiscoveryOptions {
        max_pages: 20,
        concurrency: 3,
        timeout_ms: 5_000,
        max_urls_total: 20,
        ..DiscoveryOptions::default()
    }
}

#[tokio::test]
async fn test_single_page_site_returns_root() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &[])).await;

    let discovery = discover(&server.uri(), &test_options()).await.unwrap();

    assert_eq!(discovery.urls.len(), 1);
    assert_eq!(discovery.urls[0].url, format!("{}/", server.uri()));
    assert_eq!(discovery.urls[0].depth, 0);
    assert_eq!(discovery.urls[0].category, "root");
    assert_eq!(discovery.stats.pages_succeeded, 1);
}

#[tokio::test]
async fn test_crawl_follows_same_domain_links_only() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        &page(
            "Home",
            &["/about", "/services", "https://elsewhere.example.org/", "mailto:hi@example.com"],
        ),
    )
    .await;
    mount_page(&server, "/about", &page("About", &["/", "/about/team"])).await;
    mount_page(&server, "/services", &page("Services", &["/"])).await;
    mount_page(&server, "/about/team", &page("Team", &[])).await;

    let discovery = discover(&server.uri(), &test_options()).await.unwrap();
    let urls = discovery.url_strings();

    assert_eq!(urls.len(), 4);
    assert!(urls.iter().all(|u| u.starts_with(&server.uri())));
    assert!(urls.contains(&format!("{}/about/team", server.uri())));
    assert_eq!(discovery.stats.pages_visited, 4);
}

#[tokio::test]
async fn test_duplicate_spellings_collapse() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        &page(
            "Home",
            &["/contact", "/contact/", "/contact?utm_source=footer", "/contact#form"],
        ),
    )
    .await;
    mount_page(&server, "/contact", &page("Contact", &[])).await;

    let discovery = discover(&server.uri(), &test_options()).await.unwrap();
    let contact: Vec<_> = discovery
        .url_strings()
        .into_iter()
        .filter(|u| u.contains("/contact"))
        .collect();

    assert_eq!(contact, vec![format!("{}/contact", server.uri())]);
    assert!(discovery.stats.duplicates_removed >= 1);
}

#[tokio::test]
async fn test_exclusions_and_dead_links() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        &page(
            "Home",
            &["/privacy-policy", "/wp-admin/", "/brochure.pdf", "/events/2024-gala", "/gone", "/programs"],
        ),
    )
    .await;
    mount_page(&server, "/programs", &page("Programs", &[])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let options = DiscoveryOptions {
        exclude_patterns: vec!["/events/".to_string()],
        ..test_options()
    };
    let discovery = discover(&server.uri(), &options).await.unwrap();
    let urls = discovery.url_strings();

    assert_eq!(
        urls,
        vec![format!("{}/", server.uri()), format!("{}/programs", server.uri())]
    );
    assert_eq!(discovery.stats.pages_excluded, 4);
    assert_eq!(discovery.stats.pages_skipped.len(), 1);
    assert_eq!(discovery.stats.pages_skipped[0].state, PageState::DeadLink);
    assert!(discovery
        .exclude_patterns_used
        .contains(&"/events/".to_string()));
}

#[tokio::test]
async fn test_max_pages_bounds_fetches() {
    let server = MockServer::start().await;
    let links: Vec<String> = (0..10).map(|i| format!("/section-{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", &page("Home", &link_refs)).await;
    for link in &links {
        mount_page(&server, link, &page(link, &[])).await;
    }

    let options = DiscoveryOptions {
        max_pages: 3,
        concurrency: 1,
        enable_sampling: false,
        ..test_options()
    };
    let discovery = discover(&server.uri(), &options).await.unwrap();

    assert_eq!(discovery.stats.pages_visited, 3);
    // Unvisited frontier URLs are still part of the discovered set.
    assert_eq!(discovery.urls.len(), 11);
}

#[tokio::test]
async fn test_discovery_files_round_trip() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/donate"])).await;
    mount_page(&server, "/donate", &page("Donate", &[])).await;

    let discovery = discover(&server.uri(), &test_options()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let simple = write_discovery(dir.path(), &discovery).unwrap();

    assert_eq!(read_url_list(&simple).unwrap(), discovery.url_strings());

    let raw = std::fs::read_to_string(dir.path().join(URLS_FILE)).unwrap();
    let record: UrlsFile = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.total_final_urls, 2);
    assert!(raw.contains("\"crawlStats\""));
    assert!(raw.contains("\"excludePatternsUsed\""));
}
