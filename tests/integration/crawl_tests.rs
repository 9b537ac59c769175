//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a fake catalog and drive the full
//! fetch, parse, enrich, and export cycle end-to-end.

use shelf_crawler::config::{Config, MalformedPolicy, UserAgentConfig};
use shelf_crawler::crawler::{run_crawl, Coordinator};
use shelf_crawler::output::{CsvSink, MemorySink};
use shelf_crawler::CrawlError;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a fast test configuration pointed at `start_url`
fn create_test_config(start_url: String, min_records: usize) -> Config {
    let mut config = Config::default();
    config.crawler.start_url = start_url;
    config.crawler.min_records = min_records;
    config.crawler.page_delay_ms = 0;
    config.crawler.probe_robots = false;
    config.fetch.max_attempts = 2;
    config.fetch.retry_delay_ms = 0;
    config.fetch.request_timeout_secs = 5;
    config.user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    config
}

fn entry_html(title: &str, href: &str, price: &str) -> String {
    format!(
        r#"<li><article class="product_pod">
            <div class="image_container"><a href="{href}"><img src="../media/{href}.jpg"></a></div>
            <p class="star-rating Four"><i class="icon-star"></i></p>
            <h3><a href="{href}" title="{title}">{title}</a></h3>
            <div class="product_price">
                <p class="price_color">£{price}</p>
                <p class="instock availability"><i class="icon-ok"></i> In stock </p>
            </div>
        </article></li>"#
    )
}

fn list_html(entries: &[String], next: Option<&str>) -> String {
    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#))
        .unwrap_or_default();
    format!(
        "<html><body><ol class=\"row\">{}</ol>{}</body></html>",
        entries.join("\n"),
        pager
    )
}

fn detail_html(quantity: u32) -> String {
    format!(
        r#"<html><body><article class="product_page">
            <p class="instock availability"><i class="icon-ok"></i> In stock ({quantity} available) </p>
        </article></body></html>"#
    )
}

/// Serves `/catalogue/page-N.html` for N in 1..=pages, `per_page` entries each
struct CatalogResponder {
    pages: u32,
    per_page: u32,
}

impl Respond for CatalogResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page: u32 = match request
            .url
            .path()
            .strip_prefix("/catalogue/page-")
            .and_then(|rest| rest.strip_suffix(".html"))
            .and_then(|n| n.parse().ok())
        {
            Some(n) if n >= 1 && n <= self.pages => n,
            _ => return ResponseTemplate::new(404),
        };

        let entries: Vec<String> = (1..=self.per_page)
            .map(|i| {
                entry_html(
                    &format!("Book {}-{}", page, i),
                    &format!("item-{}-{}/index.html", page, i),
                    "10.00",
                )
            })
            .collect();
        let next_href = format!("page-{}.html", page + 1);
        let next = (page < self.pages).then_some(next_href.as_str());

        ResponseTemplate::new(200).set_body_string(list_html(&entries, next))
    }
}

/// Serves `/catalogue/item-P-I/index.html` with quantity `I`
struct DetailResponder;

impl Respond for DetailResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let quantity = request
            .url
            .path()
            .trim_end_matches("/index.html")
            .rsplit('-')
            .next()
            .and_then(|i| i.parse().ok())
            .unwrap_or(0);
        ResponseTemplate::new(200).set_body_string(detail_html(quantity))
    }
}

async fn mount_catalog(server: &MockServer, pages: u32, per_page: u32) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/page-\d+\.html$"))
        .respond_with(CatalogResponder { pages, per_page })
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/item-\d+-\d+/index\.html$"))
        .respond_with(DetailResponder)
        .mount(server)
        .await;
}

async fn list_page_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|r| r.url.path().starts_with("/catalogue/page-"))
        .count()
}

async fn detail_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|r| r.url.path().starts_with("/catalogue/item-"))
        .count()
}

#[tokio::test]
async fn test_thousand_records_from_fifty_pages() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 60, 20).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut coordinator =
        Coordinator::new(create_test_config(start, 1000)).expect("Failed to create coordinator");
    let records = coordinator.run().await.expect("Crawl failed");

    assert_eq!(records.len(), 1000);
    assert_eq!(list_page_requests(&mock_server).await, 50);
    assert_eq!(coordinator.statistics().pages_fetched, 50);
    assert_eq!(records.first().unwrap().title, "Book 1-1");
    assert_eq!(records.last().unwrap().title, "Book 50-20");
}

#[tokio::test]
async fn test_overshoot_is_truncated_before_enrichment() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 4, 2).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(start, 5)).unwrap();
    let records = coordinator.run().await.unwrap();

    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Book 1-1", "Book 1-2", "Book 2-1", "Book 2-2", "Book 3-1"]);

    // Page 4 is never requested and "Book 3-2" is never enriched
    assert_eq!(list_page_requests(&mock_server).await, 3);
    assert_eq!(detail_requests(&mock_server).await, 5);
    assert_eq!(coordinator.statistics().records_collected, 6);
}

#[tokio::test]
async fn test_quantities_come_from_detail_pages() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 1, 3).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let records = Coordinator::new(create_test_config(start, 10))
        .unwrap()
        .run()
        .await
        .unwrap();

    let quantities: Vec<_> = records.iter().map(|r| r.available_quantity).collect();
    assert_eq!(quantities, vec![Some(1), Some(2), Some(3)]);
    assert!(records.iter().all(|r| r.rating == "Four"));
    assert!(records.iter().all(|r| r.stock_text == "In stock"));
    assert!(records.iter().all(|r| r.price == 10.0));
}

#[tokio::test]
async fn test_pagination_exhausted_before_target() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 2, 2).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(start, 10)).unwrap();
    let records = coordinator.run().await.expect("Early end is not an error");

    assert_eq!(records.len(), 4);
    assert_eq!(list_page_requests(&mock_server).await, 2);
}

#[tokio::test]
async fn test_relative_urls_resolve_against_current_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The start page lives at the root; the second page lives under /catalogue/
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Root Book", "catalogue/root-book/index.html", "1.00")],
            Some("catalogue/page-2.html"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Deep Book", "deep-book/index.html", "2.00")],
            None,
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/(root|deep)-book/index\.html$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(7)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let start = format!("{}/index.html", base_url);
    let records = Coordinator::new(create_test_config(start, 10))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[1].detail_url.as_str(),
        format!("{}/catalogue/deep-book/index.html", base_url)
    );
    assert_eq!(
        records[1].image_url,
        format!("{}/media/deep-book/index.html.jpg", base_url)
    );
    assert_eq!(
        records[0].detail_url.as_str(),
        format!("{}/catalogue/root-book/index.html", base_url)
    );
    assert!(records.iter().all(|r| r.available_quantity == Some(7)));
}

#[tokio::test]
async fn test_detail_failure_does_not_abort_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[
                entry_html("Fine", "fine/index.html", "1.00"),
                entry_html("Broken", "broken/index.html", "2.00"),
                entry_html("Also Fine", "also-fine/index.html", "3.00"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/broken/index.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/(fine|also-fine)/index\.html$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(4)))
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(start, 10)).unwrap();
    let records = coordinator.run().await.expect("Detail failures are soft");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].available_quantity, Some(4));
    assert_eq!(records[1].available_quantity, None);
    assert_eq!(records[2].available_quantity, Some(4));
    assert_eq!(coordinator.statistics().detail_failures, 1);
}

#[tokio::test]
async fn test_list_page_exhaustion_aborts_without_export() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("output/books.csv");
    let mut sink = CsvSink::new(&csv_path, true);

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let result = run_crawl(create_test_config(start.clone(), 10), &mut sink).await;

    match result {
        Err(CrawlError::FetchExhausted { url, attempts }) => {
            assert_eq!(url, start);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected FetchExhausted, got {other:?}"),
    }
    assert!(!csv_path.exists());
}

#[tokio::test]
async fn test_later_page_failure_discards_collected_records() {
    let mock_server = MockServer::start().await;

    // Page 1 links to page 2, which is never served
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Only", "only/index.html", "1.00")],
            Some("page-2.html"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/only/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut sink = MemorySink::default();
    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let result = run_crawl(create_test_config(start, 10), &mut sink).await;

    assert!(matches!(result, Err(CrawlError::FetchExhausted { .. })));
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Retried", "retried/index.html", "5.00")],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/retried/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(9)))
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let records = Coordinator::new(create_test_config(start, 10))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].available_quantity, Some(9));
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Polite", "polite/index.html", "5.00")],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/polite/index.html"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let records = Coordinator::new(create_test_config(start, 10))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(records[0].available_quantity, Some(1));
}

#[tokio::test]
async fn test_concurrent_enrichment_preserves_order() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 3, 8).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 20);
    config.crawler.detail_concurrency = 4;

    let records = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(records.len(), 20);
    for (n, record) in records.iter().enumerate() {
        let page = n / 8 + 1;
        let item = n % 8 + 1;
        assert_eq!(record.title, format!("Book {}-{}", page, item));
        assert_eq!(record.available_quantity, Some(item as u32));
    }
}

#[tokio::test]
async fn test_malformed_entry_aborts_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("No Price", "np/index.html", "")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let mut sink = MemorySink::default();
    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let result = run_crawl(create_test_config(start, 10), &mut sink).await;

    assert!(matches!(result, Err(CrawlError::MalformedRecord { .. })));
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn test_malformed_entry_skipped_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[
                entry_html("No Price", "np/index.html", ""),
                entry_html("Priced", "priced/index.html", "8.50"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/priced/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(2)))
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 10);
    config.crawler.on_malformed = MalformedPolicy::Skip;

    let mut sink = MemorySink::default();
    let stats = run_crawl(config, &mut sink).await.unwrap();

    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0].title, "Priced");
    assert_eq!(stats.malformed_skipped, 1);
    assert_eq!(stats.records_exported, 1);
}

#[tokio::test]
async fn test_robots_probe_does_not_gate_crawl() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 1, 1).await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 10);
    config.crawler.probe_robots = true;

    let mut coordinator = Coordinator::new(config).unwrap();
    let records = coordinator.run().await.unwrap();
    assert_eq!(records.len(), 1);

    let probe = coordinator.robots().expect("robots.txt was served");
    assert_eq!(probe.status_code, 200);
    assert!(!probe.start_allowed);
}

#[tokio::test]
async fn test_csv_export_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 2, 2).await;

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("output/books.csv");

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 3);
    config.output.csv_path = csv_path.display().to_string();
    config.output.write_bom = false;

    let stats = shelf_crawler::crawler::crawl(config).await.unwrap();
    assert_eq!(stats.records_exported, 3);

    let text = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "title,price,rating,stock,available_quantity,product_page_url,image_url"
    );
    assert_eq!(
        lines[3],
        format!(
            "Book 2-1,10,Four,In stock,1,{0}/catalogue/item-2-1/index.html,{0}/media/item-2-1/index.html.jpg",
            mock_server.uri()
        )
    );
}

#[tokio::test]
async fn test_timed_out_request_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Slow", "slow/index.html", "5.00")],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/slow/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(5)))
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 10);
    config.fetch.request_timeout_secs = 1;

    let records = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].available_quantity, Some(5));
}

#[tokio::test]
async fn test_refused_connection_exhausts_attempts() {
    // Bind and release a port so nothing is listening on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let start = format!("http://127.0.0.1:{}/catalogue/page-1.html", port);
    let mut config = create_test_config(start.clone(), 10);
    config.fetch.max_attempts = 3;

    let mut sink = MemorySink::default();
    match run_crawl(config, &mut sink).await {
        Err(CrawlError::FetchExhausted { url, attempts }) => {
            assert_eq!(url, start);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected FetchExhausted, got {other:?}"),
    }
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn test_retry_delay_between_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 10);
    config.fetch.max_attempts = 3;
    config.fetch.retry_delay_ms = 150;

    let began = Instant::now();
    let result = Coordinator::new(config).unwrap().run().await;
    let elapsed = began.elapsed();

    assert!(matches!(
        result,
        Err(CrawlError::FetchExhausted { attempts: 3, .. })
    ));
    // Two pauses between three attempts
    assert!(elapsed >= Duration::from_millis(300), "took {elapsed:?}");
}

#[tokio::test]
async fn test_page_delay_between_list_pages() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 3, 1).await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut config = create_test_config(start, 10);
    config.crawler.page_delay_ms = 200;

    let began = Instant::now();
    let records = Coordinator::new(config).unwrap().run().await.unwrap();
    let elapsed = began.elapsed();

    assert_eq!(records.len(), 3);
    assert_eq!(list_page_requests(&mock_server).await, 3);
    // One pause between each pair of pages
    assert!(elapsed >= Duration::from_millis(400), "took {elapsed:?}");
}

#[tokio::test]
async fn test_pagination_cycle_stops_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("First", "first/index.html", "1.00")],
            Some("page-2.html"),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The last page links back to the first one
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(
            &[entry_html("Second", "second/index.html", "2.00")],
            Some("page-1.html"),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/(first|second)/index\.html$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(1)))
        .mount(&mock_server)
        .await;

    let start = format!("{}/catalogue/page-1.html", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(start, 100)).unwrap();
    let records = coordinator.run().await.unwrap();

    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second"]);
    assert_eq!(coordinator.statistics().pages_fetched, 2);
}
