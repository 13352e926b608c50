//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small storefront and run the full
//! harvest cycle end-to-end: listing traversal, detail page extraction,
//! image downloads, the JSON Lines log and the CSV report.

use catalog_harvest::config::{Config, CrawlerConfig, DownloaderConfig, OutputConfig, UserAgentConfig};
use catalog_harvest::crawler::{discover_items, run_harvest, HarvestOptions, Stage};
use catalog_harvest::HarvestError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(listing_url: String, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            listing_url,
            item_path_prefix: "/product/".to_string(),
            rate_limit_seconds: 0.0,
            max_items: None,
            download_images: true,
            resume: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            log_path: dir.join("data/artworks.jsonl").to_string_lossy().into_owned(),
            report_path: dir.join("data/artworks.csv").to_string_lossy().into_owned(),
            image_dir: dir.join("images").to_string_lossy().into_owned(),
        },
        downloader: DownloaderConfig {
            max_retries: 2,
            backoff_seconds: 0.0,
            max_file_size_bytes: Some(1024),
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn product_page(base_url: &str, slug: &str, title: &str, price: &str) -> String {
    format!(
        r#"<html>
          <head><meta property="og:image" content="{base}/images/{slug}.jpg" /></head>
          <body>
            <h1>{title} (2024) Oil painting by Test Artist</h1>
            <span class="price">£{price}</span>
            <button>Add to Basket</button>
            <section>
              <h3>Original artwork description</h3>
              <p>A painting called {title}.</p>
            </section>
            <div class="product-attributes"><span>Size</span> 30 x 40 cm</div>
          </body>
        </html>"#,
        base = base_url,
        slug = slug,
        title = title,
        price = price
    )
}

/// Mounts a two-page listing with products a, b, c and a broken product
async fn mount_storefront(server: &MockServer) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/artist/test/"))
        .respond_with(html(
            r#"<html><body>
              <a href="/product/a/">A</a>
              <a href="/product/b/?ref=listing">B</a>
              <a href="/product/a/#details">A again</a>
              <nav class="pagination"><a href="/artist/test/page/2/">Next</a></nav>
            </body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/artist/test/page/2/"))
        .respond_with(html(
            r#"<html><body>
              <a href="/product/b/">B</a>
              <a href="/product/c/">C</a>
              <a href="/product/broken/">Broken</a>
              <nav class="pagination">
                <a href="/artist/test/">1</a>
                <a href="/artist/test/page/2/">2</a>
              </nav>
            </body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    for (slug, title, price) in [("a", "Alpha", "475"), ("b", "Bravo", "1,250"), ("c", "Charlie", "90")] {
        Mock::given(method("GET"))
            .and(path(format!("/product/{}/", slug)))
            .respond_with(html(product_page(&base_url, slug, title, price)))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/images/{}.jpg", slug)))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xFFu8, 0xD8, 0xFF], "image/jpeg"))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/product/broken/"))
        .respond_with(html("<html><body><h1>Nothing here</h1></body></html>".to_string()))
        .mount(server)
        .await;
}

fn read_log(config: &Config) -> Vec<serde_json::Value> {
    std::fs::read_to_string(&config.output.log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn read_report(config: &Config) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(&config.output.report_path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_full_harvest() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/artist/test/", server.uri()), dir.path());

    let result = run_harvest(&config, HarvestOptions::from_config(&config))
        .await
        .unwrap();

    let slugs: Vec<&str> = result.records.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "b", "c"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::Extract);
    assert!(result.errors[0].url.ends_with("/product/broken/"));

    let bravo = &result.records[1];
    assert_eq!(bravo.title, "Bravo");
    assert_eq!(bravo.price_gbp.as_deref(), Some("1250"));
    assert_eq!(bravo.size.as_deref(), Some("30 x 40 cm"));
    assert_eq!(bravo.description.as_deref(), Some("A painting called Bravo."));
    assert!(!bravo.sold);

    let image_path = bravo.image_path.as_deref().unwrap();
    assert!(image_path.ends_with("b.jpg"));
    assert_eq!(std::fs::read(image_path).unwrap(), vec![0xFFu8, 0xD8, 0xFF]);

    let log = read_log(&config);
    assert_eq!(log.len(), 3);
    assert_eq!(log[0]["slug"], "a");
    assert_eq!(log[2]["source_url"], format!("{}/product/c/", server.uri()));

    let report = read_report(&config);
    assert_eq!(report.len(), 4);
    assert_eq!(report[0][0], "image");
    assert_eq!(report[2][1], "Bravo");
    assert_eq!(report[2][5], "£1250");
}

#[tokio::test]
async fn test_resume_processes_only_new_items() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/artist/test/", server.uri()), dir.path());

    let log_path = Path::new(&config.output.log_path);
    std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    std::fs::write(
        log_path,
        format!(
            "{{\"slug\":\"a\",\"source_url\":\"{base}/product/a/\"}}\n\
             not json\n\
             {{\"source_url\":\"{base}/product/b/\"}}\n",
            base = server.uri()
        ),
    )
    .unwrap();

    let options = HarvestOptions {
        resume: true,
        download_images: false,
        ..HarvestOptions::default()
    };
    let result = run_harvest(&config, options).await.unwrap();

    let slugs: Vec<&str> = result.records.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["c"]);
    assert_eq!(result.skipped, 2);
    assert!(result.records[0].image_path.is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/product/a/"));
    assert!(!requests.iter().any(|r| r.url.path() == "/product/b/"));

    // Prior lines stay untouched; one line was appended
    let content = std::fs::read_to_string(log_path).unwrap();
    assert_eq!(content.lines().count(), 4);
}

#[tokio::test]
async fn test_max_items_bounds_successes() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/artist/test/", server.uri()), dir.path());

    let options = HarvestOptions {
        max_items: Some(2),
        download_images: false,
        ..HarvestOptions::default()
    };
    let result = run_harvest(&config, options).await.unwrap();

    assert_eq!(result.records.len(), 2);

    // The second listing page is never needed
    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/artist/test/page/2/"));
}

#[tokio::test]
async fn test_listing_failure_aborts_harvest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artist/test/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/artist/test/", server.uri()), dir.path());

    let result = run_harvest(&config, HarvestOptions::from_config(&config)).await;

    assert!(matches!(result, Err(HarvestError::Structural { .. })));
    assert!(!Path::new(&config.output.log_path).exists());
}

#[tokio::test]
async fn test_discover_items_walks_every_page() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/artist/test/", server.uri()), dir.path());

    let urls = discover_items(&config, None).await.unwrap();
    let paths: Vec<&str> = urls.iter().map(|u| u.path()).collect();
    assert_eq!(paths, vec!["/product/a/", "/product/b/", "/product/c/", "/product/broken/"]);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path().starts_with("/product/")));
}
