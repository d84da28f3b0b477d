//! Headless Chrome Renderer Tests
//!
//! Drives `ChromiumRenderer` against a local HTTP server. Skipped when no
//! Chrome/Chromium executable can be found (set CHROME_PATH to point at one).

use page_digest_mcp::{ChromiumRenderer, PageRenderer, RenderError, RendererConfig, SettleStrategy};
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const ARTICLE_PAGE: &str =
    "<html><body><article><h1>Rendered</h1><p>From the browser</p></article></body></html>";

/// `load` never fires: the image request is held open.
const STALLED_PAGE: &str = "<html><body><article><h1>Stalled</h1><p>DOM is ready</p>\
     <img src=\"/hang.png\"></article></body></html>";

const HANG: Duration = Duration::from_secs(120);

fn base_config() -> RendererConfig {
    RendererConfig::from_lookup(&|key: &str| std::env::var(key).ok())
        .unwrap_or_default()
}

fn chrome_available() -> bool {
    base_config().resolve_chrome().is_some()
}

/// Skip macro for tests that require Chrome
macro_rules! require_chrome {
    () => {
        if !chrome_available() {
            eprintln!("Skipping test: Chrome/Chromium not available");
            return;
        }
    };
}

fn create_renderer(profile_root: &Path) -> ChromiumRenderer {
    let mut config = base_config();
    config.profile_root = profile_root.to_path_buf();
    config.readiness.navigation_timeout = Duration::from_secs(30);
    config.readiness.body_timeout = Duration::from_secs(10);
    config.readiness.settle = SettleStrategy::Fixed(Duration::from_millis(200));
    ChromiumRenderer::new(config)
}

fn leftover_profiles(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("page-digest-chrome-"))
        .collect()
}

/// Minimal HTTP server: `/slow` serves the stalled page, `/hang.png` never
/// answers, anything else serves the article page.
async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let body = match path.as_str() {
                    "/hang.png" => {
                        tokio::time::sleep(HANG).await;
                        return;
                    }
                    "/slow" => STALLED_PAGE,
                    _ => ARTICLE_PAGE,
                };

                let response = format!(
                    "HTTP/1.1 200 OK\r\n\
                     Content-Type: text/html\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\
                     \r\n\
                     {}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_render_returns_article_markup() {
    require_chrome!();
    let profiles = TempDir::new().unwrap();
    let addr = start_server().await;
    let renderer = create_renderer(profiles.path());

    let html = renderer
        .render(&format!("http://{}/post", addr))
        .await
        .expect("render local page");

    assert!(html.contains("<article>"));
    assert!(html.contains("<h1>Rendered</h1>"));
    assert!(leftover_profiles(profiles.path()).is_empty());
}

#[tokio::test]
async fn test_render_data_url() {
    require_chrome!();
    let profiles = TempDir::new().unwrap();
    let renderer = create_renderer(profiles.path());

    let html = renderer
        .render("data:text/html,<article><h1>Inline</h1><p>Data</p></article>")
        .await
        .expect("render data url");

    assert!(html.contains("<h1>Inline</h1>"));
}

#[tokio::test]
async fn test_unreachable_url_is_navigation_error() {
    require_chrome!();
    let profiles = TempDir::new().unwrap();
    let renderer = create_renderer(profiles.path());

    // nothing listens on port 1
    let result = renderer.render("http://127.0.0.1:1/").await;

    match result {
        Err(RenderError::Navigation { url, .. }) => assert_eq!(url, "http://127.0.0.1:1/"),
        other => panic!("expected navigation error, got {:?}", other.map(|h| h.len())),
    }
}

#[tokio::test]
async fn test_failed_render_releases_browser_profile() {
    require_chrome!();
    let profiles = TempDir::new().unwrap();
    let renderer = create_renderer(profiles.path());

    assert!(renderer.render("http://127.0.0.1:1/").await.is_err());
    assert!(leftover_profiles(profiles.path()).is_empty());
}

#[tokio::test]
async fn test_stalled_subresource_does_not_block_render() {
    require_chrome!();
    let profiles = TempDir::new().unwrap();
    let addr = start_server().await;
    let renderer = create_renderer(profiles.path());

    let start = Instant::now();
    let html = renderer
        .render(&format!("http://{}/slow", addr))
        .await
        .expect("DOM is ready even though load never fires");

    assert!(html.contains("<h1>Stalled</h1>"));
    // well inside the navigation bound, which full `load` would have hit
    assert!(start.elapsed() < Duration::from_secs(25));
    assert!(leftover_profiles(profiles.path()).is_empty());
}
