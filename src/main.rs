//! Page Digest MCP Server - Entry Point
//!
//! Runs the MCP server over stdio. Logs go to stderr as JSON; stdout is the
//! protocol channel.

use page_digest_mcp::{Config, McpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Page Digest MCP Server v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: page-digest-mcp [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --help, -h         Show this help");
        println!();
        println!("Runs as an MCP server over stdio with tools fetch_page and summarize_page.");
        println!();
        println!("Environment variables:");
        println!("  TMPDIR                     Directory for saved pages (default: ~/tmp)");
        println!("  PAGE_DIGEST_ARTIFACT_NAME  Saved page file name (default: page_digest_page.html)");
        println!("  CHROME_PATH                Chrome/Chromium executable");
        println!("  BROWSER_HEADLESS           Headless mode (default: true)");
        println!("  BROWSER_SANDBOX            Keep Chrome sandbox (default: false)");
        println!("  BROWSER_USER_AGENT         User agent override");
        println!("  PAGE_DIGEST_SETTLE_MODE    quiescence | fixed (default: quiescence)");
        println!("  PAGE_DIGEST_SETTLE_SECS    Settle bound in seconds (default: 5)");
        println!("  RUST_LOG                   Log filter (default: info)");
        return Ok(());
    }

    // MCP mode - log to stderr as JSON
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .json()
        .init();

    info!("Page Digest MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Saving pages to {}",
        config.artifact_dir.join(&config.artifact_name).display()
    );

    let server = McpServer::new(&config);
    server.run().await?;

    Ok(())
}
