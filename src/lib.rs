//! Page Digest MCP Server
//!
//! Model Context Protocol server exposing a two-step retrieval pipeline.
//!
//! # Tools
//!
//! - **fetch_page**: render a URL in headless Chrome and persist the HTML
//! - **summarize_page**: extract the `<article>` text from the persisted HTML
//!
//! # Architecture
//!
//! ```text
//! Caller ──► MCP Protocol ──► ToolRegistry ──► ChromiumRenderer (CDP)
//!              (stdio)             │
//!                                  ├── ArtifactStore ($TMPDIR/page_digest_page.html)
//!                                  └── Extractor (scraper)
//! ```
//!
//! The two calls are independent; the artifact file is the only state they
//! share.

pub mod artifact;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod mcp;
pub mod tools;

pub use artifact::{ArtifactStore, PageArtifact};
pub use browser::{ChromiumRenderer, PageRenderer, ReadinessPolicy, RendererConfig, SettleStrategy};
pub use config::Config;
pub use error::{ArtifactError, ExtractError, FailureKind, RenderError};
pub use extract::{extract, PageSummary};
pub use mcp::{McpRequest, McpResponse, McpServer};
pub use tools::{ToolDefinition, ToolFailure, ToolOutput, ToolRegistry};
