//! MCP Tool Registry
//!
//! The two tools exposed to callers:
//! - `fetch_page`: render a URL and persist the HTML
//! - `summarize_page`: extract the article text from the persisted HTML
//!
//! Neither tool raises to its caller. Every failure comes back as a
//! [`ToolOutput::Failure`] tagged with a [`FailureKind`].

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::artifact::ArtifactStore;
use crate::browser::{ChromiumRenderer, PageRenderer};
use crate::config::Config;
use crate::error::FailureKind;
use crate::extract;

/// Tool definition for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a tool definition with an empty object schema
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Add a string parameter
    pub fn with_string_param(mut self, name: &str, description: &str, required: bool) -> Self {
        self.input_schema["properties"][name] = json!({
            "type": "string",
            "description": description
        });
        if required {
            if let Some(list) = self.input_schema["required"].as_array_mut() {
                list.push(json!(name));
            }
        }
        self
    }
}

/// A failed tool call, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    #[serde(rename = "error")]
    pub message: String,
    /// Render as `{"error": ..., "kind": ...}` instead of the bare message
    #[serde(skip)]
    pub structured: bool,
}

/// Result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Success(String),
    Failure(ToolFailure),
}

impl ToolOutput {
    fn message(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutput::Failure(ToolFailure {
            kind,
            message: message.into(),
            structured: false,
        })
    }

    fn structured(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutput::Failure(ToolFailure {
            kind,
            message: message.into(),
            structured: true,
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ToolOutput::Success(_) => None,
            ToolOutput::Failure(f) => Some(f.kind),
        }
    }

    /// Text placed in the MCP `content` block
    pub fn text(&self) -> String {
        match self {
            ToolOutput::Success(text) => text.clone(),
            ToolOutput::Failure(f) if f.structured => json!(f).to_string(),
            ToolOutput::Failure(f) => f.message.clone(),
        }
    }
}

/// Tool registry with the fetch → persist → extract pipeline
pub struct ToolRegistry {
    renderer: Arc<dyn PageRenderer>,
    store: ArtifactStore,
}

impl ToolRegistry {
    /// Create a registry backed by headless Chrome
    pub fn new(config: &Config) -> Self {
        let renderer = Arc::new(ChromiumRenderer::new(config.renderer.clone()));
        let store = ArtifactStore::new(&config.artifact_dir, config.artifact_name.clone());
        Self::with_parts(renderer, store)
    }

    /// Create a registry from explicit parts
    pub fn with_parts(renderer: Arc<dyn PageRenderer>, store: ArtifactStore) -> Self {
        Self { renderer, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// List all tool definitions
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "fetch_page",
                "Render a web page in a headless browser and save its HTML for summarize_page. \
                 Returns a status message.",
            )
            .with_string_param("url", "URL of the page to fetch", true)
            .with_string_param(
                "key",
                "Optional correlation key; the page is also saved under this key",
                false,
            ),
            ToolDefinition::new(
                "summarize_page",
                "Extract the article text from the page saved by fetch_page.",
            )
            .with_string_param(
                "key",
                "Optional correlation key given to fetch_page; defaults to the last fetched page",
                false,
            ),
        ]
    }

    /// Call a tool by name. Only an unknown tool name is an `Err`.
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput> {
        info!("Tool call: {} with args: {}", name, args);
        let start = std::time::Instant::now();

        if !matches!(name, "fetch_page" | "summarize_page") {
            return Err(anyhow!("Unknown tool: {}", name));
        }

        let key = match optional_string(&args, "key") {
            Ok(key) => key,
            Err(output) => return Ok(output),
        };

        let output = if name == "fetch_page" {
            match args.get("url").and_then(Value::as_str) {
                Some(url) if !url.trim().is_empty() => self.fetch_page(url, key).await,
                _ => ToolOutput::message(
                    FailureKind::InvalidArguments,
                    "Error fetching page: missing 'url' argument",
                ),
            }
        } else {
            self.summarize_page(key).await
        };

        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(100) {
            info!("Tool {} completed in {}ms", name, elapsed.as_millis());
        }

        Ok(output)
    }

    /// Render `url` and persist it. Nothing is written unless the render
    /// succeeds; the default slot is written before the keyed one.
    pub async fn fetch_page(&self, url: &str, key: Option<&str>) -> ToolOutput {
        info!("Executing fetch_page for URL: {}", url);

        let html = match self.renderer.render(url).await {
            Ok(html) => html,
            Err(e) => {
                let message = format!("Error fetching page {}: {}", url, e);
                error!("{}", message);
                return ToolOutput::message(e.kind(), message);
            }
        };

        let path = match self.store.save(None, &html).await {
            Ok(path) => path,
            Err(e) => {
                let message = format!("Error fetching page {}: {}", url, e);
                error!("{}", message);
                return ToolOutput::message(FailureKind::Io, message);
            }
        };

        if let Some(key) = key {
            if let Err(e) = self.store.save(Some(key), &html).await {
                let message = format!(
                    "Error fetching page {}: {} (saved to {} only)",
                    url,
                    e,
                    path.display()
                );
                error!("{}", message);
                return ToolOutput::message(FailureKind::Io, message);
            }
        }

        info!("Successfully fetched and saved HTML to {}", path.display());
        ToolOutput::Success(format!(
            "HTML content for {} downloaded and saved successfully to {}.",
            url,
            path.display()
        ))
    }

    /// Extract the article from the persisted page.
    pub async fn summarize_page(&self, key: Option<&str>) -> ToolOutput {
        let location = self.store.location(key);
        info!("Executing summarize_page from file: {}", location.display());

        let artifact = match self.store.load(key).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                let message = format!(
                    "HTML file not found at {}. Please run fetch_page first.",
                    location.display()
                );
                warn!("{}", message);
                return ToolOutput::structured(FailureKind::ArtifactMissing, message);
            }
            Err(e) => {
                let message = format!("Error reading HTML: {}", e);
                error!("{}", message);
                return ToolOutput::structured(FailureKind::Io, message);
            }
        };

        match extract::extract(&artifact.html) {
            Ok(summary) => {
                info!("Successfully summarized the article: {}", summary.title);
                ToolOutput::Success(summary.body)
            }
            Err(e) => {
                let message = format!("Error parsing HTML: {}", e);
                error!("{}", message);
                ToolOutput::structured(FailureKind::Extraction, message)
            }
        }
    }
}

/// Read an optional string argument; a non-string value is a caller error.
fn optional_string<'a>(args: &'a Value, name: &str) -> std::result::Result<Option<&'a str>, ToolOutput> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolOutput::structured(
            FailureKind::InvalidArguments,
            format!("'{}' must be a string, got {}", name, other),
        )),
    }
}
