//! Headless Browser Rendering
//!
//! Loads one URL in a throwaway headless Chrome and returns the serialized
//! DOM once the page looks rendered:
//! - DOMContentLoaded milestone (90s bound)
//! - `<body>` present (30s bound)
//! - settle interval for client-side rendering (5s bound by default)
//!
//! Uses chromiumoxide over CDP. A browser process is launched and torn down
//! per call; nothing is shared between renders.

pub mod readiness;
pub mod session;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::RenderError;

pub use readiness::{ReadinessPolicy, SettleStrategy, BODY_TIMEOUT, NAVIGATION_TIMEOUT};
pub use session::ChromiumRenderer;

/// Something that can turn a URL into rendered HTML
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Browser configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Browser executable path (auto-detect if None)
    pub chrome_path: Option<PathBuf>,
    /// Enable headless mode
    pub headless: bool,
    /// Keep Chrome's sandbox enabled
    pub sandbox: bool,
    /// Default viewport width
    pub viewport_width: u32,
    /// Default viewport height
    pub viewport_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// Parent of the throwaway per-render Chrome profiles
    pub profile_root: PathBuf,
    /// Navigation, body and settle timing
    pub readiness: ReadinessPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: false,
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: None,
            profile_root: std::env::temp_dir(),
            readiness: ReadinessPolicy::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settle_bound = match lookup("PAGE_DIGEST_SETTLE_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("PAGE_DIGEST_SETTLE_SECS must be whole seconds, got '{}'", raw)
            })?),
            None => defaults.readiness.settle.bound(),
        };

        let settle = match lookup("PAGE_DIGEST_SETTLE_MODE") {
            Some(mode) => SettleStrategy::from_mode(&mode, settle_bound).ok_or_else(|| {
                anyhow::anyhow!(
                    "PAGE_DIGEST_SETTLE_MODE must be 'quiescence' or 'fixed', got '{}'",
                    mode
                )
            })?,
            None => SettleStrategy::quiescence(settle_bound),
        };

        Ok(Self {
            chrome_path: lookup("CHROME_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            headless: lookup("BROWSER_HEADLESS")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(defaults.headless),
            sandbox: lookup("BROWSER_SANDBOX")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.sandbox),
            viewport_width: lookup("BROWSER_VIEWPORT_WIDTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.viewport_width),
            viewport_height: lookup("BROWSER_VIEWPORT_HEIGHT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.viewport_height),
            user_agent: lookup("BROWSER_USER_AGENT").filter(|s| !s.is_empty()),
            profile_root: defaults.profile_root,
            readiness: ReadinessPolicy {
                settle,
                ..defaults.readiness
            },
        })
    }

    /// Resolve the Chrome executable: explicit path first, then well-known locations.
    pub fn resolve_chrome(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.chrome_path {
            return Some(path.clone());
        }
        detect_chrome()
    }
}

/// Find an installed Chrome/Chromium in common locations
pub fn detect_chrome() -> Option<PathBuf> {
    let paths = [
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/local/bin/chromium",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    paths
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}
