//! Per-call Chrome session
//!
//! Launch → navigate → wait → capture → teardown. Teardown runs on every
//! path once the browser process exists.

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::page::NavigateParams,
    handler::viewport::Viewport,
    Page,
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::readiness::{DomSample, QuiescenceTracker, SettleStrategy, DOM_SAMPLE_SCRIPT};
use super::{PageRenderer, RendererConfig};
use crate::error::RenderError;

const MILESTONE_POLL: Duration = Duration::from_millis(100);
const HANDLER_SHUTDOWN: Duration = Duration::from_secs(5);
const ERROR_TEXT_GRACE: Duration = Duration::from_secs(2);

const MILESTONE_SCRIPT: &str = "({ href: location.href, readyState: document.readyState })";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Milestone {
    href: String,
    ready_state: String,
}

#[derive(Debug, PartialEq, Eq)]
enum MilestoneState {
    Pending,
    /// The target document has been parsed (DOMContentLoaded)
    Ready,
    /// Chrome replaced the target with its own network error page
    ErrorPage,
}

impl Milestone {
    fn state(&self, url: &str) -> MilestoneState {
        if self.href.starts_with("chrome-error://") {
            return MilestoneState::ErrorPage;
        }
        // the old about:blank document can answer before the new one commits
        let committed = self.href != "about:blank" || url == "about:blank";
        if committed && self.ready_state != "loading" {
            MilestoneState::Ready
        } else {
            MilestoneState::Pending
        }
    }
}

/// Renders pages in a fresh headless Chrome per call
pub struct ChromiumRenderer {
    config: RendererConfig,
}

impl ChromiumRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .request_timeout(self.config.readiness.navigation_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });

        if self.config.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }

        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref user_agent) = self.config.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }

        if let Some(path) = self.config.resolve_chrome() {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(RenderError::Launch)
    }

    /// Everything between "page opened" and "HTML captured".
    async fn render_on(&self, page: &Page, url: &str) -> Result<String, RenderError> {
        let policy = &self.config.readiness;

        timeout(policy.navigation_timeout, navigate(page, url))
            .await
            .map_err(|_| RenderError::NavigationTimeout {
                url: url.to_string(),
                timeout: policy.navigation_timeout,
            })??;
        debug!(url, "DOMContentLoaded reached");

        timeout(policy.body_timeout, wait_for_body(page))
            .await
            .map_err(|_| RenderError::ReadinessTimeout(policy.body_timeout))??;

        settle(page, &policy.settle).await;

        Ok(page.content().await?)
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let profile_dir = self.config.profile_root.join(format!(
            "page-digest-chrome-{}",
            uuid::Uuid::new_v4()
        ));

        let config = self.browser_config(&profile_dir)?;

        info!(url, "Launching headless browser");
        let (mut browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile(&profile_dir).await;
                return Err(RenderError::Launch(e.to_string()));
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {e}");
                }
            }
        });

        let result = match browser.new_page("about:blank").await {
            Ok(page) => {
                let rendered = self.render_on(&page, url).await;
                if let Err(e) = page.close().await {
                    warn!("Failed to close page: {}", e);
                }
                rendered
            }
            Err(e) => Err(RenderError::from(e)),
        };

        teardown(&mut browser, handler_task).await;
        remove_profile(&profile_dir).await;

        match &result {
            Ok(html) => info!(url, bytes = html.len(), "Rendered page"),
            Err(e) => warn!(url, "Render failed: {}", e),
        }

        result
    }
}

/// Navigate and wait for the DOM-construction milestone.
///
/// chromiumoxide resolves `Page.navigate` only once the `load` event fires,
/// so the command runs alongside a readyState poll and is dropped as soon as
/// the new document has parsed.
async fn navigate(page: &Page, url: &str) -> Result<(), RenderError> {
    let navigation = page.execute(NavigateParams::new(url));
    tokio::pin!(navigation);
    let mut navigation_done = false;

    loop {
        tokio::select! {
            response = &mut navigation, if !navigation_done => {
                navigation_done = true;
                let response = response.map_err(|e| navigation_error(url, e.to_string()))?;
                if let Some(reason) = response.result.error_text.clone() {
                    return Err(navigation_error(url, reason));
                }
            }
            _ = sleep(MILESTONE_POLL) => {
                let milestone = match read_milestone(page).await {
                    Ok(milestone) => milestone,
                    Err(e) => {
                        // the execution context is swapped while the new document commits
                        debug!("Milestone probe failed: {}", e);
                        continue;
                    }
                };
                match milestone.state(url) {
                    MilestoneState::Ready => return Ok(()),
                    MilestoneState::Pending => {}
                    MilestoneState::ErrorPage => {
                        let mut reason = None;
                        if !navigation_done {
                            if let Ok(Ok(response)) = timeout(ERROR_TEXT_GRACE, &mut navigation).await {
                                reason = response.result.error_text.clone();
                            }
                        }
                        return Err(navigation_error(
                            url,
                            reason.unwrap_or_else(|| format!("browser showed {}", milestone.href)),
                        ));
                    }
                }
            }
        }
    }
}

fn navigation_error(url: &str, reason: String) -> RenderError {
    RenderError::Navigation {
        url: url.to_string(),
        reason,
    }
}

async fn read_milestone(page: &Page) -> Result<Milestone, RenderError> {
    page.evaluate(MILESTONE_SCRIPT)
        .await?
        .into_value()
        .map_err(|e| RenderError::Session(e.to_string()))
}

async fn wait_for_body(page: &Page) -> Result<(), RenderError> {
    loop {
        match page.find_element("body").await {
            Ok(_) => return Ok(()),
            Err(e) => debug!("<body> not yet present: {}", e),
        }
        sleep(MILESTONE_POLL).await;
    }
}

/// Best-effort wait for client-side rendering. Never fails.
async fn settle(page: &Page, strategy: &SettleStrategy) {
    match strategy {
        SettleStrategy::Fixed(pause) => sleep(*pause).await,
        SettleStrategy::Quiescence {
            max_wait,
            poll_interval,
            stable_samples,
        } => {
            let mut tracker = QuiescenceTracker::new(*stable_samples);
            let outcome = timeout(*max_wait, async {
                loop {
                    match sample_dom(page).await {
                        Ok(sample) => {
                            if tracker.observe(sample) {
                                return;
                            }
                        }
                        Err(e) => debug!("DOM sample failed: {}", e),
                    }
                    sleep(*poll_interval).await;
                }
            })
            .await;

            match outcome {
                Ok(()) => debug!(last = ?tracker.last(), "Page quiescent"),
                Err(_) => debug!(last = ?tracker.last(), "Settle bound reached"),
            }
        }
    }
}

async fn sample_dom(page: &Page) -> Result<DomSample, RenderError> {
    page.evaluate(DOM_SAMPLE_SCRIPT)
        .await?
        .into_value()
        .map_err(|e| RenderError::Session(e.to_string()))
}

/// Close the browser, reap the process, and stop the handler task.
async fn teardown(browser: &mut Browser, mut handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {}", e);
    }
    if let Err(e) = browser.wait().await {
        warn!("Failed to wait for browser exit: {}", e);
    }
    if timeout(HANDLER_SHUTDOWN, &mut handler_task).await.is_err() {
        handler_task.abort();
    }
}

async fn remove_profile(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Failed to remove browser profile {}: {}", dir.display(), e);
        }
    }
}
