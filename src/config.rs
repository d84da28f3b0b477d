//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

use crate::browser::RendererConfig;

/// File name of the default artifact slot
pub const DEFAULT_ARTIFACT_NAME: &str = "page_digest_page.html";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding persisted pages (`TMPDIR`, else a per-user fallback)
    pub artifact_dir: PathBuf,

    /// File name of the default slot inside `artifact_dir`
    pub artifact_name: String,

    /// Headless browser settings
    pub renderer: RendererConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let artifact_dir = lookup("TMPDIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| dirs::fallback_tmp_dir(&lookup));

        let artifact_name = lookup("PAGE_DIGEST_ARTIFACT_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string());

        if artifact_name.contains(['/', '\\']) {
            anyhow::bail!(
                "PAGE_DIGEST_ARTIFACT_NAME must be a bare file name, got '{}'",
                artifact_name
            );
        }

        let renderer = RendererConfig::from_lookup(&lookup)?;

        Ok(Self {
            artifact_dir,
            artifact_name,
            renderer,
        })
    }
}

// Platform-specific temp dir fallback
mod dirs {
    use std::path::PathBuf;

    pub fn fallback_tmp_dir<F>(lookup: &F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        home_dir(lookup)
            .map(|h| h.join("tmp"))
            .unwrap_or_else(|| PathBuf::from(".").join("tmp"))
    }

    fn home_dir<F>(lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        #[cfg(target_os = "windows")]
        {
            lookup("USERPROFILE").map(PathBuf::from)
        }

        #[cfg(not(target_os = "windows"))]
        {
            lookup("HOME").map(PathBuf::from)
        }
    }
}
