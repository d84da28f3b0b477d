//! Error types
//!
//! One enum per pipeline stage. The tool façade folds all of them into a
//! [`FailureKind`] so callers can tell causes apart without parsing text.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while driving the headless browser.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {0:?} waiting for <body>")]
    ReadinessTimeout(Duration),

    #[error("browser session fault: {0}")]
    Session(String),
}

impl From<chromiumoxide::error::CdpError> for RenderError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        RenderError::Session(e.to_string())
    }
}

impl RenderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RenderError::NavigationTimeout { .. } | RenderError::Navigation { .. } => {
                FailureKind::Navigation
            }
            RenderError::ReadinessTimeout(_) => FailureKind::Readiness,
            RenderError::Launch(_) | RenderError::Session(_) => FailureKind::Browser,
        }
    }
}

/// Failures reading or writing a persisted page.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures locating content in a parsed document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no <{selector}> element found in document")]
    MissingContainer { selector: &'static str },

    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// Caller-visible failure category attached to every failed tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidArguments,
    Navigation,
    Readiness,
    Browser,
    ArtifactMissing,
    Extraction,
    Io,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::Navigation => "navigation",
            FailureKind::Readiness => "readiness",
            FailureKind::Browser => "browser",
            FailureKind::ArtifactMissing => "artifact_missing",
            FailureKind::Extraction => "extraction",
            FailureKind::Io => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_kinds() {
        let timeout = RenderError::NavigationTimeout {
            url: "https://example.com".to_string(),
            timeout: Duration::from_secs(90),
        };
        assert_eq!(timeout.kind(), FailureKind::Navigation);
        assert!(timeout.to_string().contains("https://example.com"));

        assert_eq!(
            RenderError::ReadinessTimeout(Duration::from_secs(30)).kind(),
            FailureKind::Readiness
        );
        assert_eq!(
            RenderError::Launch("no chrome".to_string()).kind(),
            FailureKind::Browser
        );
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::ArtifactMissing).unwrap();
        assert_eq!(json, "\"artifact_missing\"");
        assert_eq!(FailureKind::ArtifactMissing.as_str(), "artifact_missing");
    }
}
