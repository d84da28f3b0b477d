//! Readiness heuristics
//!
//! A page counts as rendered after three stages: the DOM-construction
//! milestone, presence of `<body>`, and a settle interval for client-side
//! rendering. Only the settle stage is tunable, and only by the operator.

use serde::Deserialize;
use std::time::Duration;

/// Bound on navigation up to DOMContentLoaded
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(90);

/// Bound on waiting for `<body>` after navigation
pub const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default settle bound
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_STABLE_SAMPLES: u32 = 4;

/// JavaScript producing a [`DomSample`]
pub const DOM_SAMPLE_SCRIPT: &str = "({ \
    readyState: document.readyState, \
    nodeCount: document.getElementsByTagName('*').length, \
    resourceCount: performance.getEntriesByType('resource').length \
})";

/// How to wait for client-side rendering once `<body>` exists
#[derive(Debug, Clone, PartialEq)]
pub enum SettleStrategy {
    /// Pause unconditionally.
    Fixed(Duration),
    /// Poll DOM samples until they stop changing, up to `max_wait`.
    Quiescence {
        max_wait: Duration,
        poll_interval: Duration,
        stable_samples: u32,
    },
}

impl SettleStrategy {
    pub fn quiescence(max_wait: Duration) -> Self {
        SettleStrategy::Quiescence {
            max_wait,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stable_samples: DEFAULT_STABLE_SAMPLES,
        }
    }

    /// Upper bound on time spent settling
    pub fn bound(&self) -> Duration {
        match self {
            SettleStrategy::Fixed(d) => *d,
            SettleStrategy::Quiescence { max_wait, .. } => *max_wait,
        }
    }

    /// Parse `PAGE_DIGEST_SETTLE_MODE`-style names.
    pub fn from_mode(mode: &str, bound: Duration) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "fixed" | "sleep" => Some(SettleStrategy::Fixed(bound)),
            "quiescence" | "quiet" | "idle" => Some(SettleStrategy::quiescence(bound)),
            _ => None,
        }
    }
}

/// Timing policy for one render
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessPolicy {
    pub navigation_timeout: Duration,
    pub body_timeout: Duration,
    pub settle: SettleStrategy,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            navigation_timeout: NAVIGATION_TIMEOUT,
            body_timeout: BODY_TIMEOUT,
            settle: SettleStrategy::quiescence(DEFAULT_SETTLE),
        }
    }
}

/// Snapshot of observable page activity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSample {
    pub ready_state: String,
    pub node_count: u64,
    pub resource_count: u64,
}

impl DomSample {
    pub fn is_complete(&self) -> bool {
        self.ready_state == "complete"
    }
}

/// Decides when consecutive DOM samples have stopped changing.
#[derive(Debug)]
pub struct QuiescenceTracker {
    required: u32,
    stable: u32,
    last: Option<DomSample>,
}

impl QuiescenceTracker {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            stable: 0,
            last: None,
        }
    }

    /// Record a sample; returns true once the page looks settled.
    pub fn observe(&mut self, sample: DomSample) -> bool {
        let unchanged = self.last.as_ref() == Some(&sample);
        self.stable = if unchanged && sample.is_complete() {
            self.stable + 1
        } else {
            0
        };
        self.last = Some(sample);
        self.stable >= self.required
    }

    pub fn last(&self) -> Option<&DomSample> {
        self.last.as_ref()
    }
}
