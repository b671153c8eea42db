//! Metrics collection module
//!
//! Tracks how many fetches each flow issued, how they ended, and how long
//! they took.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Number of response times kept per flow
const LATENCY_WINDOW: usize = 100;

/// The two fetch flows of the results page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Text,
    Image,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

#[derive(Default)]
struct FlowCounters {
    issued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
    response_times: RwLock<VecDeque<u64>>,
}

/// Fetch metrics collector
#[derive(Default)]
pub struct Metrics {
    text: FlowCounters,
    image: FlowCounters,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    fn flow(&self, kind: FetchKind) -> &FlowCounters {
        match kind {
            FetchKind::Text => &self.text,
            FetchKind::Image => &self.image,
        }
    }

    /// Record a fetch being issued
    pub fn record_issued(&self, kind: FetchKind) {
        self.flow(kind).issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful fetch and its response time
    pub fn record_success(&self, kind: FetchKind, time_ms: u64) {
        let flow = self.flow(kind);
        flow.succeeded.fetch_add(1, Ordering::Relaxed);
        Self::push_time(flow, time_ms);
    }

    /// Record a failed fetch and its response time
    pub fn record_failure(&self, kind: FetchKind, time_ms: u64) {
        let flow = self.flow(kind);
        flow.failed.fetch_add(1, Ordering::Relaxed);
        Self::push_time(flow, time_ms);
    }

    /// Record a response dropped because a newer fetch superseded it
    pub fn record_stale(&self, kind: FetchKind) {
        self.flow(kind).stale.fetch_add(1, Ordering::Relaxed);
    }

    fn push_time(flow: &FlowCounters, time_ms: u64) {
        let mut times = match flow.response_times.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if times.len() >= LATENCY_WINDOW {
            times.pop_front();
        }
        times.push_back(time_ms);
    }

    /// Get average response time for a flow
    pub fn avg_response_time(&self, kind: FetchKind) -> Option<u64> {
        let times = match self.flow(kind).response_times.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }

    /// Snapshot of one flow's counters
    pub fn stats(&self, kind: FetchKind) -> FlowStats {
        let flow = self.flow(kind);
        FlowStats {
            kind,
            issued: flow.issued.load(Ordering::Relaxed),
            succeeded: flow.succeeded.load(Ordering::Relaxed),
            failed: flow.failed.load(Ordering::Relaxed),
            stale: flow.stale.load(Ordering::Relaxed),
            avg_response_time: self.avg_response_time(kind),
        }
    }
}

/// Statistics for a single fetch flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    pub kind: FetchKind,
    pub issued: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub stale: u64,
    pub avg_response_time: Option<u64>,
}

impl FlowStats {
    /// Share of settled fetches that succeeded, in percent
    pub fn reliability(&self) -> f64 {
        let settled = self.succeeded + self.failed;
        if settled == 0 {
            100.0
        } else {
            (self.succeeded as f64 / settled as f64) * 100.0
        }
    }
}
