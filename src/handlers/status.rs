//! Status and health check handlers.
//!
//! - `/health` - liveness, always healthy while the process answers
//! - `/ready` - readiness, requires the model endpoint to have the model
//! - `/status` - runtime metrics
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──> Axum Router ──> status_handler ──> AppState
//!                                        │                │
//!                                        ▼                ▼
//!                              StatusResponse    LatencyHistogram
//!                                        │     + Counters + History
//!                                        ▼
//!                                   JSON Response
//! ```
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "uptime_seconds": 3600,
//!   "model": "llama3.2:1b",
//!   "scrapes": { "total": 12, "successful": 11, "success_rate": 0.917, "average_time": 0.84 },
//!   "extractions": { "total": 9, "successful": 9, "success_rate": 1.0, "average_time": 6.2 },
//!   "latency": { "p50_ms": 812.0, "p95_ms": 7200.0, "p99_ms": 9100.0 }
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::llm::ModelHealth;
use crate::service::{ExtractionResult, Pipeline, ScrapeResult};

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Activity records kept for `/api/history`
pub const HISTORY_CAPACITY: usize = 100;

// ============================================================================
// Response Types
// ============================================================================

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" while the process answers
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready"
    pub status: String,
    pub model: String,
    pub endpoint: ModelHealth,
}

/// Totals for one kind of operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub total: u64,
    pub successful: u64,
    /// successful / total, 0 when nothing ran
    pub success_rate: f64,
    /// Mean wall time in seconds
    pub average_time: f64,
}

/// Detailed runtime status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub name: String,
    pub uptime_seconds: u64,
    /// Model used for extraction
    pub model: String,
    pub scrapes: OperationStats,
    pub extractions: OperationStats,
    /// API requests answered
    pub total_requests: u64,
    /// API requests that ended in a failed result
    pub errors: u64,
    pub memory: MemoryMetrics,
    pub latency: LatencyMetrics,
    /// "running" while the process answers
    pub status: String,
    /// RFC 3339 time the status was generated
    pub timestamp: String,
}

/// Process memory from sysinfo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Resident set size in bytes
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

/// Request latency percentiles in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub total_requests: u64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe latency histogram.
///
/// Tracks 1 microsecond to 10 minutes with 3 significant figures; model
/// calls on a local CPU can take minutes.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, 600_000_000, 3).expect("static histogram bounds");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a latency in microseconds; out-of-range values are clamped
    pub fn record(&self, latency_us: u64) {
        let mut hist = self.inner.write();
        hist.saturating_record(latency_us.max(1));
    }

    /// Record a duration
    pub fn record_duration(&self, duration: Duration) {
        self.record(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX));
    }

    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Snapshot in milliseconds
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1000.0,
            total_requests: hist.len(),
            mean_ms: hist.mean() / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Activity History
// ============================================================================

/// What an activity record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Scrape,
    Extract,
    ScrapeExtract,
    Batch,
}

/// One served request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub kind: ActivityKind,
    /// URL, or a short description for text input
    pub target: String,
    pub success: bool,
    /// Seconds
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(kind: ActivityKind, target: impl Into<String>, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target: target.into(),
            success,
            processing_time: 0.0,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_time(mut self, secs: f64) -> Self {
        self.processing_time = secs;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Debug, Default)]
struct OperationCounters {
    total: AtomicU64,
    successful: AtomicU64,
    time_us: AtomicU64,
}

impl OperationCounters {
    fn record(&self, success: bool, secs: f64) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        }
        self.time_us
            .fetch_add((secs.max(0.0) * 1_000_000.0) as u64, Ordering::Relaxed);
    }

    fn stats(&self) -> OperationStats {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let time_us = self.time_us.load(Ordering::Relaxed);
        if total == 0 {
            return OperationStats::default();
        }
        OperationStats {
            total,
            successful,
            success_rate: successful as f64 / total as f64,
            average_time: time_us as f64 / total as f64 / 1_000_000.0,
        }
    }
}

/// Shared server state: the services plus counters and history.
///
/// Counters are atomics; the histogram and the history ring sit behind
/// `RwLock`s.
pub struct AppState {
    start_time: Instant,
    pipeline: Pipeline,
    max_concurrent: usize,
    scrapes: OperationCounters,
    extractions: OperationCounters,
    latency_histogram: LatencyHistogram,
    total_requests: AtomicU64,
    error_count: AtomicU64,
    history: RwLock<VecDeque<ActivityRecord>>,
}

impl AppState {
    /// State around `pipeline`; batches run at most `max_concurrent` scrapes
    /// at once unless the request asks for fewer
    pub fn new(pipeline: Pipeline, max_concurrent: usize) -> Self {
        Self {
            start_time: Instant::now(),
            pipeline,
            max_concurrent: max_concurrent.max(1),
            scrapes: OperationCounters::default(),
            extractions: OperationCounters::default(),
            latency_histogram: LatencyHistogram::new(),
            total_requests: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[inline]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count a scrape outcome
    pub fn record_scrape(&self, result: &ScrapeResult) {
        self.scrapes.record(result.success, result.processing_time);
    }

    /// Count an extraction outcome
    pub fn record_extraction(&self, result: &ExtractionResult) {
        self.extractions.record(result.success, result.processing_time);
    }

    pub fn scrape_stats(&self) -> OperationStats {
        self.scrapes.stats()
    }

    pub fn extraction_stats(&self) -> OperationStats {
        self.extractions.stats()
    }

    /// Record one answered API request
    pub fn record_request(&self, elapsed: Duration, success: bool) {
        self.latency_histogram.record_duration(elapsed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }

    /// Append to the history ring, evicting the oldest record when full
    pub fn push_activity(&self, record: ActivityRecord) {
        let mut history = self.history.write();
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Up to `limit` records, newest first
    pub fn history(&self, limit: usize) -> Vec<ActivityRecord> {
        self.history.read().iter().rev().take(limit).cloned().collect()
    }
}

// ============================================================================
// System Metrics Collection
// ============================================================================

fn collect_memory_metrics() -> MemoryMetrics {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match system.process(pid) {
        Some(process) => MemoryMetrics {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        },
        None => {
            debug!("Could not find current process in sysinfo");
            MemoryMetrics::default()
        }
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Liveness
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// Runtime status
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Status check requested");

    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        model: state.pipeline().extraction().model_name().to_string(),
        scrapes: state.scrape_stats(),
        extractions: state.extraction_stats(),
        total_requests: state.total_requests(),
        errors: state.error_count(),
        memory: collect_memory_metrics(),
        latency: state.latency_metrics(),
        status: "running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness: 200 when the model is installed, 503 otherwise
#[instrument(skip_all)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let extraction = state.pipeline().extraction();
    let endpoint = extraction.model_health().await;
    let ready = endpoint == ModelHealth::Available;
    debug!("Readiness check: {:?}", endpoint);

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        model: extraction.model_name().to_string(),
        endpoint,
    };
    (code, Json(body))
}

// ============================================================================
// Router Setup
// ============================================================================

/// `/health`, `/status` and `/ready`
pub fn status_routes() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/ready", get(readiness_handler))
}

// ============================================================================
// Tests
// ============================================================================
