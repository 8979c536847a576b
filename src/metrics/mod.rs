//! Prometheus metrics for the pool and the read-through cache
//!
//! This module provides metrics tracking for:
//! - Resource pool: acquisitions, wait timeouts, handle creation and replacement
//! - Refresh cycles: inserted, duplicate and failed candidates, fetch failures
//! - View counting: dispatched, dropped and failed increments
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for resource pool metrics
struct PoolMetrics {
    acquisitions: CounterVec,
    acquire_timeouts: Counter,
    handles_created: Counter,
    handles_replaced: Counter,
    handles_closed: Counter,
    idle_handles: Gauge,
}

/// Container for cache refresh and view metrics
struct CacheMetrics {
    refresh_cycles: CounterVec,
    candidates: CounterVec,
    fetch_failures: Counter,
    views: CounterVec,
}

/// Global storage for pool metrics
static POOL_METRICS: OnceLock<PoolMetrics> = OnceLock::new();

/// Global storage for cache metrics
static CACHE_METRICS: OnceLock<CacheMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let pool = PoolMetrics {
        acquisitions: register_counter_vec!(
            "flashnews_pool_acquisitions_total",
            "Handles handed out by the pool, by origin",
            &["origin"]
        )?,
        acquire_timeouts: register_counter!(
            "flashnews_pool_acquire_timeouts_total",
            "Waits for an idle handle that timed out"
        )?,
        handles_created: register_counter!(
            "flashnews_pool_handles_created_total",
            "Handles opened against the backing store"
        )?,
        handles_replaced: register_counter!(
            "flashnews_pool_handles_replaced_total",
            "Dead pooled handles replaced on acquire"
        )?,
        handles_closed: register_counter!(
            "flashnews_pool_handles_closed_total",
            "Handles closed by release or shutdown"
        )?,
        idle_handles: register_gauge!(
            "flashnews_pool_idle_handles",
            "Handles currently idle in the pool"
        )?,
    };

    let cache = CacheMetrics {
        refresh_cycles: register_counter_vec!(
            "flashnews_refresh_cycles_total",
            "Refresh cycles by trigger",
            &["trigger"]
        )?,
        candidates: register_counter_vec!(
            "flashnews_refresh_candidates_total",
            "Fetched candidates by outcome",
            &["outcome"]
        )?,
        fetch_failures: register_counter!(
            "flashnews_fetch_failures_total",
            "External provider calls that failed"
        )?,
        views: register_counter_vec!(
            "flashnews_view_increments_total",
            "View-count increments by outcome",
            &["outcome"]
        )?,
    };

    POOL_METRICS
        .set(pool)
        .map_err(|_| "Pool metrics already initialized")?;
    CACHE_METRICS
        .set(cache)
        .map_err(|_| "Cache metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    POOL_METRICS.get().is_some() && CACHE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Where an acquired handle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOrigin {
    /// Taken from the idle set
    Pooled,
    /// Opened directly after a wait timeout or an empty idle set
    Overflow,
    /// Opened to replace a dead pooled handle
    Replacement,
}

impl AcquireOrigin {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pooled => "pooled",
            Self::Overflow => "overflow",
            Self::Replacement => "replacement",
        }
    }
}

/// Record a handle handed out by the pool
pub fn record_acquire(origin: AcquireOrigin) {
    let Some(m) = POOL_METRICS.get() else {
        return;
    };

    m.acquisitions.with_label_values(&[origin.as_str()]).inc();
    if origin == AcquireOrigin::Replacement {
        m.handles_replaced.inc();
    }
}

/// Record a timed-out wait for an idle handle
pub fn record_acquire_timeout() {
    if let Some(m) = POOL_METRICS.get() {
        m.acquire_timeouts.inc();
    }
}

/// Record a newly opened handle
pub fn record_handle_created() {
    if let Some(m) = POOL_METRICS.get() {
        m.handles_created.inc();
    }
}

/// Record a closed handle
pub fn record_handle_closed() {
    if let Some(m) = POOL_METRICS.get() {
        m.handles_closed.inc();
    }
}

/// Update the idle handle gauge
pub fn update_idle_handles(idle: usize) {
    if let Some(m) = POOL_METRICS.get() {
        m.idle_handles.set(idle as f64);
    }
}

/// Record a refresh cycle and its per-candidate outcomes
pub fn record_refresh(trigger: &str, inserted: usize, duplicates: usize, failed: usize) {
    let Some(m) = CACHE_METRICS.get() else {
        return;
    };

    m.refresh_cycles.with_label_values(&[trigger]).inc();

    if inserted > 0 {
        m.candidates
            .with_label_values(&["inserted"])
            .inc_by(inserted as f64);
    }
    if duplicates > 0 {
        m.candidates
            .with_label_values(&["duplicate"])
            .inc_by(duplicates as f64);
    }
    if failed > 0 {
        m.candidates
            .with_label_values(&["failed"])
            .inc_by(failed as f64);
    }
}

/// Record a failed call to the external provider
pub fn record_fetch_failure() {
    if let Some(m) = CACHE_METRICS.get() {
        m.fetch_failures.inc();
    }
}

/// Record a view-count increment outcome (`dispatched`, `dropped`, `applied`, `failed`)
pub fn record_view(outcome: &str) {
    if let Some(m) = CACHE_METRICS.get() {
        m.views.with_label_values(&[outcome]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
