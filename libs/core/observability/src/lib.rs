//! Observability utilities for batch collection jobs.
//!
//! This crate provides:
//! - Prometheus metrics recording
//! - Collection metrics (tasks, skipped records, emitted records, duration)
//! - A text snapshot of every recorded metric, written next to job output
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_snapshot, CollectionMetrics};
//!
//! init_metrics()?;
//!
//! CollectionMetrics::record_task_started("ec2");
//! CollectionMetrics::record_task_succeeded("ec2");
//! CollectionMetrics::record_records_emitted("ec2", 812);
//!
//! std::fs::write("metrics.prom", render_snapshot().unwrap_or_default())?;
//! ```

pub mod collection;

pub use collection::CollectionMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Later calls return the handle installed by the first one. Fails when
/// another global recorder was installed outside this crate.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Prometheus text exposition of everything recorded so far.
pub fn render_snapshot() -> Option<String> {
    get_metrics_handle().map(PrometheusHandle::render)
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    describe_counter!(
        "collection_tasks_total",
        "Fetch tasks by service and status"
    );
    describe_counter!(
        "collection_skipped_records_total",
        "Records skipped during normalization by service and reason"
    );
    describe_gauge!(
        "collection_records_emitted",
        "Instance records written in the last run by service"
    );
    describe_histogram!(
        "collection_duration_seconds",
        "Wall time of one service collection"
    );
}
