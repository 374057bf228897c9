//! Metrics for instance pricing collection runs.

use metrics::{counter, gauge, histogram};

/// Collection metrics recorder
pub struct CollectionMetrics;

impl CollectionMetrics {
    // =========================================================================
    // Task Metrics
    // =========================================================================

    pub fn record_task_started(service: &str) {
        counter!("collection_tasks_total", "service" => service.to_string(), "status" => "started")
            .increment(1);
    }

    pub fn record_task_succeeded(service: &str) {
        counter!("collection_tasks_total", "service" => service.to_string(), "status" => "succeeded")
            .increment(1);
    }

    pub fn record_task_failed(service: &str) {
        counter!("collection_tasks_total", "service" => service.to_string(), "status" => "failed")
            .increment(1);
    }

    // =========================================================================
    // Output Metrics
    // =========================================================================

    /// Record skip counters for one service, one series per reason.
    pub fn record_skipped<'a>(service: &str, skipped: impl IntoIterator<Item = (&'a str, usize)>) {
        for (reason, count) in skipped {
            counter!(
                "collection_skipped_records_total",
                "service" => service.to_string(),
                "reason" => reason.to_string()
            )
            .increment(count as u64);
        }
    }

    pub fn record_records_emitted(service: &str, count: usize) {
        gauge!("collection_records_emitted", "service" => service.to_string()).set(count as f64);
    }

    pub fn record_duration(service: &str, duration_secs: f64) {
        histogram!("collection_duration_seconds", "service" => service.to_string())
            .record(duration_secs);

        tracing::debug!(
            service = service,
            duration_secs = duration_secs,
            "Recorded collection duration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            CollectionMetrics::record_task_started("ec2");
            CollectionMetrics::record_task_succeeded("ec2");
            CollectionMetrics::record_task_failed("ec2");
            CollectionMetrics::record_skipped("ec2", [("orphan_record", 3), ("unmapped_term", 1)]);
            CollectionMetrics::record_records_emitted("ec2", 812);
            CollectionMetrics::record_duration("ec2", 1.5);
        });

        let rendered = handle.render();
        assert!(rendered.contains("collection_tasks_total"));
        assert!(rendered.contains("status=\"failed\""));
        assert!(rendered.contains("reason=\"orphan_record\""));
        assert!(rendered.contains("collection_records_emitted{service=\"ec2\"} 812"));
        assert!(rendered.contains("collection_duration_seconds"));
    }
}
