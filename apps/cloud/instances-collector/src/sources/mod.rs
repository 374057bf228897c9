//! Vendor document sources.
//!
//! Each source fetches documents for one service and folds them into that
//! service's [`Aggregator`]. Fetching fans out through the [`FetchPool`];
//! folding happens on the caller's task, one document at a time.

pub mod aws;
pub mod azure;
pub mod ec2;

use domain_instances::{decode_json, Aggregator, OfferDocument, Partition, ServiceKind};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::fetch::{FetchError, OfferFetcher};
use crate::pool::{FetchPool, PoolSummary, TaskContext};

/// Shared handles for every source
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<dyn OfferFetcher>,
    pub pool: FetchPool,
    pub config: Arc<Config>,
}

impl SourceContext {
    pub fn new(fetcher: Arc<dyn OfferFetcher>, config: Arc<Config>) -> Self {
        Self {
            fetcher,
            pool: FetchPool::new(config.max_workers),
            config,
        }
    }

    /// Fetches every document for `service` in the aggregator's partition.
    /// Failures are recorded in the returned summary; whatever was folded
    /// before a failure stays in the aggregator.
    ///
    /// The China partition only has offer files and savings plans.
    pub async fn collect(&self, service: ServiceKind, aggregator: &mut Aggregator) -> PoolSummary {
        match (service, aggregator.partition()) {
            (ServiceKind::Azure, _) => azure::collect(self, aggregator).await,
            (ServiceKind::Ec2, Partition::Global) => {
                let mut summary = aws::collect(self, service, aggregator).await;
                summary.merge(ec2::collect_spot(self, aggregator).await);
                summary.merge(ec2::collect_dedicated(self, aggregator).await);
                summary.merge(ec2::collect_emr(self, aggregator).await);
                summary
            }
            _ => aws::collect(self, service, aggregator).await,
        }
    }
}

/// Folds a previously downloaded offer document instead of fetching live.
pub async fn replay(path: &Path, service: ServiceKind, aggregator: &mut Aggregator) -> PoolSummary {
    let mut summary = PoolSummary::default();
    let context = TaskContext::new(service, "replay");

    let result = match tokio::fs::read(path).await {
        Ok(bytes) => decode_json::<OfferDocument>(&bytes).map_err(|source| FetchError::Decode {
            url: path.display().to_string(),
            source,
        }),
        Err(source) => Err(FetchError::Io {
            path: path.display().to_string(),
            source,
        }),
    };

    match result {
        Ok(document) => {
            let written = aggregator.fold_offer(&document);
            info!(service = %service, path = %path.display(), tuples = written, "Replayed offer document");
            summary.succeeded += 1;
        }
        Err(error) => summary.record_failure(context, &error),
    }
    summary
}

/// `base` + `path`, tolerating a trailing or missing slash.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://pricing.us-east-1.amazonaws.com/", "/offers/v1.0/aws/index.json"),
            "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws/index.json"
        );
        assert_eq!(join_url("https://a", "b"), "https://a/b");
        assert_eq!(join_url("https://a", "https://b/c"), "https://b/c");
    }

    #[tokio::test]
    async fn test_replay_local_offer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let document = json!({
            "products": {
                "SKU1": {
                    "sku": "SKU1",
                    "productFamily": "Cache Instance",
                    "attributes": {"location": "EU (Ireland)", "instanceType": "cache.r5.large", "cacheEngine": "Redis"}
                }
            },
            "terms": {"OnDemand": {"SKU1": {"SKU1.T": {
                "sku": "SKU1",
                "priceDimensions": {"SKU1.T.D": {"unit": "Hrs", "description": "cache.r5.large hour", "pricePerUnit": {"USD": "0.216"}}},
                "termAttributes": {}
            }}}}
        });
        file.write_all(document.to_string().as_bytes()).unwrap();

        let mut aggregator = Aggregator::new(ServiceKind::Cache);
        let summary = replay(file.path(), ServiceKind::Cache, &mut aggregator).await;
        let output = aggregator.finish();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(output.records[0].instance_type(), "cache.r5.large");
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_a_failure() {
        let mut aggregator = Aggregator::new(ServiceKind::Rds);
        let summary = replay(Path::new("/nonexistent/offer.json"), ServiceKind::Rds, &mut aggregator).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].context.source, "replay");
    }
}
