//! Instance Collector Service
//!
//! Runs each selected service to completion, writes its document, then
//! writes the run report and a metrics snapshot.

use chrono::{DateTime, Utc};
use domain_instances::{Aggregator, CollectionReport, Partition, ServiceKind, ServiceOutput};
use eyre::{eyre, Result, WrapErr};
use observability::CollectionMetrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::fetch::OfferFetcher;
use crate::pool::PoolSummary;
use crate::sources::{replay, SourceContext};

pub const REPORT_FILE: &str = "collection-report.json";
pub const METRICS_FILE: &str = "metrics.prom";

/// Services to run and local documents to replay instead of fetching
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub services: Vec<ServiceKind>,
    /// Replayed documents; they stand in for the global partition only
    pub inputs: BTreeMap<ServiceKind, PathBuf>,
    pub partitions: Vec<Partition>,
    /// Services named by `--input` but not selected
    pub ignored: Vec<ServiceKind>,
}

impl CollectRequest {
    /// Every known service, all fetched live
    pub fn all() -> Self {
        Self::for_services(ServiceKind::iter().collect())
    }

    fn for_services(services: Vec<ServiceKind>) -> Self {
        Self {
            services,
            inputs: BTreeMap::new(),
            partitions: vec![Partition::Global],
            ignored: Vec::new(),
        }
    }

    /// Adds the China partition for the services it publishes.
    pub fn with_china(mut self, china: bool) -> Self {
        if china && !self.partitions.contains(&Partition::China) {
            self.partitions.push(Partition::China);
        }
        self
    }

    /// `(partition, service)` pairs in run order
    pub fn runs(&self) -> Vec<(Partition, ServiceKind)> {
        self.partitions
            .iter()
            .flat_map(|&partition| {
                self.services
                    .iter()
                    .filter(move |&&service| partition.supports(service))
                    .map(move |&service| (partition, service))
            })
            .collect()
    }

    /// Builds a request from `--services` names and `--input service=path`
    /// pairs. No names selects every service.
    pub fn parse(services: Option<&[String]>, inputs: &[String]) -> Result<Self> {
        let mut request = match services {
            None => Self::all(),
            Some(names) => {
                let mut selected = Vec::new();
                for name in names {
                    let service = parse_service(name)?;
                    if !selected.contains(&service) {
                        selected.push(service);
                    }
                }
                Self::for_services(selected)
            }
        };

        for input in inputs {
            let (name, path) = input
                .split_once('=')
                .ok_or_else(|| eyre!("Invalid --input '{input}', expected <service>=<path>"))?;
            let service = parse_service(name)?;
            if !request.services.contains(&service) {
                if !request.ignored.contains(&service) {
                    request.ignored.push(service);
                }
                continue;
            }
            request.inputs.insert(service, PathBuf::from(path.trim()));
        }

        Ok(request)
    }
}

fn parse_service(name: &str) -> Result<ServiceKind> {
    ServiceKind::from_str(name.trim()).map_err(|_| {
        let known: Vec<String> = ServiceKind::iter().map(|service| service.to_string()).collect();
        eyre!("Unknown service '{name}', expected one of: {}", known.join(", "))
    })
}

/// Result of one service run
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub service: ServiceKind,
    pub partition: Partition,
    pub records: usize,
    pub output: PathBuf,
    pub duration_ms: u64,
    pub tasks: PoolSummary,
    pub report: CollectionReport,
}

/// Result of a collection run, written as the run report
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub services: Vec<ServiceSummary>,
}

impl CollectionSummary {
    pub fn failed_tasks(&self) -> usize {
        self.services.iter().map(|service| service.tasks.failed).sum()
    }

    pub fn records(&self) -> usize {
        self.services.iter().map(|service| service.records).sum()
    }
}

/// Main instance collector service
#[derive(Clone)]
pub struct InstanceCollector {
    config: Arc<Config>,
    fetcher: Arc<dyn OfferFetcher>,
}

impl InstanceCollector {
    pub fn new(config: Config, fetcher: Arc<dyn OfferFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
        }
    }

    /// Run a one-time collection.
    ///
    /// Fetch failures are counted, never fatal; the run fails only when a
    /// document cannot be written.
    pub async fn collect(&self, request: &CollectRequest) -> Result<CollectionSummary> {
        let start = Instant::now();
        let context = SourceContext::new(Arc::clone(&self.fetcher), Arc::clone(&self.config));
        let runs = request.runs();
        let mut services = Vec::with_capacity(runs.len());

        for (partition, service) in runs {
            let input = match partition {
                Partition::Global => request.inputs.get(&service),
                Partition::China => None,
            };
            services.push(self.collect_service(&context, service, partition, input).await?);
        }

        let summary = CollectionSummary {
            timestamp: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
            services,
        };

        self.write_report(&summary).await?;
        self.write_metrics_snapshot().await?;

        Ok(summary)
    }

    async fn collect_service(
        &self,
        context: &SourceContext,
        service: ServiceKind,
        partition: Partition,
        input: Option<&PathBuf>,
    ) -> Result<ServiceSummary> {
        let start = Instant::now();
        info!(service = %service, partition = %partition, "Starting service collection");

        let mut aggregator = Aggregator::for_partition(service, partition);
        let tasks = match input {
            Some(path) => replay(path, service, &mut aggregator).await,
            None => context.collect(service, &mut aggregator).await,
        };

        let ServiceOutput {
            records, report, ..
        } = aggregator.finish();
        let path = partition
            .output_path(service)
            .ok_or_else(|| eyre!("{service} is not published in the {partition} partition"))?;
        let output = self.config.output_dir.join(path);
        write_json(&output, &records).await?;

        let duration = start.elapsed();
        let name = match partition {
            Partition::Global => service.to_string(),
            _ => format!("{service}-{partition}"),
        };
        let reasons: Vec<(String, usize)> = report
            .skipped
            .iter()
            .map(|(reason, count)| (reason.to_string(), *count))
            .collect();
        CollectionMetrics::record_skipped(&name, reasons.iter().map(|(reason, count)| (reason.as_str(), *count)));
        CollectionMetrics::record_records_emitted(&name, records.len());
        CollectionMetrics::record_duration(&name, duration.as_secs_f64());

        if tasks.failed > 0 {
            warn!(
                service = %service,
                partition = %partition,
                failed = tasks.failed,
                succeeded = tasks.succeeded,
                "Service collected with failed tasks"
            );
        }
        info!(
            service = %service,
            partition = %partition,
            records = records.len(),
            skipped = report.total_skipped(),
            output = %output.display(),
            "Wrote service document"
        );

        Ok(ServiceSummary {
            service,
            partition,
            records: records.len(),
            output,
            duration_ms: duration.as_millis() as u64,
            tasks,
            report,
        })
    }

    async fn write_report(&self, summary: &CollectionSummary) -> Result<()> {
        let path = self.config.output_dir.join(REPORT_FILE);
        write_json(&path, summary).await
    }

    async fn write_metrics_snapshot(&self) -> Result<()> {
        let Some(snapshot) = observability::render_snapshot() else {
            return Ok(());
        };
        let path = self.config.output_dir.join(METRICS_FILE);
        tokio::fs::write(&path, snapshot)
            .await
            .wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    /// Run as a scheduled service
    pub async fn run_scheduled(&self, cron_expr: &str, request: CollectRequest) -> Result<()> {
        info!(cron = cron_expr, "Starting scheduled instance collection");

        let sched = JobScheduler::new().await?;

        let collector = self.clone();
        let request = Arc::new(request);

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let collector = collector.clone();
            let request = Arc::clone(&request);

            Box::pin(async move {
                info!("Running scheduled instance collection");

                match collector.collect(&request).await {
                    Ok(summary) => {
                        info!(
                            records = summary.records(),
                            failed_tasks = summary.failed_tasks(),
                            duration_ms = summary.duration_ms,
                            "Scheduled collection complete"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled collection failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler started, waiting for jobs...");
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
        }
    }
}

/// Pretty JSON at `path`, creating parent directories.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}
