//! Instances Collector
//!
//! A batch job that normalizes AWS and Azure instance pricing into one static
//! JSON document per service. Can run as a one-shot collection or as a
//! scheduled cron job.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use domain_instances::{Partition, ServiceKind};
use eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, warn};

mod collector;
mod config;
mod fetch;
mod pool;
mod sources;

use collector::{CollectRequest, InstanceCollector};
use config::Config;
use fetch::HttpFetcher;

#[derive(Parser)]
#[command(name = "instances-collector")]
#[command(about = "Normalize AWS and Azure instance pricing into static JSON documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-time collection
    Collect {
        /// Services to collect (ec2, rds, cache, opensearch, redshift, sagemaker, azure). Defaults to all.
        #[arg(short, long, value_delimiter = ',')]
        services: Option<Vec<String>>,

        /// Root of the generated JSON tree
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum concurrent fetches
        #[arg(short = 'w', long)]
        max_workers: Option<usize>,

        /// Replay a downloaded offer document instead of fetching (<service>=<path>)
        #[arg(short, long = "input", value_name = "SERVICE=PATH")]
        inputs: Vec<String>,

        /// Also collect the China partition (CNY prices)
        #[arg(long)]
        china: bool,

        /// Log per-record skips
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run as a scheduled service
    Schedule {
        /// Cron expression for scheduling (default: every 6 hours)
        #[arg(short, long, default_value = "0 0 */6 * * *")]
        cron: String,

        /// Services to collect on every run. Defaults to all.
        #[arg(short, long, value_delimiter = ',')]
        services: Option<Vec<String>>,

        /// Also collect the China partition (CNY prices)
        #[arg(long)]
        china: bool,
    },

    /// List known services and their output paths
    Services,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    if let Commands::Collect {
        output_dir,
        max_workers,
        verbose,
        ..
    } = &cli.command
    {
        if let Some(output_dir) = output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(max_workers) = max_workers {
            config.max_workers = (*max_workers).max(1);
        }
        config.verbose |= *verbose;
    }

    init_tracing(&config.environment, config.verbose);

    let request = match &cli.command {
        Commands::Collect {
            services,
            inputs,
            china,
            ..
        } => CollectRequest::parse(services.as_deref(), inputs)?.with_china(*china),
        Commands::Schedule { services, china, .. } => {
            CollectRequest::parse(services.as_deref(), &[])?.with_china(*china)
        }
        Commands::Services => {
            for service in ServiceKind::iter() {
                println!(
                    "{:<12} {:<28} {}",
                    service.to_string(),
                    service.output_path(),
                    Partition::China.output_path(service).unwrap_or("-")
                );
            }
            return Ok(());
        }
    };

    for service in &request.ignored {
        warn!(service = %service, "Ignoring input for a service that is not selected");
    }

    // Credentials are checked before any fetch starts
    config.validate_for(&request.services)?;

    if let Err(e) = observability::init_metrics() {
        warn!(error = %e, "Metrics recorder unavailable, skipping snapshot");
    }

    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout)?);
    let collector = InstanceCollector::new(config, fetcher);

    match cli.command {
        Commands::Collect { .. } => {
            info!(
                services = ?request.services,
                partitions = ?request.partitions,
                replayed = request.inputs.len(),
                "Starting one-time instance collection"
            );

            let summary = collector.collect(&request).await?;

            info!(
                "Collection complete: {} records across {} services, {} failed tasks, {} ms",
                summary.records(),
                summary.services.len(),
                summary.failed_tasks(),
                summary.duration_ms
            );
        }

        Commands::Schedule { cron, .. } => {
            info!("Starting scheduled collection with cron: {}", cron);
            collector.run_scheduled(&cron, request).await?;
        }

        Commands::Services => {}
    }

    Ok(())
}
