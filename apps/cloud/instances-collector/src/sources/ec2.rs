//! EC2-only feeds: spot prices, dedicated hosts, EMR surcharges.

use domain_instances::dedicated::{RESERVED_PAYMENTS, RESERVED_TERMS};
use domain_instances::{Aggregator, DedicatedHostDocument, EmrPriceDocument, ServiceKind, SpotFeed};
use std::sync::Arc;
use tracing::info;

use super::{join_url, SourceContext};
use crate::fetch::fetch_document;
use crate::pool::{PoolSummary, TaskContext};

const ON_DEMAND_HOSTS_PATH: &str = "dedicatedhost-ondemand.json";
const RESERVED_HOSTS_PATH: &str = "dedicatedhost-reservedinstance-virtual";

pub async fn collect_spot(context: &SourceContext, aggregator: &mut Aggregator) -> PoolSummary {
    let fetcher = Arc::clone(&context.fetcher);
    let url = context.config.aws.spot_feed_url.clone();
    let task = async move { fetch_document::<SpotFeed>(fetcher.as_ref(), &url, None).await };

    context
        .pool
        .run(vec![(TaskContext::new(ServiceKind::Ec2, "spot"), task)], |task, feed| {
            let written = aggregator.fold_spot(&feed);
            info!(task = %task, regions = feed.config.regions.len(), tuples = written, "Folded spot feed");
        })
        .await
}

/// EMR prices attach to instances from the offer files, so this runs after
/// them.
pub async fn collect_emr(context: &SourceContext, aggregator: &mut Aggregator) -> PoolSummary {
    let fetcher = Arc::clone(&context.fetcher);
    let url = context.config.aws.emr_pricing_url.clone();
    let task = async move { fetch_document::<EmrPriceDocument>(fetcher.as_ref(), &url, None).await };

    context
        .pool
        .run(vec![(TaskContext::new(ServiceKind::Ec2, "emr"), task)], |task, document| {
            let written = aggregator.fold_emr(&document);
            info!(task = %task, regions = document.regions.len(), tuples = written, "Folded EMR prices");
        })
        .await
}

/// Reserved host feed path for one location, lease and payment option.
/// Every segment is percent-encoded (`EU (Ireland)` -> `EU%20%28Ireland%29`).
pub fn reserved_hosts_url(base: &str, location: &str, term: &str, payment: &str) -> String {
    join_url(
        base,
        &format!(
            "{RESERVED_HOSTS_PATH}/{}/{}/{}/index.json",
            urlencoding::encode(location),
            urlencoding::encode(term),
            urlencoding::encode(payment)
        ),
    )
}

/// On-demand host prices first; their locations drive the reserved fan-out.
pub async fn collect_dedicated(context: &SourceContext, aggregator: &mut Aggregator) -> PoolSummary {
    let base = context.config.aws.dedicated_host_base_url.clone();

    let fetcher = Arc::clone(&context.fetcher);
    let url = join_url(&base, ON_DEMAND_HOSTS_PATH);
    let task = async move { fetch_document::<DedicatedHostDocument>(fetcher.as_ref(), &url, None).await };

    let mut locations = Vec::new();
    let mut summary = context
        .pool
        .run(
            vec![(TaskContext::new(ServiceKind::Ec2, "dedicated-ondemand"), task)],
            |task, document: DedicatedHostDocument| {
                let written = aggregator.fold_dedicated_on_demand(&document);
                info!(task = %task, tuples = written, "Folded on-demand dedicated hosts");
                locations.extend(document.locations().map(str::to_string));
            },
        )
        .await;

    let mut tasks = Vec::new();
    for location in &locations {
        for term in RESERVED_TERMS {
            for payment in RESERVED_PAYMENTS {
                let fetcher = Arc::clone(&context.fetcher);
                let url = reserved_hosts_url(&base, location, term, payment);
                let task = async move { fetch_document::<DedicatedHostDocument>(fetcher.as_ref(), &url, None).await };
                let task_context = TaskContext::new(ServiceKind::Ec2, "dedicated-reserved")
                    .region(location.as_str())
                    .term(*term, *payment);
                tasks.push((task_context, task));
            }
        }
    }

    info!(tasks = tasks.len(), "Fetching reserved dedicated host prices");

    summary.merge(
        context
            .pool
            .run(tasks, |_, document: DedicatedHostDocument| {
                aggregator.fold_dedicated_reserved(&document);
            })
            .await,
    );
    summary
}
