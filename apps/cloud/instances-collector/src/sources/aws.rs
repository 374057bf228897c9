//! AWS price list: offer index, per-region offer files, savings plans.

use domain_instances::{
    Aggregator, OfferDocument, OfferIndex, Partition, RegionIndex, SavingsPlanDocument,
    SavingsPlanRegionIndex, ServiceKind,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{join_url, SourceContext};
use crate::fetch::{fetch_document, FetchError, OfferFetcher};
use crate::pool::{PoolSummary, TaskContext};

/// Offer files first, then savings plans, which resolve against the SKUs
/// the offer files registered. The aggregator's partition picks the price
/// list host and index.
pub async fn collect(
    context: &SourceContext,
    service: ServiceKind,
    aggregator: &mut Aggregator,
) -> PoolSummary {
    let mut summary = PoolSummary::default();
    let partition = aggregator.partition();
    let base = context.config.aws.pricing_base(partition);

    let Some(offer_code) = service.offer_code() else {
        return summary;
    };

    let index_url = join_url(base, partition.offer_index_path());
    let index: OfferIndex = match fetch_document(context.fetcher.as_ref(), &index_url, None).await {
        Ok(index) => index,
        Err(error) => {
            summary.record_failure(TaskContext::new(service, "offer-index"), &error);
            return summary;
        }
    };

    let Some(entry) = index.offers.get(offer_code) else {
        summary.record_failure(
            TaskContext::new(service, "offer-index"),
            &FetchError::MissingIndex(offer_code.to_string()),
        );
        return summary;
    };

    match &entry.current_region_index_url {
        Some(path) => summary.merge(
            collect_offers(context, service, partition, &join_url(base, path), aggregator).await,
        ),
        None => summary.record_failure(
            TaskContext::new(service, "region-index"),
            &FetchError::MissingIndex(format!("{offer_code} region index")),
        ),
    }

    if let Some(path) = &entry.current_savings_plan_index_url {
        summary.merge(
            collect_savings_plans(context, service, partition, &join_url(base, path), aggregator)
                .await,
        );
    }

    summary
}

async fn collect_offers(
    context: &SourceContext,
    service: ServiceKind,
    partition: Partition,
    region_index_url: &str,
    aggregator: &mut Aggregator,
) -> PoolSummary {
    let base = context.config.aws.pricing_base(partition).to_string();
    let region_index: RegionIndex =
        match fetch_document(context.fetcher.as_ref(), region_index_url, None).await {
            Ok(index) => index,
            Err(error) => {
                let mut summary = PoolSummary::default();
                summary.record_failure(TaskContext::new(service, "region-index"), &error);
                return summary;
            }
        };

    let tasks: Vec<_> = region_index
        .regions
        .into_iter()
        .filter(|(region, _)| !partition.ignored_regions().contains(&region.as_str()))
        .map(|(region, entry)| {
            let fetcher = Arc::clone(&context.fetcher);
            let url = join_url(&base, &entry.current_version_url);
            let task = async move { fetch_offer(fetcher, url).await };
            (TaskContext::new(service, "offer").region(region), task)
        })
        .collect();

    info!(service = %service, partition = %partition, regions = tasks.len(), "Fetching regional offer files");

    context
        .pool
        .run(tasks, |task, document: OfferDocument| {
            let written = aggregator.fold_offer(&document);
            info!(task = %task, products = document.products.len(), tuples = written, "Folded offer file");
        })
        .await
}

async fn fetch_offer(fetcher: Arc<dyn OfferFetcher>, url: String) -> Result<OfferDocument, FetchError> {
    fetch_document(fetcher.as_ref(), &url, None).await
}

async fn collect_savings_plans(
    context: &SourceContext,
    service: ServiceKind,
    partition: Partition,
    savings_index_url: &str,
    aggregator: &mut Aggregator,
) -> PoolSummary {
    let base = context.config.aws.pricing_base(partition).to_string();
    let index: SavingsPlanRegionIndex =
        match fetch_document(context.fetcher.as_ref(), savings_index_url, None).await {
            Ok(index) => index,
            Err(error) => {
                warn!(service = %service, error = %error, "Savings plan index unavailable");
                let mut summary = PoolSummary::default();
                summary.record_failure(TaskContext::new(service, "savings-index"), &error);
                return summary;
            }
        };

    let tasks: Vec<_> = index
        .regions
        .into_iter()
        .filter(|entry| !partition.ignored_regions().contains(&entry.region_code.as_str()))
        .map(|entry| {
            let fetcher = Arc::clone(&context.fetcher);
            let url = join_url(&base, &entry.version_url);
            let task = async move { fetch_document::<SavingsPlanDocument>(fetcher.as_ref(), &url, None).await };
            (TaskContext::new(service, "savings-plan").region(entry.region_code), task)
        })
        .collect();

    context
        .pool
        .run(tasks, |task, document: SavingsPlanDocument| {
            let written = aggregator.fold_savings(&document);
            info!(task = %task, tuples = written, "Folded savings plan rates");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetch::MockOfferFetcher;
    use core_config::FromEnv;
    use serde_json::{json, Value};

    fn offer_file(region: &str, location: &str, price: &str) -> Value {
        let sku = format!("SKU-{region}");
        json!({
            "products": {
                sku.clone(): {
                    "sku": sku,
                    "productFamily": "Compute Instance",
                    "attributes": {
                        "location": location,
                        "locationType": "AWS Region",
                        "instanceType": "m5.large",
                        "tenancy": "Shared",
                        "capacitystatus": "Used",
                        "licenseModel": "No License required",
                        "operatingSystem": "Linux",
                        "preInstalledSw": "NA"
                    }
                }
            },
            "terms": {"OnDemand": {sku.clone(): {format!("{sku}.T"): {
                "sku": sku,
                "priceDimensions": {format!("{sku}.T.D"): {"unit": "Hrs", "description": "m5.large hour", "pricePerUnit": {"USD": price}}},
                "termAttributes": {}
            }}}}
        })
    }

    fn context(fetcher: MockOfferFetcher) -> SourceContext {
        let mut config = temp_env::with_var_unset("COLLECTOR_MAX_WORKERS", || Config::from_env().unwrap());
        config.aws.pricing_base_url = "https://pricing.test".to_string();
        config.aws.china_pricing_base_url = "https://pricing.test.cn".to_string();
        SourceContext::new(Arc::new(fetcher), Arc::new(config))
    }

    fn body(value: Value) -> Result<Vec<u8>, FetchError> {
        Ok(value.to_string().into_bytes())
    }

    #[tokio::test]
    async fn test_failed_region_does_not_block_others() {
        let mut fetcher = MockOfferFetcher::new();
        fetcher.expect_get().returning(|url, _| match url {
            "https://pricing.test/offers/v1.0/aws/index.json" => body(json!({
                "offers": {"AmazonEC2": {"currentRegionIndexUrl": "/offers/v1.0/aws/AmazonEC2/current/region_index.json"}}
            })),
            "https://pricing.test/offers/v1.0/aws/AmazonEC2/current/region_index.json" => body(json!({
                "regions": {
                    "us-east-1": {"regionCode": "us-east-1", "currentVersionUrl": "/ec2/us-east-1/index.json"},
                    "af-south-1": {"regionCode": "af-south-1", "currentVersionUrl": "/ec2/af-south-1/index.json"},
                    "eu-west-1": {"regionCode": "eu-west-1", "currentVersionUrl": "/ec2/eu-west-1/index.json"},
                    "cn-north-1-pkx-1": {"regionCode": "cn-north-1-pkx-1", "currentVersionUrl": "/ec2/pkx/index.json"}
                }
            })),
            "https://pricing.test/ec2/us-east-1/index.json" => body(offer_file("us-east-1", "US East (N. Virginia)", "0.096")),
            "https://pricing.test/ec2/eu-west-1/index.json" => body(offer_file("eu-west-1", "EU (Ireland)", "0.107")),
            other => Err(FetchError::Status { url: other.to_string(), status: 503 }),
        });

        let mut aggregator = Aggregator::new(ServiceKind::Ec2);
        let summary = collect(&context(fetcher), ServiceKind::Ec2, &mut aggregator).await;
        let output = aggregator.finish();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].context.region.as_deref(), Some("af-south-1"));

        let record = &output.records[0];
        assert!(record.platform("us-east-1", "linux").is_some());
        assert!(record.platform("eu-west-1", "linux").is_some());
        assert!(!record.pricing.contains_key("af-south-1"));
    }

    #[tokio::test]
    async fn test_missing_offer_code() {
        let mut fetcher = MockOfferFetcher::new();
        fetcher
            .expect_get()
            .times(1)
            .returning(|_, _| body(json!({"offers": {}})));

        let mut aggregator = Aggregator::new(ServiceKind::Redshift);
        let summary = collect(&context(fetcher), ServiceKind::Redshift, &mut aggregator).await;

        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].error.contains("AmazonRedshift"));
    }

    #[tokio::test]
    async fn test_savings_plans_follow_offers() {
        let mut fetcher = MockOfferFetcher::new();
        fetcher.expect_get().returning(|url, _| match url {
            "https://pricing.test/offers/v1.0/aws/index.json" => body(json!({
                "offers": {"AmazonEC2": {
                    "currentRegionIndexUrl": "/ec2/region_index.json",
                    "currentSavingsPlanIndexUrl": "/savings/region_index.json"
                }}
            })),
            "https://pricing.test/ec2/region_index.json" => body(json!({
                "regions": {"us-east-1": {"regionCode": "us-east-1", "currentVersionUrl": "/ec2/us-east-1/index.json"}}
            })),
            "https://pricing.test/ec2/us-east-1/index.json" => body(offer_file("us-east-1", "US East (N. Virginia)", "0.096")),
            "https://pricing.test/savings/region_index.json" => body(json!({
                "regions": [{"regionCode": "us-east-1", "versionUrl": "/savings/us-east-1/index.json"}]
            })),
            "https://pricing.test/savings/us-east-1/index.json" => body(json!({
                "products": [{"sku": "PLAN", "attributes": {"purchaseOption": "All Upfront", "purchaseTerm": "1yr"}}],
                "terms": {"savingsPlan": [{"sku": "PLAN", "rates": [
                    {"discountedSku": "SKU-us-east-1", "discountedRate": {"price": "0.058", "currency": "USD"}}
                ]}]}
            })),
            other => Err(FetchError::Status { url: other.to_string(), status: 404 }),
        });

        let mut aggregator = Aggregator::new(ServiceKind::Ec2);
        let summary = collect(&context(fetcher), ServiceKind::Ec2, &mut aggregator).await;
        let output = aggregator.finish();

        assert_eq!(summary.failed, 0);
        let pricing = output.records[0].platform("us-east-1", "linux").unwrap();
        assert_eq!(pricing.reserved["yrTerm1Savings.allUpfront"], 0.058);
    }

    #[tokio::test]
    async fn test_china_partition_uses_cn_index_and_cny() {
        let mut fetcher = MockOfferFetcher::new();
        fetcher.expect_get().returning(|url, _| match url {
            "https://pricing.test.cn/offers/v1.0/cn/index.json" => body(json!({
                "offers": {"AmazonEC2": {
                    "currentRegionIndexUrl": "/offers/v1.0/cn/AmazonEC2/current/region_index.json",
                    "currentSavingsPlanIndexUrl": "/savings/cn/region_index.json"
                }}
            })),
            "https://pricing.test.cn/offers/v1.0/cn/AmazonEC2/current/region_index.json" => body(json!({
                "regions": {
                    "cn-north-1": {"regionCode": "cn-north-1", "currentVersionUrl": "/ec2/cn-north-1/index.json"},
                    "aws-cn-other": {"regionCode": "aws-cn-other", "currentVersionUrl": "/ec2/other/index.json"}
                }
            })),
            "https://pricing.test.cn/ec2/cn-north-1/index.json" => {
                let mut file = offer_file("cn-north-1", "China (Beijing)", "0.664");
                let dimension = &mut file["terms"]["OnDemand"]["SKU-cn-north-1"]["SKU-cn-north-1.T"]
                    ["priceDimensions"]["SKU-cn-north-1.T.D"];
                dimension["pricePerUnit"] = json!({"CNY": "0.664"});
                body(file)
            }
            "https://pricing.test.cn/savings/cn/region_index.json" => body(json!({
                "regions": [{"regionCode": "cn-north-1", "versionUrl": "/savings/cn-north-1/index.json"}]
            })),
            "https://pricing.test.cn/savings/cn-north-1/index.json" => body(json!({
                "products": [{"sku": "PLAN", "attributes": {"purchaseOption": "No Upfront", "purchaseTerm": "1yr"}}],
                "terms": {"savingsPlan": [{"sku": "PLAN", "rates": [
                    {"discountedSku": "SKU-cn-north-1", "discountedRate": {"price": "0.41", "currency": "CNY"}}
                ]}]}
            })),
            other => Err(FetchError::Status { url: other.to_string(), status: 404 }),
        });

        let mut aggregator = Aggregator::for_partition(ServiceKind::Ec2, Partition::China);
        let summary = collect(&context(fetcher), ServiceKind::Ec2, &mut aggregator).await;
        let output = aggregator.finish();

        assert_eq!(summary.failed, 0);
        assert_eq!(summary.succeeded, 2);
        let pricing = output.records[0].platform("cn-north-1", "linux").unwrap();
        assert_eq!(pricing.ondemand, Some(domain_instances::PriceValue::Text("0.664".to_string())));
        assert_eq!(pricing.reserved["yrTerm1Savings.noUpfront"], 0.41);
        assert_eq!(output.records[0].regions["cn-north-1"], "China (Beijing)");
    }
}
