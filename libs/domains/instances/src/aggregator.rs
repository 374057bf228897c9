//! Per-service aggregation state.
//!
//! Fetched documents are folded in one at a time. The aggregator owns the
//! region table, the merger and the SKU index for a single service run, so
//! two services never share mutable state.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::azure::{AzureLocationList, AzureSkuPage, RetailPricePage};
use crate::collector::{OfferCollector, SkuIndex};
use crate::dedicated::{DedicatedHostDocument, HostPrice, DEDICATED_PLATFORM};
use crate::emr::EmrPriceDocument;
use crate::error::CollectError;
use crate::merger::PricingMerger;
use crate::models::{InstanceRecord, ServiceKind};
use crate::offer::OfferDocument;
use crate::partition::Partition;
use crate::region::{RegionResolver, RegionTable};
use crate::report::CollectionReport;
use crate::savings::SavingsPlanDocument;
use crate::services::{
    CacheAttributes, Ec2Attributes, OpenSearchAttributes, ProductAttributes, RdsAttributes,
    RedshiftAttributes, SageMakerAttributes,
};
use crate::spot::SpotFeed;

/// Finished output of one service run
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOutput {
    pub service: ServiceKind,
    pub partition: Partition,
    pub records: Vec<InstanceRecord>,
    pub report: CollectionReport,
}

#[derive(Debug)]
pub struct Aggregator {
    service: ServiceKind,
    partition: Partition,
    resolver: RegionResolver,
    table: RegionTable,
    merger: PricingMerger,
    skus: SkuIndex,
    report: CollectionReport,
}

impl Aggregator {
    pub fn new(service: ServiceKind) -> Self {
        Self::for_partition(service, Partition::Global)
    }

    /// AWS services start from the partition's region table; Azure fills
    /// its table from the locations API.
    pub fn for_partition(service: ServiceKind, partition: Partition) -> Self {
        let table = match service {
            ServiceKind::Azure => RegionTable::new(),
            _ => partition.region_table(),
        };
        Self {
            partition,
            resolver: RegionResolver::new(partition.default_region()),
            ..Self::with_table(service, table)
        }
    }

    fn with_table(service: ServiceKind, table: RegionTable) -> Self {
        Self {
            service,
            partition: Partition::Global,
            resolver: RegionResolver::default(),
            table,
            merger: PricingMerger::new(),
            skus: SkuIndex::new(),
            report: CollectionReport::new(service),
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn report(&self) -> &CollectionReport {
        &self.report
    }

    pub fn merger(&self) -> &PricingMerger {
        &self.merger
    }

    /// Folds one regional offer document. Returns the number of tuples
    /// written.
    pub fn fold_offer(&mut self, document: &OfferDocument) -> usize {
        match self.service {
            ServiceKind::Ec2 => self.fold_typed::<Ec2Attributes>(document),
            ServiceKind::Rds => self.fold_typed::<RdsAttributes>(document),
            ServiceKind::Cache => self.fold_typed::<CacheAttributes>(document),
            ServiceKind::OpenSearch => self.fold_typed::<OpenSearchAttributes>(document),
            ServiceKind::Redshift => self.fold_typed::<RedshiftAttributes>(document),
            ServiceKind::SageMaker => self.fold_typed::<SageMakerAttributes>(document),
            ServiceKind::Azure => {
                debug!("Ignoring AWS offer document in the Azure run");
                0
            }
        }
    }

    fn fold_typed<A: ProductAttributes>(&mut self, document: &OfferDocument) -> usize {
        let offer = OfferCollector::<A>::new(&self.resolver, &mut self.table, &mut self.report)
            .with_currency(self.partition.currency())
            .collect(document);

        for spec in offer.instances {
            self.merger.register(spec);
        }
        self.skus.extend(offer.skus);
        self.merger.apply_all(offer.tuples, &mut self.report)
    }

    /// Savings plan rates resolve against SKUs from offers folded so far.
    pub fn fold_savings(&mut self, document: &SavingsPlanDocument) -> usize {
        let tuples = document.tuples(&self.skus, self.partition.currency(), &mut self.report);
        self.merger.apply_all(tuples, &mut self.report)
    }

    /// EMR surcharges for instances already in the catalog.
    pub fn fold_emr(&mut self, document: &EmrPriceDocument) -> usize {
        let mut tuples = document.tuples(&self.table, &mut self.report);
        tuples.retain(|tuple| {
            if self.merger.contains(&tuple.instance_type) {
                return true;
            }
            warn!(instance_type = %tuple.instance_type, region = %tuple.region, "EMR price for unknown instance type");
            self.report.record(&CollectError::OrphanPricingRecord {
                key: tuple.instance_type.clone(),
            });
            false
        });
        self.merger.apply_all(tuples, &mut self.report)
    }

    pub fn fold_spot(&mut self, feed: &SpotFeed) -> usize {
        let tuples = feed.tuples(&mut self.report);
        self.merger.apply_all(tuples, &mut self.report)
    }

    pub fn fold_dedicated_on_demand(&mut self, document: &DedicatedHostDocument) -> usize {
        let prices = document.on_demand_prices(&self.resolver, &mut self.table, &mut self.report);
        self.fold_host_prices(prices)
    }

    pub fn fold_dedicated_reserved(&mut self, document: &DedicatedHostDocument) -> usize {
        let prices = document.reserved_prices(&self.resolver, &mut self.table, &mut self.report);
        self.fold_host_prices(prices)
    }

    fn fold_host_prices(&mut self, prices: Vec<HostPrice>) -> usize {
        let mut written = 0;
        for host in prices {
            match self
                .merger
                .apply_to_family(&host.family, &host.region, DEDICATED_PLATFORM, host.price)
            {
                Ok(count) => written += count,
                Err(error) => self.report.record(&error),
            }
        }
        written
    }

    /// Physical Azure regions and their display names.
    pub fn fold_azure_locations(&mut self, locations: &AzureLocationList) -> usize {
        locations.register(&mut self.table)
    }

    /// Registers virtual machine SKUs. Entries repeat once per location;
    /// the first one wins.
    pub fn fold_azure_specs(&mut self, page: &AzureSkuPage) -> usize {
        page.value
            .iter()
            .filter(|sku| sku.is_virtual_machine())
            .map(|sku| self.merger.register(sku.to_spec()))
            .filter(|registered| *registered)
            .count()
    }

    /// Retail prices may name SKUs the resource API did not list; those get
    /// a bare record.
    pub fn fold_azure_prices(&mut self, page: &RetailPricePage) -> usize {
        let mut tuples = Vec::new();
        for item in &page.items {
            tuples.extend(item.tuples(&mut self.report));
        }
        for tuple in &tuples {
            self.merger.ensure(&tuple.instance_type);
        }
        self.merger.apply_all(tuples, &mut self.report)
    }

    /// Runs the effectivizer and produces the sorted output records.
    pub fn finish(self) -> ServiceOutput {
        let Self {
            service,
            partition,
            table,
            merger,
            mut report,
            ..
        } = self;
        let records = merger.finish(&table, &mut report);

        info!(
            service = %service,
            partition = %partition,
            records = records.len(),
            skipped = report.total_skipped(),
            "Aggregated service pricing"
        );
        ServiceOutput {
            service,
            partition,
            records,
            report,
        }
    }
}
