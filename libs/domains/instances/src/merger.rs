//! Folds price tuples from every source into the canonical instance records.
//!
//! Fetch tasks never write here directly: each returns its document, and the
//! single aggregation step owns the merger. That keeps the merge lock-free
//! and makes the result independent of task completion order for disjoint
//! `(instance, region, platform, term)` paths.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::models::{family_token, InstanceRecord, InstanceSpec, PriceValue};
use crate::region::RegionTable;
use crate::report::CollectionReport;
use crate::reserved::Effectivizer;
use crate::terms::{ReservedComponent, ReservedTerm};

/// What a tuple contributes to a pricing slot
#[derive(Debug, Clone, PartialEq)]
pub enum TuplePrice {
    OnDemand(PriceValue),
    /// One half of a reserved price, effectivized when the run finishes
    ReservedComponent {
        term: ReservedTerm,
        component: ReservedComponent,
        amount: f64,
    },
    /// A rate that is already hourly (savings plans)
    Reserved { term: ReservedTerm, hourly: f64 },
    Spot(f64),
    /// EMR surcharge per instance hour, as published
    Emr(String),
}

/// How a tuple treats a price already in its slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeRule {
    #[default]
    Replace,
    /// Alias keys fed by several SKUs keep the highest price
    KeepMax,
}

/// `(instance_type, region, platform, price)` as emitted by a collector
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTuple {
    pub instance_type: String,
    pub region: String,
    pub platform: String,
    pub price: TuplePrice,
    pub rule: MergeRule,
}

impl PriceTuple {
    pub fn new(instance_type: &str, region: &str, platform: &str, price: TuplePrice) -> Self {
        Self {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            platform: platform.to_string(),
            price,
            rule: MergeRule::Replace,
        }
    }

    pub fn with_rule(mut self, rule: MergeRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Owner of the instance map for one service run.
#[derive(Debug, Default)]
pub struct PricingMerger {
    records: BTreeMap<String, InstanceRecord>,
}

impl PricingMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance to the catalog. Attributes come from the first spec
    /// seen for an instance type; later specs are ignored.
    pub fn register(&mut self, spec: InstanceSpec) -> bool {
        if self.records.contains_key(&spec.instance_type) {
            return false;
        }
        self.records
            .insert(spec.instance_type.clone(), InstanceRecord::new(spec));
        true
    }

    /// Catalog entry for an instance type, creating a bare one when missing.
    pub fn ensure(&mut self, instance_type: &str) -> &mut InstanceRecord {
        self.records
            .entry(instance_type.to_string())
            .or_insert_with(|| InstanceRecord::new(InstanceSpec::new(instance_type)))
    }

    pub fn contains(&self, instance_type: &str) -> bool {
        self.records.contains_key(instance_type)
    }

    pub fn get(&self, instance_type: &str) -> Option<&InstanceRecord> {
        self.records.get(instance_type)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes one tuple. Tuples for instance types outside the catalog are
    /// orphans.
    pub fn apply(&mut self, tuple: PriceTuple) -> CollectResult<()> {
        let record = self.records.get_mut(&tuple.instance_type).ok_or_else(|| {
            CollectError::OrphanPricingRecord {
                key: tuple.instance_type.clone(),
            }
        })?;
        write_price(record, &tuple.region, &tuple.platform, tuple.price, tuple.rule);
        Ok(())
    }

    /// Writes a batch, recording failures instead of stopping.
    pub fn apply_all(
        &mut self,
        tuples: impl IntoIterator<Item = PriceTuple>,
        report: &mut CollectionReport,
    ) -> usize {
        let mut applied = 0;
        for tuple in tuples {
            match self.apply(tuple) {
                Ok(()) => applied += 1,
                Err(error) => report.record(&error),
            }
        }
        applied
    }

    /// Writes a family-wide price to every catalog instance of that family.
    ///
    /// Dedicated hosts are priced per family (`m5`), not per size.
    pub fn apply_to_family(
        &mut self,
        family: &str,
        region: &str,
        platform: &str,
        price: TuplePrice,
    ) -> CollectResult<usize> {
        let mut written = 0;
        for record in self
            .records
            .values_mut()
            .filter(|record| family_token(record.instance_type()) == family)
        {
            write_price(record, region, platform, price.clone(), MergeRule::Replace);
            written += 1;
        }
        if written == 0 {
            return Err(CollectError::OrphanPricingRecord {
                key: family.to_string(),
            });
        }
        Ok(written)
    }

    /// Effectivizes reserved prices, summarizes spot series, drops empty
    /// platforms and regions, and fills `regions` from the table.
    ///
    /// Records are returned sorted by instance type.
    pub fn finish(self, table: &RegionTable, report: &mut CollectionReport) -> Vec<InstanceRecord> {
        let effectivizer = Effectivizer::new();
        let mut records: Vec<InstanceRecord> = self.records.into_values().collect();

        for record in &mut records {
            effectivizer.apply(record, report);

            for platforms in record.pricing.values_mut() {
                for pricing in platforms.values_mut() {
                    pricing.summarize_spot();
                }
                platforms.retain(|_, pricing| !pricing.is_empty());
            }
            record.pricing.retain(|_, platforms| !platforms.is_empty());

            record.regions = record
                .pricing
                .keys()
                .map(|code| {
                    let description = table.description(code).unwrap_or(code);
                    (code.clone(), description.to_string())
                })
                .collect();
        }

        debug!(records = records.len(), "Finished merging pricing");
        records
    }
}

fn write_price(
    record: &mut InstanceRecord,
    region: &str,
    platform: &str,
    price: TuplePrice,
    rule: MergeRule,
) {
    if matches!(price, TuplePrice::Emr(_)) {
        record.spec.emr = Some(true);
    }
    let pricing = record.pricing_mut(region, platform);
    match price {
        TuplePrice::OnDemand(value) => {
            let keep = rule == MergeRule::KeepMax
                && pricing
                    .ondemand
                    .as_ref()
                    .is_some_and(|current| current.amount() >= value.amount());
            if !keep {
                pricing.ondemand = Some(value);
            }
        }
        TuplePrice::ReservedComponent {
            term,
            component,
            amount,
        } => {
            let raw = pricing.raw_reserved.entry(term).or_default();
            let slot = match component {
                ReservedComponent::Hourly => &mut raw.hourly,
                ReservedComponent::Upfront => &mut raw.upfront,
            };
            *slot = Some(merge_amount(*slot, amount, rule));
        }
        TuplePrice::Reserved { term, hourly } => {
            let slot = pricing.reserved.get(&term.key()).copied();
            pricing
                .reserved
                .insert(term.key(), merge_amount(slot, hourly, rule));
        }
        TuplePrice::Spot(price) => pricing.spot.push(price),
        TuplePrice::Emr(price) => pricing.emr = Some(price),
    }
}

fn merge_amount(current: Option<f64>, incoming: f64, rule: MergeRule) -> f64 {
    match (rule, current) {
        (MergeRule::KeepMax, Some(current)) => current.max(incoming),
        _ => incoming,
    }
}
