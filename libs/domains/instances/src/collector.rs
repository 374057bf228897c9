//! Generic three-pass walk over an AWS offer document.
//!
//! 1. `products`: family filter, service filter, disallowed locations,
//!    region resolution, attribute normalization.
//! 2. `terms.OnDemand`: excluded dimensions are dropped, the rest become
//!    on-demand tuples.
//! 3. `terms.Reserved`: dimensions become raw reserved components, keyed by
//!    canonical term, for the effectivizer.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use tracing::debug;

use crate::error::{CollectError, SkipReason};
use crate::format::parse_price;
use crate::merger::{MergeRule, PriceTuple, TuplePrice};
use crate::models::InstanceSpec;
use crate::offer::{OfferDocument, OfferTerm, PriceDimension};
use crate::partition::Partition;
use crate::region::{RegionResolver, RegionTable};
use crate::report::CollectionReport;
use crate::services::ProductAttributes;
use crate::terms::{ReservedComponent, ReservedTerm};

/// Where a SKU's prices land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuTarget {
    pub instance_type: String,
    pub region: String,
    pub platforms: Vec<String>,
    /// Keys shared by several SKUs; they keep the highest price written
    pub aliases: Vec<String>,
}

impl SkuTarget {
    pub fn new(instance_type: &str, region: &str, platforms: Vec<String>) -> Self {
        Self {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            platforms,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// One tuple per platform key and alias key.
    pub fn tuples(&self, price: &TuplePrice) -> Vec<PriceTuple> {
        let keyed = self.platforms.iter().map(|platform| (platform, MergeRule::Replace));
        let aliased = self.aliases.iter().map(|alias| (alias, MergeRule::KeepMax));
        keyed
            .chain(aliased)
            .map(|(platform, rule)| {
                PriceTuple::new(&self.instance_type, &self.region, platform, price.clone())
                    .with_rule(rule)
            })
            .collect()
    }
}

/// Outcome of resolving a SKU against the index
#[derive(Debug, PartialEq, Eq)]
pub enum SkuLookup<'a> {
    Target(&'a SkuTarget),
    /// Product exists but was filtered out in the first pass
    Ignored,
    Orphan,
}

/// `sku -> target`, kept across documents so savings plans can resolve
/// their discounted SKUs. SKUs seen in a catalog but filtered out are
/// remembered so they are not mistaken for orphans.
#[derive(Debug, Clone, Default)]
pub struct SkuIndex {
    targets: BTreeMap<String, SkuTarget>,
    ignored: BTreeSet<String>,
}

impl SkuIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sku: impl Into<String>, target: SkuTarget) {
        let sku = sku.into();
        self.ignored.remove(&sku);
        self.targets.insert(sku, target);
    }

    pub fn ignore(&mut self, sku: impl Into<String>) {
        let sku = sku.into();
        if !self.targets.contains_key(&sku) {
            self.ignored.insert(sku);
        }
    }

    pub fn get(&self, sku: &str) -> Option<&SkuTarget> {
        self.targets.get(sku)
    }

    pub fn lookup(&self, sku: &str) -> SkuLookup<'_> {
        match self.targets.get(sku) {
            Some(target) => SkuLookup::Target(target),
            None if self.ignored.contains(sku) => SkuLookup::Ignored,
            None => SkuLookup::Orphan,
        }
    }

    /// Indexed targets; ignored SKUs are not counted.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn extend(&mut self, other: SkuIndex) {
        for sku in other.ignored {
            self.ignore(sku);
        }
        for (sku, target) in other.targets {
            self.insert(sku, target);
        }
    }
}

/// Everything one offer document contributes.
#[derive(Debug, Default)]
pub struct CollectedOffer {
    pub instances: Vec<InstanceSpec>,
    pub skus: SkuIndex,
    pub tuples: Vec<PriceTuple>,
}

/// Walks offer documents for the service described by `A`.
pub struct OfferCollector<'a, A> {
    resolver: &'a RegionResolver,
    currency: &'static str,
    table: &'a mut RegionTable,
    report: &'a mut CollectionReport,
    attributes: PhantomData<A>,
}

impl<'a, A: ProductAttributes> OfferCollector<'a, A> {
    pub fn new(
        resolver: &'a RegionResolver,
        table: &'a mut RegionTable,
        report: &'a mut CollectionReport,
    ) -> Self {
        Self {
            resolver,
            currency: Partition::Global.currency(),
            table,
            report,
            attributes: PhantomData,
        }
    }

    /// Reads prices in `currency` instead of USD.
    pub fn with_currency(mut self, currency: &'static str) -> Self {
        self.currency = currency;
        self
    }

    pub fn collect(&mut self, document: &OfferDocument) -> CollectedOffer {
        let mut offer = CollectedOffer::default();
        self.index_products(document, &mut offer);
        self.collect_on_demand(document, &mut offer);
        self.collect_reserved(document, &mut offer);

        debug!(
            service = %A::PROFILE.service,
            products = document.products.len(),
            skus = offer.skus.len(),
            instances = offer.instances.len(),
            tuples = offer.tuples.len(),
            "Collected offer document"
        );
        offer
    }

    fn index_products(&mut self, document: &OfferDocument, offer: &mut CollectedOffer) {
        let mut seen = BTreeSet::new();

        for (sku, product) in &document.products {
            if !A::PROFILE.accepts_family(product.product_family.as_deref()) {
                continue;
            }

            let attributes = match A::deserialize(&product.attributes) {
                Ok(attributes) => attributes,
                Err(error) => {
                    self.report.record(&CollectError::MalformedProduct {
                        sku: sku.clone(),
                        details: error.to_string(),
                    });
                    continue;
                }
            };

            if let Some(reason) = attributes.filter() {
                self.report.skip(reason);
                continue;
            }

            let location = attributes.location();
            if location.is_disallowed() {
                debug!(sku = %sku, location_type = ?location.location_type, "Skipping disallowed location type");
                self.report.skip(SkipReason::DisallowedLocation);
                continue;
            }

            let Some(instance_type) = attributes.instance_type() else {
                self.report.record(&CollectError::MalformedProduct {
                    sku: sku.clone(),
                    details: "missing instance type".to_string(),
                });
                continue;
            };

            let region = match self.resolver.resolve(
                self.table,
                &location.location,
                location.region_code.as_deref(),
            ) {
                Ok(region) => region,
                Err(error) => {
                    self.report.record(&error);
                    continue;
                }
            };

            let platforms = match attributes.platforms() {
                Ok(platforms) => platforms,
                Err(error) => {
                    self.report.record(&error);
                    continue;
                }
            };

            if seen.insert(instance_type.clone()) {
                offer.instances.push(attributes.normalize(&instance_type));
            }
            offer.skus.insert(
                sku.clone(),
                SkuTarget::new(&instance_type, &region, platforms)
                    .with_aliases(attributes.aliases()),
            );
        }

        for sku in document.products.keys() {
            offer.skus.ignore(sku.clone());
        }
    }

    /// Resolves a term's SKU, recording orphans.
    fn target_for(&mut self, offer: &CollectedOffer, term: &OfferTerm, sku: &str) -> Option<SkuTarget> {
        let sku = if term.sku.is_empty() { sku } else { term.sku.as_str() };
        match offer.skus.lookup(sku) {
            SkuLookup::Target(target) => Some(target.clone()),
            SkuLookup::Ignored => None,
            SkuLookup::Orphan => {
                self.report.record(&CollectError::OrphanPricingRecord {
                    key: sku.to_string(),
                });
                None
            }
        }
    }

    /// Price of a dimension, or `None` for excluded or unparsable ones.
    fn dimension_price(&mut self, dimension: &PriceDimension) -> Option<f64> {
        if A::PROFILE.is_excluded(&dimension.description) {
            debug!(description = %dimension.description, "Skipping excluded price dimension");
            self.report.skip(SkipReason::ExcludedDimension);
            return None;
        }
        let Some(raw) = dimension.price_in(self.currency) else {
            self.report.record(&CollectError::MalformedPrice {
                raw: format!("no {} price in '{}'", self.currency, dimension.description),
            });
            return None;
        };
        match parse_price(raw) {
            Ok(price) => Some(price),
            Err(error) => {
                self.report.record(&error);
                None
            }
        }
    }

    fn collect_on_demand(&mut self, document: &OfferDocument, offer: &mut CollectedOffer) {
        let mut tuples = Vec::new();

        for (sku, terms) in &document.terms.on_demand {
            for term in terms.values() {
                let Some(target) = self.target_for(offer, term, sku) else {
                    continue;
                };
                for dimension in term.price_dimensions.values() {
                    let Some(price) = self.dimension_price(dimension) else {
                        continue;
                    };
                    if price == 0.0 {
                        continue;
                    }
                    let value = A::PROFILE.price_style.value(price);
                    tuples.extend(target.tuples(&TuplePrice::OnDemand(value)));
                }
            }
        }

        offer.tuples.extend(tuples);
    }

    fn collect_reserved(&mut self, document: &OfferDocument, offer: &mut CollectedOffer) {
        let mut tuples = Vec::new();

        for (sku, terms) in &document.terms.reserved {
            for term in terms.values() {
                let Some(target) = self.target_for(offer, term, sku) else {
                    continue;
                };

                let attributes = &term.term_attributes;
                let reserved_term = match ReservedTerm::translate(
                    attributes.lease_contract_length.as_deref(),
                    attributes.purchase_option.as_deref(),
                    attributes.offering_class.as_deref(),
                ) {
                    Ok(reserved_term) => reserved_term,
                    Err(error) => {
                        self.report.record(&CollectError::from(error));
                        continue;
                    }
                };

                for dimension in term.price_dimensions.values() {
                    let Some(component) = ReservedComponent::from_unit(&dimension.unit) else {
                        self.report.skip(SkipReason::ExcludedDimension);
                        continue;
                    };
                    let Some(amount) = self.dimension_price(dimension) else {
                        continue;
                    };
                    tuples.extend(target.tuples(&TuplePrice::ReservedComponent {
                        term: reserved_term,
                        component,
                        amount,
                    }));
                }
            }
        }

        offer.tuples.extend(tuples);
    }
}
