//! EC2 dedicated host prices.
//!
//! Hosts are priced per instance family. A family price is written to every
//! catalog instance of that family under the `dedicated` platform.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{CollectError, CollectResult};
use crate::format::parse_price;
use crate::merger::TuplePrice;
use crate::models::PriceStyle;
use crate::region::{RegionResolver, RegionTable};
use crate::report::CollectionReport;
use crate::terms::{ReservedComponent, ReservedTerm};

pub const DEDICATED_PLATFORM: &str = "dedicated";

/// Lease lengths requested from the reserved host feed
pub const RESERVED_TERMS: &[&str] = &["3 year", "1 year"];

/// Payment options requested from the reserved host feed
pub const RESERVED_PAYMENTS: &[&str] = &["No Upfront", "Partial Upfront", "All Upfront"];

/// `regions{location description -> {label -> row}}`, shared by the
/// on-demand and reserved host feeds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DedicatedHostDocument {
    #[serde(default)]
    pub regions: BTreeMap<String, BTreeMap<String, DedicatedHostRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedicatedHostRow {
    #[serde(rename = "Instance Type")]
    pub instance_type: Option<String>,
    pub price: Option<String>,
    #[serde(rename = "riupfront:PricePerUnit")]
    pub upfront: Option<String>,
    #[serde(rename = "LeaseContractLength")]
    pub lease_contract_length: Option<String>,
    #[serde(rename = "PurchaseOption")]
    pub purchase_option: Option<String>,
}

/// A family-wide host price for one region
#[derive(Debug, Clone, PartialEq)]
pub struct HostPrice {
    pub family: String,
    pub region: String,
    pub price: TuplePrice,
}

impl DedicatedHostDocument {
    /// Location descriptions, used to fan out the reserved feed.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn on_demand_prices(
        &self,
        resolver: &RegionResolver,
        table: &mut RegionTable,
        report: &mut CollectionReport,
    ) -> Vec<HostPrice> {
        self.rows(resolver, table, report, |row| {
            let price = parse_price(row.price.as_deref().unwrap_or_default())?;
            if price == 0.0 {
                return Ok(Vec::new());
            }
            Ok(vec![TuplePrice::OnDemand(PriceStyle::Formatted.value(price))])
        })
    }

    /// Hourly and upfront components; the effectivizer combines them.
    pub fn reserved_prices(
        &self,
        resolver: &RegionResolver,
        table: &mut RegionTable,
        report: &mut CollectionReport,
    ) -> Vec<HostPrice> {
        self.rows(resolver, table, report, |row| {
            let term = ReservedTerm::translate(
                row.lease_contract_length.as_deref(),
                row.purchase_option.as_deref(),
                None,
            )?;
            let hourly = parse_price(row.price.as_deref().unwrap_or_default())?;
            let mut prices = vec![TuplePrice::ReservedComponent {
                term,
                component: ReservedComponent::Hourly,
                amount: hourly,
            }];
            if let Some(upfront) = row.upfront.as_deref() {
                prices.push(TuplePrice::ReservedComponent {
                    term,
                    component: ReservedComponent::Upfront,
                    amount: parse_price(upfront)?,
                });
            }
            Ok(prices)
        })
    }

    fn rows(
        &self,
        resolver: &RegionResolver,
        table: &mut RegionTable,
        report: &mut CollectionReport,
        prices: impl Fn(&DedicatedHostRow) -> CollectResult<Vec<TuplePrice>>,
    ) -> Vec<HostPrice> {
        let mut host_prices = Vec::new();
        for (location, rows) in &self.regions {
            let region = match resolver.resolve(table, location, None) {
                Ok(region) => region,
                Err(error) => {
                    report.record(&error);
                    continue;
                }
            };
            for (label, row) in rows {
                let Some(family) = row.instance_type.clone() else {
                    report.record(&CollectError::MalformedProduct {
                        sku: label.clone(),
                        details: "dedicated host row without Instance Type".to_string(),
                    });
                    continue;
                };
                match prices(row) {
                    Ok(row_prices) => host_prices.extend(row_prices.into_iter().map(|price| HostPrice {
                        family: family.clone(),
                        region: region.clone(),
                        price,
                    })),
                    Err(error) => report.record(&error),
                }
            }
        }
        host_prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::models::{PriceValue, ServiceKind};
    use serde_json::json;

    #[test]
    fn test_on_demand_host_prices() {
        let document: DedicatedHostDocument = serde_json::from_value(json!({
            "regions": {
                "US East (N. Virginia)": {
                    "m5 Dedicated Host": {"Instance Type": "m5", "price": "5.0690000000"},
                    "free": {"Instance Type": "a1", "price": "0"}
                },
                "Nowhere (Special)": {
                    "c5 Dedicated Host": {"Instance Type": "c5", "price": "4.0"}
                }
            }
        }))
        .unwrap();
        let mut table = RegionTable::aws();
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let prices = document.on_demand_prices(&RegionResolver::default(), &mut table, &mut report);

        assert_eq!(
            prices,
            vec![HostPrice {
                family: "m5".to_string(),
                region: "us-east-1".to_string(),
                price: TuplePrice::OnDemand(PriceValue::Text("5.069".to_string())),
            }]
        );
        assert_eq!(report.count(SkipReason::UnresolvableRegion), 1);
    }

    #[test]
    fn test_reserved_host_components() {
        let document: DedicatedHostDocument = serde_json::from_value(json!({
            "regions": {
                "EU (Ireland)": {
                    "m5 Dedicated Host": {
                        "Instance Type": "m5",
                        "price": "2.1",
                        "riupfront:PricePerUnit": "18396",
                        "LeaseContractLength": "1 yr",
                        "PurchaseOption": "PartialUpfront"
                    },
                    "c5 Dedicated Host": {
                        "Instance Type": "c5",
                        "price": "1.0",
                        "LeaseContractLength": "2 yr",
                        "PurchaseOption": "NoUpfront"
                    }
                }
            }
        }))
        .unwrap();
        let mut table = RegionTable::aws();
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let prices = document.reserved_prices(&RegionResolver::default(), &mut table, &mut report);

        assert_eq!(prices.len(), 2);
        assert!(prices.iter().all(|price| price.family == "m5" && price.region == "eu-west-1"));
        assert!(prices.iter().any(|price| matches!(
            &price.price,
            TuplePrice::ReservedComponent { term, component: ReservedComponent::Upfront, amount }
                if term.key() == "yrTerm1Standard.partialUpfront" && *amount == 18396.0
        )));
        assert_eq!(report.count(SkipReason::UnmappedTerm), 1);
    }
}
