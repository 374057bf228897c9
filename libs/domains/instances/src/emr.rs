//! EMR per-instance surcharges.
//!
//! The metered unit map is keyed by location description, then by
//! `Instance-instancetype-<type>`. Each price lands under the `emr`
//! platform of an EC2 instance that is already in the catalog.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::format::parse_price;
use crate::merger::{PriceTuple, TuplePrice};
use crate::region::{canonicalize_location, RegionTable};
use crate::report::CollectionReport;

pub const EMR_PLATFORM: &str = "emr";

const INSTANCE_PREFIX: &str = "Instance-instancetype-";

/// Locations that stand for more than one region
const SHARED_LOCATIONS: &[(&str, &[&str])] =
    &[("AWS GovCloud (US)", &["us-gov-west-1", "us-gov-east-1"])];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmrPriceDocument {
    #[serde(default)]
    pub regions: BTreeMap<String, BTreeMap<String, EmrPrice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmrPrice {
    pub price: Option<String>,
}

impl EmrPriceDocument {
    /// EMR tuples for every location the table knows. Unknown locations
    /// are skipped without a report entry.
    pub fn tuples(&self, table: &RegionTable, report: &mut CollectionReport) -> Vec<PriceTuple> {
        let mut tuples = Vec::new();

        for (location, units) in &self.regions {
            let regions = regions_for(table, location);
            if regions.is_empty() {
                debug!(location = %location, "Skipping EMR prices for unknown location");
                continue;
            }

            for (unit, price) in units {
                let Some(instance_type) = unit.strip_prefix(INSTANCE_PREFIX) else {
                    continue;
                };
                let raw = price.price.as_deref().unwrap_or_default().trim();
                if let Err(error) = parse_price(raw) {
                    report.record(&error);
                    continue;
                }
                for region in &regions {
                    tuples.push(PriceTuple::new(
                        instance_type,
                        region,
                        EMR_PLATFORM,
                        TuplePrice::Emr(raw.to_string()),
                    ));
                }
            }
        }
        tuples
    }
}

fn regions_for(table: &RegionTable, location: &str) -> Vec<String> {
    let location = canonicalize_location(location);
    if let Some((_, regions)) = SHARED_LOCATIONS.iter().find(|(shared, _)| *shared == location) {
        return regions.iter().map(|region| region.to_string()).collect();
    }
    table
        .code_for(&location)
        .map(|code| vec![code.to_string()])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::models::ServiceKind;
    use serde_json::json;

    fn document(value: serde_json::Value) -> EmrPriceDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_instance_units_become_tuples() {
        let document = document(json!({
            "regions": {
                "US East (N. Virginia)": {
                    "Instance-instancetype-m5.large": {"price": "0.048", "rateCode": "X"},
                    "EMR-Serverless-vCPU": {"price": "0.052624"}
                },
                "Lunar Base (Crater)": {
                    "Instance-instancetype-m5.large": {"price": "1.0"}
                }
            }
        }));
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let tuples = document.tuples(&RegionTable::aws(), &mut report);

        assert_eq!(
            tuples,
            vec![PriceTuple::new(
                "m5.large",
                "us-east-1",
                EMR_PLATFORM,
                TuplePrice::Emr("0.048".to_string())
            )]
        );
        assert_eq!(report.total_skipped(), 0);
    }

    #[test]
    fn test_govcloud_covers_both_regions() {
        let document = document(json!({
            "regions": {
                "AWS GovCloud (US)": {"Instance-instancetype-c5.xlarge": {"price": "0.06"}}
            }
        }));
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let regions: Vec<String> = document
            .tuples(&RegionTable::aws(), &mut report)
            .into_iter()
            .map(|tuple| tuple.region)
            .collect();

        assert_eq!(regions, vec!["us-gov-west-1", "us-gov-east-1"]);
    }

    #[test]
    fn test_bad_price_is_recorded() {
        let document = document(json!({
            "regions": {
                "EU (Ireland)": {"Instance-instancetype-m5.large": {"price": "n/a"}}
            }
        }));
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        assert!(document.tuples(&RegionTable::aws(), &mut report).is_empty());
        assert_eq!(report.count(SkipReason::MalformedPrice), 1);
    }
}
