//! Spot prices: the per-(region, platform) observation series and the
//! EC2 spot feed that fills it.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::format::{format_price, parse_price};
use crate::merger::{PriceTuple, TuplePrice};
use crate::report::CollectionReport;

/// Observed spot prices, kept numerically sorted.
///
/// Observations only accumulate within a run; the series is summarized as
/// `spot_min` / `spot_max` when the output is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotPriceSeries {
    prices: Vec<f64>,
}

impl SpotPriceSeries {
    pub fn push(&mut self, price: f64) {
        let index = self.prices.partition_point(|existing| *existing <= price);
        self.prices.insert(index, price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.prices.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Formatted `(min, max)`
    pub fn summary(&self) -> Option<(String, String)> {
        Some((format_price(self.min()?), format_price(self.max()?)))
    }
}

impl FromIterator<f64> for SpotPriceSeries {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut series = SpotPriceSeries::default();
        for price in iter {
            series.push(price);
        }
        series
    }
}

/// Legacy region names still used by the spot feed
const SPOT_REGION_ALIASES: &[(&str, &str)] = &[
    ("us-east", "us-east-1"),
    ("us-west", "us-west-1"),
    ("eu-ireland", "eu-west-1"),
    ("apac-sin", "ap-southeast-1"),
    ("apac-syd", "ap-southeast-2"),
    ("apac-tokyo", "ap-northeast-1"),
];

fn spot_region(region: &str) -> &str {
    SPOT_REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == region)
        .map_or(region, |(_, code)| code)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotFeed {
    pub config: SpotFeedConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotFeedConfig {
    #[serde(default)]
    pub regions: Vec<SpotFeedRegion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotFeedRegion {
    pub region: String,
    #[serde(rename = "instanceTypes", default)]
    pub instance_types: Vec<SpotFeedGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotFeedGroup {
    #[serde(default)]
    pub sizes: Vec<SpotFeedSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotFeedSize {
    pub size: String,
    #[serde(rename = "valueColumns", default)]
    pub value_columns: Vec<SpotFeedValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotFeedValue {
    /// Platform key, `linux` or `mswin`
    pub name: String,
    #[serde(default)]
    pub prices: BTreeMap<String, String>,
}

impl SpotFeed {
    /// One spot tuple per priced size and platform.
    ///
    /// Placeholder prices such as `N/A*` are counted as malformed and skipped.
    pub fn tuples(&self, report: &mut CollectionReport) -> Vec<PriceTuple> {
        let mut tuples = Vec::new();
        for region in &self.config.regions {
            let code = spot_region(&region.region);
            for size in region.instance_types.iter().flat_map(|group| &group.sizes) {
                for column in &size.value_columns {
                    let Some(raw) = column.prices.get("USD") else {
                        continue;
                    };
                    match parse_price(raw) {
                        Ok(price) => tuples.push(PriceTuple::new(
                            &size.size,
                            code,
                            &column.name,
                            TuplePrice::Spot(price),
                        )),
                        Err(error) => report.record(&error),
                    }
                }
            }
        }
        tuples
    }
}
