use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

use crate::format::format_price;
use crate::spot::SpotPriceSeries;
use crate::terms::ReservedTerm;

/// Services that produce an instance document
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServiceKind {
    Ec2,
    Rds,
    #[strum(to_string = "cache", serialize = "elasticache")]
    #[serde(rename = "cache")]
    Cache,
    OpenSearch,
    Redshift,
    SageMaker,
    Azure,
}

impl ServiceKind {
    /// Output path relative to the output directory
    pub fn output_path(self) -> &'static str {
        match self {
            ServiceKind::Ec2 => "instances.json",
            ServiceKind::Rds => "rds/instances.json",
            ServiceKind::Cache => "cache/instances.json",
            ServiceKind::OpenSearch => "opensearch/instances.json",
            ServiceKind::Redshift => "redshift/instances.json",
            ServiceKind::SageMaker => "sagemaker/instances.json",
            ServiceKind::Azure => "azure/instances.json",
        }
    }

    /// Offer code in the AWS price list index
    pub fn offer_code(self) -> Option<&'static str> {
        match self {
            ServiceKind::Ec2 => Some("AmazonEC2"),
            ServiceKind::Rds => Some("AmazonRDS"),
            ServiceKind::Cache => Some("AmazonElastiCache"),
            ServiceKind::OpenSearch => Some("AmazonES"),
            ServiceKind::Redshift => Some("AmazonRedshift"),
            ServiceKind::SageMaker => Some("AmazonSageMaker"),
            ServiceKind::Azure => None,
        }
    }
}

/// A price as it appears in the output document.
///
/// EC2 keeps the vendor's formatted string; the other services emit numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    /// Numeric amount; unparsable text counts as zero.
    pub fn amount(&self) -> f64 {
        match self {
            PriceValue::Number(value) => *value,
            PriceValue::Text(text) => text.parse().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStyle {
    /// `format_price` string, e.g. `"0.1"`
    Formatted,
    Numeric,
}

impl PriceStyle {
    pub fn value(self, price: f64) -> PriceValue {
        match self {
            PriceStyle::Formatted => PriceValue::Text(format_price(price)),
            PriceStyle::Numeric => PriceValue::Number(price),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Current,
    Previous,
}

/// EC2 compute units; burstable families report `variable`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ecu {
    Units(f64),
    Variable,
}

impl Serialize for Ecu {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ecu::Units(units) => serializer.serialize_f64(*units),
            Ecu::Variable => serializer.serialize_str("variable"),
        }
    }
}

/// Canonical instance attributes shared by every service.
///
/// Absent fields are omitted from the output rather than written as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceSpec {
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arch: Vec<String>,
    #[serde(rename = "GPU", skip_serializing_if = "Option::is_none")]
    pub gpu: Option<u32>,
    #[serde(rename = "ECU", skip_serializing_if = "Option::is_none")]
    pub ecu: Option<Ecu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_performance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_processor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_speed_ghz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intel_avx: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intel_avx2: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intel_avx512: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intel_turbo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_networking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    /// Set once an EMR price has been written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emr: Option<bool>,
    /// Service-specific attributes (cache `max_clients`, ML `gpu_memory`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl InstanceSpec {
    pub fn new(instance_type: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            ..Default::default()
        }
    }

    /// Text before the first `.` (`m5` for `m5.large`, `db` for `db.r5.large`).
    pub fn family_token(&self) -> &str {
        family_token(&self.instance_type)
    }
}

pub fn family_token(instance_type: &str) -> &str {
    instance_type
        .split_once('.')
        .map_or(instance_type, |(family, _)| family)
}

/// Raw reserved components collected before effectivization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawReservedPrice {
    pub hourly: Option<f64>,
    pub upfront: Option<f64>,
}

/// Pricing for one (region, platform) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformPricing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ondemand: Option<PriceValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_max: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub reserved: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emr: Option<String>,
    #[serde(skip)]
    pub spot: SpotPriceSeries,
    #[serde(skip)]
    pub raw_reserved: BTreeMap<ReservedTerm, RawReservedPrice>,
}

impl PlatformPricing {
    /// Nothing a renderer could show
    pub fn is_empty(&self) -> bool {
        self.ondemand.is_none()
            && self.reserved.is_empty()
            && self.spot_min.is_none()
            && self.spot.is_empty()
            && self.emr.is_none()
    }

    /// Copies the spot series summary into `spot_min` / `spot_max`.
    pub fn summarize_spot(&mut self) {
        if let Some((min, max)) = self.spot.summary() {
            self.spot_min = Some(min);
            self.spot_max = Some(max);
        }
    }
}

/// `region -> platform -> pricing`
pub type PricingMap = BTreeMap<String, BTreeMap<String, PlatformPricing>>;

/// One entry of a service's output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceRecord {
    #[serde(flatten)]
    pub spec: InstanceSpec,
    pub pricing: PricingMap,
    /// Region code to description for every region in `pricing`
    pub regions: BTreeMap<String, String>,
}

impl InstanceRecord {
    pub fn new(spec: InstanceSpec) -> Self {
        Self {
            spec,
            pricing: BTreeMap::new(),
            regions: BTreeMap::new(),
        }
    }

    pub fn instance_type(&self) -> &str {
        &self.spec.instance_type
    }

    /// Pricing slot for a path, creating missing levels.
    pub fn pricing_mut(&mut self, region: &str, platform: &str) -> &mut PlatformPricing {
        self.pricing
            .entry(region.to_string())
            .or_default()
            .entry(platform.to_string())
            .or_default()
    }

    pub fn platform(&self, region: &str, platform: &str) -> Option<&PlatformPricing> {
        self.pricing.get(region)?.get(platform)
    }
}
