//! Per-service attribute schemas.
//!
//! Each AWS service publishes its products with a different attribute
//! vocabulary. Every service gets a typed attribute struct, deserialized
//! from the product's attribute map, plus an explicit normalization into
//! the shared [`InstanceSpec`]. The generic
//! [`OfferCollector`](crate::collector::OfferCollector) drives all of them.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{CollectResult, SkipReason};
use crate::models::{Generation, InstanceSpec, PriceStyle, ServiceKind};

pub mod cache;
pub mod ec2;
pub mod opensearch;
pub mod rds;
pub mod redshift;
pub mod sagemaker;

pub use cache::CacheAttributes;
pub use ec2::Ec2Attributes;
pub use opensearch::OpenSearchAttributes;
pub use rds::RdsAttributes;
pub use redshift::RedshiftAttributes;
pub use sagemaker::SageMakerAttributes;

/// Price dimension descriptions that are not a base compute price
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "transfer", "global", "storage", "iops", "requests", "multi-az",
];

/// Services whose compute dimensions mention bundled storage
pub const BUNDLED_STORAGE_EXCLUSIONS: &[&str] =
    &["transfer", "global", "iops", "requests", "multi-az"];

/// Static description of how a service's offer file is read.
#[derive(Debug, Clone, Copy)]
pub struct ServiceProfile {
    pub service: ServiceKind,
    pub product_families: &'static [&'static str],
    pub excluded_descriptions: &'static [&'static str],
    pub price_style: PriceStyle,
}

impl ServiceProfile {
    pub fn accepts_family(&self, family: Option<&str>) -> bool {
        family.is_some_and(|family| self.product_families.contains(&family))
    }

    pub fn is_excluded(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        self.excluded_descriptions
            .iter()
            .any(|excluded| description.contains(excluded))
    }
}

/// Location fields shared by every AWS product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAttributes {
    #[serde(default)]
    pub location: String,
    pub location_type: Option<String>,
    pub region_code: Option<String>,
}

impl LocationAttributes {
    /// Outposts racks share instance types with their parent region and
    /// must never merge into it.
    pub fn is_disallowed(&self) -> bool {
        self.location_type
            .as_deref()
            .is_some_and(|location_type| location_type.contains("Outposts"))
    }
}

/// Typed view of a product's attribute map for one service.
pub trait ProductAttributes: DeserializeOwned {
    const PROFILE: ServiceProfile;

    fn location(&self) -> &LocationAttributes;

    /// Canonical instance type, or `None` when the product has none.
    fn instance_type(&self) -> Option<String>;

    /// Platform keys the product's prices are written under.
    fn platforms(&self) -> CollectResult<Vec<String>>;

    /// Extra keys several SKUs write to; the highest price wins there.
    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    /// Service-level product filter.
    fn filter(&self) -> Option<SkipReason> {
        None
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec;
}

/// `"Yes"` -> current, anything else -> previous
pub(crate) fn generation(current_generation: Option<&str>) -> Option<Generation> {
    current_generation.map(|value| {
        if value == "Yes" {
            Generation::Current
        } else {
            Generation::Previous
        }
    })
}

/// Drops vendor placeholders such as `NA`.
pub(crate) fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "NA" && *value != "N/A")
        .map(str::to_string)
}
