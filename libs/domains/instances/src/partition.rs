//! AWS partitions with their own price list endpoint and currency.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::models::ServiceKind;
use crate::region::RegionTable;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum Partition {
    #[default]
    Global,
    #[strum(to_string = "china", serialize = "cn")]
    China,
}

impl Partition {
    pub fn currency(self) -> &'static str {
        match self {
            Partition::Global => "USD",
            Partition::China => "CNY",
        }
    }

    /// Offer index path under the partition's price list host
    pub fn offer_index_path(self) -> &'static str {
        match self {
            Partition::Global => "/offers/v1.0/aws/index.json",
            Partition::China => "/offers/v1.0/cn/index.json",
        }
    }

    /// Region index entries that are not real regions
    pub fn ignored_regions(self) -> &'static [&'static str] {
        match self {
            Partition::Global => &["cn-north-1-pkx-1"],
            Partition::China => &["aws-cn-other"],
        }
    }

    /// Region for products located `"Any"`
    pub fn default_region(self) -> &'static str {
        match self {
            Partition::Global => crate::region::DEFAULT_REGION,
            Partition::China => "cn-north-1",
        }
    }

    pub fn region_table(self) -> RegionTable {
        match self {
            Partition::Global => RegionTable::aws(),
            Partition::China => RegionTable::china(),
        }
    }

    /// Output path for a service, or `None` when the partition does not
    /// publish it.
    pub fn output_path(self, service: ServiceKind) -> Option<&'static str> {
        match (self, service) {
            (Partition::Global, service) => Some(service.output_path()),
            (Partition::China, ServiceKind::Ec2) => Some("instances-cn.json"),
            (Partition::China, ServiceKind::Rds) => Some("rds/instances-cn.json"),
            (Partition::China, ServiceKind::Cache) => Some("cache/instances-cn.json"),
            (Partition::China, ServiceKind::OpenSearch) => Some("opensearch/instances-cn.json"),
            (Partition::China, ServiceKind::Redshift) => Some("redshift/instances-cn.json"),
            (Partition::China, ServiceKind::SageMaker | ServiceKind::Azure) => None,
        }
    }

    pub fn supports(self, service: ServiceKind) -> bool {
        self.output_path(service).is_some()
    }
}
