use serde::Deserialize;

use super::{present, LocationAttributes, ProductAttributes, ServiceProfile, BUNDLED_STORAGE_EXCLUSIONS};
use crate::error::{CollectResult, SkipReason};
use crate::format::{parse_count, parse_quantity};
use crate::models::{InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, OPENSEARCH_FAMILIES};

pub const PLATFORM: &str = "opensearch";

/// Serverless direct-query capacity shares the instance product family
const DIRECT_QUERY_OPERATION: &str = "DirectQueryAmazonS3GDCOCU";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchAttributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_type: Option<String>,
    pub instance_family: Option<String>,
    pub vcpu: Option<String>,
    pub memory_gib: Option<String>,
    pub storage: Option<String>,
    pub operation: Option<String>,
}

impl ProductAttributes for OpenSearchAttributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::OpenSearch,
        product_families: &["Amazon OpenSearch Service Instance"],
        excluded_descriptions: BUNDLED_STORAGE_EXCLUSIONS,
        price_style: PriceStyle::Numeric,
    };

    fn location(&self) -> &LocationAttributes {
        &self.location
    }

    fn instance_type(&self) -> Option<String> {
        present(&self.instance_type)
    }

    fn platforms(&self) -> CollectResult<Vec<String>> {
        Ok(vec![PLATFORM.to_string()])
    }

    fn filter(&self) -> Option<SkipReason> {
        if self.operation.as_deref() == Some(DIRECT_QUERY_OPERATION) || self.instance_type().is_none() {
            Some(SkipReason::FilteredProduct)
        } else {
            None
        }
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        InstanceSpec {
            family: present(&self.instance_family),
            pretty_name: pretty_name(instance_type, OPENSEARCH_FAMILIES),
            vcpu: self.vcpu.as_deref().and_then(parse_count),
            memory: self.memory_gib.as_deref().and_then(parse_quantity),
            storage: present(&self.storage),
            ..InstanceSpec::new(instance_type)
        }
    }
}
