use serde::Deserialize;

use super::{generation, present, LocationAttributes, ProductAttributes, ServiceProfile, BUNDLED_STORAGE_EXCLUSIONS};
use crate::error::CollectResult;
use crate::format::{parse_count, parse_quantity};
use crate::models::{InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, REDSHIFT_FAMILIES};

pub const PLATFORM: &str = "redshift";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedshiftAttributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_type: Option<String>,
    pub usage_family: Option<String>,
    pub vcpu: Option<String>,
    pub memory: Option<String>,
    pub storage: Option<String>,
    pub io: Option<String>,
    pub current_generation: Option<String>,
}

impl ProductAttributes for RedshiftAttributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::Redshift,
        product_families: &["Compute Instance"],
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

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        let mut spec = InstanceSpec {
            family: present(&self.usage_family),
            pretty_name: pretty_name(instance_type, REDSHIFT_FAMILIES),
            vcpu: self.vcpu.as_deref().and_then(parse_count),
            memory: self.memory.as_deref().and_then(parse_quantity),
            storage: present(&self.storage),
            generation: generation(self.current_generation.as_deref()),
            ..InstanceSpec::new(instance_type)
        };
        if let Some(io) = present(&self.io) {
            spec.extra.insert("io".to_string(), serde_json::Value::String(io));
        }
        spec
    }
}
