use serde::Deserialize;
use serde_json::Value;

use super::{generation, present, LocationAttributes, ProductAttributes, ServiceProfile, DEFAULT_EXCLUSIONS};
use crate::error::{CollectError, CollectResult};
use crate::format::{parse_count, parse_quantity};
use crate::models::{InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, CACHE_FAMILIES};

/// Node types with the reduced connection limit
const SMALL_NODE_TYPES: &[&str] = &[
    "cache.t2.micro",
    "cache.t2.small",
    "cache.t2.medium",
    "cache.t3.micro",
    "cache.t4g.micro",
];

/// Default `maxclients` for a node type
pub fn max_clients(instance_type: &str) -> &'static str {
    if SMALL_NODE_TYPES.contains(&instance_type) {
        "20000"
    } else {
        "65000"
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAttributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_type: Option<String>,
    pub instance_family: Option<String>,
    pub vcpu: Option<String>,
    pub memory: Option<String>,
    pub network_performance: Option<String>,
    pub current_generation: Option<String>,
    pub cache_engine: Option<String>,
}

impl ProductAttributes for CacheAttributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::Cache,
        product_families: &["Cache Instance"],
        excluded_descriptions: DEFAULT_EXCLUSIONS,
        price_style: PriceStyle::Numeric,
    };

    fn location(&self) -> &LocationAttributes {
        &self.location
    }

    fn instance_type(&self) -> Option<String> {
        present(&self.instance_type)
    }

    fn platforms(&self) -> CollectResult<Vec<String>> {
        present(&self.cache_engine)
            .map(|engine| vec![engine])
            .ok_or_else(|| CollectError::UnknownPlatform {
                os: self.cache_engine.clone().unwrap_or_default(),
                software: String::new(),
            })
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        let mut spec = InstanceSpec {
            family: present(&self.instance_family),
            pretty_name: pretty_name(instance_type, CACHE_FAMILIES),
            vcpu: self.vcpu.as_deref().and_then(parse_count),
            memory: self.memory.as_deref().and_then(parse_quantity),
            network_performance: present(&self.network_performance),
            generation: generation(self.current_generation.as_deref()),
            ..InstanceSpec::new(instance_type)
        };
        spec.extra.insert(
            "max_clients".to_string(),
            Value::String(max_clients(instance_type).to_string()),
        );
        spec
    }
}
