use serde::Deserialize;
use serde_json::Value;

use super::{present, LocationAttributes, ProductAttributes, ServiceProfile, DEFAULT_EXCLUSIONS};
use crate::error::{CollectError, CollectResult};
use crate::format::{parse_count, parse_quantity};
use crate::models::{InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, SAGEMAKER_FAMILIES};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SageMakerAttributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_name: Option<String>,
    pub instance_type: Option<String>,
    #[serde(rename = "usagetype")]
    pub usage_type: Option<String>,
    pub instance_family: Option<String>,
    #[serde(alias = "vcpu")]
    pub v_cpu: Option<String>,
    pub memory: Option<String>,
    pub gpu: Option<String>,
    pub gpu_memory: Option<String>,
    /// ML component: Hosting, Training, Notebook, ...
    #[serde(rename = "platoinstancetype")]
    pub component: Option<String>,
}

impl ProductAttributes for SageMakerAttributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::SageMaker,
        product_families: &["ML Instance"],
        excluded_descriptions: DEFAULT_EXCLUSIONS,
        price_style: PriceStyle::Numeric,
    };

    fn location(&self) -> &LocationAttributes {
        &self.location
    }

    /// `ml.m5.large-Hosting` -> `ml.m5.large`; `NA` falls back to the
    /// usage type (`USE1-Notebk:ml.t3.medium` -> `ml.t3.medium`).
    fn instance_type(&self) -> Option<String> {
        if let Some(name) = present(&self.instance_name) {
            return Some(name);
        }
        let from_type = self
            .instance_type
            .as_deref()
            .and_then(|instance_type| instance_type.split('-').next())
            .map(str::trim)
            .filter(|instance_type| !instance_type.is_empty());
        match from_type {
            Some(instance_type) if instance_type != "NA" => Some(instance_type.to_string()),
            _ => self
                .usage_type
                .as_deref()
                .and_then(|usage| usage.split(':').nth(1))
                .map(str::to_string),
        }
    }

    fn platforms(&self) -> CollectResult<Vec<String>> {
        present(&self.component)
            .map(|component| vec![component])
            .ok_or_else(|| CollectError::UnknownPlatform {
                os: self.component.clone().unwrap_or_default(),
                software: String::new(),
            })
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        let mut spec = InstanceSpec {
            family: present(&self.instance_family),
            pretty_name: pretty_name(instance_type, SAGEMAKER_FAMILIES),
            vcpu: self.v_cpu.as_deref().and_then(parse_count),
            memory: self.memory.as_deref().and_then(parse_quantity),
            gpu: self.gpu.as_deref().and_then(parse_count),
            ..InstanceSpec::new(instance_type)
        };
        if let Some(gpu_memory) = present(&self.gpu_memory) {
            spec.extra
                .insert("gpu_memory".to_string(), Value::String(gpu_memory));
        }
        spec
    }
}
