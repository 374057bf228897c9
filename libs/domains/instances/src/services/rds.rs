use serde::Deserialize;

use super::{generation, present, LocationAttributes, ProductAttributes, ServiceProfile, DEFAULT_EXCLUSIONS};
use crate::error::{CollectError, CollectResult, SkipReason};
use crate::format::{parse_count, parse_quantity};
use crate::models::{InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, RDS_FAMILIES};

/// Storage mode of Aurora I/O-Optimized SKUs
const IO_OPTIMIZED_STORAGE: &str = "Aurora IO Optimization Mode";

/// Engine code under which I/O-Optimized Aurora prices are published
const IO_OPTIMIZED_ENGINE_CODE: &str = "211";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdsAttributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_type: Option<String>,
    pub instance_family: Option<String>,
    pub vcpu: Option<String>,
    pub memory: Option<String>,
    pub network_performance: Option<String>,
    pub current_generation: Option<String>,
    pub physical_processor: Option<String>,
    pub processor_architecture: Option<String>,
    pub storage: Option<String>,
    pub database_engine: Option<String>,
    pub engine_code: Option<String>,
    pub deployment_option: Option<String>,
}

impl RdsAttributes {
    fn is_io_optimized(&self) -> bool {
        self.storage.as_deref() == Some(IO_OPTIMIZED_STORAGE)
    }

    fn code(&self) -> Option<String> {
        if self.is_io_optimized() {
            return Some(IO_OPTIMIZED_ENGINE_CODE.to_string());
        }
        present(&self.engine_code)
    }
}

impl ProductAttributes for RdsAttributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::Rds,
        product_families: &["Database Instance"],
        excluded_descriptions: DEFAULT_EXCLUSIONS,
        price_style: PriceStyle::Numeric,
    };

    fn location(&self) -> &LocationAttributes {
        &self.location
    }

    fn instance_type(&self) -> Option<String> {
        present(&self.instance_type)
    }

    /// Prices are keyed by `engineCode`, or by the engine name when the
    /// product has no code. I/O-Optimized Aurora SKUs use their own code.
    fn platforms(&self) -> CollectResult<Vec<String>> {
        match (self.code(), present(&self.database_engine)) {
            (Some(code), _) => Ok(vec![code]),
            (None, Some(engine)) => Ok(vec![engine]),
            (None, None) => Err(CollectError::UnknownPlatform {
                os: self.database_engine.clone().unwrap_or_default(),
                software: self.engine_code.clone().unwrap_or_default(),
            }),
        }
    }

    /// The engine name is shared by every code of that engine, including
    /// I/O-Optimized Aurora, so it holds the highest price among them.
    fn aliases(&self) -> Vec<String> {
        let Some(code) = self.code() else {
            return Vec::new();
        };
        present(&self.database_engine)
            .filter(|engine| *engine != code)
            .into_iter()
            .collect()
    }

    /// Multi-AZ rows carry the standby surcharge, not the instance price.
    fn filter(&self) -> Option<SkipReason> {
        match self.deployment_option.as_deref() {
            None | Some("Single-AZ") => None,
            Some(_) => Some(SkipReason::FilteredProduct),
        }
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        let graviton = self
            .physical_processor
            .as_deref()
            .is_some_and(|processor| processor.contains("Graviton"));
        let arch = match self.processor_architecture.as_deref() {
            _ if graviton => vec!["arm64".to_string()],
            Some(value) if value.contains("64-bit") => vec!["x86_64".to_string()],
            _ => Vec::new(),
        };

        InstanceSpec {
            family: present(&self.instance_family),
            pretty_name: pretty_name(instance_type, RDS_FAMILIES),
            vcpu: self.vcpu.as_deref().and_then(parse_count),
            memory: self.memory.as_deref().and_then(parse_quantity),
            arch,
            network_performance: present(&self.network_performance),
            generation: generation(self.current_generation.as_deref()),
            physical_processor: present(&self.physical_processor),
            storage: present(&self.storage).filter(|storage| storage != IO_OPTIMIZED_STORAGE),
            ..InstanceSpec::new(instance_type)
        }
    }
}
