use serde::Deserialize;

use super::{generation, present, LocationAttributes, ProductAttributes, ServiceProfile, DEFAULT_EXCLUSIONS};
use crate::error::{CollectError, CollectResult, SkipReason};
use crate::format::{parse_count, parse_quantity};
use crate::models::{Ecu, InstanceSpec, PriceStyle, ServiceKind};
use crate::pretty::{pretty_name, EC2_FAMILIES};

/// High-memory types published without their `.metal` size
const METAL_ONLY: &[&str] = &["u-6tb1", "u-9tb1", "u-12tb1"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Attributes {
    #[serde(flatten)]
    pub location: LocationAttributes,
    pub instance_type: Option<String>,
    pub instance_family: Option<String>,
    pub vcpu: Option<String>,
    pub memory: Option<String>,
    pub network_performance: Option<String>,
    pub current_generation: Option<String>,
    pub gpu: Option<String>,
    pub ecu: Option<String>,
    pub physical_processor: Option<String>,
    pub processor_architecture: Option<String>,
    pub processor_features: Option<String>,
    pub clock_speed: Option<String>,
    pub enhanced_networking_supported: Option<String>,
    pub storage: Option<String>,
    pub tenancy: Option<String>,
    #[serde(rename = "capacitystatus")]
    pub capacity_status: Option<String>,
    pub license_model: Option<String>,
    #[serde(rename = "instancesku")]
    pub instance_sku: Option<String>,
    pub operating_system: Option<String>,
    pub pre_installed_sw: Option<String>,
}

/// `operatingSystem` x `preInstalledSw` -> platform key, e.g. `mswinSQLWeb`
pub fn translate_platform(operating_system: &str, software: &str) -> CollectResult<String> {
    let os = match operating_system {
        "Linux" | "Linux/UNIX" => "linux",
        "RHEL"
        | "Red Hat Enterprise Linux"
        | "Red Hat Enterprise Linux with HA"
        | "Red Hat Enterprise Linux (Amazon VPC)" => "rhel",
        "SUSE" | "SUSE Linux" => "sles",
        "Windows" => "mswin",
        "Ubuntu Pro" | "Ubuntu Pro Linux" => "ubuntu",
        _ => "",
    };
    let software_key = match software {
        "" | "NA" => Some(""),
        "SQL Std" => Some("SQL"),
        "SQL Web" => Some("SQLWeb"),
        "SQL Ent" => Some("SQLEnterprise"),
        _ => None,
    };
    match (os, software_key) {
        ("", _) | (_, None) => Err(CollectError::UnknownPlatform {
            os: operating_system.to_string(),
            software: software.to_string(),
        }),
        (os, Some(software_key)) => Ok(format!("{os}{software_key}")),
    }
}

impl Ec2Attributes {
    fn arch(&self) -> Vec<String> {
        let processor = self.physical_processor.as_deref().unwrap_or_default();
        if processor.contains("Graviton") || processor.starts_with("AWS") {
            return vec!["arm64".to_string()];
        }
        let mut arch = vec!["x86_64".to_string()];
        if self
            .processor_architecture
            .as_deref()
            .is_some_and(|value| value.contains("32-bit"))
        {
            arch.push("i386".to_string());
        }
        arch
    }

    fn ecu(&self) -> Option<Ecu> {
        match self.ecu.as_deref()? {
            "Variable" => Some(Ecu::Variable),
            raw => parse_quantity(raw).map(Ecu::Units),
        }
    }
}

impl ProductAttributes for Ec2Attributes {
    const PROFILE: ServiceProfile = ServiceProfile {
        service: ServiceKind::Ec2,
        product_families: &["Compute Instance", "Compute Instance (bare metal)"],
        excluded_descriptions: DEFAULT_EXCLUSIONS,
        price_style: PriceStyle::Formatted,
    };

    fn location(&self) -> &LocationAttributes {
        &self.location
    }

    fn instance_type(&self) -> Option<String> {
        let instance_type = present(&self.instance_type)?;
        if METAL_ONLY.contains(&instance_type.as_str()) {
            return Some(format!("{instance_type}.metal"));
        }
        Some(instance_type)
    }

    fn platforms(&self) -> CollectResult<Vec<String>> {
        let platform = translate_platform(
            self.operating_system.as_deref().unwrap_or_default(),
            self.pre_installed_sw.as_deref().unwrap_or_default(),
        )?;
        Ok(vec![platform])
    }

    /// Shared tenancy, used capacity, bundled license; no instance-level
    /// SKUs and no bare dedicated-host families.
    fn filter(&self) -> Option<SkipReason> {
        let shared = self.tenancy.as_deref() == Some("Shared");
        let used = self.capacity_status.as_deref().is_none_or(|status| status == "Used");
        let licensed = self
            .license_model
            .as_deref()
            .is_none_or(|model| model == "No License required");
        let sized = self
            .instance_type()
            .is_some_and(|instance_type| instance_type.contains('.'));

        if shared && used && licensed && sized && self.instance_sku.is_none() {
            None
        } else {
            Some(SkipReason::FilteredProduct)
        }
    }

    fn normalize(&self, instance_type: &str) -> InstanceSpec {
        let features = self.processor_features.as_deref().unwrap_or_default();
        let flag = |feature: &str| features.contains(feature).then_some(true);

        InstanceSpec {
            family: present(&self.instance_family),
            pretty_name: pretty_name(instance_type, EC2_FAMILIES),
            vcpu: self.vcpu.as_deref().and_then(parse_count),
            memory: self.memory.as_deref().and_then(parse_quantity),
            arch: self.arch(),
            gpu: self.gpu.as_deref().and_then(parse_count),
            ecu: self.ecu(),
            network_performance: present(&self.network_performance),
            generation: generation(self.current_generation.as_deref()),
            physical_processor: present(&self.physical_processor),
            clock_speed_ghz: present(&self.clock_speed),
            intel_avx: flag("Intel AVX"),
            intel_avx2: flag("Intel AVX2"),
            intel_avx512: flag("Intel AVX512"),
            intel_turbo: flag("Intel Turbo"),
            enhanced_networking: (self.enhanced_networking_supported.as_deref() == Some("Yes"))
                .then_some(true),
            storage: present(&self.storage),
            ..InstanceSpec::new(instance_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Generation;
    use serde_json::json;

    fn attributes(overrides: serde_json::Value) -> Ec2Attributes {
        let mut base = json!({
            "location": "US East (N. Virginia)",
            "locationType": "AWS Region",
            "instanceType": "m5.large",
            "instanceFamily": "General purpose",
            "vcpu": "2",
            "memory": "8 GiB",
            "networkPerformance": "Up to 10 Gigabit",
            "currentGeneration": "Yes",
            "ecu": "10",
            "physicalProcessor": "Intel Xeon Platinum 8175",
            "processorArchitecture": "64-bit",
            "processorFeatures": "Intel AVX; Intel AVX2; Intel AVX512; Intel Turbo",
            "clockSpeed": "3.1 GHz",
            "enhancedNetworkingSupported": "Yes",
            "storage": "EBS only",
            "tenancy": "Shared",
            "capacitystatus": "Used",
            "licenseModel": "No License required",
            "operatingSystem": "Linux",
            "preInstalledSw": "NA"
        });
        if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_normalize() {
        let spec = attributes(json!({})).normalize("m5.large");

        assert_eq!(spec.instance_type, "m5.large");
        assert_eq!(spec.family.as_deref(), Some("General purpose"));
        assert_eq!(spec.vcpu, Some(2));
        assert_eq!(spec.memory, Some(8.0));
        assert_eq!(spec.arch, vec!["x86_64".to_string()]);
        assert_eq!(spec.ecu, Some(Ecu::Units(10.0)));
        assert_eq!(spec.generation, Some(Generation::Current));
        assert_eq!(spec.intel_avx512, Some(true));
        assert_eq!(spec.enhanced_networking, Some(true));
        assert_eq!(spec.gpu, None);
        assert_eq!(spec.pretty_name.as_deref(), Some("M5 General Purpose Large"));
    }

    #[test]
    fn test_graviton_and_variable_ecu() {
        let spec = attributes(json!({
            "instanceType": "t4g.micro",
            "physicalProcessor": "AWS Graviton2 Processor",
            "ecu": "Variable",
            "processorFeatures": null
        }))
        .normalize("t4g.micro");

        assert_eq!(spec.arch, vec!["arm64".to_string()]);
        assert_eq!(spec.ecu, Some(Ecu::Variable));
        assert_eq!(spec.intel_avx, None);
    }

    #[test]
    fn test_translate_platform() {
        assert_eq!(translate_platform("Linux", "NA").unwrap(), "linux");
        assert_eq!(translate_platform("Windows", "SQL Web").unwrap(), "mswinSQLWeb");
        assert_eq!(translate_platform("RHEL", "SQL Ent").unwrap(), "rhelSQLEnterprise");
        assert_eq!(translate_platform("SUSE", "NA").unwrap(), "sles");
        assert_eq!(translate_platform("Ubuntu Pro Linux", "NA").unwrap(), "ubuntu");
        assert_eq!(
            translate_platform("Red Hat Enterprise Linux (Amazon VPC)", "NA").unwrap(),
            "rhel"
        );
        assert!(matches!(
            translate_platform("BeOS", "NA"),
            Err(CollectError::UnknownPlatform { .. })
        ));
        assert!(translate_platform("Linux", "Oracle").is_err());
    }

    #[test]
    fn test_filter() {
        assert_eq!(attributes(json!({})).filter(), None);
        assert_eq!(
            attributes(json!({"tenancy": "Dedicated"})).filter(),
            Some(SkipReason::FilteredProduct)
        );
        assert_eq!(
            attributes(json!({"capacitystatus": "UnusedCapacityReservation"})).filter(),
            Some(SkipReason::FilteredProduct)
        );
        assert_eq!(
            attributes(json!({"licenseModel": "Bring your own license"})).filter(),
            Some(SkipReason::FilteredProduct)
        );
        assert_eq!(
            attributes(json!({"instancesku": "ABCDEF"})).filter(),
            Some(SkipReason::FilteredProduct)
        );
        assert_eq!(
            attributes(json!({"instanceType": "m5"})).filter(),
            Some(SkipReason::FilteredProduct)
        );
    }

    #[test]
    fn test_metal_only_types() {
        let attrs = attributes(json!({"instanceType": "u-6tb1"}));
        assert_eq!(attrs.instance_type().as_deref(), Some("u-6tb1.metal"));
        assert_eq!(attrs.filter(), None);
    }
}
