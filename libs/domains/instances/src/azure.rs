//! Azure virtual machine documents: ARM locations, compute resource SKUs,
//! and retail price pages.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CollectError, SkipReason};
use crate::format::{parse_count, parse_quantity};
use crate::merger::{PriceTuple, TuplePrice};
use crate::models::{InstanceSpec, PriceStyle};
use crate::pretty::azure_pretty_name;
use crate::region::RegionTable;
use crate::report::CollectionReport;
use crate::terms::{ReservedComponent, ReservedTerm};

pub const VIRTUAL_MACHINES: &str = "virtualMachines";

/// Retail prices are whole-term for reservations, paid upfront
const RESERVATION_OPTION: &str = "All Upfront";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureLocationList {
    #[serde(default)]
    pub value: Vec<AzureLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureLocation {
    pub name: String,
    pub display_name: Option<String>,
    pub metadata: Option<AzureLocationMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureLocationMetadata {
    pub region_type: Option<String>,
}

impl AzureLocation {
    pub fn is_physical(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.region_type.as_deref())
            == Some("Physical")
    }
}

impl AzureLocationList {
    pub fn physical(&self) -> impl Iterator<Item = &AzureLocation> {
        self.value.iter().filter(|location| location.is_physical())
    }

    /// Writes physical regions and their display names into `table`.
    pub fn register(&self, table: &mut RegionTable) -> usize {
        let mut registered = 0;
        for location in self.physical() {
            let description = location.display_name.as_deref().unwrap_or(&location.name);
            table.insert(description, &location.name);
            registered += 1;
        }
        registered
    }
}

/// One page of `Microsoft.Compute/skus`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSkuPage {
    #[serde(default)]
    pub value: Vec<AzureResourceSku>,
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureResourceSku {
    pub name: String,
    pub resource_type: String,
    pub family: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<AzureCapability>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureCapability {
    pub name: String,
    pub value: String,
}

fn capability_flag(value: &str) -> Option<bool> {
    match value {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

impl AzureResourceSku {
    pub fn is_virtual_machine(&self) -> bool {
        self.resource_type == VIRTUAL_MACHINES
    }

    pub fn to_spec(&self) -> InstanceSpec {
        let mut spec = InstanceSpec {
            family: self.family.clone(),
            pretty_name: Some(azure_pretty_name(&self.name)),
            ..InstanceSpec::new(&self.name)
        };

        for capability in &self.capabilities {
            let value = capability.value.as_str();
            match capability.name.as_str() {
                "vCPUs" => spec.vcpu = parse_count(value),
                "MemoryGB" => spec.memory = parse_quantity(value),
                "GPUs" => spec.gpu = parse_count(value),
                "CpuArchitectureType" => {
                    spec.arch = vec![match value {
                        "x64" => "x86_64".to_string(),
                        "Arm64" => "arm64".to_string(),
                        other => other.to_lowercase(),
                    }]
                }
                "AcceleratedNetworkingEnabled" => {
                    spec.enhanced_networking = capability_flag(value)
                }
                "ACUs" | "MaxDataDiskCount" | "vCPUsPerCore" => {
                    if let Some(count) = parse_count(value) {
                        spec.extra
                            .insert(extra_key(&capability.name).to_string(), Value::from(count));
                    }
                }
                "PremiumIO" | "LowPriorityCapable" | "EncryptionAtHostSupported" | "UltraSSDAvailable" => {
                    if let Some(flag) = capability_flag(value) {
                        spec.extra
                            .insert(extra_key(&capability.name).to_string(), Value::Bool(flag));
                    }
                }
                "HyperVGenerations" => {
                    spec.extra.insert(
                        extra_key(&capability.name).to_string(),
                        Value::String(value.to_string()),
                    );
                }
                _ => {}
            }
        }
        spec
    }
}

fn extra_key(capability: &str) -> &'static str {
    match capability {
        "ACUs" => "acu",
        "MaxDataDiskCount" => "max_data_disks",
        "vCPUsPerCore" => "vcpus_per_core",
        "PremiumIO" => "premium_io",
        "LowPriorityCapable" => "low_priority",
        "EncryptionAtHostSupported" => "encryption_at_host",
        "UltraSSDAvailable" => "ultra_ssd",
        "HyperVGenerations" => "hyperv_generations",
        _ => "other",
    }
}

/// One page of the retail prices API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetailPricePage {
    #[serde(default)]
    pub items: Vec<RetailPrice>,
    pub next_page_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailPrice {
    #[serde(default)]
    pub currency_code: String,
    pub retail_price: f64,
    #[serde(default)]
    pub arm_region_name: String,
    #[serde(default)]
    pub arm_sku_name: String,
    #[serde(default)]
    pub meter_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub unit_of_measure: String,
    #[serde(rename = "type", default)]
    pub price_type: String,
    pub reservation_term: Option<String>,
}

impl RetailPrice {
    pub fn platform(&self) -> &'static str {
        if self.product_name.contains("Windows") {
            "windows"
        } else {
            "linux"
        }
    }

    /// Tuples for one retail price item. Skipped items are counted in
    /// `report`.
    pub fn tuples(&self, report: &mut CollectionReport) -> Vec<PriceTuple> {
        if self.arm_sku_name.is_empty() || self.arm_region_name.is_empty() {
            report.record(&CollectError::MalformedProduct {
                sku: self.meter_name.clone(),
                details: "retail price without armSkuName or armRegionName".to_string(),
            });
            return Vec::new();
        }
        if !self.currency_code.is_empty() && self.currency_code != "USD" {
            report.record(&CollectError::MalformedPrice {
                raw: format!("{} {}", self.retail_price, self.currency_code),
            });
            return Vec::new();
        }
        if !self.retail_price.is_finite() || self.retail_price < 0.0 {
            report.record(&CollectError::MalformedPrice {
                raw: self.retail_price.to_string(),
            });
            return Vec::new();
        }

        let tuple = |price| PriceTuple::new(&self.arm_sku_name, &self.arm_region_name, self.platform(), price);

        match self.price_type.as_str() {
            "Consumption" => {
                if self.meter_name.contains("Low Priority") || self.unit_of_measure != "1 Hour" {
                    report.skip(SkipReason::FilteredProduct);
                    return Vec::new();
                }
                if self.retail_price == 0.0 {
                    return Vec::new();
                }
                if self.meter_name.contains("Spot") {
                    vec![tuple(TuplePrice::Spot(self.retail_price))]
                } else {
                    vec![tuple(TuplePrice::OnDemand(
                        PriceStyle::Numeric.value(self.retail_price),
                    ))]
                }
            }
            "Reservation" => {
                let term = match ReservedTerm::translate(
                    self.reservation_term.as_deref(),
                    Some(RESERVATION_OPTION),
                    None,
                ) {
                    Ok(term) => term,
                    Err(error) => {
                        report.record(&CollectError::from(error));
                        return Vec::new();
                    }
                };
                vec![
                    tuple(TuplePrice::ReservedComponent {
                        term,
                        component: ReservedComponent::Hourly,
                        amount: 0.0,
                    }),
                    tuple(TuplePrice::ReservedComponent {
                        term,
                        component: ReservedComponent::Upfront,
                        amount: self.retail_price,
                    }),
                ]
            }
            _ => {
                report.skip(SkipReason::FilteredProduct);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceValue, ServiceKind};
    use serde_json::json;

    fn price(value: serde_json::Value) -> RetailPrice {
        let mut base = json!({
            "currencyCode": "USD",
            "retailPrice": 0.096,
            "armRegionName": "eastus",
            "armSkuName": "Standard_D2s_v3",
            "meterName": "D2s v3",
            "productName": "Virtual Machines DSv3 Series",
            "unitOfMeasure": "1 Hour",
            "type": "Consumption"
        });
        if let (Some(base), Some(value)) = (base.as_object_mut(), value.as_object()) {
            for (key, field) in value {
                base.insert(key.clone(), field.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_consumption_split() {
        let mut report = CollectionReport::new(ServiceKind::Azure);

        let ondemand = price(json!({})).tuples(&mut report);
        let spot = price(json!({"meterName": "D2s v3 Spot", "retailPrice": 0.02})).tuples(&mut report);
        let windows = price(json!({"productName": "Virtual Machines DSv3 Series Windows"})).tuples(&mut report);
        let low_priority = price(json!({"meterName": "D2s v3 Low Priority"})).tuples(&mut report);

        assert_eq!(
            ondemand[0].price,
            TuplePrice::OnDemand(PriceValue::Number(0.096))
        );
        assert_eq!(ondemand[0].platform, "linux");
        assert_eq!(spot[0].price, TuplePrice::Spot(0.02));
        assert_eq!(windows[0].platform, "windows");
        assert!(low_priority.is_empty());
        assert_eq!(report.count(SkipReason::FilteredProduct), 1);
    }

    #[test]
    fn test_reservation_is_upfront_only() {
        let mut report = CollectionReport::new(ServiceKind::Azure);

        let tuples = price(json!({
            "type": "Reservation",
            "retailPrice": 876.0,
            "unitOfMeasure": "1 Hour",
            "reservationTerm": "1 Year"
        }))
        .tuples(&mut report);

        assert_eq!(tuples.len(), 2);
        assert!(tuples.iter().any(|tuple| matches!(
            &tuple.price,
            TuplePrice::ReservedComponent { term, component: ReservedComponent::Upfront, amount }
                if term.key() == "yrTerm1Standard.allUpfront" && *amount == 876.0
        )));
    }

    #[test]
    fn test_dev_test_is_skipped() {
        let mut report = CollectionReport::new(ServiceKind::Azure);
        assert!(price(json!({"type": "DevTestConsumption"}))
            .tuples(&mut report)
            .is_empty());
    }

    #[test]
    fn test_sku_capabilities() {
        let sku: AzureResourceSku = serde_json::from_value(json!({
            "resourceType": "virtualMachines",
            "name": "Standard_D2s_v3",
            "family": "standardDSv3Family",
            "capabilities": [
                {"name": "vCPUs", "value": "2"},
                {"name": "MemoryGB", "value": "8"},
                {"name": "CpuArchitectureType", "value": "x64"},
                {"name": "ACUs", "value": "160"},
                {"name": "PremiumIO", "value": "True"},
                {"name": "AcceleratedNetworkingEnabled", "value": "True"},
                {"name": "MaxResourceVolumeMB", "value": "16384"}
            ]
        }))
        .unwrap();

        let spec = sku.to_spec();

        assert!(sku.is_virtual_machine());
        assert_eq!(spec.instance_type, "Standard_D2s_v3");
        assert_eq!(spec.pretty_name.as_deref(), Some("Standard D2s v3"));
        assert_eq!(spec.vcpu, Some(2));
        assert_eq!(spec.memory, Some(8.0));
        assert_eq!(spec.arch, vec!["x86_64".to_string()]);
        assert_eq!(spec.enhanced_networking, Some(true));
        assert_eq!(spec.extra["acu"], json!(160));
        assert_eq!(spec.extra["premium_io"], json!(true));
        assert_eq!(spec.extra.len(), 2);
    }

    #[test]
    fn test_physical_locations() {
        let locations: AzureLocationList = serde_json::from_value(json!({
            "value": [
                {"name": "eastus", "displayName": "East US", "metadata": {"regionType": "Physical"}},
                {"name": "eastusstg", "displayName": "East US STG", "metadata": {"regionType": "Logical"}}
            ]
        }))
        .unwrap();

        let mut table = RegionTable::new();

        assert_eq!(locations.register(&mut table), 1);
        assert_eq!(table.description("eastus"), Some("East US"));
        assert_eq!(table.description("eastusstg"), None);
    }
}
