//! AWS price list document shapes: the offer index, per-region indexes,
//! and the offer file itself.

use serde::Deserialize;
use std::collections::BTreeMap;

/// `offers/v1.0/aws/index.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferIndex {
    #[serde(default)]
    pub offers: BTreeMap<String, OfferIndexEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferIndexEntry {
    pub current_region_index_url: Option<String>,
    pub current_savings_plan_index_url: Option<String>,
}

/// Region index of one offer: `regions{code: {currentVersionUrl}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionIndex {
    #[serde(default)]
    pub regions: BTreeMap<String, RegionIndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionIndexEntry {
    pub region_code: Option<String>,
    pub current_version_url: String,
}

/// Savings plan region index: `regions[{regionCode, versionUrl}]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavingsPlanRegionIndex {
    #[serde(default)]
    pub regions: Vec<SavingsPlanRegionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlanRegionEntry {
    pub region_code: String,
    pub version_url: String,
}

/// Products plus on-demand and reserved terms for one service (and
/// usually one region).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDocument {
    #[serde(default)]
    pub offer_code: Option<String>,
    #[serde(default)]
    pub products: BTreeMap<String, Product>,
    #[serde(default)]
    pub terms: OfferTerms,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: String,
    #[serde(default)]
    pub product_family: Option<String>,
    /// Service-specific attribute map, read through a typed schema
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// `sku -> offer term code -> term`
pub type TermsBySku = BTreeMap<String, BTreeMap<String, OfferTerm>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferTerms {
    #[serde(rename = "OnDemand", default)]
    pub on_demand: TermsBySku,
    #[serde(rename = "Reserved", default)]
    pub reserved: TermsBySku,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerm {
    pub sku: String,
    #[serde(default)]
    pub price_dimensions: BTreeMap<String, PriceDimension>,
    #[serde(default)]
    pub term_attributes: TermAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDimension {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_per_unit: BTreeMap<String, String>,
}

impl PriceDimension {
    /// Price in the partition's currency (`USD`, `CNY`).
    pub fn price_in(&self, currency: &str) -> Option<&str> {
        self.price_per_unit.get(currency).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TermAttributes {
    pub lease_contract_length: Option<String>,
    pub purchase_option: Option<String>,
    pub offering_class: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_document_shape() {
        let document: OfferDocument = serde_json::from_value(json!({
            "formatVersion": "v1.0",
            "offerCode": "AmazonEC2",
            "products": {
                "SKU1": {
                    "sku": "SKU1",
                    "productFamily": "Compute Instance",
                    "attributes": {"instanceType": "m5.large"}
                }
            },
            "terms": {
                "Reserved": {
                    "SKU1": {
                        "SKU1.TERM": {
                            "sku": "SKU1",
                            "priceDimensions": {
                                "SKU1.TERM.DIM": {
                                    "unit": "Quantity",
                                    "description": "Upfront Fee",
                                    "pricePerUnit": {"USD": "876"}
                                }
                            },
                            "termAttributes": {
                                "LeaseContractLength": "1yr",
                                "PurchaseOption": "All Upfront",
                                "OfferingClass": "standard"
                            }
                        }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(document.offer_code.as_deref(), Some("AmazonEC2"));
        assert!(document.terms.on_demand.is_empty());
        let term = &document.terms.reserved["SKU1"]["SKU1.TERM"];
        assert_eq!(term.term_attributes.lease_contract_length.as_deref(), Some("1yr"));
        assert_eq!(term.price_dimensions["SKU1.TERM.DIM"].price_in("USD"), Some("876"));
    }

    #[test]
    fn test_offer_index_shape() {
        let index: OfferIndex = serde_json::from_value(json!({
            "offers": {
                "AmazonEC2": {
                    "offerCode": "AmazonEC2",
                    "currentRegionIndexUrl": "/offers/v1.0/aws/AmazonEC2/current/region_index.json",
                    "currentSavingsPlanIndexUrl": "/savingsPlan/v1.0/aws/AWSComputeSavingsPlan/current/region_index.json"
                }
            }
        }))
        .unwrap();

        let entry = &index.offers["AmazonEC2"];
        assert!(entry.current_region_index_url.is_some());
        assert!(entry.current_savings_plan_index_url.is_some());
    }
}
