//! Savings plan rate documents.
//!
//! Rates are already hourly; they land directly in `reserved` under the
//! `Savings` offering class.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::collector::{SkuIndex, SkuLookup};
use crate::error::CollectError;
use crate::format::parse_price;
use crate::merger::{PriceTuple, TuplePrice};
use crate::report::CollectionReport;
use crate::terms::ReservedTerm;

const SAVINGS_CLASS: &str = "savings";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavingsPlanDocument {
    #[serde(default)]
    pub products: Vec<SavingsPlanProduct>,
    #[serde(default)]
    pub terms: SavingsPlanTerms,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavingsPlanProduct {
    pub sku: String,
    #[serde(default)]
    pub attributes: SavingsPlanAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlanAttributes {
    pub purchase_option: Option<String>,
    pub purchase_term: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlanTerms {
    #[serde(default)]
    pub savings_plan: Vec<SavingsPlanTerm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavingsPlanTerm {
    pub sku: String,
    #[serde(default)]
    pub rates: Vec<SavingsPlanRate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlanRate {
    pub discounted_sku: String,
    pub discounted_rate: DiscountedRate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountedRate {
    pub price: String,
    pub currency: String,
}

impl SavingsPlanDocument {
    /// Reserved tuples for every rate whose discounted SKU is in `skus`.
    /// Rates in another currency than `currency` are malformed.
    pub fn tuples(
        &self,
        skus: &SkuIndex,
        currency: &str,
        report: &mut CollectionReport,
    ) -> Vec<PriceTuple> {
        let mut plans = BTreeMap::new();
        for product in &self.products {
            let attributes = &product.attributes;
            match ReservedTerm::translate(
                attributes.purchase_term.as_deref(),
                attributes.purchase_option.as_deref(),
                Some(SAVINGS_CLASS),
            ) {
                Ok(term) => {
                    plans.insert(product.sku.as_str(), term);
                }
                Err(error) => report.record(&CollectError::from(error)),
            }
        }

        let mut tuples = Vec::new();
        for plan in &self.terms.savings_plan {
            let Some(term) = plans.get(plan.sku.as_str()) else {
                continue;
            };
            for rate in &plan.rates {
                let target = match skus.lookup(&rate.discounted_sku) {
                    SkuLookup::Target(target) => target,
                    SkuLookup::Ignored => continue,
                    SkuLookup::Orphan => {
                        report.record(&CollectError::OrphanPricingRecord {
                            key: rate.discounted_sku.clone(),
                        });
                        continue;
                    }
                };
                if rate.discounted_rate.currency != currency {
                    report.record(&CollectError::MalformedPrice {
                        raw: format!(
                            "{} {}",
                            rate.discounted_rate.price, rate.discounted_rate.currency
                        ),
                    });
                    continue;
                }
                let hourly = match parse_price(&rate.discounted_rate.price) {
                    Ok(hourly) => hourly,
                    Err(error) => {
                        report.record(&error);
                        continue;
                    }
                };
                tuples.extend(target.tuples(&TuplePrice::Reserved {
                    term: *term,
                    hourly,
                }));
            }
        }
        tuples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::SkuTarget;
    use crate::error::SkipReason;
    use crate::models::ServiceKind;
    use serde_json::json;

    #[test]
    fn test_rates_become_savings_terms() {
        let document: SavingsPlanDocument = serde_json::from_value(json!({
            "products": [
                {"sku": "PLAN1", "attributes": {"purchaseOption": "No Upfront", "purchaseTerm": "1yr"}},
                {"sku": "PLAN3", "attributes": {"purchaseOption": "All Upfront", "purchaseTerm": "3yr"}}
            ],
            "terms": {
                "savingsPlan": [
                    {"sku": "PLAN1", "rates": [
                        {"discountedSku": "SKU1", "discountedRate": {"price": "0.062", "currency": "USD"}},
                        {"discountedSku": "UNKNOWN", "discountedRate": {"price": "0.01", "currency": "USD"}}
                    ]},
                    {"sku": "PLAN3", "rates": [
                        {"discountedSku": "SKU1", "discountedRate": {"price": "0.041", "currency": "CNY"}}
                    ]}
                ]
            }
        }))
        .unwrap();
        let mut skus = SkuIndex::new();
        skus.insert(
            "SKU1",
            SkuTarget::new("m5.large", "us-east-1", vec!["linux".to_string()]),
        );
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let tuples = document.tuples(&skus, "USD", &mut report);

        assert_eq!(tuples.len(), 1);
        match &tuples[0].price {
            TuplePrice::Reserved { term, hourly } => {
                assert_eq!(term.key(), "yrTerm1Savings.noUpfront");
                assert_eq!(*hourly, 0.062);
            }
            other => panic!("unexpected price {other:?}"),
        }
        assert_eq!(report.count(SkipReason::OrphanRecord), 1);
        assert_eq!(report.count(SkipReason::MalformedPrice), 1);
    }

    #[test]
    fn test_filtered_skus_are_not_orphans() {
        let document: SavingsPlanDocument = serde_json::from_value(json!({
            "products": [
                {"sku": "PLAN1", "attributes": {"purchaseOption": "No Upfront", "purchaseTerm": "1yr"}}
            ],
            "terms": {
                "savingsPlan": [
                    {"sku": "PLAN1", "rates": [
                        {"discountedSku": "SHARED", "discountedRate": {"price": "0.062", "currency": "USD"}},
                        {"discountedSku": "DEDICATED", "discountedRate": {"price": "0.07", "currency": "USD"}}
                    ]}
                ]
            }
        }))
        .unwrap();
        let mut skus = SkuIndex::new();
        skus.insert(
            "SHARED",
            SkuTarget::new("m5.large", "us-east-1", vec!["linux".to_string()]),
        );
        skus.ignore("DEDICATED");
        let mut report = CollectionReport::new(ServiceKind::Ec2);

        let tuples = document.tuples(&skus, "USD", &mut report);

        assert_eq!(tuples.len(), 1);
        assert_eq!(report.count(SkipReason::OrphanRecord), 0);
    }
}
