//! End-to-end collection scenarios for the instances domain
//!
//! These tests drive synthetic vendor documents through the full pipeline:
//! - document decoding (JSON, JSONP, gzip)
//! - per-service collection and region resolution
//! - merging, effectivization and output cleanup
//!
//! No network access; every document is built with `json!`.

use domain_instances::*;
use serde_json::{json, Value};

fn compute_product(sku: &str, instance_type: &str, location: &str, location_type: &str) -> Value {
    json!({
        "sku": sku,
        "productFamily": "Compute Instance",
        "attributes": {
            "location": location,
            "locationType": location_type,
            "instanceType": instance_type,
            "instanceFamily": "General purpose",
            "vcpu": "2",
            "memory": "8 GiB",
            "physicalProcessor": "Intel Xeon Platinum 8175",
            "currentGeneration": "Yes",
            "tenancy": "Shared",
            "capacitystatus": "Used",
            "licenseModel": "No License required",
            "operatingSystem": "Linux",
            "preInstalledSw": "NA"
        }
    })
}

fn hourly_term(sku: &str, price: &str) -> Value {
    json!({
        format!("{sku}.JRTCKXETXF"): {
            "sku": sku,
            "priceDimensions": {
                format!("{sku}.JRTCKXETXF.6YS6EN2CT7"): {
                    "unit": "Hrs",
                    "description": format!("${price} per On Demand Linux Instance Hour"),
                    "pricePerUnit": {"USD": price}
                }
            },
            "termAttributes": {}
        }
    })
}

fn offer(value: Value) -> OfferDocument {
    let bytes = serde_json::to_vec(&value).unwrap();
    decode_json(&bytes).unwrap()
}

fn ec2_output(documents: &[OfferDocument]) -> ServiceOutput {
    let mut aggregator = Aggregator::new(ServiceKind::Ec2);
    for document in documents {
        aggregator.fold_offer(document);
    }
    aggregator.finish()
}

#[test]
fn test_on_demand_price_lands_under_region_and_platform() {
    let document = offer(json!({
        "offerCode": "AmazonEC2",
        "products": {"SKU1": compute_product("SKU1", "m5.large", "US East (N. Virginia)", "AWS Region")},
        "terms": {"OnDemand": {"SKU1": hourly_term("SKU1", "0.1000000000")}}
    }));

    let output = ec2_output(&[document]);
    let json = serde_json::to_value(&output.records).unwrap();

    assert_eq!(json[0]["instance_type"], "m5.large");
    assert_eq!(json[0]["pricing"]["us-east-1"]["linux"]["ondemand"], "0.1");
    assert_eq!(json[0]["regions"]["us-east-1"], "US East (N. Virginia)");
    assert_eq!(output.report.total_skipped(), 0);
}

#[test]
fn test_all_upfront_reserved_price_is_effectivized() {
    let document = offer(json!({
        "products": {"SKU1": compute_product("SKU1", "m5.large", "US East (N. Virginia)", "AWS Region")},
        "terms": {
            "Reserved": {
                "SKU1": {
                    "SKU1.6QCMYABX3D": {
                        "sku": "SKU1",
                        "priceDimensions": {
                            "SKU1.6QCMYABX3D.2TG2D8R56U": {
                                "unit": "Quantity",
                                "description": "Upfront Fee",
                                "pricePerUnit": {"USD": "876"}
                            },
                            "SKU1.6QCMYABX3D.6YS6EN2CT7": {
                                "unit": "Hrs",
                                "description": "USD 0.0 per Linux/UNIX (Amazon VPC), m5.large reserved instance applied",
                                "pricePerUnit": {"USD": "0.0000000000"}
                            }
                        },
                        "termAttributes": {
                            "LeaseContractLength": "1yr",
                            "OfferingClass": "standard",
                            "PurchaseOption": "All Upfront"
                        }
                    }
                }
            }
        }
    }));

    let output = ec2_output(&[document]);
    let pricing = output.records[0].platform("us-east-1", "linux").unwrap();
    let effective = pricing.reserved["yrTerm1Standard.allUpfront"];

    assert!((effective - 0.1).abs() < 1e-12);
    assert!(pricing.ondemand.is_none());
}

#[test]
fn test_outposts_never_reach_region_pricing() {
    let document = offer(json!({
        "products": {
            "STD": compute_product("STD", "m5.large", "US East (N. Virginia)", "AWS Region"),
            "OUT": compute_product("OUT", "m5.large", "US East (N. Virginia)", "AWS Outposts"),
            "OUTONLY": compute_product("OUTONLY", "m5d.large", "US East (N. Virginia)", "AWS Outposts")
        },
        "terms": {
            "OnDemand": {
                "STD": hourly_term("STD", "0.096"),
                "OUT": hourly_term("OUT", "0.5"),
                "OUTONLY": hourly_term("OUTONLY", "0.7")
            }
        }
    }));

    let output = ec2_output(&[document]);

    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].instance_type(), "m5.large");
    assert_eq!(
        output.records[0].platform("us-east-1", "linux").unwrap().ondemand,
        Some(PriceValue::Text("0.096".to_string()))
    );
    assert_eq!(output.report.count(SkipReason::DisallowedLocation), 2);
}

#[test]
fn test_spot_observations_yield_min_and_max() {
    let document = offer(json!({
        "products": {"SKU1": compute_product("SKU1", "m5.large", "US East (N. Virginia)", "AWS Region")},
        "terms": {"OnDemand": {"SKU1": hourly_term("SKU1", "0.096")}}
    }));

    let mut aggregator = Aggregator::new(ServiceKind::Ec2);
    aggregator.fold_offer(&document);

    for price in ["0.05", "0.09", "0.03"] {
        let body = format!(
            r#"callback({{vers:0.01,config:{{rate:"perhr",regions:[{{region:"us-east-1",instanceTypes:[{{type:"generalCurrentGen",sizes:[{{size:"m5.large",valueColumns:[{{name:"linux",prices:{{USD:"{price}"}}}}]}}]}}]}}]}}}})"#
        );
        let feed: SpotFeed = decode_json(body.as_bytes()).unwrap();
        aggregator.fold_spot(&feed);
    }

    let output = aggregator.finish();
    let json = serde_json::to_value(&output.records[0]).unwrap();

    assert_eq!(json["pricing"]["us-east-1"]["linux"]["spot_min"], "0.03");
    assert_eq!(json["pricing"]["us-east-1"]["linux"]["spot_max"], "0.09");
    assert_eq!(json["pricing"]["us-east-1"]["linux"]["ondemand"], "0.096");
}

#[test]
fn test_regional_documents_merge_independently_of_order() {
    let east = offer(json!({
        "products": {"E1": compute_product("E1", "m5.large", "US East (N. Virginia)", "AWS Region")},
        "terms": {"OnDemand": {"E1": hourly_term("E1", "0.096")}}
    }));
    let west = offer(json!({
        "products": {"W1": compute_product("W1", "m5.large", "EU (Ireland)", "AWS Region")},
        "terms": {"OnDemand": {"W1": hourly_term("W1", "0.107")}}
    }));

    let forward = serde_json::to_string(&ec2_output(&[east.clone(), west.clone()]).records).unwrap();
    let backward = serde_json::to_string(&ec2_output(&[west, east]).records).unwrap();

    assert_eq!(forward, backward);
    assert!(forward.contains("\"eu-west-1\":\"EU (Ireland)\""));
}

#[test]
fn test_savings_plan_rates_use_collected_skus() {
    let document = offer(json!({
        "products": {"SKU1": compute_product("SKU1", "m5.large", "US East (N. Virginia)", "AWS Region")},
        "terms": {"OnDemand": {"SKU1": hourly_term("SKU1", "0.096")}}
    }));
    let savings: SavingsPlanDocument = serde_json::from_value(json!({
        "products": [{"sku": "PLAN", "attributes": {"purchaseOption": "No Upfront", "purchaseTerm": "3yr"}}],
        "terms": {"savingsPlan": [{"sku": "PLAN", "rates": [
            {"discountedSku": "SKU1", "discountedRate": {"price": "0.041", "currency": "USD"}}
        ]}]}
    }))
    .unwrap();

    let mut aggregator = Aggregator::new(ServiceKind::Ec2);
    aggregator.fold_offer(&document);
    aggregator.fold_savings(&savings);
    let output = aggregator.finish();

    let pricing = output.records[0].platform("us-east-1", "linux").unwrap();
    assert_eq!(pricing.reserved["yrTerm3Savings.noUpfront"], 0.041);
}

#[test]
fn test_rds_engine_aliases_receive_identical_prices() {
    let document = offer(json!({
        "products": {
            "DB1": {
                "sku": "DB1",
                "productFamily": "Database Instance",
                "attributes": {
                    "location": "US East (N. Virginia)",
                    "instanceType": "db.r5.large",
                    "databaseEngine": "MySQL",
                    "engineCode": "2",
                    "deploymentOption": "Single-AZ",
                    "vcpu": "2",
                    "memory": "16 GiB"
                }
            }
        },
        "terms": {"OnDemand": {"DB1": hourly_term("DB1", "0.25")}}
    }));

    let mut aggregator = Aggregator::new(ServiceKind::Rds);
    aggregator.fold_offer(&document);
    let output = aggregator.finish();
    let record = &output.records[0];

    assert_eq!(
        record.platform("us-east-1", "MySQL").unwrap().ondemand,
        record.platform("us-east-1", "2").unwrap().ondemand
    );
    assert_eq!(
        record.platform("us-east-1", "2").unwrap().ondemand,
        Some(PriceValue::Number(0.25))
    );
}

#[test]
fn test_aurora_io_optimized_keeps_its_code_and_raises_the_engine_name() {
    let aurora = |sku: &str, storage: &str| {
        json!({
            "sku": sku,
            "productFamily": "Database Instance",
            "attributes": {
                "location": "US East (N. Virginia)",
                "instanceType": "db.r6g.large",
                "databaseEngine": "Aurora MySQL",
                "engineCode": "16",
                "storage": storage,
                "deploymentOption": "Single-AZ"
            }
        })
    };
    let document = offer(json!({
        "products": {
            "STD": aurora("STD", "EBS Only"),
            "IOPT": aurora("IOPT", "Aurora IO Optimization Mode")
        },
        "terms": {"OnDemand": {
            "STD": hourly_term("STD", "0.26"),
            "IOPT": hourly_term("IOPT", "0.338")
        }}
    }));

    let mut aggregator = Aggregator::new(ServiceKind::Rds);
    aggregator.fold_offer(&document);
    let output = aggregator.finish();
    let record = &output.records[0];
    let ondemand = |platform: &str| record.platform("us-east-1", platform).unwrap().ondemand.clone();

    assert_eq!(ondemand("16"), Some(PriceValue::Number(0.26)));
    assert_eq!(ondemand("211"), Some(PriceValue::Number(0.338)));
    assert_eq!(ondemand("Aurora MySQL"), Some(PriceValue::Number(0.338)));
}
