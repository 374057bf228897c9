//! Instances Domain
//!
//! Normalizes vendor pricing documents into one canonical record per
//! instance type.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  Documents   │  ← offer files, spot feed, dedicated hosts, EMR, Azure pages
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │  Collectors  │  ← per-service attributes, regions, terms → price tuples
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │  Aggregator  │  ← merger + effectivizer → sorted instance records
//! └──────────────┘
//! ```
//!
//! Nothing here performs I/O; the collector binary fetches documents and
//! folds them into an [`Aggregator`] per service.

pub mod aggregator;
pub mod azure;
pub mod collector;
pub mod dedicated;
pub mod document;
pub mod emr;
pub mod error;
pub mod format;
pub mod merger;
pub mod models;
pub mod offer;
pub mod partition;
pub mod pretty;
pub mod region;
pub mod report;
pub mod reserved;
pub mod savings;
pub mod services;
pub mod spot;
pub mod terms;

// Re-export commonly used types
pub use aggregator::{Aggregator, ServiceOutput};
pub use azure::{AzureLocationList, AzureSkuPage, RetailPricePage};
pub use dedicated::DedicatedHostDocument;
pub use document::decode_json;
pub use emr::EmrPriceDocument;
pub use error::{CollectError, CollectResult, DocumentError, SkipReason};
pub use merger::{MergeRule, PriceTuple, PricingMerger, TuplePrice};
pub use models::{InstanceRecord, InstanceSpec, PriceValue, ServiceKind};
pub use offer::{OfferDocument, OfferIndex, RegionIndex, SavingsPlanRegionIndex};
pub use partition::Partition;
pub use region::{RegionResolver, RegionTable};
pub use report::CollectionReport;
pub use savings::SavingsPlanDocument;
pub use spot::SpotFeed;
pub use terms::{ReservedTerm, TermError};
