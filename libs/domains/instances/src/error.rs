use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::terms::TermError;

/// Result type for record-level normalization
pub type CollectResult<T> = Result<T, CollectError>;

/// Reasons a single record can be skipped during normalization.
///
/// None of these abort a run; they are recovered per record and counted
/// in the [`CollectionReport`](crate::report::CollectionReport).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    /// Location string matched nothing, even after the `regionCode` fallback
    #[error("Unresolvable region for location '{location}'")]
    UnresolvableRegion { location: String },

    /// Term attributes outside the known vocabulary
    #[error("Unmapped term: {0}")]
    UnmappedTerm(#[from] TermError),

    /// A price record references a key that is not in the product catalog
    #[error("Orphan pricing record: '{key}' is not in the product catalog")]
    OrphanPricingRecord { key: String },

    /// A reserved term is missing the dimension needed to effectivize it
    #[error("Malformed reserved pricing for {term}: {details}")]
    MalformedReserved { term: String, details: String },

    /// Product attributes could not be read into the service schema
    #[error("Malformed product {sku}: {details}")]
    MalformedProduct { sku: String, details: String },

    /// A price string that is not a number
    #[error("Malformed price '{raw}'")]
    MalformedPrice { raw: String },

    /// Vendor platform vocabulary outside the translation table
    #[error("Unknown platform: operating system '{os}', software '{software}'")]
    UnknownPlatform { os: String, software: String },
}

impl CollectError {
    pub fn reason(&self) -> SkipReason {
        match self {
            CollectError::UnresolvableRegion { .. } => SkipReason::UnresolvableRegion,
            CollectError::UnmappedTerm(TermError::RetiredPurchaseOption(_)) => {
                SkipReason::RetiredTerm
            }
            CollectError::UnmappedTerm(_) => SkipReason::UnmappedTerm,
            CollectError::OrphanPricingRecord { .. } => SkipReason::OrphanRecord,
            CollectError::MalformedReserved { .. } => SkipReason::MalformedReserved,
            CollectError::MalformedProduct { .. } => SkipReason::MalformedProduct,
            CollectError::MalformedPrice { .. } => SkipReason::MalformedPrice,
            CollectError::UnknownPlatform { .. } => SkipReason::UnknownPlatform,
        }
    }
}

/// Counting key for skipped records
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    UnresolvableRegion,
    UnmappedTerm,
    RetiredTerm,
    OrphanRecord,
    MalformedReserved,
    MalformedProduct,
    MalformedPrice,
    UnknownPlatform,
    /// Price dimension that is not a base compute price
    ExcludedDimension,
    /// Outposts and similar on-premises location types
    DisallowedLocation,
    /// Product rejected by a service filter (tenancy, deployment option, ...)
    FilteredProduct,
}

/// Errors raised while decoding a fetched document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decompress gzip body: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("Body is neither JSON nor a callback(...) wrapper")]
    NotJsonp,
}
