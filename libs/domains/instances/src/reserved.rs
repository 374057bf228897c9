//! Reserved-price effectivization.
//!
//! Vendors publish reserved terms as an hourly component plus an optional
//! upfront fee. Both are folded into one effective hourly rate:
//!
//! ```text
//! effective_hourly = hourly + upfront / (lease_years * 365 * 24)
//! ```

use tracing::warn;

use crate::error::{CollectError, CollectResult};
use crate::models::{InstanceRecord, PlatformPricing, RawReservedPrice};
use crate::report::CollectionReport;
use crate::terms::ReservedTerm;

/// Effective hourly rate for one reserved term.
///
/// The hourly component is required; a missing upfront fee counts as zero.
pub fn effective_hourly(term: &ReservedTerm, raw: &RawReservedPrice) -> CollectResult<f64> {
    let hourly = raw.hourly.ok_or_else(|| CollectError::MalformedReserved {
        term: term.key(),
        details: "missing hourly dimension".to_string(),
    })?;
    let upfront = raw.upfront.unwrap_or(0.0);

    if !hourly.is_finite() || !upfront.is_finite() || hourly < 0.0 || upfront < 0.0 {
        return Err(CollectError::MalformedReserved {
            term: term.key(),
            details: format!("invalid components hourly={hourly} upfront={upfront}"),
        });
    }

    Ok(hourly + upfront / term.lease.hours())
}

/// Converts the raw reserved components of every record into `reserved`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Effectivizer;

impl Effectivizer {
    pub fn new() -> Self {
        Self
    }

    /// A term that cannot be computed stays absent; the rest of the record
    /// is still effectivized.
    pub fn apply(&self, record: &mut InstanceRecord, report: &mut CollectionReport) {
        let instance_type = record.spec.instance_type.clone();
        for (region, platforms) in record.pricing.iter_mut() {
            for (platform, pricing) in platforms.iter_mut() {
                self.apply_platform(pricing, report, |error| {
                    warn!(
                        instance_type = %instance_type,
                        region = %region,
                        platform = %platform,
                        error = %error,
                        "Leaving reserved term absent"
                    );
                });
            }
        }
    }

    fn apply_platform(
        &self,
        pricing: &mut PlatformPricing,
        report: &mut CollectionReport,
        on_error: impl Fn(&CollectError),
    ) {
        for (term, raw) in std::mem::take(&mut pricing.raw_reserved) {
            match effective_hourly(&term, &raw) {
                Ok(price) => {
                    pricing.reserved.insert(term.key(), price);
                }
                Err(error) => {
                    on_error(&error);
                    report.skip(error.reason());
                }
            }
        }
    }
}
