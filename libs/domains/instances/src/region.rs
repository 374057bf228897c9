//! Region resolution for vendor location strings.
//!
//! Price list products name their region by description ("US East (N.
//! Virginia)"). The [`RegionTable`] maps those descriptions to codes and is
//! owned by the caller for the length of a run; the [`RegionResolver`] only
//! borrows it, so independent runs never share state.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{CollectError, CollectResult};

/// Region used for global (`"Any"`) products
pub const DEFAULT_REGION: &str = "us-east-1";

const ANY_LOCATION: &str = "Any";

/// Locations that were renamed or promoted after SKUs referencing the old
/// name were published.
const RENAMED_LOCATIONS: &[(&str, &str)] = &[
    ("Asia Pacific (Osaka-Local)", "ap-northeast-3"),
    ("AWS GovCloud (US)", "us-gov-west-1"),
];

/// Region codes and the descriptions used by the AWS price list.
const AWS_REGIONS: &[(&str, &str)] = &[
    ("af-south-1", "Africa (Cape Town)"),
    ("ap-east-1", "Asia Pacific (Hong Kong)"),
    ("ap-east-2", "Asia Pacific (Taipei)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-northeast-2", "Asia Pacific (Seoul)"),
    ("ap-northeast-3", "Asia Pacific (Osaka)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-south-2", "Asia Pacific (Hyderabad)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("ap-southeast-3", "Asia Pacific (Jakarta)"),
    ("ap-southeast-4", "Asia Pacific (Melbourne)"),
    ("ap-southeast-5", "Asia Pacific (Malaysia)"),
    ("ap-southeast-7", "Asia Pacific (Thailand)"),
    ("ca-central-1", "Canada (Central)"),
    ("ca-west-1", "Canada West (Calgary)"),
    ("eu-central-1", "EU (Frankfurt)"),
    ("eu-central-2", "EU (Zurich)"),
    ("eu-north-1", "EU (Stockholm)"),
    ("eu-south-1", "EU (Milan)"),
    ("eu-south-2", "EU (Spain)"),
    ("eu-west-1", "EU (Ireland)"),
    ("eu-west-2", "EU (London)"),
    ("eu-west-3", "EU (Paris)"),
    ("il-central-1", "Israel (Tel Aviv)"),
    ("me-central-1", "Middle East (UAE)"),
    ("me-south-1", "Middle East (Bahrain)"),
    ("mx-central-1", "Mexico (Central)"),
    ("sa-east-1", "South America (Sao Paulo)"),
    ("us-east-1", "US East (N. Virginia)"),
    ("us-east-2", "US East (Ohio)"),
    ("us-gov-east-1", "AWS GovCloud (US-East)"),
    ("us-gov-west-1", "AWS GovCloud (US-West)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
];

/// Regions served by the China price list
const CHINA_REGIONS: &[(&str, &str)] = &[
    ("cn-north-1", "China (Beijing)"),
    ("cn-northwest-1", "China (Ningxia)"),
];

/// Newer price lists spell European regions "Europe (...)"; the table uses
/// the older "EU (...)" form.
pub fn canonicalize_location(location: &str) -> String {
    match location.trim().strip_prefix("Europe (") {
        Some(rest) => format!("EU ({rest}"),
        None => location.trim().to_string(),
    }
}

/// Run-scoped location table with insert-on-miss semantics.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    by_location: HashMap<String, String>,
    descriptions: BTreeMap<String, String>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the AWS price list descriptions.
    pub fn aws() -> Self {
        Self::seeded(AWS_REGIONS)
    }

    pub fn china() -> Self {
        Self::seeded(CHINA_REGIONS)
    }

    fn seeded(regions: &[(&str, &str)]) -> Self {
        let mut table = Self::new();
        for (code, description) in regions {
            table.insert(description, code);
        }
        table
    }

    /// Registers `location -> code`. The first description seen for a code
    /// becomes its display name.
    pub fn insert(&mut self, location: &str, code: &str) {
        self.by_location
            .insert(location.to_string(), code.to_string());
        self.descriptions
            .entry(code.to_string())
            .or_insert_with(|| location.to_string());
    }

    pub fn code_for(&self, location: &str) -> Option<&str> {
        self.by_location.get(location).map(String::as_str)
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

/// Maps vendor location strings to region codes against a borrowed table.
#[derive(Debug, Clone)]
pub struct RegionResolver {
    default_region: String,
}

impl Default for RegionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl RegionResolver {
    pub fn new(default_region: impl Into<String>) -> Self {
        Self {
            default_region: default_region.into(),
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// Resolves a location, in order:
    /// 1. `"Any"` maps to the default region
    /// 2. renamed locations map to their current code and are written into
    ///    the table
    /// 3. table lookup
    /// 4. the record's own `regionCode`, registered for the rest of the run
    pub fn resolve(
        &self,
        table: &mut RegionTable,
        location: &str,
        region_code: Option<&str>,
    ) -> CollectResult<String> {
        let location = canonicalize_location(location);

        if location == ANY_LOCATION {
            return Ok(self.default_region.clone());
        }

        if let Some((_, code)) = RENAMED_LOCATIONS
            .iter()
            .find(|(renamed, _)| *renamed == location)
        {
            if table.code_for(&location).is_none() {
                table.insert(&location, code);
            }
            return Ok((*code).to_string());
        }

        if let Some(code) = table.code_for(&location) {
            return Ok(code.to_string());
        }

        match region_code.map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => {
                debug!(location = %location, region = code, "Registering location from regionCode");
                table.insert(&location, code);
                Ok(code.to_string())
            }
            None => Err(CollectError::UnresolvableRegion { location }),
        }
    }
}
