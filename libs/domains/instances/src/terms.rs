//! Reserved term vocabulary.
//!
//! Vendor term attributes (lease length, purchase option, offering class)
//! are translated into canonical keys such as `yrTerm1Standard.allUpfront`.
//! The tables are closed: anything outside them is an [`TermError`], so new
//! vendor terms have to be added here explicitly.

use std::fmt;
use thiserror::Error;

use crate::format::leading_digits;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("unknown lease length '{0}'")]
    UnknownLease(String),

    #[error("unknown purchase option '{0}'")]
    UnknownPurchaseOption(String),

    #[error("unknown offering class '{0}'")]
    UnknownOfferingClass(String),

    /// Light/Medium/Heavy utilization options from previous instance generations
    #[error("retired purchase option '{0}'")]
    RetiredPurchaseOption(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeaseLength {
    OneYear,
    ThreeYears,
}

impl LeaseLength {
    /// Accepts `1yr`, `1 yr`, `1 year`, `1 Year`, `3 Years`, ...
    pub fn parse(raw: &str) -> Result<Self, TermError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let unit = normalized.trim_start_matches(|c: char| c.is_ascii_digit()).trim();
        if !matches!(unit, "yr" | "yrs" | "year" | "years") {
            return Err(TermError::UnknownLease(raw.to_string()));
        }
        match leading_digits(&normalized) {
            Some(1) => Ok(LeaseLength::OneYear),
            Some(3) => Ok(LeaseLength::ThreeYears),
            _ => Err(TermError::UnknownLease(raw.to_string())),
        }
    }

    pub fn years(self) -> u32 {
        match self {
            LeaseLength::OneYear => 1,
            LeaseLength::ThreeYears => 3,
        }
    }

    /// Hours in the lease, counting 365-day years.
    pub fn hours(self) -> f64 {
        f64::from(self.years() * 365 * 24)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PurchaseOption {
    AllUpfront,
    PartialUpfront,
    NoUpfront,
}

impl PurchaseOption {
    /// Accepts both `All Upfront` and `AllUpfront` spellings.
    pub fn parse(raw: &str) -> Result<Self, TermError> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "allupfront" => Ok(PurchaseOption::AllUpfront),
            "partialupfront" => Ok(PurchaseOption::PartialUpfront),
            "noupfront" => Ok(PurchaseOption::NoUpfront),
            "lightutilization" | "mediumutilization" | "heavyutilization" => {
                Err(TermError::RetiredPurchaseOption(raw.to_string()))
            }
            _ => Err(TermError::UnknownPurchaseOption(raw.to_string())),
        }
    }

    fn key(self) -> &'static str {
        match self {
            PurchaseOption::AllUpfront => "allUpfront",
            PurchaseOption::PartialUpfront => "partialUpfront",
            PurchaseOption::NoUpfront => "noUpfront",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OfferingClass {
    #[default]
    Standard,
    Convertible,
    Savings,
}

impl OfferingClass {
    /// Absent class means a standard reservation.
    pub fn parse(raw: Option<&str>) -> Result<Self, TermError> {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("standard") => Ok(OfferingClass::Standard),
            Some("convertible") => Ok(OfferingClass::Convertible),
            Some("savings") => Ok(OfferingClass::Savings),
            Some(_) => Err(TermError::UnknownOfferingClass(
                raw.unwrap_or_default().to_string(),
            )),
        }
    }

    fn key(self) -> &'static str {
        match self {
            OfferingClass::Standard => "Standard",
            OfferingClass::Convertible => "Convertible",
            OfferingClass::Savings => "Savings",
        }
    }
}

/// Canonical reserved term, rendered as `yrTerm{1|3}{Class}.{option}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservedTerm {
    pub lease: LeaseLength,
    pub class: OfferingClass,
    pub option: PurchaseOption,
}

impl ReservedTerm {
    pub fn new(lease: LeaseLength, class: OfferingClass, option: PurchaseOption) -> Self {
        Self {
            lease,
            class,
            option,
        }
    }

    /// Translates raw vendor attributes. Missing lease or option is unmapped.
    pub fn translate(
        lease: Option<&str>,
        option: Option<&str>,
        class: Option<&str>,
    ) -> Result<Self, TermError> {
        let lease = LeaseLength::parse(lease.unwrap_or_default())?;
        let option = PurchaseOption::parse(option.unwrap_or_default())?;
        let class = OfferingClass::parse(class)?;
        Ok(Self::new(lease, class, option))
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReservedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "yrTerm{}{}.{}",
            self.lease.years(),
            self.class.key(),
            self.option.key()
        )
    }
}

/// Which half of a reserved price a dimension carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedComponent {
    Hourly,
    Upfront,
}

impl ReservedComponent {
    /// `Hrs` dimensions are hourly, `Quantity` dimensions are upfront fees.
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "hrs" | "hours" | "hour" => Some(ReservedComponent::Hourly),
            "quantity" => Some(ReservedComponent::Upfront),
            _ => None,
        }
    }
}
