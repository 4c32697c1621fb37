//! Insurance premiums folded into every installment
//!
//! Two premiums are charged each period:
//! - MIP (mortality/disability): outstanding balance x age-indexed annual rate / 12
//! - DFI (property damage): property value x property-type annual rate / 12, flat for the
//!   whole term
//!
//! MIP tables come in two shapes (age bands or a floor-matched age map). Both resolve
//! through [`AgeRateLookup`] with one strategy: range match first, then the band with the
//! largest lower bound not above the age, then the lowest band.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::profile::PropertyType;
use crate::config::MipAgeBasis;
use crate::schedule::{PremiumSource, Premiums};

/// Annual MIP rate for an inclusive age range (open-ended when `max_age` is None)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min_age: u32,
    #[serde(default)]
    pub max_age: Option<u32>,
    pub rate: f64,
}

impl AgeBand {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min_age && self.max_age.map_or(true, |max| age <= max)
    }
}

/// Age-indexed rate lookup shared by every MIP table shape
pub trait AgeRateLookup {
    /// Bands in table order
    fn age_bands(&self) -> Cow<'_, [AgeBand]>;

    /// Annual rate for an age, or None when the table is empty
    fn rate_for_age(&self, age: u32) -> Option<f64> {
        resolve_age_rate(&self.age_bands(), age)
    }
}

fn resolve_age_rate(bands: &[AgeBand], age: u32) -> Option<f64> {
    if let Some(band) = bands.iter().find(|b| b.contains(age)) {
        return Some(band.rate);
    }

    // Nearest band below the age, else the lowest band
    bands
        .iter()
        .filter(|b| b.min_age <= age)
        .max_by_key(|b| b.min_age)
        .or_else(|| bands.iter().min_by_key(|b| b.min_age))
        .map(|b| b.rate)
}

/// Rate keyed by a single age in a floor-matched table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRate {
    pub age: u32,
    pub rate: f64,
}

/// MIP rate table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MipTable {
    /// Ordered age ranges, each with its own rate
    Bands { bands: Vec<AgeBand> },
    /// Discrete ages; an age uses the largest key not above it
    FloorMap { rates: Vec<AgeRate> },
}

impl AgeRateLookup for MipTable {
    fn age_bands(&self) -> Cow<'_, [AgeBand]> {
        match self {
            MipTable::Bands { bands } => Cow::Borrowed(bands.as_slice()),
            MipTable::FloorMap { rates } => {
                let mut keys = rates.clone();
                keys.sort_by_key(|r| r.age);
                keys.dedup_by_key(|r| r.age);
                let bands = keys
                    .iter()
                    .enumerate()
                    .map(|(i, r)| AgeBand {
                        min_age: r.age,
                        max_age: keys.get(i + 1).map(|next| next.age.saturating_sub(1)),
                        rate: r.rate,
                    })
                    .collect();
                Cow::Owned(bands)
            }
        }
    }
}

/// Insurance configuration for one lender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTable {
    pub mip: MipTable,
    /// Annual DFI rate by property type
    pub dfi: BTreeMap<PropertyType, f64>,
}

impl InsuranceTable {
    pub fn dfi_rate(&self, property_type: PropertyType) -> Option<f64> {
        self.dfi.get(&property_type).copied()
    }
}

/// Premium calculator bound to a lender's insurance table
#[derive(Debug, Clone)]
pub struct InsuranceCalculator {
    /// Resolved bands, so per-period lookups do not rebuild them
    mip_bands: Vec<AgeBand>,
    dfi_rates: BTreeMap<PropertyType, f64>,
}

impl InsuranceCalculator {
    pub fn new(table: &InsuranceTable) -> Self {
        Self {
            mip_bands: table.mip.age_bands().into_owned(),
            dfi_rates: table.dfi.clone(),
        }
    }

    /// Annual MIP rate for an age
    pub fn mip_rate(&self, age: u32) -> Option<f64> {
        self.rate_for_age(age)
    }

    /// MIP premium for one period: balance x rate / 12
    pub fn mip_premium(&self, age: u32, outstanding_balance: f64) -> Option<f64> {
        self.mip_rate(age).map(|rate| outstanding_balance * rate / 12.0)
    }

    /// DFI premium for one period: property value x rate / 12
    pub fn dfi_premium(&self, property_value: f64, property_type: PropertyType) -> Option<f64> {
        self.dfi_rates
            .get(&property_type)
            .map(|rate| property_value * rate / 12.0)
    }
}

impl AgeRateLookup for InsuranceCalculator {
    fn age_bands(&self) -> Cow<'_, [AgeBand]> {
        Cow::Borrowed(&self.mip_bands)
    }
}

/// Per-period premium source for the scheduler
///
/// Holds everything resolved up front; construction fails when the lender has no MIP rate
/// or no DFI rate for the property type.
#[derive(Debug, Clone)]
pub struct PeriodInsurance {
    calculator: InsuranceCalculator,
    age_at_start: u32,
    age_basis: MipAgeBasis,
    dfi_monthly: f64,
}

impl PeriodInsurance {
    pub fn new(
        calculator: InsuranceCalculator,
        age_at_start: u32,
        age_basis: MipAgeBasis,
        property_value: f64,
        property_type: PropertyType,
    ) -> Option<Self> {
        calculator.mip_rate(age_at_start)?;
        let dfi_monthly = calculator.dfi_premium(property_value, property_type)?;
        Some(Self {
            calculator,
            age_at_start,
            age_basis,
            dfi_monthly,
        })
    }

    /// Borrower age used for the MIP lookup in a given period (1-indexed)
    pub fn age_in_period(&self, period: u32) -> u32 {
        match self.age_basis {
            MipAgeBasis::AtContract => self.age_at_start,
            MipAgeBasis::Attained => self.age_at_start + period.saturating_sub(1) / 12,
        }
    }
}

impl PremiumSource for PeriodInsurance {
    fn premiums(&mut self, period: u32, opening_balance: f64) -> Premiums {
        let age = self.age_in_period(period);
        Premiums {
            mip: self.calculator.mip_premium(age, opening_balance).unwrap_or(0.0),
            dfi: self.dfi_monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn banded() -> MipTable {
        MipTable::Bands {
            bands: vec![
                AgeBand { min_age: 18, max_age: Some(30), rate: 0.00010 },
                AgeBand { min_age: 31, max_age: Some(45), rate: 0.00020 },
                AgeBand { min_age: 51, max_age: Some(80), rate: 0.00060 },
            ],
        }
    }

    fn floor_map() -> MipTable {
        MipTable::FloorMap {
            rates: vec![
                AgeRate { age: 40, rate: 0.00025 },
                AgeRate { age: 18, rate: 0.00012 },
                AgeRate { age: 60, rate: 0.00070 },
            ],
        }
    }

    fn table(mip: MipTable) -> InsuranceTable {
        InsuranceTable {
            mip,
            dfi: BTreeMap::from([(PropertyType::Residential, 0.00084)]),
        }
    }

    #[test]
    fn test_band_range_match() {
        let mip = banded();
        assert_eq!(mip.rate_for_age(18), Some(0.00010));
        assert_eq!(mip.rate_for_age(30), Some(0.00010));
        assert_eq!(mip.rate_for_age(31), Some(0.00020));
        assert_eq!(mip.rate_for_age(80), Some(0.00060));
    }

    #[test]
    fn test_band_fallbacks() {
        let mip = banded();
        // Gap between 45 and 51 falls back to the band below
        assert_eq!(mip.rate_for_age(48), Some(0.00020));
        // Below the table uses the lowest band, above uses the highest
        assert_eq!(mip.rate_for_age(16), Some(0.00010));
        assert_eq!(mip.rate_for_age(85), Some(0.00060));
    }

    #[test]
    fn test_floor_map_matching() {
        let mip = floor_map();
        assert_eq!(mip.rate_for_age(17), Some(0.00012));
        assert_eq!(mip.rate_for_age(39), Some(0.00012));
        assert_eq!(mip.rate_for_age(40), Some(0.00025));
        assert_eq!(mip.rate_for_age(59), Some(0.00025));
        assert_eq!(mip.rate_for_age(75), Some(0.00070));
    }

    #[test]
    fn test_empty_table() {
        let mip = MipTable::FloorMap { rates: Vec::new() };
        assert_eq!(mip.rate_for_age(40), None);
    }

    #[test]
    fn test_premiums() {
        let calc = InsuranceCalculator::new(&table(floor_map()));
        assert_abs_diff_eq!(calc.mip_premium(45, 300_000.0).unwrap(), 300_000.0 * 0.00025 / 12.0);
        assert_abs_diff_eq!(
            calc.dfi_premium(500_000.0, PropertyType::Residential).unwrap(),
            35.0,
            epsilon = 1e-9
        );
        assert!(calc.dfi_premium(500_000.0, PropertyType::Commercial).is_none());
    }

    #[test]
    fn test_period_insurance_requires_dfi_rate() {
        let calc = InsuranceCalculator::new(&table(banded()));
        let missing = PeriodInsurance::new(
            calc.clone(),
            35,
            MipAgeBasis::AtContract,
            500_000.0,
            PropertyType::Commercial,
        );
        assert!(missing.is_none());

        let mut ok = PeriodInsurance::new(calc, 35, MipAgeBasis::AtContract, 500_000.0, PropertyType::Residential)
            .unwrap();
        let p = ok.premiums(1, 120_000.0);
        assert_abs_diff_eq!(p.mip, 120_000.0 * 0.00020 / 12.0);
        assert_abs_diff_eq!(p.dfi, 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_attained_age_basis() {
        let calc = InsuranceCalculator::new(&table(banded()));
        let ins = PeriodInsurance::new(calc, 29, MipAgeBasis::Attained, 500_000.0, PropertyType::Residential)
            .unwrap();
        assert_eq!(ins.age_in_period(1), 29);
        assert_eq!(ins.age_in_period(12), 29);
        assert_eq!(ins.age_in_period(13), 30);
        assert_eq!(ins.age_in_period(25), 31);
    }

    #[test]
    fn test_mip_table_json_shapes() {
        let json = r#"{"kind":"floor_map","rates":[{"age":18,"rate":0.0001},{"age":50,"rate":0.0004}]}"#;
        let mip: MipTable = serde_json::from_str(json).unwrap();
        assert_eq!(mip.rate_for_age(55), Some(0.0004));

        let json = r#"{"kind":"bands","bands":[{"min_age":18,"max_age":40,"rate":0.0002}]}"#;
        let mip: MipTable = serde_json::from_str(json).unwrap();
        assert_eq!(mip.rate_for_age(20), Some(0.0002));
    }
}
