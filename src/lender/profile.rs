//! Lender configuration: rate tables, financing caps, and program tiers

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::insurance::InsuranceTable;

/// Repayment system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AmortizationSystem {
    /// Constant amortization (SAC): fixed principal, decreasing installments
    Sac,
    /// Constant installment (PRICE): annuity with fixed principal + interest
    Price,
}

impl AmortizationSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmortizationSystem::Sac => "SAC",
            AmortizationSystem::Price => "PRICE",
        }
    }
}

impl fmt::Display for AmortizationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index used to correct the outstanding balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CorrectionIndex {
    /// Reference rate (TR)
    Tr,
    /// Consumer inflation (IPCA)
    Ipca,
    /// Savings-linked (Poupança)
    Poupanca,
    /// Fixed rate, no correction
    Fixed,
}

impl CorrectionIndex {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionIndex::Tr => "TR",
            CorrectionIndex::Ipca => "IPCA",
            CorrectionIndex::Poupanca => "Poupanca",
            CorrectionIndex::Fixed => "Fixed",
        }
    }
}

impl fmt::Display for CorrectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property category, drives the DFI rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Residential,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Residential => "Residential",
            PropertyType::Commercial => "Commercial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nominal annual rates (percent) keyed by system and correction index
///
/// A missing entry means the lender does not offer that combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    entries: Vec<RateEntry>,
}

/// One offered combination in a [`RateTable`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub system: AmortizationSystem,
    pub index: CorrectionIndex,
    pub annual_rate_pct: f64,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a later entry replaces an earlier one for the same key
    pub fn with_rate(mut self, system: AmortizationSystem, index: CorrectionIndex, annual_rate_pct: f64) -> Self {
        self.set_rate(system, index, annual_rate_pct);
        self
    }

    pub fn set_rate(&mut self, system: AmortizationSystem, index: CorrectionIndex, annual_rate_pct: f64) {
        self.entries.retain(|e| !(e.system == system && e.index == index));
        self.entries.push(RateEntry { system, index, annual_rate_pct });
    }

    /// Nominal annual rate in percent, if the combination is offered
    pub fn rate(&self, system: AmortizationSystem, index: CorrectionIndex) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.system == system && e.index == index)
            .map(|e| e.annual_rate_pct)
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }
}

/// Subsidized-program income bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeBracketRule {
    /// Human-readable tier label (e.g. "Faixa 1")
    pub label: String,
    /// Lower income bound (inclusive)
    pub min_income: f64,
    /// Upper income bound (inclusive; a boundary income belongs to this bracket)
    pub max_income: f64,
    #[serde(default)]
    pub min_property_value: Option<f64>,
    #[serde(default)]
    pub max_property_value: Option<f64>,
    /// Nominal annual rate in percent
    pub special_annual_rate_pct: f64,
    /// Maximum financed fraction of the property value
    pub financing_ratio_cap: f64,
}

impl IncomeBracketRule {
    pub fn contains_income(&self, income: f64) -> bool {
        income >= self.min_income && income <= self.max_income
    }

    pub fn contains_property_value(&self, value: f64) -> bool {
        let above_min = self.min_property_value.map_or(true, |min| value >= min);
        let below_max = self.max_property_value.map_or(true, |max| value <= max);
        above_min && below_max
    }
}

/// Ordered set of program brackets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramTiers {
    pub brackets: Vec<IncomeBracketRule>,
}

impl ProgramTiers {
    pub fn new(brackets: Vec<IncomeBracketRule>) -> Self {
        Self { brackets }
    }

    /// First bracket in table order containing the income
    ///
    /// Brackets are expected to be sorted by income; with adjacent brackets sharing a
    /// boundary, the lower bracket claims it.
    pub fn bracket_for_income(&self, income: f64) -> Option<&IncomeBracketRule> {
        self.brackets.iter().find(|b| b.contains_income(income))
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }
}

/// Per-lender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LenderProfile {
    pub id: String,
    pub display_name: String,

    /// Maximum financed fraction of the property value
    pub max_financing_ratio: f64,

    /// Minimum down payment as a fraction of the property value
    #[serde(default)]
    pub min_down_payment_ratio: f64,

    /// Lender-specific ceiling on the term, on top of the age-based cap
    #[serde(default)]
    pub special_max_term_months: Option<u32>,

    /// Correction indices the lender refuses regardless of the rate table
    #[serde(default)]
    pub unsupported_indices: Vec<CorrectionIndex>,

    pub rate_table: RateTable,

    pub insurance: InsuranceTable,

    /// Per-system financing ratio overrides
    #[serde(default)]
    pub system_overrides: BTreeMap<AmortizationSystem, f64>,

    #[serde(default)]
    pub program_tiers: Option<ProgramTiers>,
}

impl LenderProfile {
    /// Financing ratio override for a system, if any
    pub fn system_override(&self, system: AmortizationSystem) -> Option<f64> {
        self.system_overrides.get(&system).copied()
    }

    pub fn offers_program(&self) -> bool {
        self.program_tiers.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn supports_index(&self, index: CorrectionIndex) -> bool {
        !self.unsupported_indices.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(label: &str, min: f64, max: f64) -> IncomeBracketRule {
        IncomeBracketRule {
            label: label.to_string(),
            min_income: min,
            max_income: max,
            min_property_value: None,
            max_property_value: Some(264_000.0),
            special_annual_rate_pct: 5.0,
            financing_ratio_cap: 0.8,
        }
    }

    #[test]
    fn test_rate_table_lookup() {
        let table = RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 10.99)
            .with_rate(AmortizationSystem::Price, CorrectionIndex::Tr, 11.29);

        assert_eq!(table.rate(AmortizationSystem::Sac, CorrectionIndex::Tr), Some(10.99));
        assert_eq!(table.rate(AmortizationSystem::Price, CorrectionIndex::Ipca), None);
    }

    #[test]
    fn test_rate_table_replace() {
        let table = RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 10.99)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 9.99);

        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.rate(AmortizationSystem::Sac, CorrectionIndex::Tr), Some(9.99));
    }

    #[test]
    fn test_boundary_income_goes_to_lower_bracket() {
        let tiers = ProgramTiers::new(vec![
            bracket("Faixa 1", 0.0, 2_850.0),
            bracket("Faixa 2", 2_850.0, 4_700.0),
        ]);

        assert_eq!(tiers.bracket_for_income(2_850.0).unwrap().label, "Faixa 1");
        assert_eq!(tiers.bracket_for_income(2_850.01).unwrap().label, "Faixa 2");
        assert!(tiers.bracket_for_income(4_700.01).is_none());
    }

    #[test]
    fn test_property_window() {
        let b = bracket("Faixa 1", 0.0, 2_850.0);
        assert!(b.contains_property_value(264_000.0));
        assert!(!b.contains_property_value(264_000.01));
    }
}
