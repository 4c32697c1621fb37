//! Simulation policy constants
//!
//! Every threshold the engine applies lives here, so a run can be reproduced from a
//! config file plus the request. Missing fields in a JSON config take the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cost::{CostMethod, IrrSettings};
use crate::error::SimulationError;
use crate::rates::RateConversion;

/// Upper bound accepted for `max_term_months` (100 years)
pub const MAX_TERM_MONTHS: u32 = 1_200;

/// Upper bound accepted for `max_payoff_age`
pub const MAX_PAYOFF_AGE: u32 = 130;

/// Which borrower age indexes the MIP rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MipAgeBasis {
    /// Age at simulation time, fixed for the whole term
    #[default]
    AtContract,
    /// Age advances every 12 installments
    Attained,
}

/// Configuration for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Age by which the loan must be repaid
    pub max_payoff_age: u32,

    /// Borrower age window accepted at validation
    pub min_borrower_age: u32,
    pub max_borrower_age: u32,

    /// Term window accepted at validation
    pub min_term_months: u32,
    pub max_term_months: u32,

    /// Smallest property value accepted
    pub min_property_value: f64,

    /// First installment above this share of income raises the affordability flag
    pub affordability_ratio: f64,

    /// Ceiling for the effective annual cost rate (percent)
    pub max_effective_cost_pct: f64,

    /// Canonical effective cost method
    pub cost_method: CostMethod,

    /// Also compute the IRR-based rate and report it next to the canonical one
    pub irr_cross_check: bool,

    /// Divergence (percentage points) above which the cross-check is logged
    pub cross_check_tolerance_pct: f64,

    pub irr: IrrSettings,

    pub rate_conversion: RateConversion,

    pub mip_age_basis: MipAgeBasis,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_payoff_age: 80,
            min_borrower_age: 18,
            max_borrower_age: 75,
            min_term_months: 12,
            max_term_months: 420,
            min_property_value: 40_000.0,
            affordability_ratio: 0.30,
            max_effective_cost_pct: 50.0,
            cost_method: CostMethod::Analytic,
            irr_cross_check: false,
            cross_check_tolerance_pct: 1.0,
            irr: IrrSettings::default(),
            rate_conversion: RateConversion::Compound,
            mip_age_basis: MipAgeBasis::AtContract,
        }
    }
}

impl SimulationConfig {
    /// Load a config from a JSON file
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SimulationError> {
        let config: Self = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), SimulationError> {
        if self.min_borrower_age > self.max_borrower_age {
            return Err(SimulationError::Config(format!(
                "borrower age window [{}, {}] is empty",
                self.min_borrower_age, self.max_borrower_age
            )));
        }
        if self.min_term_months == 0 || self.min_term_months > self.max_term_months {
            return Err(SimulationError::Config(format!(
                "term window [{}, {}] is invalid",
                self.min_term_months, self.max_term_months
            )));
        }
        if self.max_term_months > MAX_TERM_MONTHS {
            return Err(SimulationError::Config(format!(
                "max_term_months {} above {}",
                self.max_term_months, MAX_TERM_MONTHS
            )));
        }
        if self.max_payoff_age > MAX_PAYOFF_AGE {
            return Err(SimulationError::Config(format!(
                "max_payoff_age {} above {}",
                self.max_payoff_age, MAX_PAYOFF_AGE
            )));
        }
        if self.irr.lower_bound >= self.irr.upper_bound {
            return Err(SimulationError::Config("IRR bounds do not form an interval".to_string()));
        }
        Ok(())
    }
}
