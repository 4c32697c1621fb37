//! Loan request supplied by the caller and its up-front validation

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::ValidationError;
use crate::lender::{AmortizationSystem, CorrectionIndex, PropertyType};

/// A financing request evaluated against every selected lender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub property_value: f64,
    pub requested_principal: f64,
    pub term_months: u32,

    #[serde(default)]
    pub borrower_birth_date: Option<NaiveDate>,

    pub property_type: PropertyType,
    pub amortization_system: AmortizationSystem,
    pub correction_index: CorrectionIndex,
    pub selected_lender_ids: Vec<String>,
    pub combined_monthly_income: f64,

    /// Opt into the subsidized housing program
    #[serde(default)]
    pub subsidized_program: bool,

    /// Projected annual rate (percent) of the correction index, folded into the balance
    #[serde(default)]
    pub index_rate_annual_pct: Option<f64>,
}

/// Completed years between a birth date and a reference date
///
/// Returns None when the reference date precedes the birth date.
pub fn age_on(birth_date: NaiveDate, as_of: NaiveDate) -> Option<u32> {
    if as_of < birth_date {
        return None;
    }
    let mut years = as_of.year() - birth_date.year();
    if (as_of.month(), as_of.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

impl LoanRequest {
    /// Borrower age on the simulation date
    pub fn borrower_age(&self, as_of: NaiveDate) -> Option<u32> {
        self.borrower_birth_date.and_then(|birth| age_on(birth, as_of))
    }

    /// Requested loan-to-value ratio
    pub fn loan_to_value(&self) -> f64 {
        self.requested_principal / self.property_value
    }

    /// Check the request before any lender is evaluated
    ///
    /// Returns the borrower age on `as_of`.
    pub fn validate(&self, as_of: NaiveDate, config: &SimulationConfig) -> Result<u32, ValidationError> {
        for (field, value) in [
            ("property_value", self.property_value),
            ("requested_principal", self.requested_principal),
            ("combined_monthly_income", self.combined_monthly_income),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidInput {
                    field: field.to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
        }
        if let Some(rate) = self.index_rate_annual_pct {
            if !rate.is_finite() || rate <= -100.0 {
                return Err(ValidationError::InvalidInput {
                    field: "index_rate_annual_pct".to_string(),
                    reason: format!("{rate} is not a usable annual rate"),
                });
            }
        }

        if self.requested_principal <= 0.0 {
            return Err(ValidationError::NonPositivePrincipal {
                principal: self.requested_principal,
            });
        }
        if self.requested_principal >= self.property_value {
            return Err(ValidationError::PrincipalNotBelowValue {
                principal: self.requested_principal,
                property_value: self.property_value,
            });
        }
        if self.property_value < config.min_property_value {
            return Err(ValidationError::PropertyValueBelowMinimum {
                property_value: self.property_value,
                minimum: config.min_property_value,
            });
        }

        let birth_date = self.borrower_birth_date.ok_or(ValidationError::MissingBirthDate)?;
        let age = age_on(birth_date, as_of).ok_or_else(|| ValidationError::InvalidInput {
            field: "borrower_birth_date".to_string(),
            reason: format!("{birth_date} is after the simulation date {as_of}"),
        })?;
        if age < config.min_borrower_age || age > config.max_borrower_age {
            return Err(ValidationError::AgeOutOfRange {
                age,
                min: config.min_borrower_age,
                max: config.max_borrower_age,
            });
        }

        if self.combined_monthly_income <= 0.0 {
            return Err(ValidationError::NonPositiveIncome {
                income: self.combined_monthly_income,
            });
        }
        if self.term_months < config.min_term_months || self.term_months > config.max_term_months {
            return Err(ValidationError::TermOutOfRange {
                term: self.term_months,
                min: config.min_term_months,
                max: config.max_term_months,
            });
        }
        if self.selected_lender_ids.is_empty() {
            return Err(ValidationError::NoLendersSelected);
        }

        Ok(age)
    }
}
