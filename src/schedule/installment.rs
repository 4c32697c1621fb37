//! Installment lines and schedule totals

use serde::{Deserialize, Serialize};

use crate::lender::AmortizationSystem;

/// One installment of a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentLine {
    /// Installment number (1..=n)
    pub index: u32,

    /// Balance at the start of the period, after any index correction
    pub opening_balance: f64,

    /// Index correction added to the balance this period
    pub correction: f64,

    pub interest: f64,
    pub amortization: f64,
    pub insurance_mip: f64,
    pub insurance_dfi: f64,

    /// Principal + interest + insurance
    pub total_payment: f64,

    pub outstanding_balance_after: f64,
}

impl InstallmentLine {
    /// Principal + interest component, without insurance
    pub fn base_payment(&self) -> f64 {
        self.interest + self.amortization
    }

    pub fn insurance(&self) -> f64 {
        self.insurance_mip + self.insurance_dfi
    }

    fn is_finite(&self) -> bool {
        [
            self.opening_balance,
            self.correction,
            self.interest,
            self.amortization,
            self.insurance_mip,
            self.insurance_dfi,
            self.total_payment,
            self.outstanding_balance_after,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Complete amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub system: AmortizationSystem,
    pub principal: f64,
    pub monthly_rate: f64,
    pub lines: Vec<InstallmentLine>,
}

impl Schedule {
    pub fn new(system: AmortizationSystem, principal: f64, monthly_rate: f64) -> Self {
        Self {
            system,
            principal,
            monthly_rate,
            lines: Vec::new(),
        }
    }

    /// Add an installment line
    pub fn add_line(&mut self, line: InstallmentLine) {
        self.lines.push(line);
    }

    pub fn term_months(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn first(&self) -> Option<&InstallmentLine> {
        self.lines.first()
    }

    pub fn last(&self) -> Option<&InstallmentLine> {
        self.lines.last()
    }

    /// True when no line carries NaN or infinity
    pub fn is_finite(&self) -> bool {
        self.principal.is_finite() && self.lines.iter().all(InstallmentLine::is_finite)
    }

    /// Get summary totals
    pub fn totals(&self) -> ScheduleTotals {
        let total_paid: f64 = self.lines.iter().map(|l| l.total_payment).sum();
        let total_interest: f64 = self.lines.iter().map(|l| l.interest).sum();
        let total_mip: f64 = self.lines.iter().map(|l| l.insurance_mip).sum();
        let total_dfi: f64 = self.lines.iter().map(|l| l.insurance_dfi).sum();
        let total_amortization: f64 = self.lines.iter().map(|l| l.amortization).sum();
        let total_correction: f64 = self.lines.iter().map(|l| l.correction).sum();

        ScheduleTotals {
            total_paid,
            total_interest,
            total_insurance: total_mip + total_dfi,
            total_mip,
            total_dfi,
            total_amortization,
            total_correction,
            first_payment: self.first().map(|l| l.total_payment).unwrap_or(0.0),
            last_payment: self.last().map(|l| l.total_payment).unwrap_or(0.0),
        }
    }
}

/// Summary totals for a schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    pub total_paid: f64,
    pub total_interest: f64,
    pub total_insurance: f64,
    pub total_mip: f64,
    pub total_dfi: f64,
    pub total_amortization: f64,
    pub total_correction: f64,
    pub first_payment: f64,
    pub last_payment: f64,
}

impl ScheduleTotals {
    pub fn is_finite(&self) -> bool {
        [
            self.total_paid,
            self.total_interest,
            self.total_insurance,
            self.total_amortization,
            self.total_correction,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
