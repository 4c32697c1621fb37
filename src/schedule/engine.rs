//! Installment-by-installment schedule generation for SAC and PRICE

use log::debug;

use super::installment::{InstallmentLine, Schedule};
use crate::lender::AmortizationSystem;

/// Insurance premiums charged in one period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Premiums {
    pub mip: f64,
    pub dfi: f64,
}

/// Supplies the insurance premiums for each period
///
/// Called once per period, in order, with the opening balance the period's interest is
/// charged on.
pub trait PremiumSource {
    fn premiums(&mut self, period: u32, opening_balance: f64) -> Premiums;
}

/// Premium source that charges nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInsurance;

impl PremiumSource for NoInsurance {
    fn premiums(&mut self, _period: u32, _opening_balance: f64) -> Premiums {
        Premiums::default()
    }
}

impl<F> PremiumSource for F
where
    F: FnMut(u32, f64) -> Premiums,
{
    fn premiums(&mut self, period: u32, opening_balance: f64) -> Premiums {
        self(period, opening_balance)
    }
}

/// Configuration for schedule generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleConfig {
    pub system: AmortizationSystem,

    /// Monthly index correction applied to the opening balance (0 = none)
    pub monthly_correction_rate: f64,
}

impl ScheduleConfig {
    pub fn new(system: AmortizationSystem) -> Self {
        Self {
            system,
            monthly_correction_rate: 0.0,
        }
    }

    pub fn with_correction(mut self, monthly_correction_rate: f64) -> Self {
        self.monthly_correction_rate = monthly_correction_rate;
        self
    }

    fn corrected(&self) -> bool {
        self.monthly_correction_rate != 0.0
    }
}

/// Fixed principal + interest payment of an annuity
///
/// Degenerates to straight division when the rate is zero.
pub fn annuity_payment(principal: f64, monthly_rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return principal;
    }
    if monthly_rate == 0.0 {
        return principal / periods as f64;
    }
    let growth = (1.0 + monthly_rate).powf(f64::from(periods));
    if growth.is_infinite() {
        // Interest-only in the limit
        return principal * monthly_rate;
    }
    principal * monthly_rate * growth / (growth - 1.0)
}

/// Amortization schedule generator
pub struct AmortizationScheduler {
    config: ScheduleConfig,
}

impl AmortizationScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Build the full schedule
    ///
    /// The last installment amortizes whatever balance remains, so the closing balance is
    /// exactly zero.
    pub fn build<P: PremiumSource + ?Sized>(
        &self,
        principal: f64,
        monthly_rate: f64,
        term_months: u32,
        premiums: &mut P,
    ) -> Schedule {
        let mut schedule = Schedule::new(self.config.system, principal, monthly_rate);
        if term_months == 0 {
            return schedule;
        }

        let fixed_amortization = principal / term_months as f64;
        let mut fixed_payment = annuity_payment(principal, monthly_rate, term_months);
        let mut balance = principal;

        for period in 1..=term_months {
            let remaining = term_months - period + 1;
            let opening = balance * (1.0 + self.config.monthly_correction_rate);
            let correction = opening - balance;
            let interest = opening * monthly_rate;

            let mut amortization = match self.config.system {
                AmortizationSystem::Sac => {
                    if self.config.corrected() {
                        opening / remaining as f64
                    } else {
                        fixed_amortization
                    }
                }
                AmortizationSystem::Price => {
                    if self.config.corrected() {
                        fixed_payment = annuity_payment(opening, monthly_rate, remaining);
                    }
                    fixed_payment - interest
                }
            };

            let closing = if period == term_months {
                amortization = opening;
                0.0
            } else {
                opening - amortization
            };

            let Premiums { mip, dfi } = premiums.premiums(period, opening);

            schedule.add_line(InstallmentLine {
                index: period,
                opening_balance: opening,
                correction,
                interest,
                amortization,
                insurance_mip: mip,
                insurance_dfi: dfi,
                total_payment: amortization + interest + mip + dfi,
                outstanding_balance_after: closing,
            });

            balance = closing;
        }

        debug!(
            "{} schedule: principal={:.2} rate={:.6} term={} first={:.2}",
            self.config.system,
            principal,
            monthly_rate,
            term_months,
            schedule.first().map(|l| l.total_payment).unwrap_or(0.0)
        );

        schedule
    }
}
