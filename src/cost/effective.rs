//! Effective annual cost rate (CET) of a financed schedule
//!
//! The analytic load-based rate is canonical: nominal rate plus annualized insurance load,
//! clamped to `[nominal, ceiling]`. The IRR over the dated installment flows is available
//! either as a cross-check or, when configured, as the primary method; an IRR below the
//! nominal rate is discarded in favour of the analytic value.

use chrono::{Months, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::irr::xirr;
use crate::config::SimulationConfig;
use crate::schedule::Schedule;

/// Method used as the canonical effective cost rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CostMethod {
    /// Nominal rate plus annualized insurance load
    #[default]
    Analytic,
    /// IRR of the disbursement and installment flows
    CashFlowIrr,
}

/// How the reported rate was actually obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostBasis {
    Analytic,
    Irr,
    /// IRR had no bracketed root; linear approximation from the average payment
    LinearApproximation,
}

/// Effective cost for one schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostOutcome {
    /// Effective annual cost rate in percent
    pub annual_rate_pct: f64,
    pub basis: CostBasis,
    /// IRR-based rate (percent), when a cross-check was requested
    pub irr_cross_check: Option<f64>,
}

/// Effective cost solver
pub struct EffectiveCostSolver<'a> {
    config: &'a SimulationConfig,
}

impl<'a> EffectiveCostSolver<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Effective annual cost rate for a schedule
    ///
    /// `as_of` dates the disbursement; installment `m` falls `m` months later.
    pub fn solve(&self, schedule: &Schedule, nominal_rate_pct: f64, as_of: NaiveDate) -> CostOutcome {
        let analytic = self.analytic(schedule, nominal_rate_pct);

        match self.config.cost_method {
            CostMethod::Analytic => {
                let irr_cross_check = self
                    .config
                    .irr_cross_check
                    .then(|| self.cash_flow_rate(schedule, as_of).0);

                if let Some(irr) = irr_cross_check {
                    if (irr - analytic).abs() > self.config.cross_check_tolerance_pct {
                        warn!(
                            "IRR cross-check {:.4}% diverges from analytic {:.4}%",
                            irr, analytic
                        );
                    }
                }

                CostOutcome {
                    annual_rate_pct: analytic,
                    basis: CostBasis::Analytic,
                    irr_cross_check,
                }
            }
            CostMethod::CashFlowIrr => {
                let (rate, basis) = self.cash_flow_rate(schedule, as_of);
                if rate < nominal_rate_pct {
                    warn!(
                        "IRR rate {:.4}% below nominal {:.4}%, using analytic {:.4}%",
                        rate, nominal_rate_pct, analytic
                    );
                    return CostOutcome {
                        annual_rate_pct: analytic,
                        basis: CostBasis::Analytic,
                        irr_cross_check: Some(rate),
                    };
                }
                CostOutcome {
                    annual_rate_pct: rate.min(self.config.max_effective_cost_pct.max(nominal_rate_pct)),
                    basis,
                    irr_cross_check: Some(rate),
                }
            }
        }
    }

    /// Nominal rate plus annualized insurance load, clamped to `[nominal, ceiling]`
    ///
    /// `load = (insurance / principal) x (12 / term) x 100`
    pub fn analytic(&self, schedule: &Schedule, nominal_rate_pct: f64) -> f64 {
        let term = schedule.term_months();
        if schedule.principal <= 0.0 || term == 0 {
            return nominal_rate_pct;
        }

        let insurance = schedule.totals().total_insurance;
        let load = insurance / schedule.principal * (12.0 / term as f64) * 100.0;

        (nominal_rate_pct + load)
            .min(self.config.max_effective_cost_pct)
            .max(nominal_rate_pct)
    }

    /// Annual IRR (percent) of the borrower flows, with the linear fallback
    pub fn cash_flow_rate(&self, schedule: &Schedule, as_of: NaiveDate) -> (f64, CostBasis) {
        if let Some(flows) = dated_cashflows(schedule, as_of) {
            if let Some(rate) = xirr(&flows, &self.config.irr) {
                return (rate * 100.0, CostBasis::Irr);
            }
        }

        debug!("IRR did not bracket a root, using linear approximation");
        (linear_approximation(schedule), CostBasis::LinearApproximation)
    }
}

/// Disbursement (negative) followed by each installment (positive), with dates
pub fn dated_cashflows(schedule: &Schedule, as_of: NaiveDate) -> Option<Vec<(NaiveDate, f64)>> {
    let mut flows = Vec::with_capacity(schedule.lines.len() + 1);
    flows.push((as_of, -schedule.principal));
    for line in &schedule.lines {
        let date = as_of.checked_add_months(Months::new(line.index))?;
        flows.push((date, line.total_payment));
    }
    Some(flows)
}

/// `(average payment x term / principal - 1) / term`, floored at 0, annualized (percent)
fn linear_approximation(schedule: &Schedule) -> f64 {
    let term = schedule.term_months();
    if term == 0 || schedule.principal <= 0.0 {
        return 0.0;
    }
    let n = term as f64;
    let average_payment = schedule.totals().total_paid / n;
    let monthly = ((average_payment * n / schedule.principal - 1.0) / n).max(0.0);
    monthly * 12.0 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lender::AmortizationSystem;
    use crate::rates::effective_monthly_rate;
    use crate::schedule::{AmortizationScheduler, NoInsurance, Premiums, ScheduleConfig};
    use approx::assert_abs_diff_eq;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }

    fn insured_schedule(system: AmortizationSystem, annual_pct: f64) -> Schedule {
        let mut premiums = |_period: u32, balance: f64| Premiums {
            mip: balance * 0.0004 / 12.0,
            dfi: 30.0,
        };
        AmortizationScheduler::new(ScheduleConfig::new(system)).build(
            300_000.0,
            effective_monthly_rate(annual_pct),
            240,
            &mut premiums,
        )
    }

    #[test]
    fn test_analytic_load() {
        let config = SimulationConfig::default();
        let solver = EffectiveCostSolver::new(&config);
        let schedule = insured_schedule(AmortizationSystem::Sac, 10.0);

        let insurance = schedule.totals().total_insurance;
        let expected = 10.0 + insurance / 300_000.0 * (12.0 / 240.0) * 100.0;
        assert_abs_diff_eq!(solver.analytic(&schedule, 10.0), expected, epsilon = 1e-12);

        let outcome = solver.solve(&schedule, 10.0, as_of());
        assert_eq!(outcome.basis, CostBasis::Analytic);
        assert!(outcome.annual_rate_pct >= 10.0);
        assert_eq!(outcome.irr_cross_check, None);
    }

    #[test]
    fn test_analytic_without_insurance_equals_nominal() {
        let config = SimulationConfig::default();
        let solver = EffectiveCostSolver::new(&config);
        let schedule = AmortizationScheduler::new(ScheduleConfig::new(AmortizationSystem::Price)).build(
            200_000.0,
            effective_monthly_rate(9.5),
            180,
            &mut NoInsurance,
        );
        assert_eq!(solver.analytic(&schedule, 9.5), 9.5);
    }

    #[test]
    fn test_analytic_ceiling() {
        let config = SimulationConfig {
            max_effective_cost_pct: 10.05,
            ..SimulationConfig::default()
        };
        let solver = EffectiveCostSolver::new(&config);
        let schedule = insured_schedule(AmortizationSystem::Sac, 10.0);
        assert_eq!(solver.analytic(&schedule, 10.0), 10.05);
    }

    #[test]
    fn test_irr_matches_nominal_without_insurance() {
        // With monthly compounding and no insurance the flows return the nominal rate,
        // up to the actual/365 day count of calendar months
        let config = SimulationConfig::default();
        let solver = EffectiveCostSolver::new(&config);
        let schedule = AmortizationScheduler::new(ScheduleConfig::new(AmortizationSystem::Price)).build(
            150_000.0,
            effective_monthly_rate(12.0),
            120,
            &mut NoInsurance,
        );
        let (rate, basis) = solver.cash_flow_rate(&schedule, as_of());
        assert_eq!(basis, CostBasis::Irr);
        assert!((rate - 12.0).abs() < 0.1, "IRR {}", rate);
    }

    #[test]
    fn test_cross_check_reported() {
        let config = SimulationConfig {
            irr_cross_check: true,
            ..SimulationConfig::default()
        };
        let solver = EffectiveCostSolver::new(&config);
        let schedule = insured_schedule(AmortizationSystem::Price, 11.0);
        let outcome = solver.solve(&schedule, 11.0, as_of());
        assert_eq!(outcome.basis, CostBasis::Analytic);
        let irr = outcome.irr_cross_check.unwrap();
        assert!(irr > 11.0);
    }

    #[test]
    fn test_irr_method_respects_nominal_floor() {
        let config = SimulationConfig {
            cost_method: CostMethod::CashFlowIrr,
            ..SimulationConfig::default()
        };
        let solver = EffectiveCostSolver::new(&config);
        let schedule = insured_schedule(AmortizationSystem::Sac, 11.0);
        let outcome = solver.solve(&schedule, 11.0, as_of());
        assert!(outcome.annual_rate_pct >= 11.0);
        assert!(outcome.irr_cross_check.is_some());
    }

    #[test]
    fn test_linear_fallback_when_not_bracketed() {
        let config = SimulationConfig {
            cost_method: CostMethod::CashFlowIrr,
            irr: crate::cost::IrrSettings {
                lower_bound: 0.5,
                upper_bound: 1.0,
                ..Default::default()
            },
            ..SimulationConfig::default()
        };
        let solver = EffectiveCostSolver::new(&config);
        let schedule = insured_schedule(AmortizationSystem::Price, 11.0);
        let (rate, basis) = solver.cash_flow_rate(&schedule, as_of());
        assert_eq!(basis, CostBasis::LinearApproximation);

        let totals = schedule.totals();
        let expected = ((totals.total_paid / 300_000.0 - 1.0) / 240.0) * 12.0 * 100.0;
        assert_abs_diff_eq!(rate, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_dated_cashflows() {
        let schedule = insured_schedule(AmortizationSystem::Sac, 10.0);
        let flows = dated_cashflows(&schedule, as_of()).unwrap();
        assert_eq!(flows.len(), 241);
        assert_eq!(flows[0], (as_of(), -300_000.0));
        assert_eq!(flows[1].0, NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());
        assert_eq!(flows[240].0, NaiveDate::from_ymd_opt(2046, 1, 10).unwrap());
    }
}
