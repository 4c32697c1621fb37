//! Side-by-side simulation across lenders
//!
//! Validates the request once, then runs rules, schedule and effective cost for each
//! selected lender independently. A lender that cannot finance the request yields an
//! infeasible result; it never aborts the others.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::cost::{CostBasis, EffectiveCostSolver};
use crate::error::ValidationError;
use crate::lender::{CorrectionIndex, InsuranceCalculator, LenderCatalog, LenderProfile, PeriodInsurance};
use crate::request::LoanRequest;
use crate::rules::{LenderRuleEngine, RejectionReason};
use crate::schedule::{AmortizationScheduler, InstallmentLine, ScheduleConfig, ScheduleTotals};

/// Outcome of one lender's simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub lender_id: String,
    pub lender_name: String,
    pub feasible: bool,
    /// Empty when feasible
    pub rejection_reasons: Vec<RejectionReason>,

    /// Financed principal (0 when infeasible)
    pub adjusted_principal: f64,
    pub nominal_annual_rate_pct: Option<f64>,
    pub monthly_rate: Option<f64>,
    pub schedule: Vec<InstallmentLine>,
    pub totals: ScheduleTotals,

    /// Effective annual cost rate (CET) in percent
    pub effective_annual_cost_rate: Option<f64>,
    pub cost_basis: Option<CostBasis>,
    pub irr_cross_check: Option<f64>,

    /// First installment exceeds the configured share of income
    pub affordability_warning: bool,
    pub adjustment_note: Option<String>,
    pub program_tier: Option<String>,
}

impl SimulationResult {
    fn rejected(lender_id: &str, lender_name: &str, reasons: Vec<RejectionReason>) -> Self {
        Self {
            lender_id: lender_id.to_string(),
            lender_name: lender_name.to_string(),
            feasible: false,
            rejection_reasons: reasons,
            adjusted_principal: 0.0,
            nominal_annual_rate_pct: None,
            monthly_rate: None,
            schedule: Vec::new(),
            totals: ScheduleTotals::default(),
            effective_annual_cost_rate: None,
            cost_basis: None,
            irr_cross_check: None,
            affordability_warning: false,
            adjustment_note: None,
            program_tier: None,
        }
    }

    /// One-line summary for console output
    pub fn summary(&self) -> String {
        if !self.feasible {
            let reasons: Vec<String> = self.rejection_reasons.iter().map(|r| r.to_string()).collect();
            return format!("{}: not feasible ({})", self.lender_name, reasons.join("; "));
        }
        format!(
            "{}: principal R$ {:.2}, rate {:.2}% a.a., CET {:.2}% a.a., first R$ {:.2}, last R$ {:.2}, total R$ {:.2}{}",
            self.lender_name,
            self.adjusted_principal,
            self.nominal_annual_rate_pct.unwrap_or_default(),
            self.effective_annual_cost_rate.unwrap_or_default(),
            self.totals.first_payment,
            self.totals.last_payment,
            self.totals.total_paid,
            if self.affordability_warning { " [affordability]" } else { "" }
        )
    }
}

/// Feasible lender ids ordered by effective cost, cheapest first
pub fn rank_by_cost(results: &BTreeMap<String, SimulationResult>) -> Vec<&str> {
    let mut feasible: Vec<(&str, f64)> = results
        .values()
        .filter_map(|r| r.effective_annual_cost_rate.filter(|_| r.feasible).map(|c| (r.lender_id.as_str(), c)))
        .collect();
    feasible.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    feasible.into_iter().map(|(id, _)| id).collect()
}

/// Runs a request against every selected lender
#[derive(Debug, Clone)]
pub struct ComparisonAggregator {
    config: SimulationConfig,
    lenders: LenderCatalog,
}

impl ComparisonAggregator {
    pub fn new(config: SimulationConfig, lenders: LenderCatalog) -> Self {
        Self { config, lenders }
    }

    /// Aggregator with default config and the built-in lenders
    pub fn with_defaults() -> Self {
        Self::new(SimulationConfig::default(), LenderCatalog::default_catalog())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn lenders(&self) -> &LenderCatalog {
        &self.lenders
    }

    /// Simulate every selected lender in turn
    pub fn compare(
        &self,
        request: &LoanRequest,
        as_of: NaiveDate,
    ) -> Result<BTreeMap<String, SimulationResult>, ValidationError> {
        let age = request.validate(as_of, &self.config)?;
        info!(
            "Comparing {} lender(s): principal={:.2} term={} system={}",
            request.selected_lender_ids.len(),
            request.requested_principal,
            request.term_months,
            request.amortization_system
        );

        Ok(request
            .selected_lender_ids
            .iter()
            .map(|id| (id.clone(), self.evaluate_lender(request, id, age, as_of)))
            .collect())
    }

    /// Same as [`compare`](Self::compare), one rayon task per lender
    pub fn compare_parallel(
        &self,
        request: &LoanRequest,
        as_of: NaiveDate,
    ) -> Result<BTreeMap<String, SimulationResult>, ValidationError> {
        let age = request.validate(as_of, &self.config)?;
        info!(
            "Comparing {} lender(s) in parallel: principal={:.2} term={} system={}",
            request.selected_lender_ids.len(),
            request.requested_principal,
            request.term_months,
            request.amortization_system
        );

        Ok(request
            .selected_lender_ids
            .par_iter()
            .map(|id| (id.clone(), self.evaluate_lender(request, id, age, as_of)))
            .collect())
    }

    /// Simulate a single lender, whether or not it is among the selected ids
    pub fn simulate(
        &self,
        request: &LoanRequest,
        lender_id: &str,
        as_of: NaiveDate,
    ) -> Result<SimulationResult, ValidationError> {
        let age = request.validate(as_of, &self.config)?;
        Ok(self.evaluate_lender(request, lender_id, age, as_of))
    }

    fn evaluate_lender(&self, request: &LoanRequest, lender_id: &str, age: u32, as_of: NaiveDate) -> SimulationResult {
        let Some(lender) = self.lenders.get(lender_id) else {
            debug!("{lender_id}: not in catalog");
            return SimulationResult::rejected(lender_id, lender_id, vec![RejectionReason::UnknownLender]);
        };

        let approval = match LenderRuleEngine::new(&self.config).evaluate(request, lender, age) {
            Ok(approval) => approval,
            Err(reasons) => return SimulationResult::rejected(&lender.id, &lender.display_name, reasons),
        };

        let conversion = self.config.rate_conversion;
        let monthly_rate = conversion.monthly_rate(approval.annual_rate_pct);
        let monthly_correction = match (request.correction_index, request.index_rate_annual_pct) {
            (CorrectionIndex::Fixed, _) | (_, None) => 0.0,
            (_, Some(index_pct)) => conversion.monthly_rate(index_pct),
        };

        let Some(mut insurance) = PeriodInsurance::new(
            InsuranceCalculator::new(&lender.insurance),
            age,
            self.config.mip_age_basis,
            request.property_value,
            request.property_type,
        ) else {
            return SimulationResult::rejected(&lender.id, &lender.display_name, missing_insurance(lender, request));
        };

        let scheduler = AmortizationScheduler::new(
            ScheduleConfig::new(request.amortization_system).with_correction(monthly_correction),
        );
        let schedule = scheduler.build(approval.principal, monthly_rate, approval.term_months, &mut insurance);
        let totals = schedule.totals();
        if !schedule.is_finite() || !totals.is_finite() {
            return SimulationResult::rejected(
                &lender.id,
                &lender.display_name,
                vec![RejectionReason::NumericFailure("non-finite value in schedule".to_string())],
            );
        }

        let cost = EffectiveCostSolver::new(&self.config).solve(&schedule, approval.annual_rate_pct, as_of);
        if !cost.annual_rate_pct.is_finite() {
            return SimulationResult::rejected(
                &lender.id,
                &lender.display_name,
                vec![RejectionReason::NumericFailure("non-finite effective cost rate".to_string())],
            );
        }

        let affordability_warning =
            totals.first_payment > self.config.affordability_ratio * request.combined_monthly_income;

        debug!(
            "{}: first={:.2} total={:.2} cet={:.4}% ({:?})",
            lender.id, totals.first_payment, totals.total_paid, cost.annual_rate_pct, cost.basis
        );

        SimulationResult {
            lender_id: lender.id.clone(),
            lender_name: lender.display_name.clone(),
            feasible: true,
            rejection_reasons: Vec::new(),
            adjusted_principal: approval.principal,
            nominal_annual_rate_pct: Some(approval.annual_rate_pct),
            monthly_rate: Some(monthly_rate),
            schedule: schedule.lines,
            totals,
            effective_annual_cost_rate: Some(cost.annual_rate_pct),
            cost_basis: Some(cost.basis),
            irr_cross_check: cost.irr_cross_check,
            affordability_warning,
            adjustment_note: approval.adjustment_note,
            program_tier: approval.program_tier,
        }
    }
}

fn missing_insurance(lender: &LenderProfile, request: &LoanRequest) -> Vec<RejectionReason> {
    if lender.insurance.dfi_rate(request.property_type).is_none() {
        vec![RejectionReason::MissingDfiRate(request.property_type)]
    } else {
        vec![RejectionReason::MissingMipRate]
    }
}
