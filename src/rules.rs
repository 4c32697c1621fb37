//! Per-lender eligibility rules
//!
//! Decides whether a request can be scheduled at a lender, clamps an oversized principal
//! to the lender's financing cap, and resolves the nominal rate. Hard failures are
//! collected as [`RejectionReason`]s; clamping is a soft outcome carried on the
//! [`Approval`].

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::lender::{AgeRateLookup, AmortizationSystem, CorrectionIndex, LenderProfile, PropertyType};
use crate::request::LoanRequest;

/// Why a lender cannot finance a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum RejectionReason {
    #[error("{system}/{index} not offered by this lender")]
    UnsupportedCombination {
        system: AmortizationSystem,
        index: CorrectionIndex,
    },

    #[error("correction index {0} not offered by this lender")]
    IndexNotOffered(CorrectionIndex),

    #[error("income {income:.2} outside program brackets")]
    IncomeOutsideBrackets { income: f64 },

    #[error("property value {property_value:.2} outside {label} window {window}")]
    PropertyValueOutsideWindow {
        label: String,
        property_value: f64,
        window: String,
    },

    #[error("no DFI rate for {0} property")]
    MissingDfiRate(PropertyType),

    #[error("no MIP rate configured")]
    MissingMipRate,

    #[error("term of {requested} months exceeds maximum of {maximum} for borrower age at this lender")]
    TermExceedsMaximum { requested: u32, maximum: u32 },

    #[error("lender not configured")]
    UnknownLender,

    #[error("numeric failure: {0}")]
    NumericFailure(String),
}

/// Terms under which a lender will schedule the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    /// Principal after clamping to the financing cap
    pub principal: f64,
    /// Nominal annual rate in percent
    pub annual_rate_pct: f64,
    pub term_months: u32,
    /// Effective financing cap (fraction of property value)
    pub financing_cap: f64,
    /// Longest term allowed for this borrower at this lender
    pub max_term_months: u32,
    /// Present when the principal was reduced
    pub adjustment_note: Option<String>,
    /// Program bracket label, when the subsidized track applies
    pub program_tier: Option<String>,
}

/// Rule engine applying lender profiles to requests
pub struct LenderRuleEngine<'a> {
    config: &'a SimulationConfig,
}

impl<'a> LenderRuleEngine<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Evaluate one request at one lender
    ///
    /// `borrower_age` is the age on the simulation date. Every hard failure is reported,
    /// not only the first.
    pub fn evaluate(
        &self,
        request: &LoanRequest,
        lender: &LenderProfile,
        borrower_age: u32,
    ) -> Result<Approval, Vec<RejectionReason>> {
        let mut reasons = Vec::new();
        let system = request.amortization_system;
        let index = request.correction_index;

        let mut rate = lender.rate_table.rate(system, index);
        if rate.is_none() {
            reasons.push(RejectionReason::UnsupportedCombination { system, index });
        }
        if !lender.supports_index(index) {
            reasons.push(RejectionReason::IndexNotOffered(index));
        }

        // Lenders without tiers are evaluated on their generic terms
        let mut program_cap = None;
        let mut program_tier = None;
        let tiers = lender.program_tiers.as_ref().filter(|t| !t.is_empty());
        if let Some(tiers) = tiers.filter(|_| request.subsidized_program) {
            match tiers.bracket_for_income(request.combined_monthly_income) {
                None => reasons.push(RejectionReason::IncomeOutsideBrackets {
                    income: request.combined_monthly_income,
                }),
                Some(bracket) if !bracket.contains_property_value(request.property_value) => {
                    reasons.push(RejectionReason::PropertyValueOutsideWindow {
                        label: bracket.label.clone(),
                        property_value: request.property_value,
                        window: describe_window(bracket.min_property_value, bracket.max_property_value),
                    });
                }
                Some(bracket) => {
                    if rate.is_some() {
                        rate = Some(bracket.special_annual_rate_pct);
                    }
                    program_cap = Some(bracket.financing_ratio_cap);
                    program_tier = Some(bracket.label.clone());
                }
            }
        }

        if lender.insurance.dfi_rate(request.property_type).is_none() {
            reasons.push(RejectionReason::MissingDfiRate(request.property_type));
        }
        if lender.insurance.mip.rate_for_age(borrower_age).is_none() {
            reasons.push(RejectionReason::MissingMipRate);
        }

        let max_term_months = self.max_term_months(lender, borrower_age);
        if request.term_months > max_term_months {
            reasons.push(RejectionReason::TermExceedsMaximum {
                requested: request.term_months,
                maximum: max_term_months,
            });
        }

        let financing_cap = self.financing_cap(lender, system, program_cap);
        let max_principal = financing_cap * request.property_value;

        let annual_rate_pct = match rate {
            Some(r) if reasons.is_empty() => r,
            _ => {
                debug!("{}: rejected with {} reason(s)", lender.id, reasons.len());
                return Err(reasons);
            }
        };

        let (principal, adjustment_note) = if request.requested_principal > max_principal {
            let note = format!(
                "Principal reduced from R$ {:.2} to R$ {:.2} ({:.0}% of the property value at {})",
                request.requested_principal,
                max_principal,
                financing_cap * 100.0,
                lender.display_name
            );
            (max_principal, Some(note))
        } else {
            (request.requested_principal, None)
        };

        debug!(
            "{}: approved principal={:.2} rate={:.2}% cap={:.2} max_term={}",
            lender.id, principal, annual_rate_pct, financing_cap, max_term_months
        );

        Ok(Approval {
            principal,
            annual_rate_pct,
            term_months: request.term_months,
            financing_cap,
            max_term_months,
            adjustment_note,
            program_tier,
        })
    }

    /// Smallest of the generic ratio, the down payment floor, the system override and the
    /// program bracket cap
    pub fn financing_cap(&self, lender: &LenderProfile, system: AmortizationSystem, program_cap: Option<f64>) -> f64 {
        let mut cap = lender.max_financing_ratio.min(1.0 - lender.min_down_payment_ratio);
        if let Some(ratio) = lender.system_override(system) {
            cap = cap.min(ratio);
        }
        if let Some(ratio) = program_cap {
            cap = cap.min(ratio);
        }
        cap.max(0.0)
    }

    /// Age-based term ceiling, lowered by any lender-specific ceiling
    pub fn max_term_months(&self, lender: &LenderProfile, borrower_age: u32) -> u32 {
        let age_based = self.config.max_payoff_age.saturating_sub(borrower_age).saturating_mul(12);
        match lender.special_max_term_months {
            Some(ceiling) => age_based.min(ceiling),
            None => age_based,
        }
    }
}

fn describe_window(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min:.2}, {max:.2}]"),
        (Some(min), None) => format!(">= {min:.2}"),
        (None, Some(max)) => format!("<= {max:.2}"),
        (None, None) => "(unbounded)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lender::LenderCatalog;
    use crate::request::tests::sample_request;

    fn lender(id: &str) -> LenderProfile {
        LenderCatalog::default_catalog().get(id).unwrap().clone()
    }

    #[test]
    fn test_plain_approval() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let approval = engine.evaluate(&sample_request(), &lender("caixa"), 35).unwrap();

        assert_eq!(approval.principal, 350_000.0);
        assert_eq!(approval.annual_rate_pct, 10.99);
        assert_eq!(approval.financing_cap, 0.80);
        assert_eq!(approval.max_term_months, 540);
        assert!(approval.adjustment_note.is_none());
        assert!(approval.program_tier.is_none());
    }

    #[test]
    fn test_missing_combination() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.amortization_system = AmortizationSystem::Price;

        let reasons = engine.evaluate(&request, &lender("banco_do_brasil"), 35).unwrap_err();
        assert_eq!(
            reasons,
            vec![RejectionReason::UnsupportedCombination {
                system: AmortizationSystem::Price,
                index: CorrectionIndex::Tr,
            }]
        );
        assert_eq!(reasons[0].to_string(), "PRICE/TR not offered by this lender");
    }

    #[test]
    fn test_unsupported_index() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.correction_index = CorrectionIndex::Poupanca;

        let reasons = engine.evaluate(&request, &lender("itau"), 35).unwrap_err();
        assert!(reasons.contains(&RejectionReason::IndexNotOffered(CorrectionIndex::Poupanca)));
    }

    #[test]
    fn test_principal_clamped_to_system_override() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.amortization_system = AmortizationSystem::Price;
        request.requested_principal = 400_000.0;

        let approval = engine.evaluate(&request, &lender("caixa"), 35).unwrap();
        assert_eq!(approval.financing_cap, 0.70);
        assert!((approval.principal - 350_000.0).abs() < 1e-6);
        assert!(approval.principal <= request.requested_principal);
        assert!(approval.adjustment_note.unwrap().contains("350000.00"));
    }

    #[test]
    fn test_down_payment_floor_limits_cap() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut profile = lender("itau");
        profile.min_down_payment_ratio = 0.25;
        assert_eq!(engine.financing_cap(&profile, AmortizationSystem::Sac, None), 0.75);
    }

    #[test]
    fn test_term_cap_by_age() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let request = sample_request();

        // 80 - 55 = 25 years = 300 months < 360
        let reasons = engine.evaluate(&request, &lender("itau"), 55).unwrap_err();
        assert_eq!(
            reasons,
            vec![RejectionReason::TermExceedsMaximum {
                requested: 360,
                maximum: 300
            }]
        );
    }

    #[test]
    fn test_lender_specific_term_ceiling() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let profile = lender("santander");
        assert_eq!(engine.max_term_months(&profile, 30), 300);
        assert_eq!(engine.max_term_months(&profile, 60), 240);

        let reasons = engine.evaluate(&sample_request(), &profile, 30).unwrap_err();
        assert!(matches!(reasons[0], RejectionReason::TermExceedsMaximum { maximum: 300, .. }));
    }

    #[test]
    fn test_term_cap_saturates() {
        let config = SimulationConfig {
            max_payoff_age: u32::MAX,
            ..SimulationConfig::default()
        };
        let engine = LenderRuleEngine::new(&config);
        assert_eq!(engine.max_term_months(&lender("itau"), 30), u32::MAX);
        assert_eq!(engine.max_term_months(&lender("santander"), 30), 300);
    }

    #[test]
    fn test_program_bracket_overrides_rate_and_cap() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.subsidized_program = true;
        request.combined_monthly_income = 4_700.0;
        request.property_value = 250_000.0;
        request.requested_principal = 240_000.0;

        let approval = engine.evaluate(&request, &lender("caixa"), 35).unwrap();
        // Boundary income belongs to Faixa 2, not Faixa 3
        assert_eq!(approval.program_tier.as_deref(), Some("Faixa 2"));
        assert_eq!(approval.annual_rate_pct, 6.50);
        // Generic 0.80 is tighter than the bracket's 0.90
        assert_eq!(approval.financing_cap, 0.80);
        assert!((approval.principal - 200_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_program_rejections() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.subsidized_program = true;

        request.combined_monthly_income = 15_000.0;
        let reasons = engine.evaluate(&request, &lender("caixa"), 35).unwrap_err();
        assert_eq!(reasons, vec![RejectionReason::IncomeOutsideBrackets { income: 15_000.0 }]);

        request.combined_monthly_income = 2_000.0;
        let reasons = engine.evaluate(&request, &lender("caixa"), 35).unwrap_err();
        assert!(matches!(
            &reasons[0],
            RejectionReason::PropertyValueOutsideWindow { label, .. } if label == "Faixa 1"
        ));
        assert!(reasons[0].to_string().contains("<= 264000.00"));
    }

    #[test]
    fn test_program_opt_in_without_tiers_uses_generic_terms() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.subsidized_program = true;
        request.combined_monthly_income = 2_000.0;

        let approval = engine.evaluate(&request, &lender("itau"), 35).unwrap();
        assert_eq!(approval.program_tier, None);
        assert_eq!(approval.annual_rate_pct, 11.60);
        assert_eq!(approval.financing_cap, 0.90);
        assert_eq!(approval.principal, 350_000.0);

        let mut profile = lender("caixa");
        profile.program_tiers = Some(crate::lender::ProgramTiers::default());
        let approval = engine.evaluate(&request, &profile, 35).unwrap();
        assert_eq!(approval.program_tier, None);
        assert_eq!(approval.annual_rate_pct, 10.99);
    }

    #[test]
    fn test_missing_dfi_rate() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.property_type = PropertyType::Commercial;

        let reasons = engine.evaluate(&request, &lender("bradesco"), 35).unwrap_err();
        assert_eq!(reasons, vec![RejectionReason::MissingDfiRate(PropertyType::Commercial)]);
    }

    #[test]
    fn test_collects_all_reasons() {
        let config = SimulationConfig::default();
        let engine = LenderRuleEngine::new(&config);
        let mut request = sample_request();
        request.amortization_system = AmortizationSystem::Price;
        request.property_type = PropertyType::Commercial;

        let reasons = engine.evaluate(&request, &lender("bradesco"), 60).unwrap_err();
        assert_eq!(reasons.len(), 2);
        assert!(reasons.contains(&RejectionReason::MissingDfiRate(PropertyType::Commercial)));
        assert!(reasons.iter().any(|r| matches!(r, RejectionReason::TermExceedsMaximum { .. })));
    }
}
