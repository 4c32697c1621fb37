//! Financing Simulator - mortgage simulation engine for side-by-side lender comparison
//!
//! This library provides:
//! - Rate conversion between nominal annual and monthly rates
//! - SAC and PRICE amortization schedules with MIP/DFI insurance folded in
//! - Per-lender eligibility rules (financing caps, term caps, subsidized program brackets)
//! - Effective annual cost rate (analytic load, with an IRR alternative)
//! - Multi-lender comparison, sequential or parallel

pub mod comparison;
pub mod config;
pub mod cost;
pub mod error;
pub mod lender;
pub mod rates;
pub mod request;
pub mod rules;
pub mod schedule;

// Re-export commonly used types
pub use comparison::{rank_by_cost, ComparisonAggregator, SimulationResult};
pub use config::{MipAgeBasis, SimulationConfig};
pub use cost::{CostBasis, CostMethod, EffectiveCostSolver};
pub use error::{SimulationError, ValidationError};
pub use lender::{AmortizationSystem, CorrectionIndex, LenderCatalog, LenderProfile, PropertyType};
pub use rates::RateConversion;
pub use request::LoanRequest;
pub use rules::{Approval, LenderRuleEngine, RejectionReason};
pub use schedule::{AmortizationScheduler, InstallmentLine, Schedule, ScheduleConfig, ScheduleTotals};
