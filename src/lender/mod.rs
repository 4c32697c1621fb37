//! Lender configuration: profiles, insurance tables, and the built-in catalog

mod catalog;
mod insurance;
pub mod loader;
mod profile;

pub use catalog::{default_program_tiers, LenderCatalog, DEFAULT_LENDER_DATA_PATH};
pub use insurance::{AgeBand, AgeRate, AgeRateLookup, InsuranceCalculator, InsuranceTable, MipTable, PeriodInsurance};
pub use loader::{load_lenders, load_lenders_from_reader, load_program_tiers};
pub use profile::{
    AmortizationSystem, CorrectionIndex, IncomeBracketRule, LenderProfile, ProgramTiers, PropertyType, RateEntry,
    RateTable,
};
