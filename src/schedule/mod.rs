//! Amortization schedules for the supported repayment systems

mod engine;
mod export;
mod installment;

pub use engine::{annuity_payment, AmortizationScheduler, NoInsurance, PremiumSource, Premiums, ScheduleConfig};
pub use export::{export_schedule_csv, write_schedule_csv};
pub use installment::{InstallmentLine, Schedule, ScheduleTotals};
