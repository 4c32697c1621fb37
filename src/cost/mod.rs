//! Effective cost of financing

mod effective;
mod irr;

pub use effective::{dated_cashflows, CostBasis, CostMethod, CostOutcome, EffectiveCostSolver};
pub use irr::{xirr, xnpv, IrrSettings};
