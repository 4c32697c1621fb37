//! Internal Rate of Return (IRR) over dated cash flows
//!
//! One routine serves every lender and every entry point: the rate `r` solving
//! `sum(CF_j / (1 + r)^(days_j / 365)) = 0`, where `days_j` counts from the first flow.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bisection search settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSettings {
    /// Lowest annual rate searched (decimal)
    pub lower_bound: f64,
    /// Highest annual rate searched (decimal)
    pub upper_bound: f64,
    pub max_iterations: u32,
    /// Stops when |NPV| or the bracket width falls below this
    pub tolerance: f64,
}

impl Default for IrrSettings {
    fn default() -> Self {
        Self {
            lower_bound: -0.99,
            upper_bound: 10.0,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

/// Net present value of dated flows at an annual rate (decimal)
pub fn xnpv(cashflows: &[(NaiveDate, f64)], rate: f64) -> f64 {
    let Some(&(start, _)) = cashflows.first() else {
        return 0.0;
    };
    cashflows
        .iter()
        .map(|&(date, cf)| {
            let years = (date - start).num_days() as f64 / 365.0;
            cf / (1.0 + rate).powf(years)
        })
        .sum()
}

/// Annual IRR (decimal) of dated cash flows using bisection
///
/// Returns None when the flows have no sign change or the bounds do not bracket a root.
/// When the iteration budget runs out first, the midpoint of the last bracket is returned.
pub fn xirr(cashflows: &[(NaiveDate, f64)], settings: &IrrSettings) -> Option<f64> {
    if cashflows.is_empty() {
        return None;
    }

    let has_positive = cashflows.iter().any(|&(_, cf)| cf > 1e-10);
    let has_negative = cashflows.iter().any(|&(_, cf)| cf < -1e-10);
    if !has_positive || !has_negative {
        return None;
    }

    let mut low = settings.lower_bound;
    let mut high = settings.upper_bound;
    let mut npv_low = xnpv(cashflows, low);
    let npv_high = xnpv(cashflows, high);

    if !npv_low.is_finite() || !npv_high.is_finite() || npv_low * npv_high > 0.0 {
        return None;
    }

    for _ in 0..settings.max_iterations {
        let mid = (low + high) / 2.0;
        let npv_mid = xnpv(cashflows, mid);

        if npv_mid.abs() < settings.tolerance || high - low < settings.tolerance {
            return Some(mid);
        }

        if npv_low * npv_mid < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    Some((low + high) / 2.0)
}
