//! Conversion between nominal annual rates and per-period (monthly) rates
//!
//! Annual rates are quoted in percent (12.0 means 12% a year); monthly rates are
//! returned as decimals (0.009489 means 0.9489% a month).

use serde::{Deserialize, Serialize};

/// Method for converting an annual rate into a monthly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateConversion {
    /// Equivalent compounding: i = (1 + annual)^(1/12) - 1
    #[default]
    Compound,
    /// Proportional split: i = annual / 12
    Proportional,
}

impl RateConversion {
    /// Monthly rate (decimal) for an annual rate quoted in percent
    pub fn monthly_rate(&self, annual_rate_pct: f64) -> f64 {
        match self {
            RateConversion::Compound => effective_monthly_rate(annual_rate_pct),
            RateConversion::Proportional => annual_rate_pct / 100.0 / 12.0,
        }
    }
}

/// Effective monthly rate for a nominal annual rate in percent
///
/// `i = (1 + annual/100)^(1/12) - 1`
pub fn effective_monthly_rate(annual_rate_pct: f64) -> f64 {
    (1.0 + annual_rate_pct / 100.0).powf(1.0 / 12.0) - 1.0
}

/// Annual rate in percent equivalent to a compounded monthly rate
pub fn annual_rate_pct(monthly_rate: f64) -> f64 {
    ((1.0 + monthly_rate).powi(12) - 1.0) * 100.0
}

/// Round a monetary amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_twelve_percent_annual() {
        let i = effective_monthly_rate(12.0);
        assert_abs_diff_eq!(i, 0.009488793, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_rate() {
        assert_eq!(effective_monthly_rate(0.0), 0.0);
        assert_eq!(RateConversion::Proportional.monthly_rate(0.0), 0.0);
    }

    #[test]
    fn test_round_trip_annualization() {
        for annual in [3.5, 8.16, 10.99, 12.0] {
            let monthly = effective_monthly_rate(annual);
            assert_abs_diff_eq!(annual_rate_pct(monthly), annual, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_proportional_is_above_compound() {
        // Splitting the annual rate evenly overstates the equivalent monthly rate
        let compound = RateConversion::Compound.monthly_rate(12.0);
        let proportional = RateConversion::Proportional.monthly_rate(12.0);
        assert_abs_diff_eq!(proportional, 0.01, epsilon = 1e-12);
        assert!(proportional > compound);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(3795.5172), 3795.52);
        assert_eq!(round_cents(0.004), 0.0);
    }
}
