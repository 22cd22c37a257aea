//! Income-statement modeling constants

use crate::error::{MetricsError, Result};

/// Rates and coefficients behind the derived financial metrics.
///
/// All rates are annual percentages unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialModel {
    /// Portfolio yield at the first month
    pub base_yield_pct: f64,
    /// Monthly upward drift in yield (portfolio mix shift)
    pub yield_drift_pct: f64,
    /// Half-width of the yield noise band
    pub yield_noise_pct: f64,

    /// Cost of funds at the first month
    pub base_cost_of_funds_pct: f64,
    /// Monthly drift in cost of funds (negative: improving credit profile)
    pub cost_of_funds_drift_pct: f64,
    pub cost_of_funds_noise_pct: f64,

    /// Operating expense ratio centre
    pub opex_ratio_pct: f64,
    /// Half-width of the opex ratio band
    pub opex_band_pct: f64,

    /// Processing fee charged on disbursements (percent of amount)
    pub processing_fee_pct: f64,

    /// Share of PAR30 provided for, annualised
    pub provisioning_coefficient: f64,

    /// Flat tax rate on positive profit (fraction)
    pub tax_rate: f64,

    /// Equity as a fraction of loan balance
    pub equity_ratio: f64,

    /// Capital adequacy ratio at the first month
    pub base_car_pct: f64,
    /// Monthly CAR accretion from retained earnings
    pub car_drift_pct: f64,
    pub car_noise_pct: f64,

    /// Reported value for a ratio whose denominator is zero
    pub ratio_fallback: f64,

    /// Seed for company-level financial draws
    pub seed: u32,
}

impl Default for FinancialModel {
    fn default() -> Self {
        Self {
            base_yield_pct: 24.0,
            yield_drift_pct: 0.04,
            yield_noise_pct: 0.10,
            base_cost_of_funds_pct: 12.0,
            cost_of_funds_drift_pct: -0.03,
            cost_of_funds_noise_pct: 0.05,
            opex_ratio_pct: 6.0,
            opex_band_pct: 0.30,
            processing_fee_pct: 1.0,
            provisioning_coefficient: 0.15,
            tax_rate: 0.25,
            equity_ratio: 0.13,
            base_car_pct: 18.0,
            car_drift_pct: 0.15,
            car_noise_pct: 0.20,
            ratio_fallback: 0.0,
            seed: 20_240_401,
        }
    }
}

impl FinancialModel {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(MetricsError::invalid("tax_rate", "must be in [0, 1)"));
        }
        if self.equity_ratio <= 0.0 {
            return Err(MetricsError::invalid("equity_ratio", "must be positive"));
        }
        if self.provisioning_coefficient < 0.0 {
            return Err(MetricsError::invalid(
                "provisioning_coefficient",
                "must be non-negative",
            ));
        }
        if self.opex_band_pct < 0.0 || self.opex_band_pct > self.opex_ratio_pct {
            return Err(MetricsError::invalid(
                "opex_band_pct",
                "must be within [0, opex_ratio_pct]",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(FinancialModel::default().validate().is_ok());
    }

    #[test]
    fn test_tax_rate_bounds() {
        let model = FinancialModel {
            tax_rate: 1.2,
            ..Default::default()
        };
        assert!(model.validate().is_err());
    }
}
