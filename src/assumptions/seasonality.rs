//! Monthly seasonality factors for MFI activity

use crate::error::{MetricsError, Result};

/// Activity multiplier per calendar month.
///
/// Low at the fiscal-year start (April), peaking through the festive
/// months and the March year-end push.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalityTable {
    /// Factors by calendar month (index 0 = January)
    factors: [f64; 12],
}

impl Default for SeasonalityTable {
    fn default() -> Self {
        Self {
            factors: [
                1.00, // Jan
                1.05, // Feb
                1.25, // Mar - year-end push
                0.80, // Apr - fiscal-year start
                0.90, // May
                0.95, // Jun - monsoon slowdown
                0.95, // Jul
                1.05, // Aug
                1.10, // Sep
                1.20, // Oct - festive
                1.15, // Nov - festive
                1.05, // Dec
            ],
        }
    }
}

impl SeasonalityTable {
    /// Build from factors indexed by calendar month (January first)
    pub fn from_factors(factors: [f64; 12]) -> Result<Self> {
        let table = Self { factors };
        table.validate()?;
        Ok(table)
    }

    /// Flat table, every month 1.0
    pub fn flat() -> Self {
        Self { factors: [1.0; 12] }
    }

    /// Factor for a calendar month (1-12)
    pub fn factor(&self, calendar_month: u32) -> f64 {
        let idx = (calendar_month.clamp(1, 12) - 1) as usize;
        self.factors[idx]
    }

    pub fn factors(&self) -> &[f64; 12] {
        &self.factors
    }

    /// Growth can only stay monotonic when every factor is positive
    pub fn validate(&self) -> Result<()> {
        for (i, f) in self.factors.iter().enumerate() {
            if !f.is_finite() || *f <= 0.0 {
                return Err(MetricsError::invalid(
                    "seasonality",
                    format!("month {} factor {} must be positive", i + 1, f),
                ));
            }
        }
        Ok(())
    }
}
