//! Modeling assumptions: seasonality, portfolio shape, delinquency aging,
//! collection efficiency and income-statement constants

mod seasonality;
mod portfolio;
mod financial;
pub mod loader;

pub use seasonality::SeasonalityTable;
pub use portfolio::{PortfolioModel, DelinquencyWaterfall, CollectionModel};
pub use financial::FinancialModel;
pub use loader::LoadedAssumptions;

use crate::error::{MetricsError, Result};
use log::debug;
use std::path::Path;

/// Container for all generation assumptions
///
/// Immutable once built and passed by reference into every generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assumptions {
    pub seasonality: SeasonalityTable,
    pub portfolio: PortfolioModel,
    pub waterfall: DelinquencyWaterfall,
    pub collection: CollectionModel,
    pub financial: FinancialModel,
}

impl Assumptions {
    /// Built-in defaults
    pub fn default_mfi() -> Self {
        Self::default()
    }

    /// Load assumptions from CSV files in the default location (data/assumptions/)
    pub fn from_csv() -> Result<Self> {
        Self::from_csv_path(Path::new(loader::DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load assumptions from CSV files in a specific directory.
    ///
    /// Constants not listed in the file keep their defaults.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let loaded = LoadedAssumptions::load_from(path)?;

        let mut assumptions = Self {
            seasonality: SeasonalityTable::from_factors(loaded.seasonality)?,
            ..Self::default()
        };
        for (name, value) in &loaded.constants {
            assumptions.set_constant(name, *value)?;
        }
        assumptions.validate()?;

        debug!(
            "Loaded assumptions from {} ({} constants)",
            path.display(),
            loaded.constants.len()
        );
        Ok(assumptions)
    }

    /// Override a single named constant
    pub fn set_constant(&mut self, name: &str, value: f64) -> Result<()> {
        let p = &mut self.portfolio;
        let w = &mut self.waterfall;
        let c = &mut self.collection;
        let f = &mut self.financial;
        let slot: &mut f64 = match name {
            "start_fraction" => &mut p.start_fraction,
            "replacement_rate" => &mut p.replacement_rate,
            "due_fraction" => &mut p.due_fraction,
            "par_wave_amplitude" => &mut p.par_wave_amplitude,
            "par_wave_phase" => &mut p.par_wave_phase,
            "par_noise" => &mut p.par_noise,
            "average_loan_size" => &mut p.average_loan_size,
            "digital_share_start" => &mut p.digital_share_start,
            "digital_share_end" => &mut p.digital_share_end,
            "digital_share_noise" => &mut p.digital_share_noise,
            "par60_fraction" => &mut w.par60_fraction,
            "par90_fraction" => &mut w.par90_fraction,
            "par180_fraction" => &mut w.par180_fraction,
            "min_collection_efficiency_pct" => &mut c.min_efficiency_pct,
            "max_collection_efficiency_pct" => &mut c.max_efficiency_pct,
            "fallback_collection_efficiency_pct" => &mut c.fallback_efficiency_pct,
            "base_yield_pct" => &mut f.base_yield_pct,
            "yield_drift_pct" => &mut f.yield_drift_pct,
            "yield_noise_pct" => &mut f.yield_noise_pct,
            "base_cost_of_funds_pct" => &mut f.base_cost_of_funds_pct,
            "cost_of_funds_drift_pct" => &mut f.cost_of_funds_drift_pct,
            "cost_of_funds_noise_pct" => &mut f.cost_of_funds_noise_pct,
            "opex_ratio_pct" => &mut f.opex_ratio_pct,
            "opex_band_pct" => &mut f.opex_band_pct,
            "processing_fee_pct" => &mut f.processing_fee_pct,
            "provisioning_coefficient" => &mut f.provisioning_coefficient,
            "tax_rate" => &mut f.tax_rate,
            "equity_ratio" => &mut f.equity_ratio,
            "base_car_pct" => &mut f.base_car_pct,
            "car_drift_pct" => &mut f.car_drift_pct,
            "car_noise_pct" => &mut f.car_noise_pct,
            "ratio_fallback" => &mut f.ratio_fallback,
            "financial_seed" => {
                if value < 0.0 || value > u32::MAX as f64 || value.fract() != 0.0 {
                    return Err(MetricsError::invalid(name, "must be a 32-bit unsigned integer"));
                }
                f.seed = value as u32;
                return Ok(());
            }
            other => return Err(MetricsError::invalid(other, "unknown constant")),
        };
        if !value.is_finite() {
            return Err(MetricsError::invalid(name, "must be finite"));
        }
        *slot = value;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.seasonality.validate()?;
        self.portfolio.validate()?;
        self.waterfall.validate()?;
        self.collection.validate()?;
        self.financial.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_matches_defaults() {
        let loaded = Assumptions::from_csv().expect("Failed to load assumptions");
        let defaults = Assumptions::default_mfi();

        assert_eq!(loaded.seasonality, defaults.seasonality);
        assert_eq!(loaded.waterfall, defaults.waterfall);
        assert_eq!(loaded.financial.tax_rate, 0.25);
        assert_eq!(loaded.financial.equity_ratio, 0.13);
        assert_eq!(loaded.collection.fallback_efficiency_pct, 98.5);
    }

    #[test]
    fn test_set_constant() {
        let mut a = Assumptions::default_mfi();
        a.set_constant("tax_rate", 0.3).unwrap();
        assert_eq!(a.financial.tax_rate, 0.3);

        a.set_constant("financial_seed", 7.0).unwrap();
        assert_eq!(a.financial.seed, 7);
    }

    #[test]
    fn test_unknown_constant_rejected() {
        let mut a = Assumptions::default_mfi();
        let err = a.set_constant("vintage_roll_rate", 0.015).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidAssumption { .. }));
    }
}
