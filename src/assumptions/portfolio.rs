//! Portfolio, delinquency and collection modeling constants

use crate::error::{MetricsError, Result};

/// Shape of the generated balance and activity curves
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioModel {
    /// Opening balance as a fraction of the year-end target
    pub start_fraction: f64,

    /// Share of balance disbursed each month to replace matured loans,
    /// before seasonality
    pub replacement_rate: f64,

    /// Scheduled installments as a fraction of balance
    pub due_fraction: f64,

    /// Amplitude of the PAR30 seasonal wave, relative to the baseline ratio
    pub par_wave_amplitude: f64,

    /// Phase of the PAR30 wave in months (peak lands in the monsoon quarter)
    pub par_wave_phase: f64,

    /// Half-width of the PAR30 noise band, relative to the baseline ratio
    pub par_noise: f64,

    /// Average outstanding per client, used when no client target is given
    pub average_loan_size: f64,

    /// Digital share of collections at the first month
    pub digital_share_start: f64,

    /// Digital share of collections at the last month
    pub digital_share_end: f64,

    /// Half-width of the digital share noise band
    pub digital_share_noise: f64,
}

impl Default for PortfolioModel {
    fn default() -> Self {
        Self {
            start_fraction: 0.75,
            replacement_rate: 0.06,
            due_fraction: 0.09,
            par_wave_amplitude: 0.08,
            par_wave_phase: 2.0,
            par_noise: 0.05,
            average_loan_size: 35_000.0,
            digital_share_start: 0.18,
            digital_share_end: 0.32,
            digital_share_noise: 0.02,
        }
    }
}

impl PortfolioModel {
    pub fn validate(&self) -> Result<()> {
        if !(self.start_fraction > 0.0 && self.start_fraction <= 1.0) {
            return Err(MetricsError::invalid("start_fraction", "must be in (0, 1]"));
        }
        if self.replacement_rate < 0.0 || self.due_fraction < 0.0 {
            return Err(MetricsError::invalid(
                "replacement_rate/due_fraction",
                "must be non-negative",
            ));
        }
        if self.par_wave_amplitude + self.par_noise >= 1.0 {
            return Err(MetricsError::invalid(
                "par_wave_amplitude",
                "wave plus noise must stay below the baseline",
            ));
        }
        if self.average_loan_size <= 0.0 {
            return Err(MetricsError::invalid("average_loan_size", "must be positive"));
        }
        for share in [self.digital_share_start, self.digital_share_end] {
            if !(0.0..=1.0).contains(&share) {
                return Err(MetricsError::invalid("digital_share", "must be in [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Aging waterfall: longer-overdue ratios as fixed fractions of PAR30
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelinquencyWaterfall {
    pub par60_fraction: f64,
    pub par90_fraction: f64,
    pub par180_fraction: f64,
}

impl Default for DelinquencyWaterfall {
    fn default() -> Self {
        Self {
            par60_fraction: 0.75,
            par90_fraction: 0.50,
            par180_fraction: 0.25,
        }
    }
}

impl DelinquencyWaterfall {
    /// (PAR60, PAR90, PAR180) for a given PAR30
    pub fn derive(&self, par30: f64) -> (f64, f64, f64) {
        (
            par30 * self.par60_fraction,
            par30 * self.par90_fraction,
            par30 * self.par180_fraction,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = 1.0 >= self.par60_fraction
            && self.par60_fraction >= self.par90_fraction
            && self.par90_fraction >= self.par180_fraction
            && self.par180_fraction >= 0.0;
        if !ordered {
            return Err(MetricsError::invalid(
                "delinquency_waterfall",
                "fractions must be non-increasing within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Collection efficiency band, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionModel {
    pub min_efficiency_pct: f64,
    pub max_efficiency_pct: f64,

    /// Reported efficiency when nothing was due
    pub fallback_efficiency_pct: f64,
}

impl Default for CollectionModel {
    fn default() -> Self {
        Self {
            min_efficiency_pct: 95.5,
            max_efficiency_pct: 99.5,
            fallback_efficiency_pct: 98.5,
        }
    }
}

impl CollectionModel {
    pub fn validate(&self) -> Result<()> {
        if !(0.0 <= self.min_efficiency_pct && self.min_efficiency_pct <= self.max_efficiency_pct) {
            return Err(MetricsError::invalid(
                "collection_efficiency",
                "band must satisfy 0 <= min <= max",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waterfall_fractions() {
        let (p60, p90, p180) = DelinquencyWaterfall::default().derive(4.0);
        assert_eq!(p60, 3.0);
        assert_eq!(p90, 2.0);
        assert_eq!(p180, 1.0);
    }

    #[test]
    fn test_waterfall_rejects_inverted() {
        let w = DelinquencyWaterfall {
            par60_fraction: 0.4,
            par90_fraction: 0.6,
            par180_fraction: 0.1,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_defaults_valid() {
        assert!(PortfolioModel::default().validate().is_ok());
        assert!(DelinquencyWaterfall::default().validate().is_ok());
        assert!(CollectionModel::default().validate().is_ok());
    }

    #[test]
    fn test_collection_band_order() {
        let model = CollectionModel {
            min_efficiency_pct: 99.0,
            max_efficiency_pct: 97.0,
            fallback_efficiency_pct: 98.5,
        };
        assert!(model.validate().is_err());
    }
}
