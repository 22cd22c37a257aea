//! Balance trajectory state for a single entity

use crate::assumptions::{PortfolioModel, SeasonalityTable};
use crate::calendar::FiscalCalendar;

/// Compounding balance curve from the opening fraction towards the target
#[derive(Debug, Clone)]
pub struct TrajectoryState {
    /// Current month (0-based)
    pub month_index: usize,

    /// Balance at the current month
    pub balance: f64,

    /// Balance one month earlier (implied opening balance at month 0)
    pub prior_balance: f64,

    /// Constant monthly growth rate before seasonality
    pub growth_rate: f64,
}

impl TrajectoryState {
    /// Initialise at month 0 for a year-end target.
    ///
    /// The base rate is the even compounding rate divided by the mean
    /// seasonality of the growth months. By AM-GM the seasonal product then
    /// stays at or below the even one, so the curve lands at or just under
    /// the target and the final snap never shrinks the balance.
    pub fn start(
        target_balance: f64,
        model: &PortfolioModel,
        seasonality: &SeasonalityTable,
        calendar: &FiscalCalendar,
    ) -> Self {
        let steps = calendar.months.saturating_sub(1);
        let growth_rate = if steps == 0 {
            0.0
        } else {
            let even_rate = (1.0 / model.start_fraction).powf(1.0 / steps as f64) - 1.0;
            let mean_factor = (1..calendar.months)
                .map(|i| seasonality.factor(calendar.calendar_month(i)))
                .sum::<f64>()
                / steps as f64;
            even_rate / mean_factor
        };

        let balance = target_balance * model.start_fraction;
        let opening_step = 1.0 + growth_rate * seasonality.factor(calendar.calendar_month(0));

        Self {
            month_index: 0,
            balance,
            prior_balance: balance / opening_step,
            growth_rate,
        }
    }

    /// Growth multiplier applied when entering a month with `factor`
    pub fn step(&self, factor: f64) -> f64 {
        1.0 + self.growth_rate * factor
    }

    /// Advance to the next month
    pub fn advance_month(&mut self, seasonality: &SeasonalityTable, calendar: &FiscalCalendar) {
        self.month_index += 1;
        let factor = seasonality.factor(calendar.calendar_month(self.month_index));
        self.prior_balance = self.balance;
        self.balance *= self.step(factor);
    }

    /// Net growth over the prior month, floored at zero
    pub fn net_growth(&self) -> f64 {
        (self.balance - self.prior_balance).max(0.0)
    }
}
