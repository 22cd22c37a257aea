//! Hierarchical rollup of child histories into a parent history
//!
//! Absolute quantities are summed per month. Delinquency ratios are
//! balance-weighted averages, so a parent ratio always lies between its
//! children's ratios for that month. No rounding happens here; published
//! figures are rounded only after the whole hierarchy is aggregated.

use crate::error::{MetricsError, Result};
use crate::geography::{EntityPath, GeoLevel};
use crate::history::{HistorySeries, MonthlyMetric};

/// Balance-weighted mean of `(ratio, balance)` pairs; zero when the total
/// balance is zero
pub fn weighted_average<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (weighted, total) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(w, t), (ratio, balance)| (w + ratio * balance, t + balance));
    if total == 0.0 {
        0.0
    } else {
        weighted / total
    }
}

/// Running totals for one month of a rollup
#[derive(Debug, Clone, Default)]
struct MonthAccumulator {
    loan_balance: f64,
    client_count: u64,
    disbursement: f64,
    amount_due: f64,
    amount_collected: f64,
    digital_collected: f64,
    // Sums of ratio * balance
    par30_weighted: f64,
    par60_weighted: f64,
    par90_weighted: f64,
    par180_weighted: f64,
}

impl MonthAccumulator {
    fn add(&mut self, m: &MonthlyMetric) {
        self.loan_balance += m.loan_balance;
        self.client_count += m.client_count;
        self.disbursement += m.disbursement;
        self.amount_due += m.amount_due;
        self.amount_collected += m.amount_collected;
        self.digital_collected += m.digital_collected;
        self.par30_weighted += m.par30 * m.loan_balance;
        self.par60_weighted += m.par60 * m.loan_balance;
        self.par90_weighted += m.par90 * m.loan_balance;
        self.par180_weighted += m.par180 * m.loan_balance;
    }

    fn ratio(&self, weighted: f64) -> f64 {
        if self.loan_balance == 0.0 {
            0.0
        } else {
            weighted / self.loan_balance
        }
    }

    fn finish(&self, template: &MonthlyMetric) -> MonthlyMetric {
        MonthlyMetric {
            month_index: template.month_index,
            month: template.month,
            label: template.label.clone(),
            loan_balance: self.loan_balance,
            client_count: self.client_count,
            disbursement: self.disbursement,
            amount_due: self.amount_due,
            amount_collected: self.amount_collected,
            digital_collected: self.digital_collected,
            par30: self.ratio(self.par30_weighted),
            par60: self.ratio(self.par60_weighted),
            par90: self.ratio(self.par90_weighted),
            par180: self.ratio(self.par180_weighted),
        }
    }
}

/// Aggregate child series into the parent's series.
///
/// All children must cover the same months.
pub fn rollup(
    path: EntityPath,
    name: &str,
    level: GeoLevel,
    children: &[&HistorySeries],
) -> Result<HistorySeries> {
    let first = children
        .first()
        .ok_or_else(|| MetricsError::EmptyRollup(path.to_string()))?;
    let months = first.len();

    for child in children {
        if child.len() != months {
            return Err(MetricsError::SeriesLengthMismatch {
                name: path.to_string(),
                expected: months,
                actual: child.len(),
            });
        }
    }

    let metrics = (0..months)
        .map(|i| {
            let mut acc = MonthAccumulator::default();
            for child in children {
                acc.add(&child.months[i]);
            }
            acc.finish(&first.months[i])
        })
        .collect();

    Ok(HistorySeries {
        path,
        name: name.to_string(),
        level,
        months: metrics,
    })
}
