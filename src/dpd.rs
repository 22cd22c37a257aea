//! Days-past-due breakdown of a month's portfolio
//!
//! Bands are the differences between consecutive PAR thresholds, so the
//! band percentages always sum to 100.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::history::MonthlyMetric;

/// Band labels in order of increasing severity
pub const DPD_BANDS: [&str; 5] = ["0-30 days", "31-60 days", "61-90 days", "91-180 days", "180+ days"];

/// One overdue-age band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpdBucket {
    pub label: String,

    /// Outstanding balance in the band
    pub amount: f64,

    /// Estimated number of accounts in the band
    pub accounts: u64,

    /// Percentage of the portfolio balance
    pub percentage: f64,
}

/// Split a month's balance and clients into DPD bands
pub fn dpd_breakdown(metric: &MonthlyMetric) -> Vec<DpdBucket> {
    let shares = [
        100.0 - metric.par30,
        metric.par30 - metric.par60,
        metric.par60 - metric.par90,
        metric.par90 - metric.par180,
        metric.par180,
    ];

    DPD_BANDS
        .iter()
        .zip(shares)
        .map(|(label, share)| {
            let percentage = if share < 0.0 {
                warn!("{}: negative share {:.4} in {}, clamped to zero", metric.label, share, label);
                0.0
            } else {
                share
            };
            DpdBucket {
                label: label.to_string(),
                amount: metric.loan_balance * percentage / 100.0,
                accounts: (metric.client_count as f64 * percentage / 100.0).round() as u64,
                percentage,
            }
        })
        .collect()
}
