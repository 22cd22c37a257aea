//! Derived income-statement metrics for the company series

mod engine;
mod metrics;

pub use engine::{derive_month, FinancialGenerator, MonthRates};
pub use metrics::{FinancialMetric, FinancialSeries, FinancialSummary};
