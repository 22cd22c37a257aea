//! MFI Metrics - Deterministic synthetic metrics engine for microfinance hierarchies
//!
//! This library provides:
//! - Seeded, reproducible monthly portfolio histories per centre/branch
//! - Hierarchical rollup (centre → branch → district → state → company)
//! - Derived income-statement metrics for the company series
//! - DPD bucket breakdowns and portfolio KPIs
//! - Dataset-wide consistency verification

pub mod error;
pub mod seed;
pub mod calendar;
pub mod assumptions;
pub mod geography;
pub mod history;
pub mod rollup;
pub mod financials;
pub mod dpd;
pub mod derived;
pub mod dataset;

// Re-export commonly used types
pub use error::{MetricsError, Result};
pub use assumptions::Assumptions;
pub use calendar::FiscalCalendar;
pub use geography::{EntityPath, GeoEntity, GeoHierarchy, GeoLevel};
pub use history::{HistoryGenerator, HistoryRequest, HistorySeries, MonthlyMetric};
pub use financials::{FinancialGenerator, FinancialMetric, FinancialSeries};
pub use dpd::DpdBucket;
pub use dataset::{EngineConfig, MetricsDataset, MetricsEngine, RankBy};
