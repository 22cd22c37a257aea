//! Monthly history generation for individual entities

mod state;
mod engine;
mod metrics;

pub use state::TrajectoryState;
pub use engine::{HistoryGenerator, HistoryRequest};
pub use metrics::{
    round_to, HistorySeries, MonthlyMetric, PortfolioSummary, CURRENCY_DECIMALS, PERCENT_DECIMALS,
};
