//! Monthly metric records and per-entity history series

use crate::assumptions::CollectionModel;
use crate::derived;
use crate::geography::{EntityPath, GeoLevel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Decimal places for published currency figures
pub const CURRENCY_DECIMALS: u32 = 2;

/// Decimal places for published percentages
pub const PERCENT_DECIMALS: u32 = 2;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// One calendar month's snapshot for an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetric {
    /// Position in the series (0-based)
    pub month_index: usize,

    /// First day of the month
    pub month: NaiveDate,

    /// Short label such as `Apr-24`
    pub label: String,

    // Portfolio
    pub loan_balance: f64,
    pub client_count: u64,
    pub disbursement: f64,

    // Collections
    pub amount_due: f64,
    pub amount_collected: f64,
    pub digital_collected: f64,

    // Delinquency, percent of balance
    pub par30: f64,
    pub par60: f64,
    pub par90: f64,
    pub par180: f64,
}

impl MonthlyMetric {
    /// Publication copy with currency and percentages rounded
    pub fn rounded(&self) -> Self {
        let c = |v: f64| round_to(v, CURRENCY_DECIMALS);
        let p = |v: f64| round_to(v, PERCENT_DECIMALS);
        Self {
            month_index: self.month_index,
            month: self.month,
            label: self.label.clone(),
            loan_balance: c(self.loan_balance),
            client_count: self.client_count,
            disbursement: c(self.disbursement),
            amount_due: c(self.amount_due),
            amount_collected: c(self.amount_collected),
            digital_collected: c(self.digital_collected),
            par30: p(self.par30),
            par60: p(self.par60),
            par90: p(self.par90),
            par180: p(self.par180),
        }
    }

    /// Ratios in threshold order (30, 60, 90, 180 days)
    pub fn par_ratios(&self) -> [f64; 4] {
        [self.par30, self.par60, self.par90, self.par180]
    }

    /// Whether longer-overdue ratios never exceed shorter ones
    pub fn aging_is_monotonic(&self) -> bool {
        self.par30 >= self.par60 && self.par60 >= self.par90 && self.par90 >= self.par180
    }
}

/// Ordered monthly metrics for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub path: EntityPath,
    pub name: String,
    pub level: GeoLevel,
    pub months: Vec<MonthlyMetric>,
}

impl HistorySeries {
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Most recent month
    pub fn current(&self) -> Option<&MonthlyMetric> {
        self.months.last()
    }

    pub fn get(&self, month_index: usize) -> Option<&MonthlyMetric> {
        self.months.get(month_index)
    }

    /// Publication copy; aggregation must always use the unrounded series
    pub fn rounded(&self) -> Self {
        Self {
            path: self.path.clone(),
            name: self.name.clone(),
            level: self.level,
            months: self.months.iter().map(MonthlyMetric::rounded).collect(),
        }
    }

    /// Headline figures for dashboards
    pub fn summary(&self, collection: &CollectionModel) -> PortfolioSummary {
        let current = self.current();
        let balance = current.map(|m| m.loan_balance).unwrap_or(0.0);
        let clients = current.map(|m| m.client_count).unwrap_or(0);
        let total_due: f64 = self.months.iter().map(|m| m.amount_due).sum();
        let total_collected: f64 = self.months.iter().map(|m| m.amount_collected).sum();
        let total_digital: f64 = self.months.iter().map(|m| m.digital_collected).sum();

        PortfolioSummary {
            name: self.name.clone(),
            level: self.level,
            months: self.months.len(),
            loan_balance: balance,
            client_count: clients,
            average_ticket_size: derived::average_ticket_size(balance, clients),
            par30: current.map(|m| m.par30).unwrap_or(0.0),
            par90: current.map(|m| m.par90).unwrap_or(0.0),
            par30_amount: current.map(derived::par30_amount).unwrap_or(0.0),
            ytd_collection_efficiency: derived::efficiency_pct(total_collected, total_due, collection),
            current_collection_efficiency: current
                .map(|m| derived::collection_efficiency(m, collection))
                .unwrap_or(collection.fallback_efficiency_pct),
            ytd_digital_adoption: derived::digital_adoption_pct(total_digital, total_collected),
            ytd_growth_pct: derived::ytd_growth_pct(self),
            ytd_disbursement: self.months.iter().map(|m| m.disbursement).sum(),
        }
    }
}

/// Headline portfolio figures for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub name: String,
    pub level: GeoLevel,
    pub months: usize,
    pub loan_balance: f64,
    pub client_count: u64,
    pub average_ticket_size: f64,
    pub par30: f64,
    pub par90: f64,
    pub par30_amount: f64,
    pub ytd_collection_efficiency: f64,
    pub current_collection_efficiency: f64,
    pub ytd_digital_adoption: f64,
    pub ytd_growth_pct: f64,
    pub ytd_disbursement: f64,
}
