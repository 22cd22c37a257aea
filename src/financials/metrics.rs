//! Derived income-statement records

use crate::history::{round_to, CURRENCY_DECIMALS, PERCENT_DECIMALS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Income-statement figures for one month.
///
/// Amounts are for the month; ratios are annualised percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub month_index: usize,
    pub month: NaiveDate,
    pub label: String,

    // Rates driving the month
    pub portfolio_yield: f64,
    pub cost_of_funds: f64,

    // Income statement
    pub interest_income: f64,
    pub fee_income: f64,
    pub interest_expense: f64,
    pub net_interest_income: f64,
    pub total_income: f64,
    pub operating_expense: f64,
    pub provision_expense: f64,
    pub pre_provision_profit: f64,
    pub profit_before_tax: f64,
    pub profit_after_tax: f64,

    // Ratios
    pub net_interest_margin: f64,
    pub opex_ratio: f64,
    pub cost_to_income: f64,
    pub return_on_assets: f64,
    pub return_on_equity: f64,
    pub capital_adequacy_ratio: f64,
}

impl FinancialMetric {
    /// Publication copy with currency and percentages rounded
    pub fn rounded(&self) -> Self {
        let c = |v: f64| round_to(v, CURRENCY_DECIMALS);
        let p = |v: f64| round_to(v, PERCENT_DECIMALS);
        Self {
            month_index: self.month_index,
            month: self.month,
            label: self.label.clone(),
            portfolio_yield: p(self.portfolio_yield),
            cost_of_funds: p(self.cost_of_funds),
            interest_income: c(self.interest_income),
            fee_income: c(self.fee_income),
            interest_expense: c(self.interest_expense),
            net_interest_income: c(self.net_interest_income),
            total_income: c(self.total_income),
            operating_expense: c(self.operating_expense),
            provision_expense: c(self.provision_expense),
            pre_provision_profit: c(self.pre_provision_profit),
            profit_before_tax: c(self.profit_before_tax),
            profit_after_tax: c(self.profit_after_tax),
            net_interest_margin: p(self.net_interest_margin),
            opex_ratio: p(self.opex_ratio),
            cost_to_income: p(self.cost_to_income),
            return_on_assets: p(self.return_on_assets),
            return_on_equity: p(self.return_on_equity),
            capital_adequacy_ratio: p(self.capital_adequacy_ratio),
        }
    }
}

/// Company-level financial series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSeries {
    pub months: Vec<FinancialMetric>,
}

impl FinancialSeries {
    /// Most recent month
    pub fn current(&self) -> Option<&FinancialMetric> {
        self.months.last()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn rounded(&self) -> Self {
        Self {
            months: self.months.iter().map(FinancialMetric::rounded).collect(),
        }
    }

    /// Year-to-date totals
    pub fn summary(&self) -> FinancialSummary {
        let sum = |f: fn(&FinancialMetric) -> f64| self.months.iter().map(f).sum::<f64>();
        FinancialSummary {
            months: self.months.len(),
            interest_income: sum(|m| m.interest_income),
            fee_income: sum(|m| m.fee_income),
            interest_expense: sum(|m| m.interest_expense),
            operating_expense: sum(|m| m.operating_expense),
            provision_expense: sum(|m| m.provision_expense),
            profit_after_tax: sum(|m| m.profit_after_tax),
            current_car: self.current().map(|m| m.capital_adequacy_ratio).unwrap_or(0.0),
        }
    }
}

/// Year-to-date totals of a financial series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub months: usize,
    pub interest_income: f64,
    pub fee_income: f64,
    pub interest_expense: f64,
    pub operating_expense: f64,
    pub provision_expense: f64,
    pub profit_after_tax: f64,
    pub current_car: f64,
}
