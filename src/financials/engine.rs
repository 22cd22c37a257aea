//! Derived financial metrics generator
//!
//! Turns the company-level portfolio series into a monthly income
//! statement. Every figure is a direct formula of the month's portfolio
//! and rates; nothing carries over between months.

use log::debug;

use super::metrics::{FinancialMetric, FinancialSeries};
use crate::assumptions::FinancialModel;
use crate::history::{HistorySeries, MonthlyMetric};
use crate::seed::{month_seed, seeded_signed, Stream};

/// Annual rates in force for one month, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthRates {
    pub portfolio_yield: f64,
    pub cost_of_funds: f64,
    pub opex_ratio: f64,
    pub capital_adequacy_ratio: f64,
}

/// Ratio with a fallback for a zero denominator
fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        fallback
    } else {
        numerator / denominator
    }
}

/// Income statement for one month of portfolio data at the given rates
pub fn derive_month(metric: &MonthlyMetric, rates: &MonthRates, model: &FinancialModel) -> FinancialMetric {
    let balance = metric.loan_balance;
    let fallback = model.ratio_fallback;

    let interest_income = balance * (rates.portfolio_yield / 100.0) / 12.0;
    let interest_expense = balance * (rates.cost_of_funds / 100.0) / 12.0;
    let operating_expense = balance * (rates.opex_ratio / 100.0) / 12.0;
    let provision_expense = balance * (metric.par30 / 100.0) * model.provisioning_coefficient / 12.0;
    let fee_income = metric.disbursement * model.processing_fee_pct / 100.0;

    let net_interest_income = interest_income - interest_expense;
    let total_income = net_interest_income + fee_income;
    let pre_provision_profit = total_income - operating_expense;
    let profit_before_tax = pre_provision_profit - provision_expense;
    let profit_after_tax = profit_before_tax.max(0.0) * (1.0 - model.tax_rate);

    let equity = balance * model.equity_ratio;

    FinancialMetric {
        month_index: metric.month_index,
        month: metric.month,
        label: metric.label.clone(),
        portfolio_yield: rates.portfolio_yield,
        cost_of_funds: rates.cost_of_funds,
        interest_income,
        fee_income,
        interest_expense,
        net_interest_income,
        total_income,
        operating_expense,
        provision_expense,
        pre_provision_profit,
        profit_before_tax,
        profit_after_tax,
        net_interest_margin: ratio_or(net_interest_income * 12.0 * 100.0, balance, fallback),
        opex_ratio: ratio_or(operating_expense * 12.0 * 100.0, balance, fallback),
        cost_to_income: ratio_or(operating_expense * 100.0, total_income, fallback),
        return_on_assets: ratio_or(profit_after_tax * 12.0 * 100.0, balance, fallback),
        return_on_equity: ratio_or(profit_after_tax * 12.0 * 100.0, equity, fallback),
        capital_adequacy_ratio: rates.capital_adequacy_ratio,
    }
}

/// Generator for the company financial series
#[derive(Debug, Clone)]
pub struct FinancialGenerator {
    model: FinancialModel,
}

impl FinancialGenerator {
    pub fn new(model: FinancialModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &FinancialModel {
        &self.model
    }

    /// Rates for month `i`: drifting yield and cost of funds, banded opex,
    /// CAR accreting linearly
    pub fn rates_for(&self, i: usize) -> MonthRates {
        let m = &self.model;
        let t = i as f64;
        let noise = |stream| seeded_signed(month_seed(m.seed, i, stream));

        MonthRates {
            portfolio_yield: m.base_yield_pct
                + m.yield_drift_pct * t
                + m.yield_noise_pct * noise(Stream::PortfolioYield),
            cost_of_funds: m.base_cost_of_funds_pct
                + m.cost_of_funds_drift_pct * t
                + m.cost_of_funds_noise_pct * noise(Stream::CostOfFunds),
            opex_ratio: m.opex_ratio_pct + m.opex_band_pct * noise(Stream::OperatingExpense),
            capital_adequacy_ratio: m.base_car_pct
                + m.car_drift_pct * t
                + m.car_noise_pct * noise(Stream::CapitalRatio),
        }
    }

    /// One financial record per month of the company series
    pub fn generate(&self, company: &HistorySeries) -> FinancialSeries {
        let months: Vec<FinancialMetric> = company
            .months
            .iter()
            .map(|metric| derive_month(metric, &self.rates_for(metric.month_index), &self.model))
            .collect();

        debug!("Derived {} months of financials for {}", months.len(), company.name);

        FinancialSeries { months }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::Assumptions;
    use crate::calendar::FiscalCalendar;
    use crate::geography::{EntityPath, GeoLevel};
    use crate::history::{HistoryGenerator, HistoryRequest};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn month(balance: f64, par30: f64, disbursement: f64) -> MonthlyMetric {
        MonthlyMetric {
            month_index: 0,
            month: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            label: "Apr-24".to_string(),
            loan_balance: balance,
            client_count: 0,
            disbursement,
            amount_due: 0.0,
            amount_collected: 0.0,
            digital_collected: 0.0,
            par30,
            par60: 0.0,
            par90: 0.0,
            par180: 0.0,
        }
    }

    fn rates(portfolio_yield: f64, cost_of_funds: f64, opex_ratio: f64) -> MonthRates {
        MonthRates {
            portfolio_yield,
            cost_of_funds,
            opex_ratio,
            capital_adequacy_ratio: 18.0,
        }
    }

    #[test]
    fn test_interest_lines() {
        let fm = derive_month(&month(1000.0, 0.0, 0.0), &rates(24.0, 12.0, 6.0), &FinancialModel::default());
        assert_relative_eq!(fm.interest_income, 20.0, epsilon = 1e-9);
        assert_relative_eq!(fm.interest_expense, 10.0, epsilon = 1e-9);
        assert_relative_eq!(fm.net_interest_income, 10.0, epsilon = 1e-9);
        assert_relative_eq!(fm.operating_expense, 5.0, epsilon = 1e-9);
        assert_eq!(fm.rounded().interest_income, 20.00);
    }

    #[test]
    fn test_profit_chain() {
        // 1000 at 24/12/6, PAR30 4%, disbursement 200
        let model = FinancialModel::default();
        let fm = derive_month(&month(1000.0, 4.0, 200.0), &rates(24.0, 12.0, 6.0), &model);

        let provision = 1000.0 * 0.04 * 0.15 / 12.0; // 0.5
        assert_relative_eq!(fm.provision_expense, provision, epsilon = 1e-12);
        assert_relative_eq!(fm.fee_income, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fm.total_income, 12.0, epsilon = 1e-9);
        assert_relative_eq!(fm.pre_provision_profit, 7.0, epsilon = 1e-9);
        assert_relative_eq!(fm.profit_before_tax, 6.5, epsilon = 1e-9);
        assert_relative_eq!(fm.profit_after_tax, 6.5 * 0.75, epsilon = 1e-9);

        assert_relative_eq!(fm.net_interest_margin, 12.0, epsilon = 1e-9);
        assert_relative_eq!(fm.opex_ratio, 6.0, epsilon = 1e-9);
        assert_relative_eq!(fm.cost_to_income, 5.0 / 12.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(fm.return_on_assets, 4.875 * 12.0 / 10.0, epsilon = 1e-9);
        assert_relative_eq!(fm.return_on_equity, 4.875 * 12.0 / 130.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loss_floored_before_tax() {
        // Opex above income: profit before tax negative, after tax zero
        let fm = derive_month(&month(1000.0, 2.0, 0.0), &rates(10.0, 9.0, 6.0), &FinancialModel::default());
        assert!(fm.profit_before_tax < 0.0);
        assert_eq!(fm.profit_after_tax, 0.0);
        assert_eq!(fm.return_on_assets, 0.0);
    }

    #[test]
    fn test_zero_balance_uses_fallback() {
        let model = FinancialModel {
            ratio_fallback: -1.0,
            ..Default::default()
        };
        let fm = derive_month(&month(0.0, 0.0, 0.0), &rates(24.0, 12.0, 6.0), &model);
        assert_eq!(fm.net_interest_margin, -1.0);
        assert_eq!(fm.cost_to_income, -1.0);
        assert_eq!(fm.return_on_equity, -1.0);
        assert!(fm.return_on_assets.is_finite());
    }

    #[test]
    fn test_rate_drifts() {
        let gen = FinancialGenerator::new(FinancialModel::default());
        let first = gen.rates_for(0);
        let last = gen.rates_for(10);
        // Drift over ten months outweighs the noise band
        assert!(last.portfolio_yield > first.portfolio_yield);
        assert!(last.cost_of_funds < first.cost_of_funds);
        assert!(last.capital_adequacy_ratio > first.capital_adequacy_ratio);
        for i in 0..11 {
            let r = gen.rates_for(i);
            assert!((5.7..=6.3).contains(&r.opex_ratio));
        }
    }

    #[test]
    fn test_series_current_is_last() {
        let history = HistoryGenerator::new(Assumptions::default_mfi(), FiscalCalendar::default())
            .generate(&HistoryRequest::new(EntityPath::root(), GeoLevel::Country, 50_000_000.0, 2.4));
        let series = FinancialGenerator::new(FinancialModel::default()).generate(&history);

        assert_eq!(series.len(), 11);
        let current = series.current().unwrap();
        assert_eq!(current.label, "Feb-25");
        assert_eq!(current, &series.months[10]);
        assert!(current.profit_after_tax > 0.0);

        let again = FinancialGenerator::new(FinancialModel::default()).generate(&history);
        assert_eq!(series, again);
    }
}
