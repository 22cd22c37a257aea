//! Derived KPIs computed from finished series
//!
//! Pure functions over aggregates. Zero denominators return a documented
//! fallback instead of NaN or infinity.

use crate::assumptions::CollectionModel;
use crate::history::{HistorySeries, MonthlyMetric};

/// Collected as a percentage of due, or the model's fallback when nothing
/// was due
pub fn efficiency_pct(collected: f64, due: f64, model: &CollectionModel) -> f64 {
    if due == 0.0 {
        model.fallback_efficiency_pct
    } else {
        collected / due * 100.0
    }
}

/// Collection efficiency for one month
pub fn collection_efficiency(metric: &MonthlyMetric, model: &CollectionModel) -> f64 {
    efficiency_pct(metric.amount_collected, metric.amount_due, model)
}

/// Digital share of collections in percent; zero with no collections
pub fn digital_adoption_pct(digital: f64, collected: f64) -> f64 {
    if collected == 0.0 {
        0.0
    } else {
        digital / collected * 100.0
    }
}

pub fn average_ticket_size(balance: f64, clients: u64) -> f64 {
    if clients == 0 {
        0.0
    } else {
        balance / clients as f64
    }
}

/// Balance overdue beyond 30 days
pub fn par30_amount(metric: &MonthlyMetric) -> f64 {
    metric.loan_balance * metric.par30 / 100.0
}

/// Balance growth over the previous month in percent.
///
/// Month 0 and months following a zero balance report zero.
pub fn mom_growth_pct(series: &HistorySeries, month_index: usize) -> f64 {
    if month_index == 0 {
        return 0.0;
    }
    match (series.get(month_index - 1), series.get(month_index)) {
        (Some(prev), Some(cur)) if prev.loan_balance != 0.0 => {
            (cur.loan_balance / prev.loan_balance - 1.0) * 100.0
        }
        _ => 0.0,
    }
}

/// Growth from the first to the last month in percent
pub fn ytd_growth_pct(series: &HistorySeries) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    match (series.months.first(), series.current()) {
        (Some(first), Some(last)) if first.loan_balance != 0.0 => {
            (last.loan_balance / first.loan_balance - 1.0) * 100.0
        }
        _ => 0.0,
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

    fn series() -> HistorySeries {
        HistoryGenerator::new(Assumptions::default_mfi(), FiscalCalendar::default())
            .generate(&HistoryRequest::new(EntityPath::from("X"), GeoLevel::Branch, 1000.0, 2.0))
    }

    #[test]
    fn test_zero_due_falls_back() {
        let model = CollectionModel::default();
        let mut m = series().months[3].clone();
        m.amount_due = 0.0;
        m.amount_collected = 0.0;
        let eff = collection_efficiency(&m, &model);
        assert!(eff.is_finite());
        assert_eq!(eff, 98.5);
    }

    #[test]
    fn test_efficiency() {
        assert_relative_eq!(efficiency_pct(97.0, 100.0, &CollectionModel::default()), 97.0);
    }

    #[test]
    fn test_digital_adoption() {
        assert_relative_eq!(digital_adoption_pct(25.0, 100.0), 25.0);
        assert_eq!(digital_adoption_pct(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_ticket_size() {
        assert_relative_eq!(average_ticket_size(35_000.0, 2), 17_500.0);
        assert_eq!(average_ticket_size(35_000.0, 0), 0.0);
    }

    #[test]
    fn test_growth() {
        let s = series();
        assert_eq!(mom_growth_pct(&s, 0), 0.0);
        assert_eq!(mom_growth_pct(&s, 99), 0.0);
        for i in 1..s.len() {
            assert!(mom_growth_pct(&s, i) >= 0.0);
        }
        // 750 -> 1000
        assert_relative_eq!(ytd_growth_pct(&s), 100.0 / 3.0, epsilon = 1e-9);
    }
}
