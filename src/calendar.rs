//! Fiscal calendar for generated series

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of months in a generated year-to-date series
pub const HISTORY_MONTHS: usize = 11;

/// The fixed run of months a history series covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCalendar {
    /// First day of the first fiscal month
    pub start: NaiveDate,

    /// Number of months generated
    pub months: usize,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self::fiscal_year_to_date(2024)
    }
}

impl FiscalCalendar {
    /// April-to-February year-to-date for the fiscal year starting in `start_year`
    pub fn fiscal_year_to_date(start_year: i32) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(start_year, 4, 1).unwrap_or(NaiveDate::MIN),
            months: HISTORY_MONTHS,
        }
    }

    /// First day of the month at `index` (0-based)
    pub fn month_start(&self, index: usize) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(index as u32))
            .unwrap_or(self.start)
    }

    /// Calendar month (1-12) at `index`
    pub fn calendar_month(&self, index: usize) -> u32 {
        self.month_start(index).month()
    }

    /// Short label such as `Apr-24`
    pub fn label(&self, index: usize) -> String {
        self.month_start(index).format("%b-%y").to_string()
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.months).map(|i| self.label(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_april_to_february() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.months, 11);
        assert_eq!(cal.label(0), "Apr-24");
        assert_eq!(cal.label(10), "Feb-25");
        assert_eq!(cal.calendar_month(0), 4);
        assert_eq!(cal.calendar_month(9), 1);
    }

    #[test]
    fn test_labels_length() {
        let cal = FiscalCalendar::fiscal_year_to_date(2023);
        let labels = cal.labels();
        assert_eq!(labels.len(), 11);
        assert_eq!(labels[6], "Oct-23");
    }
}
