//! Monthly history generator
//!
//! Produces a year-to-date series for one entity from its year-end figures.
//! The last month always equals the entity's stated figures exactly; the
//! months leading up to it follow a seasonal growth curve with
//! deterministic noise.

use std::f64::consts::PI;

use log::{debug, warn};

use super::metrics::{HistorySeries, MonthlyMetric};
use super::state::TrajectoryState;
use crate::assumptions::Assumptions;
use crate::calendar::FiscalCalendar;
use crate::geography::{EntityPath, GeoEntity, GeoLevel};
use crate::seed::{key_seed, month_seed, seeded_between, seeded_signed, Stream};

/// What to generate for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub path: EntityPath,
    pub name: String,
    pub level: GeoLevel,

    /// Balance the final month must equal
    pub target_balance: f64,

    /// PAR30 the final month must equal
    pub target_par30: f64,

    /// Client count the final month must equal, if known
    pub target_clients: Option<u64>,

    /// Pre-specified PAR60/90/180 for the final month
    pub target_aging: Option<(f64, f64, f64)>,

    /// Base seed for this entity's draws
    pub seed: u32,
}

impl HistoryRequest {
    /// Request with only balance and PAR30 targets
    pub fn new(path: EntityPath, level: GeoLevel, target_balance: f64, target_par30: f64) -> Self {
        let name = path.name().unwrap_or_default().to_string();
        let seed = key_seed(path.as_str());
        Self {
            path,
            name,
            level,
            target_balance,
            target_par30,
            target_clients: None,
            target_aging: None,
            seed,
        }
    }

    /// Request from an entity's stated profile, seeded from its path
    pub fn for_entity(path: &EntityPath, entity: &GeoEntity) -> Self {
        Self {
            path: path.clone(),
            name: entity.name.clone(),
            level: entity.level,
            target_balance: entity.profile.loan_balance,
            target_par30: entity.profile.par30,
            target_clients: Some(entity.profile.client_count),
            target_aging: entity.profile.aging(),
            seed: key_seed(path.as_str()),
        }
    }

    pub fn with_clients(mut self, clients: u64) -> Self {
        self.target_clients = Some(clients);
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

/// Generator for per-entity monthly histories
#[derive(Debug, Clone)]
pub struct HistoryGenerator {
    assumptions: Assumptions,
    calendar: FiscalCalendar,
}

impl HistoryGenerator {
    pub fn new(assumptions: Assumptions, calendar: FiscalCalendar) -> Self {
        Self { assumptions, calendar }
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    pub fn calendar(&self) -> &FiscalCalendar {
        &self.calendar
    }

    /// Generate the series for one request
    pub fn generate(&self, request: &HistoryRequest) -> HistorySeries {
        let months = self.calendar.months;
        let balances = self.balance_path(request.target_balance);

        let metrics: Vec<MonthlyMetric> = (0..months)
            .map(|i| {
                let is_final = i + 1 == months;
                self.month_metric(request, i, is_final, &balances)
            })
            .collect();

        if let Some(last) = metrics.last() {
            if !last.aging_is_monotonic() {
                warn!(
                    "{}: final aging ratios not monotonic ({:?})",
                    request.path,
                    last.par_ratios()
                );
            }
        }

        debug!(
            "Generated {} months for {} ({}), target balance {:.2}",
            metrics.len(),
            request.path,
            request.level,
            request.target_balance
        );

        HistorySeries {
            path: request.path.clone(),
            name: request.name.clone(),
            level: request.level,
            months: metrics,
        }
    }

    /// Generate from an entity's stated figures
    pub fn generate_for(&self, path: &EntityPath, entity: &GeoEntity) -> HistorySeries {
        self.generate(&HistoryRequest::for_entity(path, entity))
    }

    /// Balance curve with the final month snapped to the target, paired
    /// with the growth since the prior month
    fn balance_path(&self, target_balance: f64) -> Vec<(f64, f64)> {
        let months = self.calendar.months;
        let seasonality = &self.assumptions.seasonality;
        let mut state =
            TrajectoryState::start(target_balance, &self.assumptions.portfolio, seasonality, &self.calendar);

        let mut path = Vec::with_capacity(months);
        for i in 0..months {
            if i > 0 {
                state.advance_month(seasonality, &self.calendar);
            }
            if i + 1 == months {
                let growth = (target_balance - state.prior_balance).max(0.0);
                path.push((target_balance, growth));
            } else {
                path.push((state.balance, state.net_growth()));
            }
        }
        path
    }

    fn month_metric(
        &self,
        request: &HistoryRequest,
        i: usize,
        is_final: bool,
        balances: &[(f64, f64)],
    ) -> MonthlyMetric {
        let portfolio = &self.assumptions.portfolio;
        let collection = &self.assumptions.collection;
        let (balance, growth) = balances[i];
        let factor = self.assumptions.seasonality.factor(self.calendar.calendar_month(i));

        let client_count = match request.target_clients {
            Some(clients) if is_final => clients,
            Some(clients) if request.target_balance > 0.0 => {
                (clients as f64 * balance / request.target_balance).round() as u64
            }
            Some(clients) => clients,
            None => (balance / portfolio.average_loan_size).round() as u64,
        };

        // Replacement of matured loans plus net growth
        let disbursement = balance * portfolio.replacement_rate * factor + growth;

        let amount_due = balance * portfolio.due_fraction;
        let efficiency = seeded_between(
            month_seed(request.seed, i, Stream::Collection),
            collection.min_efficiency_pct,
            collection.max_efficiency_pct,
        );
        let amount_collected = amount_due * efficiency / 100.0;

        let digital_share = self.digital_share(request.seed, i);
        let digital_collected = amount_collected * digital_share;

        let par30 = if is_final {
            request.target_par30
        } else {
            self.par30_trajectory(request, i)
        };
        let (par60, par90, par180) = match request.target_aging {
            Some(aging) if is_final => aging,
            _ => self.assumptions.waterfall.derive(par30),
        };

        MonthlyMetric {
            month_index: i,
            month: self.calendar.month_start(i),
            label: self.calendar.label(i),
            loan_balance: balance,
            client_count,
            disbursement,
            amount_due,
            amount_collected,
            digital_collected,
            par30,
            par60,
            par90,
            par180,
        }
    }

    /// Baseline plus a seasonal wave plus noise, all relative to the baseline
    fn par30_trajectory(&self, request: &HistoryRequest, i: usize) -> f64 {
        let portfolio = &self.assumptions.portfolio;
        let wave = (2.0 * PI * (i as f64 + portfolio.par_wave_phase) / 12.0).sin();
        let noise = seeded_signed(month_seed(request.seed, i, Stream::DelinquencyNoise));
        let ratio = request.target_par30
            * (1.0 + portfolio.par_wave_amplitude * wave + portfolio.par_noise * noise);
        ratio.max(0.0)
    }

    /// Digital share of collections, trending upward over the year
    fn digital_share(&self, seed: u32, i: usize) -> f64 {
        let portfolio = &self.assumptions.portfolio;
        let span = self.calendar.months.saturating_sub(1).max(1) as f64;
        let trend = portfolio.digital_share_start
            + (portfolio.digital_share_end - portfolio.digital_share_start) * i as f64 / span;
        let noise = portfolio.digital_share_noise * seeded_signed(month_seed(seed, i, Stream::DigitalShare));
        (trend + noise).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::{EntityProfile, GeoHierarchy};
    use approx::assert_relative_eq;

    fn generator() -> HistoryGenerator {
        HistoryGenerator::new(Assumptions::default_mfi(), FiscalCalendar::default())
    }

    fn single_request() -> HistoryRequest {
        HistoryRequest::new(EntityPath::from("Test"), GeoLevel::Centre, 1000.0, 2.5)
    }

    #[test]
    fn test_generates_eleven_months() {
        let series = generator().generate(&single_request());
        assert_eq!(series.len(), 11);
        assert_eq!(series.months[0].label, "Apr-24");
        assert_eq!(series.current().unwrap().label, "Feb-25");
    }

    #[test]
    fn test_final_month_snaps_to_target() {
        let series = generator().generate(&single_request());
        let last = series.current().unwrap();
        assert_eq!(last.loan_balance, 1000.0);
        assert_eq!(last.par30, 2.5);
        assert_eq!(last.rounded().loan_balance, 1000.00);
        assert_eq!(last.rounded().par30, 2.50);
    }

    #[test]
    fn test_snap_independent_of_seed() {
        let gen = generator();
        for seed in [0u32, 1, 99, 123_456, u32::MAX] {
            let series = gen.generate(&single_request().with_seed(seed));
            let last = series.current().unwrap();
            assert_eq!(last.loan_balance, 1000.0);
            assert_eq!(last.par30, 2.5);
        }
    }

    #[test]
    fn test_snap_rederives_aging() {
        let series = generator().generate(&single_request());
        let last = series.current().unwrap();
        assert_relative_eq!(last.par60, 2.5 * 0.75);
        assert_relative_eq!(last.par90, 2.5 * 0.5);
        assert_relative_eq!(last.par180, 2.5 * 0.25);
    }

    #[test]
    fn test_prespecified_aging_used_at_final_month() {
        let mut request = single_request();
        request.target_aging = Some((2.0, 1.2, 0.4));
        let series = generator().generate(&request);
        let last = series.current().unwrap();
        assert_eq!((last.par60, last.par90, last.par180), (2.0, 1.2, 0.4));
        // Earlier months still use the waterfall
        let first = &series.months[0];
        assert_relative_eq!(first.par60, first.par30 * 0.75);
    }

    #[test]
    fn test_deterministic() {
        let gen = generator();
        let a = gen.generate(&single_request());
        let b = gen.generate(&single_request());
        for (x, y) in a.months.iter().zip(&b.months) {
            assert_eq!(x.loan_balance.to_bits(), y.loan_balance.to_bits());
            assert_eq!(x.amount_collected.to_bits(), y.amount_collected.to_bits());
            assert_eq!(x.par30.to_bits(), y.par30.to_bits());
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_balance_never_shrinks() {
        let gen = generator();
        for (path, entity) in GeoHierarchy::builtin().entities() {
            let series = gen.generate_for(&path, entity);
            for pair in series.months.windows(2) {
                assert!(
                    pair[1].loan_balance >= pair[0].loan_balance,
                    "{} shrank at {}",
                    path,
                    pair[1].label
                );
            }
        }
    }

    #[test]
    fn test_starts_at_three_quarters() {
        let series = generator().generate(&single_request());
        assert_relative_eq!(series.months[0].loan_balance, 750.0);
    }

    #[test]
    fn test_collections_within_band() {
        let series = generator().generate(&single_request());
        for m in &series.months {
            let eff = m.amount_collected / m.amount_due * 100.0;
            assert!((95.5..99.5).contains(&eff), "efficiency {}", eff);
            assert!(m.digital_collected <= m.amount_collected);
        }
    }

    #[test]
    fn test_par_wave_stays_near_baseline() {
        let series = generator().generate(&single_request());
        for m in &series.months {
            assert!(m.par30 > 2.5 * (1.0 - 0.08 - 0.05) - 1e-12);
            assert!(m.par30 < 2.5 * (1.0 + 0.08 + 0.05) + 1e-12);
            assert!(m.aging_is_monotonic());
        }
    }

    #[test]
    fn test_client_targets() {
        let gen = generator();
        let with_clients = gen.generate(&single_request().with_clients(40));
        assert_eq!(with_clients.current().unwrap().client_count, 40);
        assert_eq!(with_clients.months[0].client_count, 30);

        let path = EntityPath::from("Big");
        let entity = GeoEntity::leaf(
            GeoLevel::Branch,
            "Big",
            EntityProfile::new(3_500_000.0, 97, 1.0),
        );
        let estimated = gen.generate(&HistoryRequest {
            target_clients: None,
            ..HistoryRequest::for_entity(&path, &entity)
        });
        assert_eq!(estimated.current().unwrap().client_count, 100);
    }

    #[test]
    fn test_zero_target() {
        let series = generator().generate(&HistoryRequest::new(
            EntityPath::from("Empty"),
            GeoLevel::Centre,
            0.0,
            0.0,
        ));
        assert!(series.months.iter().all(|m| m.loan_balance == 0.0 && m.amount_due == 0.0));
    }

    #[test]
    fn test_disbursement_positive() {
        let series = generator().generate(&single_request());
        for m in &series.months {
            assert!(m.disbursement > 0.0);
        }
    }
}
