//! End-to-end metrics pipeline
//!
//! Hierarchy in, a complete immutable dataset out: leaf histories are
//! generated independently (optionally across threads), every parent is
//! rolled up from its children bottom-up, and company financials are
//! derived from the company series.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;

use crate::assumptions::Assumptions;
use crate::calendar::FiscalCalendar;
use crate::dpd::{dpd_breakdown, DpdBucket};
use crate::error::{MetricsError, Result};
use crate::financials::{FinancialGenerator, FinancialSeries};
use crate::geography::{EntityPath, GeoEntity, GeoHierarchy, GeoLevel};
use crate::history::{HistoryGenerator, HistorySeries, MonthlyMetric, PortfolioSummary};
use crate::rollup::rollup;

/// Relative tolerance used by consistency verification
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Engine run configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Months covered by every series
    pub calendar: FiscalCalendar,

    /// Generate leaf histories on the rayon pool
    pub parallel: bool,

    /// Relative tolerance for consistency checks
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calendar: FiscalCalendar::default(),
            parallel: true,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Ordering key for ranking entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Par30,
    Balance,
}

impl RankBy {
    fn value(&self, metric: &MonthlyMetric) -> f64 {
        match self {
            RankBy::Par30 => metric.par30,
            RankBy::Balance => metric.loan_balance,
        }
    }

    pub fn parse(s: &str) -> Option<RankBy> {
        match s.to_ascii_lowercase().as_str() {
            "par30" | "par" => Some(RankBy::Par30),
            "balance" | "glp" => Some(RankBy::Balance),
            _ => None,
        }
    }
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBy::Par30 => f.write_str("par30"),
            RankBy::Balance => f.write_str("balance"),
        }
    }
}

/// Builds datasets from a hierarchy
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    assumptions: Assumptions,
    config: EngineConfig,
}

impl MetricsEngine {
    pub fn new(assumptions: Assumptions, config: EngineConfig) -> Self {
        Self { assumptions, config }
    }

    /// Engine with assumptions loaded from a CSV directory
    pub fn from_csv_path(path: &Path, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(Assumptions::from_csv_path(path)?, config))
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate, roll up and derive everything for `hierarchy`
    pub fn build(&self, hierarchy: GeoHierarchy) -> Result<MetricsDataset> {
        let generator = HistoryGenerator::new(self.assumptions.clone(), self.config.calendar);

        hierarchy.figure_mismatches(self.config.tolerance);

        let entities = hierarchy.entities();
        let leaves: Vec<&(EntityPath, &GeoEntity)> =
            entities.iter().filter(|(_, e)| e.is_leaf()).collect();

        let generated: Vec<HistorySeries> = if self.config.parallel {
            leaves
                .par_iter()
                .map(|(path, entity)| generator.generate_for(path, entity))
                .collect()
        } else {
            leaves
                .iter()
                .map(|(path, entity)| generator.generate_for(path, entity))
                .collect()
        };
        let leaf_count = generated.len();

        let mut by_path: HashMap<EntityPath, HistorySeries> =
            generated.into_iter().map(|s| (s.path.clone(), s)).collect();
        roll_up_tree(EntityPath::root(), hierarchy.root(), &mut by_path)?;

        // Pre-order, company first
        let mut series = Vec::with_capacity(entities.len());
        let mut index = HashMap::with_capacity(entities.len());
        for (path, _) in &entities {
            let s = by_path
                .remove(path)
                .ok_or_else(|| MetricsError::UnknownEntity(path.to_string()))?;
            index.insert(path.clone(), series.len());
            series.push(s);
        }

        let financials = FinancialGenerator::new(self.assumptions.financial.clone()).generate(&series[0]);

        info!(
            "Built dataset for {}: {} entities ({} generated, {} rolled up), {} months",
            hierarchy.company_name(),
            series.len(),
            leaf_count,
            series.len() - leaf_count,
            self.config.calendar.months
        );

        Ok(MetricsDataset {
            hierarchy,
            assumptions: self.assumptions.clone(),
            tolerance: self.config.tolerance,
            series,
            index,
            financials,
        })
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(Assumptions::default_mfi(), EngineConfig::default())
    }
}

/// Post-order rollup: every child is present before its parent is built
fn roll_up_tree(
    path: EntityPath,
    entity: &GeoEntity,
    series: &mut HashMap<EntityPath, HistorySeries>,
) -> Result<()> {
    if entity.is_leaf() {
        return Ok(());
    }
    for child in &entity.children {
        roll_up_tree(path.join(&child.name), child, series)?;
    }

    let children = entity
        .children
        .iter()
        .map(|c| {
            let child_path = path.join(&c.name);
            series
                .get(&child_path)
                .ok_or_else(|| MetricsError::UnknownEntity(child_path.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    let parent = rollup(path.clone(), &entity.name, entity.level, &children)?;

    debug!("Rolled up {} children into {}", entity.children.len(), path);
    series.insert(path, parent);
    Ok(())
}

/// Relative closeness with an absolute floor of `tolerance` near zero
fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

/// Every entity's series plus company financials
#[derive(Debug, Clone)]
pub struct MetricsDataset {
    hierarchy: GeoHierarchy,
    assumptions: Assumptions,
    tolerance: f64,
    series: Vec<HistorySeries>,
    index: HashMap<EntityPath, usize>,
    financials: FinancialSeries,
}

impl MetricsDataset {
    /// Built-in hierarchy with default assumptions
    pub fn builtin() -> Result<Self> {
        MetricsEngine::default().build(GeoHierarchy::builtin())
    }

    pub fn hierarchy(&self) -> &GeoHierarchy {
        &self.hierarchy
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    /// All series, company first, in hierarchy pre-order
    pub fn all_series(&self) -> &[HistorySeries] {
        &self.series
    }

    pub fn company(&self) -> &HistorySeries {
        &self.series[0]
    }

    pub fn series(&self, path: &EntityPath) -> Result<&HistorySeries> {
        self.index
            .get(path)
            .map(|&i| &self.series[i])
            .ok_or_else(|| MetricsError::UnknownEntity(path.to_string()))
    }

    /// First entity with the given level and name
    pub fn find(&self, level: GeoLevel, name: &str) -> Option<&HistorySeries> {
        self.series.iter().find(|s| s.level == level && s.name == name)
    }

    pub fn financials(&self) -> &FinancialSeries {
        &self.financials
    }

    /// DPD bands for an entity; `None` means the current month
    pub fn dpd(&self, path: &EntityPath, month: Option<usize>) -> Result<Vec<DpdBucket>> {
        let series = self.series(path)?;
        let index = month.unwrap_or_else(|| series.len().saturating_sub(1));
        let metric = series.get(index).ok_or_else(|| MetricsError::MonthOutOfRange {
            entity: path.to_string(),
            month: index,
            months: series.len(),
        })?;
        Ok(dpd_breakdown(metric))
    }

    pub fn summary(&self, path: &EntityPath) -> Result<PortfolioSummary> {
        Ok(self.series(path)?.summary(&self.assumptions.collection))
    }

    /// Direct children of `path`, highest current value first
    pub fn rank_children(&self, path: &EntityPath, by: RankBy) -> Result<Vec<&HistorySeries>> {
        let entity = self
            .hierarchy
            .get(path)
            .ok_or_else(|| MetricsError::UnknownEntity(path.to_string()))?;

        let mut children = entity
            .children
            .iter()
            .map(|c| self.series(&path.join(&c.name)))
            .collect::<Result<Vec<_>>>()?;

        let key = |s: &HistorySeries| s.current().map(|m| by.value(m)).unwrap_or(0.0);
        children.sort_by(|a, b| key(*b).total_cmp(&key(*a)));
        Ok(children)
    }

    /// Every consistency violation found in the dataset
    pub fn consistency_issues(&self) -> Vec<MetricsError> {
        let mut issues = Vec::new();
        for (path, entity) in self.hierarchy.entities() {
            let Ok(series) = self.series(&path) else {
                issues.push(MetricsError::UnknownEntity(path.to_string()));
                continue;
            };
            if entity.is_leaf() {
                self.check_snap(&path, entity, series, &mut issues);
            } else {
                self.check_rollup(&path, entity, series, &mut issues);
            }
        }
        issues
    }

    /// First consistency violation, if any
    pub fn verify(&self) -> Result<()> {
        match self.consistency_issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => {
                info!("Dataset consistent: {} entities verified", self.series.len());
                Ok(())
            }
        }
    }

    fn check_snap(
        &self,
        path: &EntityPath,
        entity: &GeoEntity,
        series: &HistorySeries,
        issues: &mut Vec<MetricsError>,
    ) {
        let Some(last) = series.current() else {
            issues.push(inconsistent(path, 0, "empty series".to_string()));
            return;
        };
        let target = &entity.profile;
        if last.loan_balance != target.loan_balance {
            issues.push(inconsistent(
                path,
                last.month_index,
                format!("final balance {} != {}", last.loan_balance, target.loan_balance),
            ));
        }
        if last.par30 != target.par30 {
            issues.push(inconsistent(
                path,
                last.month_index,
                format!("final PAR30 {} != {}", last.par30, target.par30),
            ));
        }
        if last.client_count != target.client_count {
            issues.push(inconsistent(
                path,
                last.month_index,
                format!("final clients {} != {}", last.client_count, target.client_count),
            ));
        }
    }

    fn check_rollup(
        &self,
        path: &EntityPath,
        entity: &GeoEntity,
        parent: &HistorySeries,
        issues: &mut Vec<MetricsError>,
    ) {
        let children: Vec<&HistorySeries> = entity
            .children
            .iter()
            .filter_map(|c| self.series(&path.join(&c.name)).ok())
            .collect();
        if children.len() != entity.children.len() {
            issues.push(inconsistent(path, 0, "missing child series".to_string()));
            return;
        }

        let tol = self.tolerance;
        let sums: [(&str, fn(&MonthlyMetric) -> f64); 5] = [
            ("balance", |m| m.loan_balance),
            ("disbursement", |m| m.disbursement),
            ("due", |m| m.amount_due),
            ("collected", |m| m.amount_collected),
            ("digital", |m| m.digital_collected),
        ];
        let ratios: [(&str, fn(&MonthlyMetric) -> f64); 4] = [
            ("PAR30", |m| m.par30),
            ("PAR60", |m| m.par60),
            ("PAR90", |m| m.par90),
            ("PAR180", |m| m.par180),
        ];

        for (i, m) in parent.months.iter().enumerate() {
            let Some(kids) = children.iter().map(|c| c.get(i)).collect::<Option<Vec<_>>>() else {
                issues.push(inconsistent(path, i, "child series too short".to_string()));
                continue;
            };

            for (name, pick) in sums {
                let expected: f64 = kids.iter().map(|k| pick(*k)).sum();
                if !close(pick(m), expected, tol) {
                    issues.push(inconsistent(
                        path,
                        i,
                        format!("{} {} != sum of children {}", name, pick(m), expected),
                    ));
                }
            }

            let clients: u64 = kids.iter().map(|k| k.client_count).sum();
            if m.client_count != clients {
                issues.push(inconsistent(
                    path,
                    i,
                    format!("clients {} != sum of children {}", m.client_count, clients),
                ));
            }

            for (name, pick) in ratios {
                let lo = kids.iter().map(|k| pick(*k)).fold(f64::INFINITY, f64::min);
                let hi = kids.iter().map(|k| pick(*k)).fold(f64::NEG_INFINITY, f64::max);
                let v = pick(m);
                if m.loan_balance > 0.0 && !(lo - tol <= v && v <= hi + tol) {
                    issues.push(inconsistent(
                        path,
                        i,
                        format!("{} {} outside children range [{}, {}]", name, v, lo, hi),
                    ));
                }
            }
        }
    }
}

fn inconsistent(path: &EntityPath, month: usize, detail: String) -> MetricsError {
    MetricsError::Inconsistent {
        entity: path.to_string(),
        month,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::load_default_hierarchy;
    use approx::assert_relative_eq;

    fn dataset() -> MetricsDataset {
        MetricsDataset::builtin().unwrap()
    }

    #[test]
    fn test_builds_every_entity() {
        let ds = dataset();
        let hierarchy = GeoHierarchy::builtin();
        assert_eq!(ds.all_series().len(), hierarchy.root().node_count());
        assert_eq!(ds.company().level, GeoLevel::Country);
        assert!(ds.company().path.is_root());
        for s in ds.all_series() {
            assert_eq!(s.len(), 11);
        }
    }

    #[test]
    fn test_verify_passes() {
        let ds = dataset();
        assert!(ds.consistency_issues().is_empty(), "{:?}", ds.consistency_issues());
        ds.verify().unwrap();
    }

    #[test]
    fn test_company_equals_sum_of_states() {
        let ds = dataset();
        let states: Vec<&HistorySeries> = ds.all_series().iter().filter(|s| s.level == GeoLevel::State).collect();
        assert_eq!(states.len(), 3);

        for (i, m) in ds.company().months.iter().enumerate() {
            let sum: f64 = states.iter().map(|s| s.months[i].loan_balance).sum();
            assert_relative_eq!(m.loan_balance, sum, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_leaves_snap_to_hierarchy() {
        let ds = dataset();
        for (path, entity) in ds.hierarchy().entities() {
            if !entity.is_leaf() {
                continue;
            }
            let last = ds.series(&path).unwrap().current().unwrap().clone();
            assert_eq!(last.loan_balance, entity.profile.loan_balance);
            assert_eq!(last.par30, entity.profile.par30);
            assert_eq!(last.client_count, entity.profile.client_count);
        }
    }

    #[test]
    fn test_company_current_matches_static_total() {
        let ds = dataset();
        let last = ds.company().current().unwrap();
        let stated = &ds.hierarchy().root().profile;
        assert_relative_eq!(last.loan_balance, stated.loan_balance, max_relative = 1e-9);
        assert_eq!(last.client_count, stated.client_count);
        assert_relative_eq!(last.par30, stated.par30, max_relative = 1e-9);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let serial = MetricsEngine::new(
            Assumptions::default_mfi(),
            EngineConfig {
                parallel: false,
                ..Default::default()
            },
        )
        .build(GeoHierarchy::builtin())
        .unwrap();
        let parallel = dataset();

        assert_eq!(serial.all_series(), parallel.all_series());
        assert_eq!(serial.financials(), parallel.financials());
    }

    #[test]
    fn test_lookup() {
        let ds = dataset();
        let path = EntityPath::from("Odisha/Khordha/Balugaon");
        let branch = ds.series(&path).unwrap();
        assert_eq!(branch.name, "Balugaon");
        assert_eq!(branch.level, GeoLevel::Branch);

        let found = ds.find(GeoLevel::Branch, "Balugaon").unwrap();
        assert_eq!(found.path, path);

        let err = ds.series(&EntityPath::from("Kerala")).unwrap_err();
        assert!(matches!(err, MetricsError::UnknownEntity(_)));
    }

    #[test]
    fn test_prespecified_aging_flows_to_leaf() {
        let ds = dataset();
        let centre = ds.find(GeoLevel::Centre, "Balugaon Centre 01").unwrap();
        let last = centre.current().unwrap();
        assert_eq!(last.par30, 4.33);
        assert_eq!((last.par60, last.par90, last.par180), (3.6, 2.7, 1.4));
        assert!(last.aging_is_monotonic());
    }

    #[test]
    fn test_dpd_lookup() {
        let ds = dataset();
        let buckets = ds.dpd(&EntityPath::root(), None).unwrap();
        assert_eq!(buckets.len(), 5);
        let total: f64 = buckets.iter().map(|b| b.amount).sum();
        assert_relative_eq!(total, ds.company().current().unwrap().loan_balance, max_relative = 1e-9);

        let first = ds.dpd(&EntityPath::root(), Some(0)).unwrap();
        assert_relative_eq!(first[0].percentage, 100.0 - ds.company().months[0].par30, epsilon = 1e-9);

        let err = ds.dpd(&EntityPath::root(), Some(11)).unwrap_err();
        assert!(matches!(err, MetricsError::MonthOutOfRange { month: 11, months: 11, .. }));
    }

    #[test]
    fn test_rank_children() {
        let ds = dataset();
        let by_balance = ds.rank_children(&EntityPath::root(), RankBy::Balance).unwrap();
        assert_eq!(by_balance.len(), 3);
        let balances: Vec<f64> = by_balance.iter().map(|s| s.current().unwrap().loan_balance).collect();
        assert!(balances.windows(2).all(|w| w[0] >= w[1]));

        let by_par = ds.rank_children(&EntityPath::from("Karnataka"), RankBy::Par30).unwrap();
        let pars: Vec<f64> = by_par.iter().map(|s| s.current().unwrap().par30).collect();
        assert!(pars.windows(2).all(|w| w[0] >= w[1]));

        assert_eq!(RankBy::parse("PAR30"), Some(RankBy::Par30));
        assert_eq!(RankBy::parse("size"), None);
    }

    #[test]
    fn test_summary() {
        let ds = dataset();
        let s = ds.summary(&EntityPath::root()).unwrap();
        assert_eq!(s.months, 11);
        assert!(s.ytd_growth_pct > 0.0);
        assert!((95.5..99.5).contains(&s.ytd_collection_efficiency));
        assert!(s.ytd_digital_adoption > 0.0 && s.ytd_digital_adoption < 100.0);
    }

    #[test]
    fn test_financials_follow_company() {
        let ds = dataset();
        let fin = ds.financials();
        assert_eq!(fin.len(), ds.company().len());
        let cur = fin.current().unwrap();
        let company = ds.company().current().unwrap();
        assert_eq!(cur.label, company.label);
        assert_relative_eq!(
            cur.interest_income,
            company.loan_balance * cur.portfolio_yield / 100.0 / 12.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_tampered_dataset_fails_verify() {
        let mut ds = dataset();
        let i = ds.index[&EntityPath::from("Tamil Nadu")];
        ds.series[i].months[4].loan_balance *= 1.01;
        let issues = ds.consistency_issues();
        assert!(!issues.is_empty());
        assert!(matches!(ds.verify(), Err(MetricsError::Inconsistent { .. })));
    }

    #[test]
    fn test_loaded_hierarchy_builds() {
        let ds = MetricsEngine::default().build(load_default_hierarchy().unwrap()).unwrap();
        ds.verify().unwrap();
        assert_eq!(ds.company().current(), dataset().company().current());
    }
}
