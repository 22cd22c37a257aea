//! Load a hierarchy from hierarchy.csv
//!
//! One row per leaf entity. Rows with an empty `centre` column describe a
//! branch reported without centre detail.

use super::data::{EntityProfile, GeoEntity, GeoLevel};
use super::hierarchy::{GeoHierarchy, DEFAULT_COMPANY_NAME};
use crate::error::{MetricsError, Result};
use csv::Reader;
use std::path::Path;

/// Default path to the hierarchy file
pub const DEFAULT_HIERARCHY_PATH: &str = "data/hierarchy.csv";

const FILE_LABEL: &str = "hierarchy.csv";

/// Raw CSV row matching hierarchy.csv columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    state: String,
    district: String,
    branch: String,
    #[serde(default)]
    centre: Option<String>,
    loan_balance: f64,
    client_count: u64,
    par30: f64,
    #[serde(default)]
    par60: Option<f64>,
    #[serde(default)]
    par90: Option<f64>,
    #[serde(default)]
    par180: Option<f64>,
}

impl CsvRow {
    fn to_profile(&self) -> Result<EntityProfile> {
        if !self.loan_balance.is_finite() || self.loan_balance < 0.0 {
            return Err(MetricsError::parse(
                FILE_LABEL,
                format!("negative or non-finite balance for '{}'", self.branch),
            ));
        }
        let ratios = [Some(self.par30), self.par60, self.par90, self.par180];
        if ratios.iter().flatten().any(|r| !(0.0..=100.0).contains(r)) {
            return Err(MetricsError::parse(
                FILE_LABEL,
                format!("delinquency ratio outside 0-100 for '{}'", self.branch),
            ));
        }
        let mut profile = EntityProfile::new(self.loan_balance, self.client_count, self.par30);
        profile.par60 = self.par60;
        profile.par90 = self.par90;
        profile.par180 = self.par180;
        Ok(profile)
    }
}

enum BranchRows {
    Reported(EntityProfile),
    Centres(Vec<(String, EntityProfile)>),
}

type BranchGroup = (String, BranchRows);
type DistrictGroup = (String, Vec<BranchGroup>);
type StateGroup = (String, Vec<DistrictGroup>);

fn slot<'a, T, F>(groups: &'a mut Vec<(String, T)>, name: &str, init: F) -> &'a mut T
where
    F: FnOnce() -> T,
{
    let idx = match groups.iter().position(|(n, _)| n == name) {
        Some(idx) => idx,
        None => {
            groups.push((name.to_string(), init()));
            groups.len() - 1
        }
    };
    &mut groups[idx].1
}

fn build_hierarchy(rows: Vec<CsvRow>, company: &str) -> Result<GeoHierarchy> {
    let mut states: Vec<StateGroup> = Vec::new();

    for row in rows {
        let profile = row.to_profile()?;
        let districts = slot(&mut states, row.state.trim(), Vec::new);
        let branches = slot(districts, row.district.trim(), Vec::new);
        let centre = row.centre.as_deref().map(str::trim).filter(|c| !c.is_empty());

        match (centre, branches.iter().position(|(n, _)| n == row.branch.trim())) {
            (None, None) => branches.push((row.branch.trim().to_string(), BranchRows::Reported(profile))),
            (Some(c), None) => branches.push((
                row.branch.trim().to_string(),
                BranchRows::Centres(vec![(c.to_string(), profile)]),
            )),
            (Some(c), Some(idx)) => match &mut branches[idx].1 {
                BranchRows::Centres(centres) => centres.push((c.to_string(), profile)),
                BranchRows::Reported(_) => {
                    return Err(MetricsError::parse(
                        FILE_LABEL,
                        format!("branch '{}' has both a branch row and centre rows", row.branch),
                    ))
                }
            },
            (None, Some(_)) => {
                return Err(MetricsError::parse(
                    FILE_LABEL,
                    format!("branch '{}' listed more than once without centres", row.branch),
                ))
            }
        }
    }

    if states.is_empty() {
        return Err(MetricsError::parse(FILE_LABEL, "no rows"));
    }

    let state_nodes = states
        .into_iter()
        .map(|(state, districts)| {
            let district_nodes = districts
                .into_iter()
                .map(|(district, branches)| {
                    let branch_nodes = branches
                        .into_iter()
                        .map(|(branch, rows)| match rows {
                            BranchRows::Reported(p) => GeoEntity::leaf(GeoLevel::Branch, &branch, p),
                            BranchRows::Centres(centres) => GeoEntity::parent(
                                GeoLevel::Branch,
                                &branch,
                                centres
                                    .into_iter()
                                    .map(|(name, p)| GeoEntity::leaf(GeoLevel::Centre, &name, p))
                                    .collect(),
                            ),
                        })
                        .collect();
                    GeoEntity::parent(GeoLevel::District, &district, branch_nodes)
                })
                .collect();
            GeoEntity::parent(GeoLevel::State, &state, district_nodes)
        })
        .collect();

    GeoHierarchy::new(GeoEntity::parent(GeoLevel::Country, company, state_nodes))
}

/// Load a hierarchy from a CSV file
pub fn load_hierarchy<P: AsRef<Path>>(path: P, company: &str) -> Result<GeoHierarchy> {
    let mut reader = Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        rows.push(row);
    }
    build_hierarchy(rows, company)
}

/// Load a hierarchy from any reader (e.g., string buffer)
pub fn load_hierarchy_from_reader<R: std::io::Read>(reader: R, company: &str) -> Result<GeoHierarchy> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        rows.push(row);
    }
    build_hierarchy(rows, company)
}

/// Load the shipped data/hierarchy.csv under the default company name
pub fn load_default_hierarchy() -> Result<GeoHierarchy> {
    load_hierarchy(DEFAULT_HIERARCHY_PATH, DEFAULT_COMPANY_NAME)
}
