//! CSV-based assumption loader
//!
//! Loads modeling assumptions from CSV files in data/assumptions/

use crate::error::{MetricsError, Result};
use std::fs::File;
use std::path::Path;

/// Default path to assumptions directory
pub const DEFAULT_ASSUMPTIONS_PATH: &str = "data/assumptions";

pub const SEASONALITY_FILE: &str = "seasonality.csv";
pub const CONSTANTS_FILE: &str = "modeling_constants.csv";

/// Column `index` of a record, trimmed
fn field<'r>(record: &'r csv::StringRecord, index: usize, file: &str) -> Result<&'r str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| MetricsError::parse(file, format!("missing column {} in {:?}", index + 1, record)))
}

/// Load seasonality factors from CSV (`month,factor`, month 1-12)
///
/// Months missing from the file keep a factor of 1.0.
pub fn load_seasonality(path: &Path) -> Result<[f64; 12]> {
    let file = File::open(path.join(SEASONALITY_FILE))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut factors = [1.0; 12];

    for result in reader.records() {
        let record = result?;
        let raw_month = field(&record, 0, SEASONALITY_FILE)?;
        let raw_factor = field(&record, 1, SEASONALITY_FILE)?;
        let month: usize = raw_month
            .parse()
            .map_err(|e| MetricsError::parse(SEASONALITY_FILE, format!("month '{}': {}", raw_month, e)))?;
        let factor: f64 = raw_factor
            .parse()
            .map_err(|e| MetricsError::parse(SEASONALITY_FILE, format!("factor '{}': {}", raw_factor, e)))?;

        if !(1..=12).contains(&month) {
            return Err(MetricsError::parse(
                SEASONALITY_FILE,
                format!("month {} out of range", month),
            ));
        }
        factors[month - 1] = factor;
    }

    Ok(factors)
}

/// Load named modeling constants from CSV (`name,value`)
pub fn load_constants(path: &Path) -> Result<Vec<(String, f64)>> {
    let file = File::open(path.join(CONSTANTS_FILE))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut constants = Vec::new();

    for result in reader.records() {
        let record = result?;
        let name = field(&record, 0, CONSTANTS_FILE)?.to_string();
        let raw = field(&record, 1, CONSTANTS_FILE)?;
        let value: f64 = raw
            .parse()
            .map_err(|e| MetricsError::parse(CONSTANTS_FILE, format!("{} = '{}': {}", name, raw, e)))?;
        constants.push((name, value));
    }

    Ok(constants)
}

/// Raw contents of an assumptions directory
pub struct LoadedAssumptions {
    pub seasonality: [f64; 12],
    pub constants: Vec<(String, f64)>,
}

impl LoadedAssumptions {
    /// Load all assumptions from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load all assumptions from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self {
            seasonality: load_seasonality(path)?,
            constants: load_constants(path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_assumptions() {
        let result = LoadedAssumptions::load_default();
        assert!(result.is_ok(), "Failed to load assumptions: {:?}", result.err());

        let loaded = result.unwrap();

        // April is the slow month
        assert!(loaded.seasonality[3] < 1.0);
        assert!(loaded.seasonality.iter().all(|f| *f > 0.0));

        assert!(loaded
            .constants
            .iter()
            .any(|(name, value)| name == "provisioning_coefficient" && (*value - 0.15).abs() < 1e-12));
    }

    #[test]
    fn test_missing_directory() {
        let result = LoadedAssumptions::load_from(Path::new("data/does_not_exist"));
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }
}
