//! Geographic hierarchy store and the built-in static network

use super::data::{EntityPath, EntityProfile, GeoEntity, GeoLevel};
use crate::error::{MetricsError, Result};
use log::warn;

/// Name of the company node in the built-in hierarchy
pub const DEFAULT_COMPANY_NAME: &str = "Sahayog Microfinance";

/// Country → State → District → Branch → Centre tree rooted at the company
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHierarchy {
    root: GeoEntity,
}

impl GeoHierarchy {
    /// Wrap a company-level root, checking that levels nest correctly
    pub fn new(root: GeoEntity) -> Result<Self> {
        if root.level != GeoLevel::Country {
            return Err(MetricsError::invalid(
                "hierarchy",
                format!("root '{}' must be a country node, got {}", root.name, root.level),
            ));
        }
        check_levels(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &GeoEntity {
        &self.root
    }

    pub fn company_name(&self) -> &str {
        &self.root.name
    }

    pub fn states(&self) -> &[GeoEntity] {
        &self.root.children
    }

    /// Entity at `path`; the empty path is the company
    pub fn get(&self, path: &EntityPath) -> Option<&GeoEntity> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Every entity in depth-first pre-order, company first
    pub fn entities(&self) -> Vec<(EntityPath, &GeoEntity)> {
        let mut out = Vec::with_capacity(self.root.node_count());
        collect(&self.root, EntityPath::root(), &mut out);
        out
    }

    /// Paths of all entities at `level`
    pub fn paths_at(&self, level: GeoLevel) -> Vec<EntityPath> {
        self.entities()
            .into_iter()
            .filter(|(_, e)| e.level == level)
            .map(|(p, _)| p)
            .collect()
    }

    /// Paths of entities with the given level and name
    pub fn find_by_name(&self, level: GeoLevel, name: &str) -> Vec<EntityPath> {
        self.entities()
            .into_iter()
            .filter(|(_, e)| e.level == level && e.name == name)
            .map(|(p, _)| p)
            .collect()
    }

    /// Nodes whose stated figures disagree with the aggregate of their children.
    ///
    /// Balance and PAR30 are compared with a relative tolerance, clients exactly.
    pub fn figure_mismatches(&self, tolerance: f64) -> Vec<String> {
        let mut issues = Vec::new();
        for (path, entity) in self.entities() {
            if entity.is_leaf() {
                continue;
            }
            let expected = EntityProfile::aggregate(entity.children.iter().map(|c| &c.profile));
            let stated = &entity.profile;
            let scale = expected.loan_balance.abs().max(1.0);
            if (stated.loan_balance - expected.loan_balance).abs() / scale > tolerance {
                issues.push(format!(
                    "{}: balance {} vs children {}",
                    path, stated.loan_balance, expected.loan_balance
                ));
            }
            if stated.client_count != expected.client_count {
                issues.push(format!(
                    "{}: clients {} vs children {}",
                    path, stated.client_count, expected.client_count
                ));
            }
            if (stated.par30 - expected.par30).abs() > tolerance * expected.par30.abs().max(1.0) {
                issues.push(format!(
                    "{}: PAR30 {} vs children {}",
                    path, stated.par30, expected.par30
                ));
            }
        }
        for issue in &issues {
            warn!("Hierarchy figure mismatch: {}", issue);
        }
        issues
    }

    /// The built-in three-state branch network
    pub fn builtin() -> Self {
        use GeoEntity as E;
        use GeoLevel::*;

        let branch = |name: &str, centres: Vec<GeoEntity>| E::parent(Branch, name, centres);

        let karnataka = E::parent(State, "Karnataka", vec![
            E::parent(District, "Mysuru", vec![
                branch("Hunsur", vec![
                    E::centre("Hunsur Centre 01", 1_407_000.0, 34, 1.97),
                    E::centre("Hunsur Centre 02", 772_000.0, 25, 2.28),
                ]),
                branch("Nanjangud", vec![
                    E::centre("Nanjangud Centre 01", 1_295_000.0, 35, 3.1),
                    E::centre("Nanjangud Centre 02", 913_000.0, 30, 2.05),
                ]),
            ]),
            E::parent(District, "Belagavi", vec![
                branch("Gokak", vec![
                    E::centre("Gokak Centre 01", 855_000.0, 26, 2.31),
                    E::centre("Gokak Centre 02", 998_000.0, 25, 1.37),
                ]),
                branch("Athani", vec![
                    E::centre("Athani Centre 01", 1_165_000.0, 31, 2.38),
                    E::centre("Athani Centre 02", 923_000.0, 25, 1.97),
                ]),
            ]),
        ]);

        let tamil_nadu = E::parent(State, "Tamil Nadu", vec![
            E::parent(District, "Madurai", vec![
                branch("Melur", vec![
                    E::centre("Melur Centre 01", 947_000.0, 31, 2.49),
                    E::centre("Melur Centre 02", 1_156_000.0, 33, 1.79),
                ]),
                branch("Usilampatti", vec![
                    E::centre("Usilampatti Centre 01", 1_415_000.0, 42, 2.4),
                    E::centre("Usilampatti Centre 02", 906_000.0, 29, 1.86),
                ]),
            ]),
            E::parent(District, "Tiruchirappalli", vec![
                branch("Lalgudi", vec![
                    E::centre("Lalgudi Centre 01", 1_034_000.0, 30, 1.81),
                    E::centre("Lalgudi Centre 02", 956_000.0, 26, 1.96),
                ]),
                branch("Manapparai", vec![
                    E::centre("Manapparai Centre 01", 1_488_000.0, 39, 1.54),
                    E::centre("Manapparai Centre 02", 1_210_000.0, 34, 2.63),
                ]),
            ]),
        ]);

        // Balugaon Centre 01 carries audited aging figures
        let odisha = E::parent(State, "Odisha", vec![
            E::parent(District, "Khordha", vec![
                branch("Jatni", vec![
                    E::centre("Jatni Centre 01", 1_176_000.0, 35, 4.15),
                    E::centre("Jatni Centre 02", 1_810_000.0, 46, 2.58),
                ]),
                branch("Balugaon", vec![
                    E::leaf(
                        Centre,
                        "Balugaon Centre 01",
                        EntityProfile::new(1_198_000.0, 33, 4.33).with_aging(3.6, 2.7, 1.4),
                    ),
                    E::centre("Balugaon Centre 02", 1_271_000.0, 38, 4.56),
                ]),
            ]),
            E::parent(District, "Ganjam", vec![
                branch("Berhampur", vec![
                    E::centre("Berhampur Centre 01", 976_000.0, 27, 2.76),
                    E::centre("Berhampur Centre 02", 1_082_000.0, 34, 3.48),
                ]),
                branch("Aska", vec![
                    E::centre("Aska Centre 01", 1_039_000.0, 25, 2.57),
                    E::centre("Aska Centre 02", 1_512_000.0, 41, 4.33),
                ]),
            ]),
        ]);

        Self {
            root: E::parent(Country, DEFAULT_COMPANY_NAME, vec![karnataka, tamil_nadu, odisha]),
        }
    }
}

fn collect<'a>(entity: &'a GeoEntity, path: EntityPath, out: &mut Vec<(EntityPath, &'a GeoEntity)>) {
    let children: Vec<(EntityPath, &'a GeoEntity)> = entity
        .children
        .iter()
        .map(|c| (path.join(&c.name), c))
        .collect();
    out.push((path, entity));
    for (child_path, child) in children {
        collect(child, child_path, out);
    }
}

fn check_levels(entity: &GeoEntity) -> Result<()> {
    let mut names = std::collections::HashSet::new();
    for child in &entity.children {
        if Some(child.level) != entity.level.child_level() {
            return Err(MetricsError::invalid(
                "hierarchy",
                format!(
                    "'{}' ({}) cannot sit under '{}' ({})",
                    child.name, child.level, entity.name, entity.level
                ),
            ));
        }
        if child.name.contains(EntityPath::SEPARATOR) || child.name.trim().is_empty() {
            return Err(MetricsError::invalid(
                "hierarchy",
                format!("entity name '{}' is empty or contains '/'", child.name),
            ));
        }
        if !names.insert(child.name.as_str()) {
            return Err(MetricsError::invalid(
                "hierarchy",
                format!("duplicate child '{}' under '{}'", child.name, entity.name),
            ));
        }
        check_levels(child)?;
    }
    Ok(())
}
