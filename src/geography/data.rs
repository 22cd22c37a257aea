//! Geographic entity data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of a node in the geographic hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeoLevel {
    Country,
    State,
    District,
    Branch,
    Centre,
}

impl GeoLevel {
    /// Level expected for this node's children
    pub fn child_level(&self) -> Option<GeoLevel> {
        match self {
            GeoLevel::Country => Some(GeoLevel::State),
            GeoLevel::State => Some(GeoLevel::District),
            GeoLevel::District => Some(GeoLevel::Branch),
            GeoLevel::Branch => Some(GeoLevel::Centre),
            GeoLevel::Centre => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoLevel::Country => "country",
            GeoLevel::State => "state",
            GeoLevel::District => "district",
            GeoLevel::Branch => "branch",
            GeoLevel::Centre => "centre",
        }
    }

    pub fn parse(s: &str) -> Option<GeoLevel> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" | "company" => Some(GeoLevel::Country),
            "state" => Some(GeoLevel::State),
            "district" => Some(GeoLevel::District),
            "branch" => Some(GeoLevel::Branch),
            "centre" | "center" => Some(GeoLevel::Centre),
            _ => None,
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline scale figures of an entity at the most recent month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Gross loan portfolio outstanding
    pub loan_balance: f64,

    /// Active clients
    pub client_count: u64,

    /// PAR30, percent of balance
    pub par30: f64,

    /// Optional pre-specified longer-overdue ratios, percent
    #[serde(default)]
    pub par60: Option<f64>,
    #[serde(default)]
    pub par90: Option<f64>,
    #[serde(default)]
    pub par180: Option<f64>,
}

impl EntityProfile {
    pub fn new(loan_balance: f64, client_count: u64, par30: f64) -> Self {
        Self {
            loan_balance,
            client_count,
            par30,
            par60: None,
            par90: None,
            par180: None,
        }
    }

    /// Attach pre-specified 60/90/180-day ratios
    pub fn with_aging(mut self, par60: f64, par90: f64, par180: f64) -> Self {
        self.par60 = Some(par60);
        self.par90 = Some(par90);
        self.par180 = Some(par180);
        self
    }

    /// Whether all three longer-overdue ratios were supplied
    pub fn aging(&self) -> Option<(f64, f64, f64)> {
        match (self.par60, self.par90, self.par180) {
            (Some(a), Some(b), Some(c)) => Some((a, b, c)),
            _ => None,
        }
    }

    /// Sum balances and clients, balance-weight the PAR30
    pub fn aggregate<'a, I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = &'a EntityProfile>,
    {
        let mut balance = 0.0;
        let mut clients = 0u64;
        let mut weighted_par = 0.0;
        for p in profiles {
            balance += p.loan_balance;
            clients += p.client_count;
            weighted_par += p.par30 * p.loan_balance;
        }
        let par30 = if balance > 0.0 { weighted_par / balance } else { 0.0 };
        Self::new(balance, clients, par30)
    }
}

/// A node in the geographic hierarchy.
///
/// Parents own their children outright; lookups elsewhere go by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntity {
    pub name: String,
    pub level: GeoLevel,
    pub profile: EntityProfile,
    #[serde(default)]
    pub children: Vec<GeoEntity>,
}

impl GeoEntity {
    /// Entity with stated figures and no children
    pub fn leaf(level: GeoLevel, name: &str, profile: EntityProfile) -> Self {
        Self {
            name: name.to_string(),
            level,
            profile,
            children: Vec::new(),
        }
    }

    /// Parent whose figures are the aggregate of its children
    pub fn parent(level: GeoLevel, name: &str, children: Vec<GeoEntity>) -> Self {
        let profile = EntityProfile::aggregate(children.iter().map(|c| &c.profile));
        Self {
            name: name.to_string(),
            level,
            profile,
            children,
        }
    }

    /// Centre shorthand used by the built-in hierarchy
    pub fn centre(name: &str, loan_balance: f64, client_count: u64, par30: f64) -> Self {
        Self::leaf(GeoLevel::Centre, name, EntityProfile::new(loan_balance, client_count, par30))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn child(&self, name: &str) -> Option<&GeoEntity> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Slash-joined names from the root's first child down to an entity.
///
/// The root (company) has the empty path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityPath(String);

impl EntityPath {
    pub const SEPARATOR: char = '/';

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn join(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}{}{}", self.0, Self::SEPARATOR, name))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(Self::SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last segment, or `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityPath {
    fn from(s: &str) -> Self {
        let segments: Vec<&str> = s
            .split(Self::SEPARATOR)
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .collect();
        Self(segments.join("/"))
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<company>")
        } else {
            f.write_str(&self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_aggregates_children() {
        let branch = GeoEntity::parent(
            GeoLevel::Branch,
            "Hunsur",
            vec![
                GeoEntity::centre("A", 100.0, 10, 4.0),
                GeoEntity::centre("B", 300.0, 20, 1.0),
            ],
        );
        assert_eq!(branch.profile.loan_balance, 400.0);
        assert_eq!(branch.profile.client_count, 30);
        assert!((branch.profile.par30 - 1.75).abs() < 1e-12);
        assert_eq!(branch.node_count(), 3);
    }

    #[test]
    fn test_aggregate_zero_balance() {
        let p = EntityProfile::aggregate(&[EntityProfile::new(0.0, 0, 5.0)]);
        assert_eq!(p.par30, 0.0);
    }

    #[test]
    fn test_entity_path() {
        let path = EntityPath::root().join("Karnataka").join("Mysuru");
        assert_eq!(path.as_str(), "Karnataka/Mysuru");
        assert_eq!(path.name(), Some("Mysuru"));
        assert_eq!(path.depth(), 2);
        assert_eq!(EntityPath::from(" Karnataka / Mysuru/ "), path);
        assert!(EntityPath::root().name().is_none());
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(GeoLevel::parse("Center"), Some(GeoLevel::Centre));
        assert_eq!(GeoLevel::parse("company"), Some(GeoLevel::Country));
        assert_eq!(GeoLevel::parse("region"), None);
        assert_eq!(GeoLevel::Branch.child_level(), Some(GeoLevel::Centre));
    }
}
