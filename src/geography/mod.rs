//! Geographic hierarchy: entity data, the built-in network and CSV loading

mod data;
mod hierarchy;
pub mod loader;

pub use data::{EntityPath, EntityProfile, GeoEntity, GeoLevel};
pub use hierarchy::{GeoHierarchy, DEFAULT_COMPANY_NAME};
pub use loader::{load_default_hierarchy, load_hierarchy, load_hierarchy_from_reader};
