//! Plant catalog lookups.

use crate::model::PlantCatalogEntry;

/// Entries whose name contains `query`, ignoring case. A blank query
/// matches everything.
pub fn search<'a>(plants: &'a [PlantCatalogEntry], query: &str) -> Vec<&'a PlantCatalogEntry> {
    let query = query.trim().to_lowercase();
    plants
        .iter()
        .filter(|p| query.is_empty() || p.name.to_lowercase().contains(&query))
        .collect()
}

/// Find a plant by exact id, falling back to a case-insensitive name match.
pub fn find<'a>(plants: &'a [PlantCatalogEntry], key: &str) -> Option<&'a PlantCatalogEntry> {
    let key = key.trim();
    plants
        .iter()
        .find(|p| p.id == key)
        .or_else(|| plants.iter().find(|p| p.name.eq_ignore_ascii_case(key)))
}
