//! Per-chassis capacity of each part, from the catalog's proportion rule.

use wear_core::models::{CapacityFact, PartCatalog};

/// A distinct (chassis, code, line count) combination to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapacityKey<'a> {
    pub chassis_id: &'a str,
    pub code: &'a str,
    pub line_count: u32,
}

/// Facts resolved from a set of keys.
#[derive(Debug, Clone, Default)]
pub struct CapacityResolution {
    /// One fact per resolvable key, in input order.
    pub facts: Vec<CapacityFact>,
    /// Keys whose code is missing from the catalog or has no quantity.
    pub unresolved: usize,
}

/// Joins capacity keys with the catalog.
///
/// Holds no state besides the catalog reference, so the rate and durability
/// branches can resolve their own key sets independently.
#[derive(Debug, Clone, Copy)]
pub struct CapacityResolver<'c> {
    catalog: &'c PartCatalog,
}

impl<'c> CapacityResolver<'c> {
    pub fn new(catalog: &'c PartCatalog) -> Self {
        Self { catalog }
    }

    /// Capacity of one chassis for one part, or `None` when the code cannot
    /// be joined with a catalog entry that has a quantity.
    pub fn resolve(&self, key: &CapacityKey<'_>) -> Option<CapacityFact> {
        let entry = self.catalog.get(key.code)?;
        let quantity = entry.quantity_per_proportion?;
        Some(CapacityFact {
            chassis_id: key.chassis_id.to_string(),
            code: key.code.to_string(),
            line_count: key.line_count,
            quantity_per_chassis: entry
                .proportion_rule
                .quantity_per_chassis(quantity, key.line_count),
        })
    }

    /// Resolve every key. Callers pass each distinct key once.
    pub fn resolve_all<'k>(&self, keys: impl IntoIterator<Item = CapacityKey<'k>>) -> CapacityResolution {
        let mut resolution = CapacityResolution::default();
        for key in keys {
            match self.resolve(&key) {
                Some(fact) => resolution.facts.push(fact),
                None => resolution.unresolved += 1,
            }
        }
        resolution
    }
}
