//! Brand keyword table: brand names and their fuzzy-match variants.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a keyword table is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrandTableError {
    #[error("Brand name must not be empty")]
    EmptyName,

    #[error("Duplicate brand name: {0}")]
    DuplicateBrand(String),

    #[error("Brand {0} has no variants")]
    NoVariants(String),

    #[error("Brand {0} has an empty variant")]
    EmptyVariant(String),
}

/// One brand and the surface forms it may appear as in OCR text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub name: String,
    pub variants: Vec<String>,
}

impl BrandEntry {
    pub fn new(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Ordered, validated brand -> variants table.
///
/// Variants are stored trimmed and lowercased, since matching runs against
/// lowercased OCR tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandKeywordTable {
    entries: Vec<BrandEntry>,
}

impl BrandKeywordTable {
    /// Build a table, rejecting empty or duplicate names and empty variants.
    pub fn new(entries: Vec<BrandEntry>) -> Result<Self, BrandTableError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry.name.trim().to_string();
            if name.is_empty() {
                return Err(BrandTableError::EmptyName);
            }
            if !seen.insert(name.clone()) {
                return Err(BrandTableError::DuplicateBrand(name));
            }
            if entry.variants.is_empty() {
                return Err(BrandTableError::NoVariants(name));
            }
            let mut variants = Vec::with_capacity(entry.variants.len());
            for variant in &entry.variants {
                let variant = variant.trim().to_lowercase();
                if variant.is_empty() {
                    return Err(BrandTableError::EmptyVariant(name));
                }
                variants.push(variant);
            }
            normalized.push(BrandEntry { name, variants });
        }

        Ok(Self {
            entries: normalized,
        })
    }

    /// The stock table for basketball broadcast footage.
    pub fn broadcast_default() -> Self {
        Self {
            entries: vec![
                BrandEntry::new("YouTube TV", &["youtube", "tube"]),
                BrandEntry::new("Coinbase", &["coin", "base", "coinbas", "coir", "coinb"]),
                BrandEntry::new("StateFarm", &["state", "statefarm", "astatefarm"]),
                BrandEntry::new(
                    "Michelob Ultra",
                    &["michel", "ultra", "michelao", "michelab", "michewb"],
                ),
                BrandEntry::new("Google", &["google", "gogl", "gogle", "googl", "gooogle"]),
                BrandEntry::new("Tissot", &["tissot", "tiss", "tisso", "tissol", "tissst"]),
                BrandEntry::new("ESPN", &["espn", "esn", "esp", "espm", "espnn"]),
                BrandEntry::new("Kia", &["kia", "kv"]),
            ],
        }
    }

    /// Restrict the table to the requested brands.
    ///
    /// Unknown names are dropped and duplicates collapsed. The result keeps
    /// request order, which becomes the column order of every table.
    pub fn select<S: AsRef<str>>(&self, requested: &[S]) -> Self {
        let mut seen = HashSet::new();
        let entries = requested
            .iter()
            .filter_map(|name| self.get(name.as_ref().trim()))
            .filter(|entry| seen.insert(entry.name.clone()))
            .cloned()
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&BrandEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[BrandEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BrandKeywordTable {
    fn default() -> Self {
        Self::broadcast_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_keeps_request_order_and_drops_unknown() {
        let table = BrandKeywordTable::broadcast_default();
        let selected = table.select(&["Tissot", "Nike", "Coinbase", "Tissot"]);
        assert_eq!(selected.names(), vec!["Tissot", "Coinbase"]);
    }

    #[test]
    fn test_select_all_unknown_is_empty() {
        let table = BrandKeywordTable::broadcast_default();
        assert!(table.select(&["Nike", "Adidas"]).is_empty());
    }

    #[test]
    fn test_new_normalizes_variants() {
        let table = BrandKeywordTable::new(vec![BrandEntry::new("Acme", &[" ACME ", "acm"])])
            .unwrap();
        assert_eq!(table.entries()[0].variants, vec!["acme", "acm"]);
    }

    #[test]
    fn test_new_rejects_duplicates_and_empty_variants() {
        let dup = BrandKeywordTable::new(vec![
            BrandEntry::new("Acme", &["acme"]),
            BrandEntry::new("Acme", &["acm"]),
        ]);
        assert_eq!(dup, Err(BrandTableError::DuplicateBrand("Acme".into())));

        let empty = BrandKeywordTable::new(vec![BrandEntry::new("Acme", &["  "])]);
        assert_eq!(empty, Err(BrandTableError::EmptyVariant("Acme".into())));

        let none = BrandKeywordTable::new(vec![BrandEntry::new("Acme", &[])]);
        assert_eq!(none, Err(BrandTableError::NoVariants("Acme".into())));
    }
}
