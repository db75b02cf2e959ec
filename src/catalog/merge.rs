use std::collections::HashSet;

use super::CatalogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Duplicate,
}

/// In-memory catalog for one crawl run: entries in discovery order plus the set
/// of source URLs already present.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    seen: HashSet<String>,
}

impl Catalog {
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let seen = entries.iter().map(|e| e.url.clone()).collect();
        Self { entries, seen }
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Append `entry` unless its URL is already present.
    pub fn admit(&mut self, entry: CatalogEntry) -> Admission {
        if !self.seen.insert(entry.url.clone()) {
            return Admission::Duplicate;
        }
        self.entries.push(entry);
        Admission::Admitted
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
