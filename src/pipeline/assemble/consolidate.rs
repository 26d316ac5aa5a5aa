use std::collections::{BTreeMap, HashMap};

/// Many-to-one lookup from raw free-text categories to canonical buckets.
///
/// Lookup order: exact (trimmed) match, then case-insensitive match, then the
/// raw value unchanged. Nothing is ever dropped.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationMap {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl ConsolidationMap {
    pub fn new(entries: &BTreeMap<String, String>) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for (raw, canonical) in entries {
            let raw = raw.trim();
            exact.insert(raw.to_string(), canonical.clone());
            folded
                .entry(raw.to_lowercase())
                .or_insert_with(|| canonical.clone());
        }
        Self { exact, folded }
    }

    pub fn lookup(&self, raw: &str) -> String {
        let key = raw.trim();
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
