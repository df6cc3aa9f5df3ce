// Column Registry
//
// Known columns and their declared types for one validation pass. Lookups are
// case-insensitive; the first spelling registered is kept for display.

use linked_hash_map::LinkedHashMap;

use crate::catalog::schema::{describe_type, ColumnType};
use crate::common::types::field_suffix;

#[derive(Debug, Clone, PartialEq)]
struct ColumnEntry {
    name: String,
    column_type: Option<ColumnType>,
}

/// Registry of qualified column names to declared types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRegistry {
    /// Keyed by lowercased name, in registration order
    columns: LinkedHashMap<String, ColumnEntry>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        ColumnRegistry::default()
    }

    /// Register a column, replacing the type of an existing entry
    pub fn register(&mut self, name: &str, column_type: Option<ColumnType>) {
        let key = name.to_lowercase();
        if let Some(entry) = self.columns.get_mut(&key) {
            entry.column_type = column_type;
        } else {
            self.columns.insert(
                key,
                ColumnEntry {
                    name: name.to_string(),
                    column_type,
                },
            );
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(&name.to_lowercase())
    }

    /// Declared type of a known column. `Some(None)` is a known untyped column.
    pub fn column_type(&self, name: &str) -> Option<Option<ColumnType>> {
        self.columns.get(&name.to_lowercase()).map(|e| e.column_type)
    }

    /// The registered spelling of a column
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.columns.get(&name.to_lowercase()).map(|e| e.name.as_str())
    }

    /// Registered columns whose field part matches `field`
    pub fn suffix_matches(&self, field: &str) -> Vec<&str> {
        self.columns
            .values()
            .filter(|e| field_suffix(&e.name).is_some_and(|suffix| suffix.eq_ignore_ascii_case(field)))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Column names in registration order
    pub fn names(&self) -> Vec<String> {
        self.columns.values().map(|e| e.name.clone()).collect()
    }

    /// `(name, type)` pairs in registration order
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<ColumnType>)> {
        self.columns.values().map(|e| (e.name.as_str(), e.column_type))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One `name TYPE` line per column
    pub fn describe(&self) -> String {
        self.entries()
            .map(|(name, t)| format!("{} {}", name, describe_type(t)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
