//! Header-driven column lookup for the CSV tables

use crate::error::ProviderError;
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;

/// Columns the card table must expose
pub const CARD_COLUMNS: &[&str] = &[
    "uuid",
    "name",
    "number",
    "setCode",
    "subtypes",
    "supertypes",
    "types",
];

/// Columns the identifier table must expose
pub const IDENTIFIER_COLUMNS: &[&str] = &["uuid", "scryfallId", "multiverseId"];

/// Ordinals of the required columns of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    ordinals: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    /// Map each required column to its position in `headers`.
    ///
    /// Fails with [`ProviderError::MissingColumns`] unless every required
    /// name is present. The first header matching a name wins.
    pub fn resolve(
        source: &Path,
        required: &[&'static str],
        headers: &StringRecord,
    ) -> Result<Self, ProviderError> {
        debug_assert!(!required.is_empty(), "no required columns given");

        let mut ordinals = HashMap::with_capacity(required.len());
        for (position, header) in headers.iter().enumerate() {
            if let Some(name) = required.iter().find(|name| **name == header) {
                ordinals.entry(*name).or_insert(position);
            }
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !ordinals.contains_key(*name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ProviderError::MissingColumns {
                path: source.to_path_buf(),
                required: required.iter().map(|name| name.to_string()).collect(),
                missing,
            });
        }

        Ok(Self { ordinals })
    }

    /// Ordinal of a required column
    pub fn ordinal(&self, column: &str) -> Option<usize> {
        self.ordinals.get(column).copied()
    }

    /// Field of `row` under `column`, or "" for short rows
    pub fn field<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.ordinal(column)
            .and_then(|position| row.get(position))
            .unwrap_or("")
    }
}
