//! Two-pass streaming join of the card table and the identifier table

use crate::error::ProviderError;
use crate::models::{normalize_name, parse_type_tags, CardRecord};
use crate::tables::columns::{ColumnIndex, CARD_COLUMNS, IDENTIFIER_COLUMNS};
use csv::StringRecord;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Outcome of one resolution run
#[derive(Debug, Default)]
pub struct Resolution {
    /// Fully joined records, at most one per requested name
    pub records: Vec<CardRecord>,
    /// Card table rows read before the pass ended
    pub card_rows: usize,
    /// Identifier table rows read before the pass ended
    pub identifier_rows: usize,
    pub cancelled: bool,
}

/// Resolves card names against the two on-disk tables.
///
/// Tables are opened fresh on every call; nothing is held open between runs.
#[derive(Debug, Clone)]
pub struct CardRecordResolver {
    cards_path: PathBuf,
    identifiers_path: PathBuf,
}

impl CardRecordResolver {
    pub fn new(cards_path: impl Into<PathBuf>, identifiers_path: impl Into<PathBuf>) -> Self {
        Self {
            cards_path: cards_path.into(),
            identifiers_path: identifiers_path.into(),
        }
    }

    /// Check that both tables open and expose their required columns
    pub fn validate(&self) -> Result<(), ProviderError> {
        let mut cards = open_table(&self.cards_path)?;
        read_index(&mut cards, &self.cards_path, CARD_COLUMNS)?;

        let mut identifiers = open_table(&self.identifiers_path)?;
        read_index(&mut identifiers, &self.identifiers_path, IDENTIFIER_COLUMNS)?;

        log::info!(
            "Validated card tables {} and {}",
            self.cards_path.display(),
            self.identifiers_path.display()
        );
        Ok(())
    }

    /// Resolve `manifest` (normalised names) on a blocking worker thread
    pub async fn resolve(
        &self,
        manifest: HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ProviderError> {
        let resolver = self.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || resolver.resolve_blocking(manifest, &cancel))
            .await
            .map_err(|e| ProviderError::ScanAborted(e.to_string()))?
    }

    /// Resolve `manifest` on the current thread
    pub fn resolve_blocking(
        &self,
        manifest: HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ProviderError> {
        if manifest.is_empty() {
            return Ok(Resolution::default());
        }
        let requested = manifest.len();

        let mut cards = open_table(&self.cards_path)?;
        let (records, card_rows, cancelled) =
            scan_card_table(&mut cards, &self.cards_path, manifest, cancel)?;

        if cancelled || records.is_empty() {
            log::debug!(
                "Skipping identifier pass ({} matches, cancelled: {})",
                records.len(),
                cancelled
            );
            return Ok(Resolution {
                // Records without their identifier visit are incomplete
                records: Vec::new(),
                card_rows,
                identifier_rows: 0,
                cancelled,
            });
        }

        let mut identifiers = open_table(&self.identifiers_path)?;
        let resolution =
            join_identifiers(&mut identifiers, &self.identifiers_path, records, cancel)?;

        log::info!(
            "Resolved {}/{} card(s) after {} card rows and {} identifier rows",
            resolution.records.len(),
            requested,
            card_rows,
            resolution.identifier_rows
        );
        Ok(Resolution {
            card_rows,
            ..resolution
        })
    }
}

fn open_table(path: &Path) -> Result<csv::Reader<std::fs::File>, ProviderError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ProviderError::table(path, e))
}

fn read_index<R: Read>(
    reader: &mut csv::Reader<R>,
    source: &Path,
    required: &[&'static str],
) -> Result<ColumnIndex, ProviderError> {
    let headers = reader
        .headers()
        .map_err(|e| ProviderError::table(source, e))?;
    ColumnIndex::resolve(source, required, headers)
}

/// Primary pass: collect the first row for every name in `manifest`.
///
/// Returns the matched records, the number of rows read and whether the pass
/// was cut short by cancellation.
pub(crate) fn scan_card_table<R: Read>(
    reader: &mut csv::Reader<R>,
    source: &Path,
    mut manifest: HashSet<String>,
    cancel: &CancellationToken,
) -> Result<(Vec<CardRecord>, usize, bool), ProviderError> {
    let index = read_index(reader, source, CARD_COLUMNS)?;
    let mut records = Vec::new();
    let mut rows = 0;
    let mut row = StringRecord::new();

    loop {
        if manifest.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            log::debug!("Card table scan cancelled after {} rows", rows);
            return Ok((records, rows, true));
        }

        match reader.read_record(&mut row) {
            Ok(true) => rows += 1,
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(ProviderError::table(source, e)),
            Err(e) => {
                rows += 1;
                log::warn!("Skipping unreadable row in {}: {}", source.display(), e);
                continue;
            }
        }

        let name = index.field(&row, "name");
        if name.is_empty() {
            continue;
        }
        // First occurrence wins: removal makes later duplicates miss
        if !manifest.remove(&normalize_name(name)) {
            continue;
        }

        let type_tags = parse_type_tags([
            index.field(&row, "subtypes"),
            index.field(&row, "supertypes"),
            index.field(&row, "types"),
        ]);
        records.push(CardRecord::new(
            name.to_string(),
            index.field(&row, "uuid").to_string(),
            index.field(&row, "number"),
            index.field(&row, "setCode"),
            type_tags,
        ));
    }

    if !manifest.is_empty() {
        log::debug!("{} name(s) not found in {}", manifest.len(), source.display());
    }
    Ok((records, rows, false))
}

/// Identifier pass: copy image ids onto `records` by foreign key.
///
/// Stops once every record has been visited. On cancellation only the
/// records already visited are returned; a completed pass returns all of
/// them, visited or not.
pub(crate) fn join_identifiers<R: Read>(
    reader: &mut csv::Reader<R>,
    source: &Path,
    records: Vec<CardRecord>,
    cancel: &CancellationToken,
) -> Result<Resolution, ProviderError> {
    let index = read_index(reader, source, IDENTIFIER_COLUMNS)?;

    let mut by_uuid: HashMap<String, Vec<usize>> = HashMap::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        if !record.uuid.is_empty() {
            by_uuid.entry(record.uuid.clone()).or_default().push(position);
        }
    }

    // A record without a foreign key can never be joined
    let mut records: Vec<(CardRecord, bool)> = records
        .into_iter()
        .map(|record| {
            let unjoinable = record.uuid.is_empty();
            (record, unjoinable)
        })
        .collect();
    let mut remaining = records.iter().filter(|(_, visited)| !*visited).count();
    let mut rows = 0;
    let mut row = StringRecord::new();

    while remaining > 0 {
        if cancel.is_cancelled() {
            log::debug!("Identifier table scan cancelled after {} rows", rows);
            return Ok(Resolution {
                records: records
                    .into_iter()
                    .filter(|(_, visited)| *visited)
                    .map(|(record, _)| record)
                    .collect(),
                card_rows: 0,
                identifier_rows: rows,
                cancelled: true,
            });
        }

        match reader.read_record(&mut row) {
            Ok(true) => rows += 1,
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(ProviderError::table(source, e)),
            Err(e) => {
                rows += 1;
                log::warn!("Skipping unreadable row in {}: {}", source.display(), e);
                continue;
            }
        }

        let uuid = index.field(&row, "uuid");
        if uuid.is_empty() {
            continue;
        }
        let Some(positions) = by_uuid.get(uuid) else {
            continue;
        };
        for &position in positions {
            let (record, visited) = &mut records[position];
            if *visited {
                continue;
            }
            record.set_image_ids(
                index.field(&row, "scryfallId"),
                index.field(&row, "multiverseId"),
            );
            *visited = true;
            remaining -= 1;
        }
    }

    Ok(Resolution {
        records: records.into_iter().map(|(record, _)| record).collect(),
        card_rows: 0,
        identifier_rows: rows,
        cancelled: false,
    })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
