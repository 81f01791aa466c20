//! Types exchanged around a bulk spreadsheet import.
//!
//! A client uploads a workbook for one [`EntityKind`] and picks a [`WriteMode`]; the backend
//! answers with a [`BatchResult`] describing what happened to every input row.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The reference-data tables that accept spreadsheet imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "instructors")]
    Instructor,
    #[serde(rename = "departments")]
    Department,
    #[serde(rename = "subjects")]
    Subject,
}

impl EntityKind {
    /// Path segment used by the import routes (`/api/imports/{kind}`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Instructor => "instructors",
            EntityKind::Department => "departments",
            EntityKind::Subject => "subjects",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the writer treats rows whose foreign key cannot be resolved, and how it writes the rest.
///
/// - `Strict`: a single unresolved reference aborts the whole batch; rows are plain inserts,
///   so a natural key that already exists in the store fails the batch as well.
/// - `Upsert`: unresolved rows are skipped and reported; the rest are inserted, overwriting the
///   non-key fields of any existing row with the same natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Strict,
    #[default]
    Upsert,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Strict => f.write_str("strict"),
            WriteMode::Upsert => f.write_str("upsert"),
        }
    }
}

/// Summary of one committed import batch. Returned to the caller only, never persisted.
///
/// Every input row lands in exactly one bucket, so
/// `accepted_count + rejected_count + dropped_missing_fields + dropped_duplicates == input_rows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub kind: EntityKind,
    pub mode: WriteMode,
    /// Data rows read from the sheet (header excluded).
    pub input_rows: usize,
    /// Rows written to the store.
    pub accepted_count: usize,
    /// Rows skipped because their reference could not be resolved (upsert mode only).
    pub rejected_count: usize,
    /// The unresolved reference values behind `rejected_count`, e.g. unknown department names.
    pub rejected_keys: BTreeSet<String>,
    /// Rows dropped because a required field was empty.
    pub dropped_missing_fields: usize,
    /// Rows dropped because an earlier row in the same file had the same natural key.
    pub dropped_duplicates: usize,
    /// Sum of the row counts reported by the store; upserts that change nothing count as 0.
    pub affected_rows: usize,
    pub message: String,
}

impl BatchResult {
    pub fn is_balanced(&self) -> bool {
        self.accepted_count
            + self.rejected_count
            + self.dropped_missing_fields
            + self.dropped_duplicates
            == self.input_rows
    }
}
