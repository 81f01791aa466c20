use common::model::import::EntityKind;
use std::collections::BTreeSet;
use thiserror::Error;

/// Failure reported by the persistence capability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness or foreign-key constraint refused a write. The data is at fault, not the
    /// store.
    #[error("{0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            StoreError::Conflict(e.to_string())
        } else {
            StoreError::Sqlite(e)
        }
    }
}

/// Why an import batch was aborted. Every variant means nothing from the batch was committed.
///
/// Rows dropped for missing fields, duplicate keys or (in upsert mode) unknown references are
/// not errors; they are reported through `BatchResult`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read spreadsheet: {0}")]
    Decode(String),

    #[error("missing required columns: {}. Found columns: {}", join(.missing), join(.found))]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("cannot import {kind}: the following {referenced} do not exist: {}. Please add them first", join(.missing))]
    ReferentialIntegrity {
        kind: EntityKind,
        referenced: EntityKind,
        missing: BTreeSet<String>,
    },

    #[error("batch conflicts with stored data: {0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Persistence(StoreError),

    #[error("import cancelled before commit")]
    Cancelled,
}

impl ImportError {
    /// Only store failures may succeed on a plain retry; everything else needs new input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImportError::Persistence(_))
    }

    /// Stable tag used in JSON error bodies.
    pub fn tag(&self) -> &'static str {
        match self {
            ImportError::Decode(_) => "decode_error",
            ImportError::Schema { .. } => "schema_error",
            ImportError::ReferentialIntegrity { .. } => "referential_integrity_error",
            ImportError::Conflict(_) => "conflict",
            ImportError::Persistence(_) => "persistence_error",
            ImportError::Cancelled => "cancelled",
        }
    }
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(detail) => ImportError::Conflict(detail),
            other => ImportError::Persistence(other),
        }
    }
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_message_names_the_missing_values() {
        let err = ImportError::ReferentialIntegrity {
            kind: EntityKind::Instructor,
            referenced: EntityKind::Department,
            missing: BTreeSet::from(["NOPE".to_string(), "BIO".to_string()]),
        };
        assert_eq!(
            err.to_string(),
            "cannot import instructors: the following departments do not exist: BIO, NOPE. Please add them first"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_persistence_failures_are_retryable() {
        let err = ImportError::from(StoreError::Unavailable("locked".into()));
        assert!(err.is_retryable());
        assert_eq!(err.tag(), "persistence_error");
        assert!(!ImportError::Cancelled.is_retryable());
    }

    #[test]
    fn constraint_violations_are_conflicts_not_store_failures() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE subject (subject_name TEXT PRIMARY KEY)")
            .unwrap();
        conn.execute("INSERT INTO subject VALUES ('Algebra')", []).unwrap();
        let sqlite_err = conn
            .execute("INSERT INTO subject VALUES ('Algebra')", [])
            .unwrap_err();

        let err = ImportError::from(StoreError::from(sqlite_err));

        assert!(matches!(err, ImportError::Conflict(_)), "got {err:?}");
        assert_eq!(err.tag(), "conflict");
        assert!(!err.is_retryable());
    }
}
