//! Reference resolution, partitioning and the per-record writes of one batch.
//!
//! The transaction boundary itself (begin, commit, rollback) belongs to the pipeline in
//! `import/mod.rs`; everything here runs inside a transaction it opened.

use super::entity::{EntitySpec, Record};
use super::error::ImportError;
use super::store::StoreTx;
use common::model::import::{EntityKind, WriteMode};
use std::collections::{BTreeSet, HashMap};
use tokio_util::sync::CancellationToken;

/// Rows between two progress callbacks while writing.
const PROGRESS_EVERY: usize = 100;

/// Snapshot of the values a foreign key may take, read once per batch.
///
/// Lookups ignore surrounding whitespace and case; a hit yields the spelling stored in the
/// referenced table so the written row satisfies the store's own foreign key.
#[derive(Debug, Default)]
pub struct ReferenceSet {
    values: HashMap<String, String>,
}

impl ReferenceSet {
    pub fn from_values(values: impl IntoIterator<Item = String>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|value| (fold(&value), value))
                .collect(),
        }
    }

    pub fn resolve(&self, value: &str) -> Option<&str> {
        self.values.get(&fold(value)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Reads the reference set for `spec` through `tx`, or `None` when the entity has no foreign key.
pub fn resolve_references(
    tx: &mut dyn StoreTx,
    spec: &EntitySpec,
) -> Result<Option<ReferenceSet>, ImportError> {
    let Some(referenced) = spec.references else {
        return Ok(None);
    };
    let values = tx.fetch_reference_set(referenced)?;
    let references = ReferenceSet::from_values(values);
    log::debug!(
        "{}: {} existing {} loaded",
        spec.kind,
        references.len(),
        referenced
    );
    Ok(Some(references))
}

#[derive(Debug, Default)]
pub struct Partition {
    pub accepted: Vec<Record>,
    pub rejected: Vec<Record>,
    /// Distinct unresolved reference values, as written in the file.
    pub rejected_keys: BTreeSet<String>,
}

/// Splits records by whether their reference resolves. Accepted records carry the stored
/// spelling of their reference. Records without a reference are always accepted.
pub fn partition(records: Vec<Record>, references: Option<&ReferenceSet>) -> Partition {
    let mut partition = Partition::default();
    for mut record in records {
        let reference = record.reference().map(str::to_string);
        if let (Some(value), Some(references)) = (reference, references) {
            match references.resolve(&value) {
                Some(stored) => record.set_reference(stored),
                None => {
                    partition.rejected_keys.insert(value);
                    partition.rejected.push(record);
                    continue;
                }
            }
        }
        partition.accepted.push(record);
    }
    partition
}

/// Fails the batch in strict mode when anything was rejected.
pub fn enforce_mode(
    partition: &Partition,
    spec: &EntitySpec,
    mode: WriteMode,
) -> Result<(), ImportError> {
    if mode == WriteMode::Strict && !partition.rejected.is_empty() {
        return Err(ImportError::ReferentialIntegrity {
            kind: spec.kind,
            referenced: spec.references.unwrap_or(EntityKind::Department),
            missing: partition.rejected_keys.clone(),
        });
    }
    if !partition.rejected.is_empty() {
        log::warn!(
            "{}: skipping {} rows with unknown references: {:?}",
            spec.kind,
            partition.rejected.len(),
            partition.rejected_keys
        );
    }
    Ok(())
}

/// Writes `records` in order and returns the summed affected-row count.
///
/// The token is checked before each write; a cancelled batch stops at once and the caller
/// rolls back.
pub fn write_records(
    tx: &mut dyn StoreTx,
    records: &[Record],
    mode: WriteMode,
    token: &CancellationToken,
    mut progress: impl FnMut(usize),
) -> Result<usize, ImportError> {
    let mut affected = 0;
    for (idx, record) in records.iter().enumerate() {
        if token.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        affected += tx.write(record, mode)?;
        let written = idx + 1;
        if written % PROGRESS_EVERY == 0 || written == records.len() {
            progress(written);
        }
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::department::Department;
    use common::model::instructor::Instructor;

    fn instructor(id: &str, dept: &str) -> Record {
        Record::Instructor(Instructor {
            id_number: id.into(),
            name: format!("name-{id}"),
            dept: dept.into(),
        })
    }

    #[test]
    fn reference_lookup_ignores_case_and_padding() {
        let references = ReferenceSet::from_values(vec!["Computer Science".to_string()]);

        assert_eq!(
            references.resolve("  computer SCIENCE "),
            Some("Computer Science")
        );
        assert_eq!(references.resolve("Physics"), None);
    }

    #[test]
    fn partition_rewrites_accepted_references_to_stored_spelling() {
        let references = ReferenceSet::from_values(vec!["CS".to_string()]);

        let partition = partition(
            vec![instructor("1", "cs"), instructor("2", "NOPE"), instructor("3", "NOPE")],
            Some(&references),
        );

        assert_eq!(partition.accepted, vec![instructor("1", "CS")]);
        assert_eq!(partition.rejected.len(), 2);
        assert_eq!(
            partition.rejected_keys,
            BTreeSet::from(["NOPE".to_string()])
        );
    }

    #[test]
    fn records_without_reference_are_always_accepted() {
        let records = vec![Record::Department(Department {
            dept_name: "CS".into(),
        })];

        let partition = partition(records.clone(), None);

        assert_eq!(partition.accepted, records);
        assert!(partition.rejected.is_empty());
    }

    #[test]
    fn strict_mode_turns_rejections_into_an_error() {
        let references = ReferenceSet::from_values(vec!["CS".to_string()]);
        let spec = EntitySpec::for_kind(EntityKind::Instructor);
        let partition = partition(
            vec![instructor("1", "CS"), instructor("2", "NOPE")],
            Some(&references),
        );

        assert!(enforce_mode(&partition, spec, WriteMode::Upsert).is_ok());
        match enforce_mode(&partition, spec, WriteMode::Strict) {
            Err(ImportError::ReferentialIntegrity { missing, referenced, .. }) => {
                assert_eq!(missing, BTreeSet::from(["NOPE".to_string()]));
                assert_eq!(referenced, EntityKind::Department);
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }
}
