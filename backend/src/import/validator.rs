use super::decoder::RawRow;
use super::entity::{EntitySpec, Record};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Validation {
    pub records: Vec<Record>,
    pub dropped_missing_fields: usize,
    pub dropped_duplicates: usize,
}

/// Normalises every row against `spec`, in file order.
///
/// A row with any required field empty after normalisation is dropped and counted. A row
/// whose natural key was already seen earlier in the batch is dropped and counted; the first
/// occurrence is the one kept.
pub fn validate(rows: &[RawRow], spec: &EntitySpec) -> Validation {
    let key_index = spec.key_index();
    let mut seen = HashSet::new();
    let mut validation = Validation::default();

    for row in rows {
        let values: Vec<String> = spec
            .fields
            .iter()
            .map(|field| (field.normalize)(row.get(field.column).unwrap_or_default()))
            .collect();

        if values.iter().any(String::is_empty) {
            log::debug!("line {}: required field missing, row dropped", row.line);
            validation.dropped_missing_fields += 1;
            continue;
        }

        if !seen.insert(values[key_index].clone()) {
            log::debug!(
                "line {}: duplicate {} '{}', row dropped",
                row.line,
                spec.key,
                values[key_index]
            );
            validation.dropped_duplicates += 1;
            continue;
        }

        validation.records.push(spec.build(values));
    }

    validation
}
