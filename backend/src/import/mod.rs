//! Bulk spreadsheet import of reference data.
//!
//! An upload goes through three stages, each in its own module:
//!
//! 1. [`decoder`] parses the workbook (or CSV) into ordered `column -> text` rows and checks
//!    that the entity's required columns are present.
//! 2. [`validator`] normalises the fields, drops rows with a blank required field and drops
//!    repeated natural keys (first occurrence wins). Both drops are counted, never errors.
//! 3. [`writer`] resolves foreign keys against a snapshot of the referenced table, splits the
//!    records into accepted and rejected, and writes the accepted ones.
//!
//! [`ImportPipeline`] drives the stages and owns the transaction: the reference read and all
//! writes of a batch happen in one [`store::StoreTx`], committed once at the end or rolled back
//! on the first failure or cancellation. Its [`BatchState`] moves
//! `Open -> Validating -> ResolvingRefs -> Writing -> Committed | RolledBack`.

pub mod decoder;
pub mod entity;
pub mod error;
pub mod store;
pub mod validator;
pub mod writer;

use common::model::import::{BatchResult, EntityKind, WriteMode};
use decoder::{ColumnCasing, ColumnPolicy, SheetFormat};
use entity::EntitySpec;
use error::ImportError;
use log::{debug, info, warn};
use store::{Store, StoreTx};
use tokio_util::sync::CancellationToken;
use validator::Validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Open,
    Validating,
    ResolvingRefs,
    Writing,
    Committed,
    RolledBack,
}

pub struct ImportPipeline<'s> {
    store: &'s dyn Store,
    spec: &'static EntitySpec,
    mode: WriteMode,
    casing: ColumnCasing,
    state: BatchState,
    progress: Option<Box<dyn Fn(usize) + Send + 's>>,
}

impl<'s> ImportPipeline<'s> {
    pub fn new(store: &'s dyn Store, kind: EntityKind, mode: WriteMode) -> Self {
        Self {
            store,
            spec: EntitySpec::for_kind(kind),
            mode,
            casing: ColumnCasing::default(),
            state: BatchState::Open,
            progress: None,
        }
    }

    pub fn with_casing(mut self, casing: ColumnCasing) -> Self {
        self.casing = casing;
        self
    }

    /// Called with the number of rows written so far while the batch is writing.
    pub fn on_progress(mut self, progress: impl Fn(usize) + Send + 's) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Runs one batch to a terminal state.
    ///
    /// Cancelling `token` before the commit rolls the batch back and yields
    /// [`ImportError::Cancelled`]; once the commit has started the batch completes.
    pub fn run(
        &mut self,
        payload: &[u8],
        format: SheetFormat,
        token: &CancellationToken,
    ) -> Result<BatchResult, ImportError> {
        info!(
            "import {} ({}): {} bytes, md5 {:x}",
            self.spec.kind,
            self.mode,
            payload.len(),
            md5::compute(payload)
        );
        let outcome = self.execute(payload, format, token);
        match &outcome {
            Ok(result) => info!("import {} committed: {}", self.spec.kind, result.message),
            Err(e) => {
                if self.state != BatchState::RolledBack {
                    self.transition(BatchState::RolledBack);
                }
                warn!("import {} rolled back: {e}", self.spec.kind);
            }
        }
        outcome
    }

    fn execute(
        &mut self,
        payload: &[u8],
        format: SheetFormat,
        token: &CancellationToken,
    ) -> Result<BatchResult, ImportError> {
        let policy = ColumnPolicy::for_entity(self.spec, self.casing);
        let rows = decoder::decode(payload, format, &self.spec.columns(), &policy)?;

        self.transition(BatchState::Validating);
        let validation = validator::validate(&rows, self.spec);
        debug!(
            "{} rows read, {} valid, {} missing fields, {} duplicates",
            rows.len(),
            validation.records.len(),
            validation.dropped_missing_fields,
            validation.dropped_duplicates
        );
        if token.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        self.transition(BatchState::ResolvingRefs);
        let store = self.store;
        let mut tx = store.begin()?;
        match self.write_batch(tx.as_mut(), validation, rows.len(), token) {
            Ok(result) => {
                tx.commit()?;
                self.transition(BatchState::Committed);
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!("rollback failed: {rollback}");
                }
                self.transition(BatchState::RolledBack);
                Err(e)
            }
        }
    }

    fn write_batch(
        &mut self,
        tx: &mut dyn StoreTx,
        validation: Validation,
        input_rows: usize,
        token: &CancellationToken,
    ) -> Result<BatchResult, ImportError> {
        let references = writer::resolve_references(tx, self.spec)?;
        let partition = writer::partition(validation.records, references.as_ref());
        writer::enforce_mode(&partition, self.spec, self.mode)?;

        self.transition(BatchState::Writing);
        let progress = self.progress.as_deref();
        let affected_rows =
            writer::write_records(tx, &partition.accepted, self.mode, token, |written| {
                if let Some(progress) = progress {
                    progress(written);
                }
            })?;

        if token.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let result = BatchResult {
            kind: self.spec.kind,
            mode: self.mode,
            input_rows,
            accepted_count: partition.accepted.len(),
            rejected_count: partition.rejected.len(),
            message: summary(self.spec.kind, partition.accepted.len(), &partition),
            rejected_keys: partition.rejected_keys,
            dropped_missing_fields: validation.dropped_missing_fields,
            dropped_duplicates: validation.dropped_duplicates,
            affected_rows,
        };
        debug_assert!(result.is_balanced());
        Ok(result)
    }

    fn transition(&mut self, next: BatchState) {
        debug!("import {}: {:?} -> {:?}", self.spec.kind, self.state, next);
        self.state = next;
    }
}

fn summary(kind: EntityKind, accepted: usize, partition: &writer::Partition) -> String {
    if partition.rejected.is_empty() {
        format!("Imported {accepted} {kind}")
    } else {
        format!(
            "Imported {accepted} {kind}; skipped {} rows with unknown references: {}",
            partition.rejected.len(),
            partition
                .rejected_keys
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_xlsxwriter::Workbook;

    /// Builds an xlsx payload whose first sheet holds `rows` as text cells.
    pub fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet
                        .write_string(row_idx as u32, col_idx as u16, *value)
                        .expect("should write fixture cell");
                }
            }
        }
        workbook.save_to_buffer().expect("should serialise fixture workbook")
    }
}
