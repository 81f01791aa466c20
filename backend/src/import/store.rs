//! Outbound persistence capability used by the import pipeline.
//!
//! The pipeline never talks to a driver directly. It asks a [`Store`] for one [`StoreTx`] per
//! batch and does every read and write of that batch through it, then commits or rolls back
//! exactly once. A transaction dropped without either must roll back.

use super::entity::Record;
use super::error::StoreError;
use common::model::import::{EntityKind, WriteMode};

pub trait Store: Send + Sync {
    /// Opens the atomic unit for one batch. The returned handle is owned by that batch alone.
    fn begin(&self) -> Result<Box<dyn StoreTx + '_>, StoreError>;
}

pub trait StoreTx {
    /// Current natural keys of `kind`, read inside this transaction.
    fn fetch_reference_set(&mut self, kind: EntityKind) -> Result<Vec<String>, StoreError>;

    /// Writes one record and returns the number of rows the store reports as affected.
    fn write(&mut self, record: &Record, mode: WriteMode) -> Result<usize, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
