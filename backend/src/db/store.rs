use super::schema::{init_db, open_connection};
use crate::import::entity::Record;
use crate::import::error::StoreError;
use crate::import::store::{Store, StoreTx};
use common::model::import::{EntityKind, WriteMode};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// File-backed store. Every batch and every CRUD call gets its own connection, so no handle is
/// ever shared between two in-flight requests.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Creates the parent directory and the schema if needed.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = open_connection(&db_path)?;
        init_db(&conn)?;
        Ok(Self { db_path })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        Ok(open_connection(&self.db_path)?)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

impl Store for SqliteStore {
    /// `BEGIN IMMEDIATE` takes the database write lock up front, so the reference read and the
    /// writes of one batch cannot interleave with another batch's commit.
    fn begin(&self) -> Result<Box<dyn StoreTx + '_>, StoreError> {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteBatch { conn, open: true }))
    }
}

struct SqliteBatch {
    conn: Connection,
    open: bool,
}

impl StoreTx for SqliteBatch {
    fn fetch_reference_set(&mut self, kind: EntityKind) -> Result<Vec<String>, StoreError> {
        let sql = match kind {
            EntityKind::Department => "SELECT dept_name FROM department",
            EntityKind::Subject => "SELECT subject_name FROM subject",
            EntityKind::Instructor => "SELECT id_number FROM instructor",
        };
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn write(&mut self, record: &Record, mode: WriteMode) -> Result<usize, StoreError> {
        let affected = match (record, mode) {
            (Record::Instructor(i), WriteMode::Strict) => self.conn.execute(
                "INSERT INTO instructor (id_number, instructor_name, dept) VALUES (?1, ?2, ?3)",
                params![i.id_number, i.name, i.dept],
            )?,
            (Record::Instructor(i), WriteMode::Upsert) => self.conn.execute(
                "INSERT INTO instructor (id_number, instructor_name, dept) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id_number) DO UPDATE SET
                     instructor_name = excluded.instructor_name,
                     dept = excluded.dept",
                params![i.id_number, i.name, i.dept],
            )?,
            (Record::Department(d), WriteMode::Strict) => self.conn.execute(
                "INSERT INTO department (dept_name) VALUES (?1)",
                params![d.dept_name],
            )?,
            (Record::Department(d), WriteMode::Upsert) => self.conn.execute(
                "INSERT INTO department (dept_name) VALUES (?1)
                 ON CONFLICT(dept_name) DO NOTHING",
                params![d.dept_name],
            )?,
            (Record::Subject(s), WriteMode::Strict) => self.conn.execute(
                "INSERT INTO subject (subject_name) VALUES (?1)",
                params![s.subject_name],
            )?,
            (Record::Subject(s), WriteMode::Upsert) => self.conn.execute(
                "INSERT INTO subject (subject_name) VALUES (?1)
                 ON CONFLICT(subject_name) DO NOTHING",
                params![s.subject_name],
            )?,
        };
        Ok(affected)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.open = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteBatch {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("rollback of abandoned import transaction failed: {e}");
            }
        }
    }
}
