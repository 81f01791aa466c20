use common::model::subject::Subject;
use rusqlite::{params, Connection, OptionalExtension};

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Subject>> {
    let mut stmt = conn.prepare("SELECT subject_name FROM subject ORDER BY subject_name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Subject {
            subject_name: row.get(0)?,
        })
    })?;
    rows.collect()
}

pub fn insert(conn: &Connection, subject_name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO subject (subject_name) VALUES (?1)",
        params![subject_name],
    )?;
    Ok(())
}

pub fn exists(conn: &Connection, subject_name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM subject WHERE subject_name = ?1",
        params![subject_name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

pub fn rename(conn: &Connection, subject_name: &str, new_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE subject SET subject_name = ?1 WHERE subject_name = ?2",
        params![new_name, subject_name],
    )
}

pub fn delete(conn: &Connection, subject_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM subject WHERE subject_name = ?1",
        params![subject_name],
    )
}
