use common::model::instructor::Instructor;
use rusqlite::{params, Connection};

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Instructor>> {
    let mut stmt = conn.prepare(
        "SELECT id_number, instructor_name, dept FROM instructor ORDER BY id_number",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Instructor {
            id_number: row.get(0)?,
            name: row.get(1)?,
            dept: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn insert(conn: &Connection, instructor: &Instructor) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO instructor (id_number, instructor_name, dept) VALUES (?1, ?2, ?3)",
        params![instructor.id_number, instructor.name, instructor.dept],
    )?;
    Ok(())
}

/// Updates name and department of `id_number`. Returns the number of rows changed.
pub fn update(
    conn: &Connection,
    id_number: &str,
    instructor: &Instructor,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE instructor SET instructor_name = ?1, dept = ?2 WHERE id_number = ?3",
        params![instructor.name, instructor.dept, id_number],
    )
}

pub fn delete(conn: &Connection, id_number: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM instructor WHERE id_number = ?1",
        params![id_number],
    )
}
