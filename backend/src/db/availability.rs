use chrono::NaiveDate;
use common::model::availability::Availability;
use rusqlite::{params, Connection};

pub fn list_for(conn: &Connection, instructor_name: &str) -> rusqlite::Result<Vec<Availability>> {
    let mut stmt = conn.prepare(
        "SELECT instructor_name, start_date, status FROM availability
         WHERE instructor_name = ?1 ORDER BY start_date",
    )?;
    let rows = stmt.query_map(params![instructor_name], |row| {
        Ok(Availability {
            instructor_name: row.get(0)?,
            start_date: row.get(1)?,
            status: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn insert(conn: &Connection, availability: &Availability) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO availability (instructor_name, start_date, status) VALUES (?1, ?2, ?3)",
        params![
            availability.instructor_name,
            availability.start_date,
            availability.status
        ],
    )?;
    Ok(())
}

pub fn update_status(
    conn: &Connection,
    instructor_name: &str,
    start_date: NaiveDate,
    status: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE availability SET status = ?1 WHERE instructor_name = ?2 AND start_date = ?3",
        params![status, instructor_name, start_date],
    )
}

pub fn delete(
    conn: &Connection,
    instructor_name: &str,
    start_date: NaiveDate,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM availability WHERE instructor_name = ?1 AND start_date = ?2",
        params![instructor_name, start_date],
    )
}
