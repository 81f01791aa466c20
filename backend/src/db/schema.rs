use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn open_connection(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS department (
            dept_name       TEXT PRIMARY KEY NOT NULL
        );

        CREATE TABLE IF NOT EXISTS instructor (
            id_number       TEXT PRIMARY KEY NOT NULL,
            instructor_name TEXT NOT NULL,
            dept            TEXT NOT NULL,
            FOREIGN KEY (dept) REFERENCES department(dept_name)
                ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE TABLE IF NOT EXISTS subject (
            subject_name    TEXT PRIMARY KEY NOT NULL
        );

        CREATE TABLE IF NOT EXISTS availability (
            instructor_name TEXT NOT NULL,
            start_date      TEXT NOT NULL,
            status          TEXT NOT NULL,
            PRIMARY KEY (instructor_name, start_date)
        );

        CREATE INDEX IF NOT EXISTS idx_instructor_dept ON instructor(dept);
        ",
    )
}
