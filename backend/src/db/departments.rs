use common::model::department::Department;
use rusqlite::{params, Connection};

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Department>> {
    let mut stmt = conn.prepare("SELECT dept_name FROM department ORDER BY dept_name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Department {
            dept_name: row.get(0)?,
        })
    })?;
    rows.collect()
}

/// Adds a department; adding one that already exists is not an error.
pub fn insert(conn: &Connection, dept_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO department (dept_name) VALUES (?1) ON CONFLICT(dept_name) DO NOTHING",
        params![dept_name],
    )
}

/// Renames a department. Instructors follow through `ON UPDATE CASCADE`.
pub fn rename(conn: &Connection, dept_name: &str, new_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE department SET dept_name = ?1 WHERE dept_name = ?2",
        params![new_name, dept_name],
    )
}

pub fn delete(conn: &Connection, dept_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM department WHERE dept_name = ?1",
        params![dept_name],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{init_db, open_connection};
    use crate::db::instructors;
    use common::model::instructor::Instructor;

    #[test]
    fn rename_cascades_to_instructors_and_delete_is_restricted() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_connection(&dir.path().join("t.sqlite")).unwrap();
        init_db(&conn).unwrap();

        assert_eq!(insert(&conn, "CS").unwrap(), 1);
        assert_eq!(insert(&conn, "CS").unwrap(), 0);
        instructors::insert(
            &conn,
            &Instructor {
                id_number: "1".into(),
                name: "Ada".into(),
                dept: "CS".into(),
            },
        )
        .unwrap();

        assert_eq!(rename(&conn, "CS", "Computing").unwrap(), 1);
        assert_eq!(instructors::list(&conn).unwrap()[0].dept, "Computing");

        assert!(delete(&conn, "Computing").is_err(), "referenced department must stay");
        assert_eq!(delete(&conn, "Nope").unwrap(), 0);
    }
}
