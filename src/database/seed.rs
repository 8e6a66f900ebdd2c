/*!
 * Demo `STUDENT` database used by the examples and the `seed` command.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::Path;

use super::connection::ConnectionManager;
use super::target::ConnectionTarget;
use super::value::{Row, SqlValue};

const CREATE_STUDENT_TABLE: &str = "CREATE TABLE IF NOT EXISTS STUDENT(
    NAME VARCHAR(25),
    CLASS VARCHAR(25),
    SECTION VARCHAR(25),
    MARKS INT
)";

/// Rows inserted by `seed_demo_database`
pub const DEMO_STUDENTS: &[(&str, &str, &str, i64)] = &[
    ("Krish", "Data Science", "A", 90),
    ("John", "Data Science", "B", 100),
    ("Mukesh", "Data Science", "A", 86),
    ("Jacob", "DEVOPS", "A", 50),
    ("Dipesh", "DEVOPS", "A", 35),
];

/// A student record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub name: String,
    pub class: String,
    pub section: String,
    pub marks: i64,
}

impl Student {
    pub fn new(name: &str, class: &str, section: &str, marks: i64) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            section: section.to_string(),
            marks,
        }
    }

    fn params(&self) -> [SqlValue; 4] {
        [
            SqlValue::from(self.name.as_str()),
            SqlValue::from(self.class.as_str()),
            SqlValue::from(self.section.as_str()),
            SqlValue::Integer(self.marks),
        ]
    }

    fn from_row(row: &Row) -> Option<Self> {
        match row.as_slice() {
            [SqlValue::Text(name), SqlValue::Text(class), SqlValue::Text(section), SqlValue::Integer(marks)] => {
                Some(Self::new(name, class, section, *marks))
            }
            _ => None,
        }
    }
}

/// Create the database file (if needed) with an empty `STUDENT` table
pub fn create_database(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to create database: {:?}", path))?;
    conn.execute(CREATE_STUDENT_TABLE, [])
        .context("Failed to create STUDENT table")?;

    debug!("STUDENT table ready in {:?}", path);
    Ok(())
}

/// Insert a student unless an identical record already exists.
///
/// Returns `true` when a row was inserted.
pub async fn insert_student(manager: &ConnectionManager, student: &Student) -> Result<bool> {
    let params = student.params();
    let existing = manager
        .execute(
            "SELECT COUNT(*) FROM STUDENT WHERE NAME=? AND CLASS=? AND SECTION=? AND MARKS=?",
            &params,
        )
        .await?;

    let count = existing
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(SqlValue::as_f64)
        .unwrap_or(0.0);

    if count > 0.0 {
        debug!("Record for {} already exists", student.name);
        return Ok(false);
    }

    manager
        .execute("INSERT INTO STUDENT VALUES(?,?,?,?)", &params)
        .await?;
    debug!("Inserted record for {}", student.name);
    Ok(true)
}

/// All student records in table order
pub async fn all_students(manager: &ConnectionManager) -> Result<Vec<Student>> {
    let execution = manager.execute("SELECT * FROM STUDENT", &[]).await?;
    Ok(execution.rows.iter().filter_map(Student::from_row).collect())
}

/// Create `path` and fill it with the demo rows; returns how many were new
pub async fn seed_demo_database(path: &Path) -> Result<usize> {
    create_database(path)?;

    let manager = ConnectionManager::connected(ConnectionTarget::file_rw(path)).await?;
    let mut inserted = 0;
    for (name, class, section, marks) in DEMO_STUDENTS {
        if insert_student(&manager, &Student::new(name, class, section, *marks)).await? {
            inserted += 1;
        }
    }
    manager.close().await?;

    info!("Seeded {} new student record(s) into {:?}", inserted, path);
    Ok(inserted)
}
