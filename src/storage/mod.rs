//! Relational store access.
//!
//! A [`Database`] only knows how to open connections. Every component issues
//! its queries afresh against a connection it is handed; nothing caches
//! statements in process-wide state.

pub mod migration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ToSql};

use crate::error::Result;

/// Account that inherits public decks of deleted accounts.
pub const DELETED_USER_ID: i64 = 1;
pub const DELETED_USER_NAME: &str = "deleted-user";

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    pub fn new(path: PathBuf, busy_timeout: Duration) -> Self {
        Self { path, busy_timeout }
    }

    /// Open the database, creating parent directories and applying migrations.
    pub fn open(path: PathBuf, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    crate::error::ServiceError::Internal(format!(
                        "cannot create database directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let db = Self::new(path, busy_timeout);
        let conn = db.connect()?;
        migration::migrate(&conn)?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with foreign keys enforced.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Ok(conn)
    }
}

/// Column assignments for a sparse write: only the fields a caller supplied.
#[derive(Default)]
pub(crate) struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `column = value` when the value is present; absent values are skipped.
    pub fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.columns.push(column);
            self.values.push(Box::new(value));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn values(&self) -> impl Iterator<Item = &dyn ToSql> {
        self.values.iter().map(|v| v.as_ref())
    }

    /// `UPDATE table SET c1 = ?1, ... WHERE key_column = ?n` for the recorded columns.
    pub fn execute_update(
        &self,
        conn: &Connection,
        table: &str,
        key_column: &str,
        key: i64,
    ) -> rusqlite::Result<usize> {
        let sets: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table,
            sets.join(", "),
            key_column,
            self.columns.len() + 1
        );

        let mut params: Vec<&dyn ToSql> = self.values().collect();
        params.push(&key);
        conn.execute(&sql, params.as_slice())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::create_test_db;
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("app.db");
        let db = Database::open(path.clone(), Duration::from_secs(1)).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
    }

    #[test]
    fn test_connections_enforce_foreign_keys() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_assignments_skip_absent_values() {
        let mut assignments = Assignments::new();
        assignments
            .set("title", Some("New".to_string()))
            .set::<String>("description", None)
            .set("visible", Some(true));

        assert_eq!(assignments.columns(), &["title", "visible"]);
        assert_eq!(assignments.values().count(), 2);
        assert!(Assignments::new().is_empty());
    }
}
