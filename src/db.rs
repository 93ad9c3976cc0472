//! # Core database implementation
//! This module implements the abstraction over the underlying [SQLite](https://sqlite.org/)
//! database in which the metadata for an archive is stored.
//!
//! The core struct is [`Database`], which owns the connection and exposes typed operations
//! over the `OriginalFiles`, `MasterFiles`, `AccessFiles`, `StatutoryFiles`, `Events`, and
//! `Metadata` tables. Row-level operations live in [`row`]; the event log and rollback
//! machinery lives in [`crate::event`]; selector compilation lives in [`selector`].
pub mod import;
pub mod row;
mod migrate;
mod schema;
mod selector;
pub(crate) mod sql;

use std::path::Path;

use log::debug;
use rusqlite::{Connection, Transaction};

pub use self::selector::{Selector, SelectorKind};
use self::sql::*;
use crate::error::DatabaseError;

/// A sentinel written to SQLite's `application_id` pragma so that foreign database files are
/// rejected before we attempt to read their schema.
const APPLICATION_ID: i32 = 0x6469_6761; // "diga" in ASCII

/// The schema version produced by a fresh [`Database::open`]. Bumped whenever
/// [`migrate::migrate`] gains a new step.
const SCHEMA_VERSION: i32 = 1;

/// The set of tables managed by [`Database`], paired with their schema definitions.
const TABLES: &[(&str, fn() -> &'static str)] = &[
    ("OriginalFiles", schema::original_files),
    ("MasterFiles", schema::master_files),
    ("AccessFiles", schema::access_files),
    ("StatutoryFiles", schema::statutory_files),
    ("Events", schema::events),
    ("Metadata", schema::metadata),
];

/// Owns the connection to the archive's metadata database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `db_file`.
    ///
    /// If the file does not yet exist or is empty, a fresh schema at [`SCHEMA_VERSION`] is
    /// created. If it exists with an older `user_version`, it is migrated in place. If it was
    /// stamped with a different `application_id`, or its `user_version` is newer than this
    /// binary understands, opening fails.
    pub fn open<P: AsRef<Path>>(db_file: P) -> Result<Self, DatabaseError> {
        debug!(
            "Opening connection to '{}'",
            db_file.as_ref().display()
        );
        let mut conn = Connection::open(db_file)?;
        conn.prepare_cached(set_wal())?.query_row((), |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let app_id: i32 = conn.pragma_query_value(None, "application_id", |row| row.get(0))?;
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if app_id == 0 && version == 0 {
            Self::initialize_fresh(&mut conn)?;
        } else if app_id != APPLICATION_ID {
            return Err(DatabaseError::InvalidDatabase);
        } else if version > SCHEMA_VERSION {
            return Err(DatabaseError::SchemaTooNew(version, SCHEMA_VERSION));
        } else {
            for v in version..SCHEMA_VERSION {
                migrate::migrate(&mut conn, v)?;
            }
        }

        Ok(Database { conn })
    }

    /// Create all tables at the current schema and stamp the database as ours.
    fn initialize_fresh(conn: &mut Connection) -> Result<(), DatabaseError> {
        debug!("Initializing fresh database at schema version {SCHEMA_VERSION}");
        let tx = conn.transaction()?;
        for (name, schema_fn) in TABLES {
            Self::initialize_table(&tx, name, schema_fn())?;
        }
        tx.commit()?;
        conn.pragma_update(None, "application_id", APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Validate the schema of an existing table, or return an appropriate error.
    fn validate_table_schema(
        tx: &Transaction,
        table_name: &str,
        expected_schema: &str,
    ) -> Result<(), DatabaseError> {
        let mut table_selector = tx.prepare_cached(get_table_schema())?;
        let mut rows = table_selector.query([table_name])?;
        match rows.next() {
            Ok(Some(row)) => {
                let table_schema: String = row.get("sql")?;
                if table_schema == expected_schema {
                    Ok(())
                } else {
                    Err(DatabaseError::TableIncorrectSchema(
                        table_name.into(),
                        table_schema,
                    ))
                }
            }
            Ok(None) => Err(DatabaseError::TableMissing(table_name.into())),
            Err(why) => Err(why.into()),
        }
    }

    /// Create a table inside a transaction if it is missing, validating it otherwise.
    fn initialize_table(
        tx: &Transaction,
        table_name: &str,
        schema: &str,
    ) -> Result<(), DatabaseError> {
        match Self::validate_table_schema(tx, table_name, schema) {
            Ok(()) => Ok(()),
            Err(DatabaseError::TableMissing(_)) => {
                tx.execute(schema, ())?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Begin a transaction over the underlying connection.
    pub fn transaction(&mut self) -> Result<Transaction, DatabaseError> {
        Ok(self.conn.transaction()?)
    }

    /// Get a metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare_cached(get_metadata())?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get("value")?)),
            None => Ok(None),
        }
    }

    /// Set a metadata value, overwriting any existing value for `key`.
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.prepare_cached(set_metadata())?.execute((key, value))?;
        Ok(())
    }

    /// The raw connection, for callers (such as [`row`]) that need direct statement access.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_initializes_all_tables() {
        let db = Database::open(":memory:").unwrap();
        for (name, _) in TABLES {
            let mut stmt = db
                .conn
                .prepare(get_table_schema())
                .unwrap();
            let exists = stmt.exists([*name]).unwrap();
            assert!(exists, "table '{name}' should exist after fresh open");
        }
    }

    #[test]
    fn metadata_roundtrips() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(db.get_metadata("root").unwrap(), None);
        db.set_metadata("root", "/archive").unwrap();
        assert_eq!(db.get_metadata("root").unwrap(), Some("/archive".into()));
        db.set_metadata("root", "/archive2").unwrap();
        assert_eq!(db.get_metadata("root").unwrap(), Some("/archive2".into()));
    }
}
