//! Typed rows and CRUD operations over the archive tables.
//!
//! `OriginalFiles` operations use the hand-written statements in [`super::sql`]. `AccessFiles`
//! and `StatutoryFiles` share an identical shape, so their CRUD is built once in
//! [`ConvertedFile`] rather than doubled across two near-identical `.sql` files. `MasterFiles`
//! carries the extra `convert_access`/`convert_statutory`/`processed` columns that drive
//! `identify master`'s convert-action resolution, so it gets its own [`MasterFile`] struct.
use rusqlite::{params, OptionalExtension, Row};

use super::sql;
use crate::error::DatabaseError;

/// A row from the `OriginalFiles` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalFile {
    pub uuid: String,
    pub relative_path: String,
    pub original_path: String,
    pub checksum: Option<String>,
    pub size: i64,
    pub puid: Option<String>,
    pub signature: Option<String>,
    pub warning: Option<String>,
    pub action: Option<String>,
    pub action_data: Option<String>,
    pub processed: bool,
    pub locked: bool,
    pub parent: Option<String>,
}

impl OriginalFile {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(OriginalFile {
            uuid: row.get("uuid")?,
            relative_path: row.get("relative_path")?,
            original_path: row.get("original_path")?,
            checksum: row.get("checksum")?,
            size: row.get("size")?,
            puid: row.get("puid")?,
            signature: row.get("signature")?,
            warning: row.get("warning")?,
            action: row.get("action")?,
            action_data: row.get("action_data")?,
            processed: row.get("processed")?,
            locked: row.get("locked")?,
            parent: row.get("parent")?,
        })
    }

    /// Insert a freshly-discovered file. `processed` and `locked` start false.
    pub fn insert(
        tx: &rusqlite::Transaction,
        uuid: &str,
        relative_path: &str,
        original_path: &str,
        size: i64,
        parent: Option<&str>,
    ) -> Result<(), DatabaseError> {
        tx.prepare_cached(sql::insert_original_file())?.execute(params![
            uuid,
            relative_path,
            original_path,
            Option::<String>::None,
            size,
            Option::<String>::None,
            Option::<String>::None,
            Option::<String>::None,
            Option::<String>::None,
            Option::<String>::None,
            false,
            false,
            parent,
        ])?;
        Ok(())
    }

    /// Apply the result of identification. `processed` is cleared only when the caller
    /// determines `action`/`action_data` actually changed from the existing row; otherwise
    /// the previous value is passed through unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn update_identification(
        tx: &rusqlite::Transaction,
        uuid: &str,
        checksum: &str,
        size: i64,
        puid: Option<&str>,
        signature: Option<&str>,
        warning: Option<&str>,
        action: Option<&str>,
        action_data: Option<&str>,
        processed: bool,
    ) -> Result<(), DatabaseError> {
        tx.prepare_cached(sql::update_original_file_identification())?
            .execute(params![
                uuid, checksum, size, puid, signature, warning, action, action_data, processed
            ])?;
        Ok(())
    }

    /// Update the relative path following a rename.
    pub fn update_relative_path(
        tx: &rusqlite::Transaction,
        uuid: &str,
        relative_path: &str,
    ) -> Result<(), DatabaseError> {
        tx.prepare_cached(sql::update_original_file_relative_path())?
            .execute(params![uuid, relative_path])?;
        Ok(())
    }

    /// Update the action directive, re-arming `processed`.
    pub fn update_action(
        tx: &rusqlite::Transaction,
        uuid: &str,
        action: &str,
        action_data: Option<&str>,
    ) -> Result<(), DatabaseError> {
        tx.prepare_cached(sql::update_original_file_action())?
            .execute(params![uuid, action, action_data])?;
        Ok(())
    }

    /// Delete a row by uuid.
    pub fn delete(tx: &rusqlite::Transaction, uuid: &str) -> Result<(), DatabaseError> {
        tx.prepare_cached(sql::delete_original_file())?.execute(params![uuid])?;
        Ok(())
    }

    /// Fetch a row by uuid.
    pub fn by_uuid(
        tx: &rusqlite::Transaction,
        uuid: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(tx
            .prepare_cached(sql::select_original_file_by_uuid())?
            .query_row(params![uuid], Self::from_row)
            .optional()?)
    }

    /// Fetch a row by relative path.
    pub fn by_relative_path(
        tx: &rusqlite::Transaction,
        relative_path: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(tx
            .prepare_cached(sql::select_original_file_by_relative_path())?
            .query_row(params![relative_path], Self::from_row)
            .optional()?)
    }

    /// Fetch every row in `OriginalFiles`.
    pub fn all(tx: &rusqlite::Transaction) -> Result<Vec<Self>, DatabaseError> {
        let mut stmt = tx.prepare(
            "SELECT uuid, relative_path, original_path, checksum, size, puid, signature, warning, \
             action, action_data, processed, locked, parent FROM OriginalFiles",
        )?;
        let rows = stmt.query_map([], Self::from_row)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Run a selector-compiled predicate against `OriginalFiles`, returning matched rows.
    pub fn by_selector(
        tx: &rusqlite::Transaction,
        selector: &super::Selector,
    ) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!(
            "SELECT uuid, relative_path, original_path, checksum, size, puid, signature, warning, \
             action, action_data, processed, locked, parent FROM OriginalFiles WHERE {}",
            selector.predicate()
        );
        let mut stmt = tx.prepare(&sql)?;
        let mut rows = Vec::new();
        for token in &selector.tokens {
            let bound = selector.bind_value(token);
            let matched: Vec<Self> = stmt
                .query_map(params![bound], Self::from_row)?
                .collect::<Result<_, _>>()?;
            rows.extend(matched);
        }
        Ok(rows)
    }
}

/// Which of the two structurally-identical converted-file tables to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedKind {
    Access,
    Statutory,
}

impl ConvertedKind {
    fn table(self) -> &'static str {
        match self {
            ConvertedKind::Access => "AccessFiles",
            ConvertedKind::Statutory => "StatutoryFiles",
        }
    }
}

/// A row shared by `AccessFiles` and `StatutoryFiles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub uuid: String,
    pub original_uuid: String,
    pub relative_path: String,
    pub checksum: Option<String>,
    pub puid: Option<String>,
    pub signature: Option<String>,
    pub warning: Option<String>,
}

impl ConvertedFile {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(ConvertedFile {
            uuid: row.get("uuid")?,
            original_uuid: row.get("original_uuid")?,
            relative_path: row.get("relative_path")?,
            checksum: row.get("checksum")?,
            puid: row.get("puid")?,
            signature: row.get("signature")?,
            warning: row.get("warning")?,
        })
    }

    /// Insert a new converted-file row in `kind`'s table.
    pub fn insert(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        uuid: &str,
        original_uuid: &str,
        relative_path: &str,
    ) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO {} (uuid, original_uuid, relative_path) VALUES (?1, ?2, ?3)",
            kind.table()
        );
        tx.prepare(&sql)?.execute(params![uuid, original_uuid, relative_path])?;
        Ok(())
    }

    /// Update the identification fields of a converted-file row.
    pub fn update_identification(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        uuid: &str,
        checksum: &str,
        puid: Option<&str>,
        signature: Option<&str>,
        warning: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let sql = format!(
            "UPDATE {} SET checksum = ?2, puid = ?3, signature = ?4, warning = ?5 WHERE uuid = ?1",
            kind.table()
        );
        tx.prepare(&sql)?.execute(params![uuid, checksum, puid, signature, warning])?;
        Ok(())
    }

    /// Fetch a converted-file row by its own uuid.
    pub fn by_uuid(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        uuid: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        let sql = format!(
            "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning \
             FROM {} WHERE uuid = ?1",
            kind.table()
        );
        Ok(tx
            .prepare(&sql)?
            .query_row(params![uuid], Self::from_row)
            .optional()?)
    }

    /// Fetch all converted-file rows deriving from a given original file.
    pub fn by_original_uuid(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        original_uuid: &str,
    ) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!(
            "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning \
             FROM {} WHERE original_uuid = ?1",
            kind.table()
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
            .query_map(params![original_uuid], Self::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Update the relative path of a converted-file row following a rename.
    pub fn update_relative_path(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        uuid: &str,
        relative_path: &str,
    ) -> Result<(), DatabaseError> {
        let sql = format!("UPDATE {} SET relative_path = ?2 WHERE uuid = ?1", kind.table());
        tx.prepare(&sql)?.execute(params![uuid, relative_path])?;
        Ok(())
    }

    /// Fetch every converted-file row in `kind`'s table.
    pub fn all(tx: &rusqlite::Transaction, kind: ConvertedKind) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!(
            "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning FROM {}",
            kind.table()
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt.query_map([], Self::from_row)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Fetch a converted-file row by its relative path within `kind`'s table.
    pub fn by_relative_path(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        relative_path: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        let sql = format!(
            "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning \
             FROM {} WHERE relative_path = ?1",
            kind.table()
        );
        Ok(tx
            .prepare(&sql)?
            .query_row(params![relative_path], Self::from_row)
            .optional()?)
    }

    /// Delete a converted-file row by uuid.
    pub fn delete(
        tx: &rusqlite::Transaction,
        kind: ConvertedKind,
        uuid: &str,
    ) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE uuid = ?1", kind.table());
        tx.prepare(&sql)?.execute(params![uuid])?;
        Ok(())
    }
}

/// A row from the `MasterFiles` table. Unlike `AccessFiles`/`StatutoryFiles`, a master file
/// carries the resolved convert-action (access/statutory tool names) and its own `processed`
/// flag, tracking whether those derivatives still need to be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterFile {
    pub uuid: String,
    pub original_uuid: String,
    pub relative_path: String,
    pub checksum: Option<String>,
    pub puid: Option<String>,
    pub signature: Option<String>,
    pub warning: Option<String>,
    pub convert_access: Option<String>,
    pub convert_statutory: Option<String>,
    pub processed: bool,
}

impl MasterFile {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(MasterFile {
            uuid: row.get("uuid")?,
            original_uuid: row.get("original_uuid")?,
            relative_path: row.get("relative_path")?,
            checksum: row.get("checksum")?,
            puid: row.get("puid")?,
            signature: row.get("signature")?,
            warning: row.get("warning")?,
            convert_access: row.get("convert_access")?,
            convert_statutory: row.get("convert_statutory")?,
            processed: row.get("processed")?,
        })
    }

    /// Insert a freshly-discovered master file. `processed` starts false.
    pub fn insert(
        tx: &rusqlite::Transaction,
        uuid: &str,
        original_uuid: &str,
        relative_path: &str,
    ) -> Result<(), DatabaseError> {
        tx.prepare(
            "INSERT INTO MasterFiles (uuid, original_uuid, relative_path) VALUES (?1, ?2, ?3)",
        )?
        .execute(params![uuid, original_uuid, relative_path])?;
        Ok(())
    }

    /// Apply the result of identification along with the resolved convert-action. `processed`
    /// is cleared only when the caller determines the convert-action actually changed from the
    /// existing row; otherwise the previous value is passed through unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn update_identification(
        tx: &rusqlite::Transaction,
        uuid: &str,
        checksum: &str,
        puid: Option<&str>,
        signature: Option<&str>,
        warning: Option<&str>,
        convert_access: Option<&str>,
        convert_statutory: Option<&str>,
        processed: bool,
    ) -> Result<(), DatabaseError> {
        tx.prepare(
            "UPDATE MasterFiles SET checksum = ?2, puid = ?3, signature = ?4, warning = ?5, \
             convert_access = ?6, convert_statutory = ?7, processed = ?8 WHERE uuid = ?1",
        )?
        .execute(params![
            uuid,
            checksum,
            puid,
            signature,
            warning,
            convert_access,
            convert_statutory,
            processed
        ])?;
        Ok(())
    }

    /// Update the relative path of a master file following a rename.
    pub fn update_relative_path(
        tx: &rusqlite::Transaction,
        uuid: &str,
        relative_path: &str,
    ) -> Result<(), DatabaseError> {
        tx.prepare("UPDATE MasterFiles SET relative_path = ?2 WHERE uuid = ?1")?
            .execute(params![uuid, relative_path])?;
        Ok(())
    }

    /// Fetch a master file row by its own uuid.
    pub fn by_uuid(tx: &rusqlite::Transaction, uuid: &str) -> Result<Option<Self>, DatabaseError> {
        Ok(tx
            .prepare(
                "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning, \
                 convert_access, convert_statutory, processed FROM MasterFiles WHERE uuid = ?1",
            )?
            .query_row(params![uuid], Self::from_row)
            .optional()?)
    }

    /// Fetch a master file row by its relative path.
    pub fn by_relative_path(
        tx: &rusqlite::Transaction,
        relative_path: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(tx
            .prepare(
                "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning, \
                 convert_access, convert_statutory, processed FROM MasterFiles \
                 WHERE relative_path = ?1",
            )?
            .query_row(params![relative_path], Self::from_row)
            .optional()?)
    }

    /// Fetch every row in `MasterFiles`.
    pub fn all(tx: &rusqlite::Transaction) -> Result<Vec<Self>, DatabaseError> {
        let mut stmt = tx.prepare(
            "SELECT uuid, original_uuid, relative_path, checksum, puid, signature, warning, \
             convert_access, convert_statutory, processed FROM MasterFiles",
        )?;
        let rows = stmt.query_map([], Self::from_row)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Delete a master file row by uuid.
    pub fn delete(tx: &rusqlite::Transaction, uuid: &str) -> Result<(), DatabaseError> {
        tx.prepare("DELETE FROM MasterFiles WHERE uuid = ?1")?
            .execute(params![uuid])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open(":memory:").unwrap()
    }

    #[test]
    fn original_file_roundtrips_through_insert_and_select() {
        let mut db = setup();
        let tx = db.transaction().unwrap();
        OriginalFile::insert(&tx, "u1", "a/b.txt", "/archive/a/b.txt", 42, None).unwrap();
        tx.commit().unwrap();

        let tx = db.transaction().unwrap();
        let row = OriginalFile::by_uuid(&tx, "u1").unwrap().unwrap();
        assert_eq!(row.relative_path, "a/b.txt");
        assert_eq!(row.size, 42);
        assert!(!row.processed);
        assert!(!row.locked);
    }

    #[test]
    fn update_identification_rearms_processed_flag() {
        let mut db = setup();
        let tx = db.transaction().unwrap();
        OriginalFile::insert(&tx, "u1", "a.txt", "/archive/a.txt", 10, None).unwrap();
        OriginalFile::update_identification(
            &tx,
            "u1",
            "deadbeef",
            10,
            Some("fmt/1"),
            Some("Plain Text"),
            None,
            Some("ignore"),
            None,
            false,
        )
        .unwrap();
        let row = OriginalFile::by_uuid(&tx, "u1").unwrap().unwrap();
        assert_eq!(row.checksum.as_deref(), Some("deadbeef"));
        assert_eq!(row.puid.as_deref(), Some("fmt/1"));
        assert!(!row.processed);
    }

    #[test]
    fn converted_file_roundtrips_across_access_and_statutory_tables() {
        let mut db = setup();
        let tx = db.transaction().unwrap();
        OriginalFile::insert(&tx, "orig", "a.txt", "/archive/a.txt", 1, None).unwrap();

        for kind in [ConvertedKind::Access, ConvertedKind::Statutory] {
            ConvertedFile::insert(&tx, kind, "conv", "orig", "a.pdf").unwrap();
            let row = ConvertedFile::by_uuid(&tx, kind, "conv").unwrap().unwrap();
            assert_eq!(row.original_uuid, "orig");
            assert_eq!(ConvertedFile::all(&tx, kind).unwrap().len(), 1);
            assert_eq!(
                ConvertedFile::by_relative_path(&tx, kind, "a.pdf").unwrap().unwrap().uuid,
                "conv"
            );
            ConvertedFile::delete(&tx, kind, "conv").unwrap();
            assert!(ConvertedFile::by_uuid(&tx, kind, "conv").unwrap().is_none());
        }
    }

    #[test]
    fn master_file_roundtrips_and_rearms_processed() {
        let mut db = setup();
        let tx = db.transaction().unwrap();
        OriginalFile::insert(&tx, "orig", "a.txt", "/archive/a.txt", 1, None).unwrap();
        MasterFile::insert(&tx, "mast", "orig", "a.tif").unwrap();

        MasterFile::update_identification(
            &tx,
            "mast",
            "deadbeef",
            Some("fmt/353"),
            Some("TIFF"),
            None,
            Some("imagemagick"),
            None,
            false,
        )
        .unwrap();

        let row = MasterFile::by_uuid(&tx, "mast").unwrap().unwrap();
        assert_eq!(row.original_uuid, "orig");
        assert_eq!(row.checksum.as_deref(), Some("deadbeef"));
        assert_eq!(row.convert_access.as_deref(), Some("imagemagick"));
        assert!(!row.processed);
        assert_eq!(MasterFile::all(&tx).unwrap().len(), 1);
        assert_eq!(MasterFile::by_relative_path(&tx, "a.tif").unwrap().unwrap().uuid, "mast");

        MasterFile::update_relative_path(&tx, "mast", "b.tif").unwrap();
        assert!(MasterFile::by_relative_path(&tx, "a.tif").unwrap().is_none());

        MasterFile::delete(&tx, "mast").unwrap();
        assert!(MasterFile::by_uuid(&tx, "mast").unwrap().is_none());
    }
}
