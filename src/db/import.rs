//! Import of a legacy (schema `3.3.3`) archive database.
//!
//! The legacy database recomputed little beyond what was already on disk: its `Files` table
//! carried identification state (`puid`, `signature`, `warning`, `action`, `action_data`) plus
//! the names of any master copies already produced (`processed_names`, a JSON array of file
//! names alongside the original). Checksums and sizes are not trusted from the legacy row; they
//! are recomputed from the files as they currently sit on disk, matching what a fresh
//! identification pass would produce.
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection as SqliteConnection};

use super::row::{MasterFile, OriginalFile};
use crate::{checksum::checksum_file, error::DatabaseError};

/// The schema version this importer understands. `init --import` refuses any other value.
pub const SUPPORTED_VERSION: &str = "3.3.3";

/// Open the legacy database and confirm it declares `SUPPORTED_VERSION`.
pub fn check_legacy_version(path: &Path) -> Result<(), DatabaseError> {
    let conn = SqliteConnection::open(path)?;
    let mut table_check = conn.prepare(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND lower(name) IN ('files', 'metadata')",
    )?;
    let table_count: i64 = table_check.query_row([], |row| row.get(0))?;
    if table_count != 2 {
        return Err(DatabaseError::InvalidDatabase);
    }

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM Metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .ok();

    match version {
        Some(v) if v == SUPPORTED_VERSION => Ok(()),
        _ => Err(DatabaseError::InvalidDatabase),
    }
}

/// The outcome of importing a legacy database's `Files` table.
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// `(uuid, relative_path)` of every imported original file.
    pub original_files: Vec<(String, String)>,
    /// `(uuid, relative_path)` of every imported master file.
    pub master_files: Vec<(String, String)>,
    /// File names referenced by a legacy row's `processed_names` that were not found on disk,
    /// paired with the uuid of the original file that was supposed to own them.
    pub missing_master_files: Vec<(String, String)>,
}

/// A single row of the legacy `Files` table.
struct LegacyFileRow {
    uuid: String,
    parent: Option<String>,
    processed: bool,
    locked: bool,
    puid: Option<String>,
    signature: Option<String>,
    warning: Option<String>,
    action: Option<String>,
    action_data: Option<String>,
    original_path: String,
    relative_path: String,
    processed_names: Option<String>,
}

/// Import every row of the legacy `Files` table into the current schema, reading file content
/// from `original_documents_root`/`relative_path` and `master_documents_root`/`relative_path`'s
/// sibling names to recompute checksums.
pub fn import_original_files(
    tx: &rusqlite::Transaction,
    legacy_db_path: &Path,
    original_documents_root: &Path,
    master_documents_root: &Path,
) -> Result<ImportSummary, DatabaseError> {
    let legacy = SqliteConnection::open(legacy_db_path)?;
    let mut stmt = legacy.prepare(
        "SELECT uuid, parent, processed, lock, puid, signature, warning, action, action_data, \
         original_path, relative_path, processed_names FROM Files",
    )?;
    let rows: Vec<LegacyFileRow> = stmt
        .query_map([], |row| {
            Ok(LegacyFileRow {
                uuid: row.get("uuid")?,
                parent: row.get("parent")?,
                processed: row.get::<_, i64>("processed")? != 0,
                locked: row.get::<_, i64>("lock")? != 0,
                puid: row.get("puid")?,
                signature: row.get("signature")?,
                warning: row.get("warning")?,
                action: row.get("action")?,
                action_data: row.get("action_data")?,
                original_path: row.get("original_path")?,
                relative_path: row.get("relative_path")?,
                processed_names: row.get("processed_names")?,
            })
        })?
        .collect::<Result<_, _>>()?;
    drop(stmt);
    drop(legacy);

    let mut summary = ImportSummary::default();

    for row in rows {
        let full_path = original_documents_root.join(&row.relative_path);
        let checksum = checksum_file(&full_path)
            .map_err(|_| DatabaseError::RowMissing(row.relative_path.clone()))?;
        let size = full_path
            .metadata()
            .map_err(|_| DatabaseError::RowMissing(row.relative_path.clone()))?
            .len();

        OriginalFile::insert(
            tx,
            &row.uuid,
            &row.relative_path,
            &row.original_path,
            size as i64,
            row.parent.as_deref(),
        )?;
        OriginalFile::update_identification(
            tx,
            &row.uuid,
            &checksum,
            size as i64,
            row.puid.as_deref(),
            row.signature.as_deref(),
            row.warning.as_deref(),
            row.action.as_deref(),
            row.action_data.as_deref(),
            false,
        )?;
        if row.processed {
            tx.execute(
                "UPDATE OriginalFiles SET processed = 1, locked = ?2 WHERE uuid = ?1",
                params![row.uuid, row.locked],
            )?;
        } else if row.locked {
            tx.execute(
                "UPDATE OriginalFiles SET locked = 1 WHERE uuid = ?1",
                params![row.uuid],
            )?;
        }
        summary
            .original_files
            .push((row.uuid.clone(), row.relative_path.clone()));

        let master_names: Vec<String> = row
            .processed_names
            .as_deref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default();

        let sibling_dir = master_documents_root.join(&row.relative_path).parent().map(Path::to_path_buf);

        for name in master_names {
            let candidate: PathBuf = match &sibling_dir {
                Some(dir) => dir.join(&name),
                None => master_documents_root.join(&name),
            };
            if !candidate.is_file() {
                summary
                    .missing_master_files
                    .push((row.uuid.clone(), name));
                continue;
            }

            let master_uuid = uuid::Uuid::new_v4().to_string();
            let master_relative = candidate
                .strip_prefix(master_documents_root)
                .unwrap_or(&candidate)
                .to_string_lossy()
                .into_owned();
            MasterFile::insert(tx, &master_uuid, &row.uuid, &master_relative)?;
            if let Ok(master_checksum) = checksum_file(&candidate) {
                MasterFile::update_identification(
                    tx,
                    &master_uuid,
                    &master_checksum,
                    None,
                    None,
                    None,
                    None,
                    None,
                    false,
                )?;
            }
            summary.master_files.push((master_uuid, master_relative));
        }
    }

    Ok(summary)
}
