//! The `init` subcommand: create the archive's metadata database, renaming a legacy
//! `Documents/` directory into place and optionally importing a legacy (schema `3.3.3`)
//! database.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
    db::{import, Database},
    logger::info,
};

const ORIGINAL_DOCUMENTS: &str = "OriginalDocuments";
const LEGACY_DOCUMENTS: &str = "Documents";
const MASTER_DOCUMENTS: &str = "MasterDocuments";
const METADATA_DIR: &str = "_metadata";
const DATABASE_FILE: &str = "avid.db";

/// The database path implied by an archive root, absent an explicit `--database` override.
pub fn default_database_path(archive_root: &Path) -> PathBuf {
    archive_root.join(METADATA_DIR).join(DATABASE_FILE)
}

pub fn run(archive_root: &Path, database: &Path, import_path: Option<&Path>) -> Result<()> {
    let original_documents = archive_root.join(ORIGINAL_DOCUMENTS);
    if !original_documents.is_dir() {
        let legacy = archive_root.join(LEGACY_DOCUMENTS);
        if legacy.is_dir() {
            info!(
                "Renaming legacy '{}' to '{}'",
                legacy.display(),
                original_documents.display()
            );
            fs::rename(&legacy, &original_documents)
                .with_context(|| format!("failed to rename '{}'", legacy.display()))?;
        }
    }

    if let Some(parent) = database.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }

    match run_fallible(database, import_path, archive_root) {
        Ok(()) => Ok(()),
        Err(err) => {
            if database.exists() {
                let _ = fs::remove_file(database);
            }
            Err(err)
        }
    }
}

fn run_fallible(database: &Path, import_path: Option<&Path>, archive_root: &Path) -> Result<()> {
    let mut db = Database::open(database).context("failed to create database")?;

    if let Some(legacy_db) = import_path {
        info!("Importing legacy database '{}'", legacy_db.display());
        import::check_legacy_version(legacy_db).context("legacy database is not supported")?;

        let master_documents = archive_root.join(MASTER_DOCUMENTS);
        let tx = db.transaction()?;
        let summary = import::import_original_files(
            &tx,
            legacy_db,
            archive_root.join(ORIGINAL_DOCUMENTS).as_path(),
            &master_documents,
        )?;
        for (uuid, relative_path) in &summary.original_files {
            crate::event::Event::log(
                &tx,
                "init:import",
                Some(uuid),
                None,
                Some(relative_path),
            )?;
        }
        for (uuid, name) in &summary.missing_master_files {
            crate::logger::warn!("Master file '{name}' referenced by '{uuid}' is missing on disk");
        }
        info!(
            "Imported {} original files, {} master files ({} missing)",
            summary.original_files.len(),
            summary.master_files.len(),
            summary.missing_master_files.len()
        );
        tx.commit()?;
    }

    let tx = db.transaction()?;
    crate::event::Event::log(&tx, "init:initialized", None, None, None)?;
    tx.commit()?;

    info!("Initialized database at '{}'", database.display());
    Ok(())
}
