//! The `identify` subcommand: discover or select a class of archive files and run the
//! identification engine over them.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::{
    app::cli::IdentifyTarget,
    catalogue::{
        action::{ActionCatalogue, MasterActionCatalogue},
        signature::SignatureCatalogue,
    },
    config::Config,
    db::{
        row::{ConvertedFile, ConvertedKind, MasterFile, OriginalFile},
        Database, Selector, SelectorKind,
    },
    engine::{self, IdentifyOptions},
    event::Event,
    logger::{info, warn},
    siegfried,
};

const ORIGINAL_DOCUMENTS: &str = "OriginalDocuments";
const MASTER_DOCUMENTS: &str = "MasterDocuments";
const ACCESS_DOCUMENTS: &str = "AccessDocuments";
const STATUTORY_DOCUMENTS: &str = "StatutoryDocuments";

impl IdentifyTarget {
    fn directory(self) -> &'static str {
        match self {
            IdentifyTarget::Original => ORIGINAL_DOCUMENTS,
            IdentifyTarget::Master => MASTER_DOCUMENTS,
            IdentifyTarget::Access => ACCESS_DOCUMENTS,
            IdentifyTarget::Statutory => STATUTORY_DOCUMENTS,
        }
    }

    /// Which of the two structurally-identical converted-file tables this target uses, if
    /// any. `Original` and `Master` each have their own dedicated row type instead.
    fn converted_kind(self) -> Option<ConvertedKind> {
        match self {
            IdentifyTarget::Original | IdentifyTarget::Master => None,
            IdentifyTarget::Access => Some(ConvertedKind::Access),
            IdentifyTarget::Statutory => Some(ConvertedKind::Statutory),
        }
    }
}

fn discover_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    db: &mut Database,
    archive_root: &Path,
    target: IdentifyTarget,
    query: &[String],
    id_type: Option<SelectorKind>,
    id_files: bool,
    config: &Config,
    actions: &ActionCatalogue,
    signatures: &SignatureCatalogue,
    master_actions: &MasterActionCatalogue,
    opts: &IdentifyOptions,
    dry_run: bool,
    ignore_lock: bool,
) -> Result<()> {
    siegfried::preflight(opts.siegfried_binary, opts.signature_file)
        .context("siegfried pre-flight check failed")?;

    let target_root = archive_root.join(target.directory());
    let converted_kind = target.converted_kind();
    let is_master = target == IdentifyTarget::Master;

    // (path, pre-existing uuid if the row is already known)
    let mut known: HashMap<PathBuf, String> = HashMap::new();

    let paths: Vec<PathBuf> = if !query.is_empty() {
        let kind = id_type.unwrap_or(SelectorKind::RelativePath);
        let selector = Selector::new(kind, query, id_files)?;
        let tx = db.transaction()?;
        let resolved: Vec<PathBuf> = if is_master {
            MasterFile::all(&tx)?
                .into_iter()
                .filter(|row| selector.tokens.iter().any(|t| t == &row.uuid || t == &row.relative_path))
                .map(|row| {
                    let path = target_root.join(&row.relative_path);
                    known.insert(path.clone(), row.uuid);
                    path
                })
                .collect()
        } else {
            match converted_kind {
                None => OriginalFile::by_selector(&tx, &selector)?
                    .into_iter()
                    .filter(|row| ignore_lock || !row.locked)
                    .map(|row| {
                        let path = archive_root.join(&row.relative_path);
                        known.insert(path.clone(), row.uuid);
                        path
                    })
                    .collect(),
                Some(kind) => ConvertedFile::all(&tx, kind)?
                    .into_iter()
                    .filter(|row| selector.tokens.iter().any(|t| t == &row.uuid || t == &row.relative_path))
                    .map(|row| {
                        let path = target_root.join(&row.relative_path);
                        known.insert(path.clone(), row.uuid);
                        path
                    })
                    .collect(),
            }
        };
        tx.commit()?;
        resolved
    } else if is_master {
        let tx = db.transaction()?;
        let resolved = MasterFile::all(&tx)?
            .into_iter()
            .map(|row| {
                let path = target_root.join(&row.relative_path);
                known.insert(path.clone(), row.uuid);
                path
            })
            .collect();
        tx.commit()?;
        resolved
    } else {
        match converted_kind {
            None => {
                let tx = db.transaction()?;
                let existing: HashMap<String, OriginalFile> = OriginalFile::all(&tx)?
                    .into_iter()
                    .map(|row| (row.relative_path.clone(), row))
                    .collect();
                tx.commit()?;
                discover_files(&target_root)
                    .into_iter()
                    .filter(|path| {
                        let relative_path = path
                            .strip_prefix(archive_root)
                            .unwrap_or(path)
                            .to_string_lossy()
                            .into_owned();
                        match existing.get(&relative_path) {
                            Some(row) if ignore_lock || !row.locked => {
                                known.insert(path.clone(), row.uuid.clone());
                                true
                            }
                            Some(_) => false,
                            None => true,
                        }
                    })
                    .collect()
            }
            Some(kind) => {
                let tx = db.transaction()?;
                let resolved = ConvertedFile::all(&tx, kind)?
                    .into_iter()
                    .map(|row| {
                        let path = target_root.join(&row.relative_path);
                        known.insert(path.clone(), row.uuid);
                        path
                    })
                    .collect();
                tx.commit()?;
                resolved
            }
        }
    };

    info!("Identifying {} files under '{}'", paths.len(), target_root.display());

    for batch in paths.chunks(config.batch_size) {
        let results = engine::identify_batch(batch, signatures, actions, opts)
            .context("identification batch failed")?;

        if dry_run {
            for result in &results {
                info!(
                    "[dry-run] '{}' -> puid={:?} action={:?}",
                    result.path.display(),
                    result.puid,
                    result.action.as_ref().map(|a| a.kind())
                );
            }
            continue;
        }

        let tx = db.transaction()?;
        for result in results {
            if is_master {
                apply_master(&tx, target_root.as_path(), &result, &known, master_actions)?;
            } else {
                match converted_kind {
                    None => apply_original(&tx, archive_root, &result, &known)?,
                    Some(kind) => apply_converted(&tx, target_root.as_path(), kind, &result, &known)?,
                }
            }
        }
        tx.commit()?;
    }

    Ok(())
}

fn apply_original(
    tx: &rusqlite::Transaction,
    archive_root: &Path,
    result: &engine::FileIdentification,
    known: &HashMap<PathBuf, String>,
) -> Result<()> {
    let original_path = result.renamed.as_ref().map_or(&result.path, |(old, _)| old);
    let relative_path = original_path
        .strip_prefix(archive_root)
        .unwrap_or(original_path)
        .to_string_lossy()
        .into_owned();

    let uuid = match known.get(original_path) {
        Some(uuid) => uuid.clone(),
        None => uuid::Uuid::new_v4().to_string(),
    };

    let existing = OriginalFile::by_uuid(tx, &uuid)?;
    if existing.is_none() {
        OriginalFile::insert(tx, &uuid, &relative_path, &relative_path, result.size as i64, None)?;
    }

    let action_kind = result.action.as_ref().map(|a| a.kind().as_str().to_string());
    let action_data = result.action.as_ref().map(serde_json::to_string).transpose()?;

    // `processed` only clears when the resolved action/action_data actually changed; an
    // unchanged re-identification leaves downstream conversion state alone.
    let processed = match &existing {
        Some(row) => {
            if row.action == action_kind && row.action_data == action_data {
                row.processed
            } else {
                false
            }
        }
        None => false,
    };

    OriginalFile::update_identification(
        tx,
        &uuid,
        &result.checksum,
        result.size as i64,
        result.puid.as_deref(),
        result.signature.as_deref(),
        result.warning.as_deref(),
        action_kind.as_deref(),
        action_data.as_deref(),
        processed,
    )?;

    if let Some((_, new_path)) = &result.renamed {
        let new_relative = new_path
            .strip_prefix(archive_root)
            .unwrap_or(new_path)
            .to_string_lossy()
            .into_owned();
        OriginalFile::update_relative_path(tx, &uuid, &new_relative)?;
        let change = crate::event::RenameChange {
            old_relative_path: relative_path,
            new_relative_path: new_relative,
        };
        Event::log(
            tx,
            "identify:rename",
            Some(&uuid),
            Some(&serde_json::to_string(&change)?),
            None,
        )?;
    }

    if let Some(err) = &result.recoverable_error {
        warn!("Recoverable error identifying '{}': {err}", result.path.display());
        Event::log(tx, "identify:error", Some(&uuid), Some(err), None)?;
    }

    Event::log(tx, "identify:original", Some(&uuid), result.puid.as_deref(), None)?;
    Ok(())
}

fn apply_converted(
    tx: &rusqlite::Transaction,
    target_root: &Path,
    kind: ConvertedKind,
    result: &engine::FileIdentification,
    known: &HashMap<PathBuf, String>,
) -> Result<()> {
    let Some(uuid) = known.get(&result.path) else {
        warn!(
            "Skipping '{}': no matching row in {:?} table",
            result.path.display(),
            kind
        );
        return Ok(());
    };

    ConvertedFile::update_identification(
        tx,
        kind,
        uuid,
        &result.checksum,
        result.puid.as_deref(),
        result.signature.as_deref(),
        result.warning.as_deref(),
    )?;

    if let Some((_, new_path)) = &result.renamed {
        let new_relative = new_path
            .strip_prefix(target_root)
            .unwrap_or(new_path)
            .to_string_lossy()
            .into_owned();
        ConvertedFile::update_relative_path(tx, kind, uuid, &new_relative)?;
    }

    Event::log(tx, "identify:converted", Some(uuid), result.puid.as_deref(), None)?;
    Ok(())
}

fn apply_master(
    tx: &rusqlite::Transaction,
    target_root: &Path,
    result: &engine::FileIdentification,
    known: &HashMap<PathBuf, String>,
    master_actions: &MasterActionCatalogue,
) -> Result<()> {
    let Some(uuid) = known.get(&result.path) else {
        warn!("Skipping '{}': no matching row in MasterFiles table", result.path.display());
        return Ok(());
    };

    let existing = MasterFile::by_uuid(tx, uuid)?;

    let resolved = result.puid.as_deref().and_then(|p| master_actions.get(p));
    let convert_access = resolved.and_then(|a| a.access.as_deref());
    let convert_statutory = resolved.and_then(|a| a.statutory.as_deref());

    // `processed` only clears when the resolved convert-action actually changed; an unchanged
    // re-identification leaves the pending-conversion state alone.
    let processed = match &existing {
        Some(row) => {
            if row.convert_access.as_deref() == convert_access
                && row.convert_statutory.as_deref() == convert_statutory
            {
                row.processed
            } else {
                false
            }
        }
        None => false,
    };

    MasterFile::update_identification(
        tx,
        uuid,
        &result.checksum,
        result.puid.as_deref(),
        result.signature.as_deref(),
        result.warning.as_deref(),
        convert_access,
        convert_statutory,
        processed,
    )?;

    if let Some((_, new_path)) = &result.renamed {
        let new_relative = new_path
            .strip_prefix(target_root)
            .unwrap_or(new_path)
            .to_string_lossy()
            .into_owned();
        MasterFile::update_relative_path(tx, uuid, &new_relative)?;
    }

    Event::log(tx, "identify:master", Some(uuid), result.puid.as_deref(), None)?;
    Ok(())
}
