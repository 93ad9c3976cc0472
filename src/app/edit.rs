//! The `edit` subcommand family: mutate selected rows, logging an inverse-capable event for
//! every change.
use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    app::cli::EditCommand,
    db::{row::OriginalFile, Database, Selector},
    event::{ActionChange, Event, RemovedFile, RenameChange},
    logger::{info, warn},
    rename,
};

pub fn run(db: &mut Database, archive_root: &Path, command: EditCommand) -> Result<()> {
    match command {
        EditCommand::Action {
            ids,
            action,
            reason,
            id_type,
            id_files,
            data,
            data_json,
            dry_run,
        } => {
            let action_data = match data_json {
                Some(json) => {
                    serde_json::from_str::<serde_json::Value>(&json)
                        .context("--data-json is not valid JSON")?;
                    Some(json)
                }
                None => data,
            };
            run_action(db, &ids, id_type, id_files, action.as_str(), action_data.as_deref(), &reason, dry_run)
        }
        EditCommand::Rename { ref ids, ref extension, ref reason, id_type, id_files, dry_run, .. } => {
            let mode = command.rename_mode();
            run_rename(db, archive_root, ids, id_type, id_files, extension, mode, reason, dry_run)
        }
        EditCommand::Remove { ids, reason, id_type, id_files, dry_run } => {
            run_remove(db, &ids, id_type, id_files, &reason, dry_run)
        }
        EditCommand::Rollback { from, to, reason } => run_rollback(db, archive_root, from, to, &reason),
    }
}

fn run_action(
    db: &mut Database,
    ids: &[String],
    id_type: crate::db::SelectorKind,
    id_files: bool,
    action: &str,
    action_data: Option<&str>,
    reason: &str,
    dry_run: bool,
) -> Result<()> {
    let selector = Selector::new(id_type, ids, id_files)?;
    let tx = db.transaction()?;
    let rows = OriginalFile::by_selector(&tx, &selector)?;
    if rows.is_empty() {
        warn!("No rows matched selector");
    }
    for row in &rows {
        if dry_run {
            info!("[dry-run] '{}': action {:?} -> {action}", row.relative_path, row.action);
            continue;
        }
        let change = ActionChange {
            previous_action: row.action.clone(),
            previous_action_data: row.action_data.clone(),
        };
        OriginalFile::update_action(&tx, &row.uuid, action, action_data)?;
        Event::log(
            &tx,
            "edit:action",
            Some(&row.uuid),
            Some(&serde_json::to_string(&change)?),
            Some(reason),
        )?;
    }
    tx.commit()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_rename(
    db: &mut Database,
    archive_root: &Path,
    ids: &[String],
    id_type: crate::db::SelectorKind,
    id_files: bool,
    extension: &str,
    mode: rename::RenameMode,
    reason: &str,
    dry_run: bool,
) -> Result<()> {
    let selector = Selector::new(id_type, ids, id_files)?;
    let tx = db.transaction()?;
    let rows = OriginalFile::by_selector(&tx, &selector)?;
    if rows.is_empty() {
        warn!("No rows matched selector");
    }
    for row in &rows {
        let old_path = archive_root.join(&row.relative_path);
        let Some(new_path) = rename::compute_new_path(&old_path, extension, mode) else {
            continue;
        };
        let new_relative = new_path
            .strip_prefix(archive_root)
            .unwrap_or(&new_path)
            .to_string_lossy()
            .into_owned();

        if dry_run {
            info!("[dry-run] '{}' -> '{}'", row.relative_path, new_relative);
            continue;
        }

        rename::rename(&old_path, &new_path)
            .with_context(|| format!("failed to rename '{}'", old_path.display()))?;
        OriginalFile::update_relative_path(&tx, &row.uuid, &new_relative)?;

        let change = RenameChange {
            old_relative_path: row.relative_path.clone(),
            new_relative_path: new_relative,
        };
        Event::log(
            &tx,
            "edit:rename",
            Some(&row.uuid),
            Some(&serde_json::to_string(&change)?),
            Some(reason),
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn run_remove(
    db: &mut Database,
    ids: &[String],
    id_type: crate::db::SelectorKind,
    id_files: bool,
    reason: &str,
    dry_run: bool,
) -> Result<()> {
    let selector = Selector::new(id_type, ids, id_files)?;
    let tx = db.transaction()?;
    let rows = OriginalFile::by_selector(&tx, &selector)?;
    if rows.is_empty() {
        warn!("No rows matched selector");
    }
    for row in &rows {
        if dry_run {
            info!("[dry-run] removing '{}'", row.relative_path);
            continue;
        }
        let removed = RemovedFile {
            relative_path: row.relative_path.clone(),
            original_path: row.original_path.clone(),
            checksum: row.checksum.clone(),
            size: row.size,
            puid: row.puid.clone(),
            signature: row.signature.clone(),
            warning: row.warning.clone(),
            action: row.action.clone(),
            action_data: row.action_data.clone(),
            processed: row.processed,
            locked: row.locked,
            parent: row.parent.clone(),
        };
        OriginalFile::delete(&tx, &row.uuid)?;
        Event::log(
            &tx,
            "edit:remove",
            Some(&row.uuid),
            Some(&serde_json::to_string(&removed)?),
            Some(reason),
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn run_rollback(
    db: &mut Database,
    archive_root: &Path,
    from: chrono::DateTime<chrono::Local>,
    to: chrono::DateTime<chrono::Local>,
    reason: &str,
) -> Result<()> {
    let tx = db.transaction()?;
    let applied = crate::event::rollback_range(&tx, from, to, archive_root)?;
    Event::log(&tx, "edit:rollback", None, None, Some(reason))?;
    tx.commit()?;
    info!("Rolled back {applied} event(s)");
    Ok(())
}
