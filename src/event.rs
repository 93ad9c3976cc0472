//! Append-only event log and the rollback registry that interprets it.
//!
//! Every mutating command appends events through [`Event::log`] rather than writing to
//! `Events` directly, so the `time`/`operation` shape stays consistent. `edit rollback` walks
//! the log in `(from, to]`, descending by time, and dispatches each event to the handler
//! registered for its `operation` in [`RollbackRegistry`].
use chrono::{DateTime, Local};
use rusqlite::{params, OptionalExtension};

use crate::{
    db::row::OriginalFile,
    error::DatabaseError,
    logger::{error, info},
};

/// A row of the `Events` table.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub time: DateTime<Local>,
    /// A dotted-colon string, e.g. `"edit:action"` or `"identify:original"`.
    pub operation: String,
    pub uuid: Option<String>,
    /// JSON-encoded payload, shape depends on `operation`.
    pub data: Option<String>,
    pub reason: Option<String>,
}

impl Event {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Event {
            id: row.get("id")?,
            time: row.get("time")?,
            operation: row.get("operation")?,
            uuid: row.get("uuid")?,
            data: row.get("data")?,
            reason: row.get("reason")?,
        })
    }

    /// Append an event, stamping `time` at the point of the call.
    pub fn log(
        tx: &rusqlite::Transaction,
        operation: &str,
        uuid: Option<&str>,
        data: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Self, DatabaseError> {
        let time = Local::now();
        tx.prepare_cached(crate::db::sql::insert_event())?
            .execute(params![time, operation, uuid, data, reason])?;
        let id = tx.last_insert_rowid();
        Ok(Event {
            id,
            time,
            operation: operation.to_string(),
            uuid: uuid.map(str::to_string),
            data: data.map(str::to_string),
            reason: reason.map(str::to_string),
        })
    }

    /// Select events with `time` in the inclusive range `[from, to]`, most recent first.
    pub fn in_range(
        tx: &rusqlite::Transaction,
        from: DateTime<Local>,
        to: DateTime<Local>,
    ) -> Result<Vec<Self>, DatabaseError> {
        let mut stmt = tx.prepare_cached(crate::db::sql::select_events_in_range())?;
        let rows = stmt
            .query_map(params![from, to], Self::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Select events in `[from, to]`, optionally filtered by an operation `LIKE` pattern or a
    /// uuid, in either time order.
    pub fn filtered(
        tx: &rusqlite::Transaction,
        from: DateTime<Local>,
        to: DateTime<Local>,
        operation_like: Option<&str>,
        uuid: Option<&str>,
        ascending: bool,
    ) -> Result<Vec<Self>, DatabaseError> {
        let mut stmt = tx.prepare_cached(crate::db::sql::select_events_filtered())?;
        let rows = stmt
            .query_map(
                params![from, to, operation_like, uuid, ascending],
                Self::from_row,
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }
}

/// Apply the rollback handler registered for `event.operation`.
///
/// `original_documents_root` is only consulted by the `edit:rename` handler, to resolve the
/// relative paths recorded in its event data to real filesystem paths.
///
/// Events with no registered handler (informational events such as `*:start`/`*:end`) are
/// skipped without error; encountering one simply means there is nothing to compensate.
pub fn rollback_event(
    tx: &rusqlite::Transaction,
    event: &Event,
    original_documents_root: &std::path::Path,
) -> Result<(), DatabaseError> {
    match event.operation.as_str() {
        "edit:action" => rollback_action(tx, event),
        "edit:remove" => rollback_remove(tx, event),
        "edit:rename" => rollback_rename(tx, event, original_documents_root),
        _ => {
            info!("No rollback handler for operation '{}', skipping", event.operation);
            Ok(())
        }
    }
}

/// Payload recorded by `edit action`: the previous action directive, so a rollback can restore
/// it verbatim.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ActionChange {
    pub previous_action: Option<String>,
    pub previous_action_data: Option<String>,
}

fn rollback_action(tx: &rusqlite::Transaction, event: &Event) -> Result<(), DatabaseError> {
    let uuid = event
        .uuid
        .as_deref()
        .ok_or_else(|| DatabaseError::Migration(0, "edit:action event missing uuid".into()))?;
    let change: ActionChange = event
        .data
        .as_deref()
        .and_then(|d| serde_json::from_str(d).ok())
        .ok_or_else(|| DatabaseError::Migration(0, "edit:action event missing data".into()))?;

    match change.previous_action {
        Some(action) => {
            OriginalFile::update_action(tx, uuid, &action, change.previous_action_data.as_deref())?;
        }
        None => {
            tx.execute(
                "UPDATE OriginalFiles SET action = NULL, action_data = NULL, processed = 0 WHERE uuid = ?1",
                params![uuid],
            )?;
        }
    }

    let restored = serde_json::to_string(&change).unwrap_or_default();
    Event::log(
        tx,
        "edit:action",
        Some(uuid),
        Some(&restored),
        Some("rollback"),
    )?;
    Ok(())
}

/// Payload recorded by `edit remove`: the full row, so rollback can reinsert it.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RemovedFile {
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

fn rollback_remove(tx: &rusqlite::Transaction, event: &Event) -> Result<(), DatabaseError> {
    let uuid = event
        .uuid
        .as_deref()
        .ok_or_else(|| DatabaseError::Migration(0, "edit:remove event missing uuid".into()))?;
    let removed: RemovedFile = event
        .data
        .as_deref()
        .and_then(|d| serde_json::from_str(d).ok())
        .ok_or_else(|| DatabaseError::Migration(0, "edit:remove event missing data".into()))?;

    if OriginalFile::by_uuid(tx, uuid)?.is_some() {
        return Err(DatabaseError::RelativePathExists(removed.relative_path));
    }

    OriginalFile::insert(
        tx,
        uuid,
        &removed.relative_path,
        &removed.original_path,
        removed.size,
        removed.parent.as_deref(),
    )?;
    OriginalFile::update_identification(
        tx,
        uuid,
        removed.checksum.as_deref().unwrap_or_default(),
        removed.size,
        removed.puid.as_deref(),
        removed.signature.as_deref(),
        removed.warning.as_deref(),
        removed.action.as_deref(),
        removed.action_data.as_deref(),
        removed.processed,
    )?;

    Event::log(tx, "edit:remove", Some(uuid), event.data.as_deref(), Some("rollback"))?;
    Ok(())
}

/// Payload recorded by `edit rename`: old and new relative paths.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RenameChange {
    pub old_relative_path: String,
    pub new_relative_path: String,
}

fn rollback_rename(
    tx: &rusqlite::Transaction,
    event: &Event,
    original_documents_root: &std::path::Path,
) -> Result<(), DatabaseError> {
    let uuid = event
        .uuid
        .as_deref()
        .ok_or_else(|| DatabaseError::Migration(0, "edit:rename event missing uuid".into()))?;
    let change: RenameChange = event
        .data
        .as_deref()
        .and_then(|d| serde_json::from_str(d).ok())
        .ok_or_else(|| DatabaseError::Migration(0, "edit:rename event missing data".into()))?;

    OriginalFile::by_uuid(tx, uuid)?.ok_or_else(|| DatabaseError::RowMissing(uuid.to_string()))?;

    let current = original_documents_root.join(&change.new_relative_path);
    let former = original_documents_root.join(&change.old_relative_path);
    crate::rename::revert(&current, &former)
        .map_err(|source| DatabaseError::SQLiteError(rusqlite::Error::ModuleError(source.to_string())))?;

    OriginalFile::update_relative_path(tx, uuid, &change.old_relative_path)?;

    let restored = serde_json::to_string(&RenameChange {
        old_relative_path: change.new_relative_path,
        new_relative_path: change.old_relative_path,
    })
    .unwrap_or_default();
    Event::log(tx, "edit:rename", Some(uuid), Some(&restored), Some("rollback"))?;
    Ok(())
}

/// Run `edit rollback`: invoke the handler for every event in `(from, to]`, descending by time.
pub fn rollback_range(
    tx: &rusqlite::Transaction,
    from: DateTime<Local>,
    to: DateTime<Local>,
    original_documents_root: &std::path::Path,
) -> Result<usize, DatabaseError> {
    let events = Event::in_range(tx, from, to)?;
    let mut applied = 0;
    for event in events.iter().filter(|e| e.time > from) {
        match rollback_event(tx, event, original_documents_root) {
            Ok(()) => applied += 1,
            Err(err) => {
                error!("Failed to roll back event {}: {err}", event.id);
                return Err(err);
            }
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn action_rollback_restores_previous_action() {
        let mut db = Database::open(":memory:").unwrap();
        let tx = db.transaction().unwrap();
        OriginalFile::insert(&tx, "u1", "a.txt", "/a/a.txt", 1, None).unwrap();
        OriginalFile::update_action(&tx, "u1", "manual", None).unwrap();

        let change = ActionChange {
            previous_action: None,
            previous_action_data: None,
        };
        let event = Event::log(
            &tx,
            "edit:action",
            Some("u1"),
            Some(&serde_json::to_string(&change).unwrap()),
            Some("test"),
        )
        .unwrap();

        OriginalFile::update_action(&tx, "u1", "ignore", None).unwrap();
        rollback_event(&tx, &event, std::path::Path::new("/archive")).unwrap();

        let row = OriginalFile::by_uuid(&tx, "u1").unwrap().unwrap();
        assert_eq!(row.action, None);
    }

    #[test]
    fn remove_rollback_reinserts_row() {
        let mut db = Database::open(":memory:").unwrap();
        let tx = db.transaction().unwrap();
        let removed = RemovedFile {
            relative_path: "a.txt".into(),
            original_path: "/a/a.txt".into(),
            checksum: Some("abc".into()),
            size: 3,
            puid: None,
            signature: None,
            warning: None,
            action: None,
            action_data: None,
            processed: false,
            locked: false,
            parent: None,
        };
        let event = Event::log(
            &tx,
            "edit:remove",
            Some("u1"),
            Some(&serde_json::to_string(&removed).unwrap()),
            Some("test"),
        )
        .unwrap();

        rollback_event(&tx, &event, std::path::Path::new("/archive")).unwrap();
        let row = OriginalFile::by_uuid(&tx, "u1").unwrap().unwrap();
        assert_eq!(row.relative_path, "a.txt");
    }

    #[test]
    fn unregistered_operation_is_skipped() {
        let mut db = Database::open(":memory:").unwrap();
        let tx = db.transaction().unwrap();
        let event = Event::log(&tx, "identify:start", None, None, None).unwrap();
        rollback_event(&tx, &event, std::path::Path::new("/archive")).unwrap();
    }
}
