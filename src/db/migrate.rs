use rusqlite::Connection;

use crate::{error::DatabaseError, logger::info};

/// Step the schema forward from version `v` to `v + 1`.
///
/// There is currently only one schema version, so this path is unreachable in practice; it
/// exists so that future schema changes have somewhere to land without disturbing
/// [`super::Database::open`].
pub fn migrate(_conn: &mut Connection, v: i32) -> Result<(), DatabaseError> {
    info!("Migrating database from v{v} to v{}", v + 1);
    Err(DatabaseError::Migration(
        v,
        "no migration path is defined for this schema version".into(),
    ))
}
