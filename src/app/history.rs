//! The `history` subcommand: print the event log, optionally filtered.
use anyhow::Result;
use chrono::{DateTime, Local};

use crate::{db::Database, event::Event, logger::info, output::owriteln};

#[allow(clippy::too_many_arguments)]
pub fn run(
    db: &mut Database,
    from: Option<DateTime<Local>>,
    to: Option<DateTime<Local>>,
    operation: Option<&str>,
    uuid: Option<&str>,
    ascending: bool,
) -> Result<()> {
    let from = from.unwrap_or_else(|| DateTime::<Local>::MIN_UTC.into());
    let to = to.unwrap_or_else(Local::now);

    let tx = db.transaction()?;
    let events = Event::filtered(&tx, from, to, operation, uuid, ascending)?;
    tx.commit()?;

    info!("{} event(s)", events.len());
    for event in events {
        owriteln!(
            "{}\t{}\t{}\t{}",
            event.time.to_rfc3339(),
            event.operation,
            event.uuid.as_deref().unwrap_or("-"),
            event.reason.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}
