pub mod cli;
mod edit;
mod history;
mod identify;
mod init;

use std::fs::create_dir_all;

use anyhow::{Context, Result};
use clap_complete::aot::generate;

use crate::{
    catalogue::{
        action::{load_actions, load_master_actions},
        signature::load_custom_signatures,
    },
    config,
    db::Database,
    engine::IdentifyOptions,
    event::Event,
    logger::info,
};

pub use self::cli::{Cli, Command};

/// Log a `<command>:start` event, run `body`, then log a `<command>:end` event carrying the
/// error's rendering (if any), committing each independently of `body`'s own transactions.
///
/// Mirrors the start/end command framing the database-driven commands need to bracket their
/// own work; a process panic mid-command simply leaves the `end` event unwritten, which is
/// harmless since nothing it would have committed was left half-applied either.
fn run_framed(db: &mut Database, command: &str, body: impl FnOnce(&mut Database) -> Result<()>) -> Result<()> {
    let tx = db.transaction()?;
    Event::log(&tx, &format!("{command}:start"), None, None, None)?;
    tx.commit()?;

    let result = body(db);

    let tx = db.transaction()?;
    let data = result.as_ref().err().map(|err| format!("{err:#}"));
    Event::log(&tx, &format!("{command}:end"), None, data.as_deref(), None)?;
    tx.commit()?;

    result
}

/// Run the CLI.
pub fn run(cli: Cli) -> Result<()> {
    info!("digiarch version: {}", env!("CARGO_PKG_VERSION"));
    info!("SQLite version: {}", rusqlite::version());

    if let Command::Completions { shell } = cli.command {
        let mut command = <Cli as clap::CommandFactory>::command();
        let name = command.get_name().to_string();
        generate(shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let archive_root = &cli.archive_root;
    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| init::default_database_path(archive_root));

    let (config_path, missing_ok) = cli
        .config
        .clone()
        .map_or_else(|| (archive_root.join("_metadata").join("config.toml"), true), |path| (path, false));

    if let Command::Init { import } = &cli.command {
        return init::run(archive_root, &database_path, import.as_deref());
    }

    if let Some(parent) = database_path.parent() {
        create_dir_all(parent)?;
    }
    let mut db = Database::open(&database_path).context("failed to open database")?;

    match cli.command {
        Command::Init { .. } | Command::Completions { .. } => unreachable!("handled above"),
        Command::Identify { target, query, id_type, id_files, batch_size, dry_run, ignore_lock } => {
            let mut cfg = config::load(&config_path, missing_ok)?;
            if let Some(batch_size) = batch_size {
                cfg.batch_size = batch_size.clamp(1, 1024);
            }
            let actions = load_actions(cli.actions.as_deref())?;
            let signatures = load_custom_signatures(cli.custom_signatures.as_deref())?;
            let master_actions = load_master_actions(cli.master_actions.as_deref())?;
            let opts = IdentifyOptions {
                siegfried_binary: cli.siegfried.as_deref().unwrap_or(&cfg.siegfried_binary),
                signature_file: cli.siegfried_home.as_deref(),
                rerun_puids: &cfg.rerun_puids,
                markup_mismatch_puids: &cfg.markup_mismatch_puids,
            };
            run_framed(&mut db, "identify", |db| {
                identify::run(
                    db,
                    archive_root,
                    target,
                    &query,
                    id_type,
                    id_files,
                    &cfg,
                    &actions,
                    &signatures,
                    &master_actions,
                    &opts,
                    dry_run,
                    ignore_lock,
                )
            })
        }
        Command::Edit { command } => run_framed(&mut db, "edit", |db| edit::run(db, archive_root, command)),
        Command::History { from, to, operation, uuid, ascending, descending } => {
            run_framed(&mut db, "history", |db| {
                history::run(db, from, to, operation.as_deref(), uuid.as_deref(), ascending && !descending)
            })
        }
    }
}
