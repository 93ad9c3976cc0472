use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::aot::Shell;
use clap_verbosity_flag::{Verbosity, WarnLevel};

use crate::{catalogue::action::ActionKind, db::SelectorKind, rename::RenameMode};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the archive's metadata database.
    ///
    /// Defaults to `_metadata/avid.db` under the archive root.
    #[arg(short = 'D', long, value_name = "PATH", env = "DIGIARCH_DATABASE_PATH", global = true)]
    pub database: Option<PathBuf>,
    /// Root of the AVID archive directory being operated on.
    #[arg(short = 'A', long, value_name = "PATH", env = "DIGIARCH_ARCHIVE_ROOT", global = true)]
    pub archive_root: PathBuf,
    /// Use configuration file.
    #[arg(short = 'C', long, value_name = "PATH", env = "DIGIARCH_CONFIG_PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Action catalogue file, overriding the bundled default.
    #[arg(long, value_name = "PATH", env = "DIGIARCH_ACTIONS", global = true)]
    pub actions: Option<PathBuf>,
    /// Custom signature catalogue file, overriding the bundled default.
    #[arg(long, value_name = "PATH", env = "DIGIARCH_CUSTOM_SIGNATURES", global = true)]
    pub custom_signatures: Option<PathBuf>,
    /// Master-convert-action catalogue file, overriding the bundled default.
    #[arg(long, value_name = "PATH", env = "DIGIARCH_MASTER_ACTIONS", global = true)]
    pub master_actions: Option<PathBuf>,
    /// Path to the siegfried binary.
    #[arg(long, value_name = "PATH", env = "SIEGFRIED_PATH", global = true)]
    pub siegfried: Option<String>,
    /// Siegfried signature file, passed to `-sig`.
    #[arg(long, value_name = "PATH", env = "SIEGFRIED_HOME", global = true)]
    pub siegfried_home: Option<PathBuf>,
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the archive's metadata database, optionally importing a legacy one.
    Init {
        /// Path to a legacy (schema 3.3.3) database to import rows from.
        #[arg(long, value_name = "PATH")]
        import: Option<PathBuf>,
    },
    /// Run identification over a class of archive files.
    Identify {
        #[arg(value_enum)]
        target: IdentifyTarget,
        /// Identifier tokens restricting which rows are (re-)identified.
        query: Vec<String>,
        /// Interpret `query` tokens as this kind of identifier, instead of discovering every
        /// file under the target's directory.
        #[arg(long = "id-type", value_enum)]
        id_type: Option<SelectorKind>,
        /// Read each `query` token as a path to a newline-separated file of identifiers.
        #[arg(long = "id-files", requires = "id_type")]
        id_files: bool,
        /// Maximum number of files per external-identifier invocation.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Report what would be identified without writing to the database.
        #[arg(long)]
        dry_run: bool,
        /// Re-identify files even if their `lock` flag is set.
        #[arg(long)]
        ignore_lock: bool,
    },
    /// Mutate existing rows by identifier selector.
    Edit {
        #[command(subcommand)]
        command: EditCommand,
    },
    /// Show the event history, optionally filtered.
    History {
        #[arg(long)]
        from: Option<DateTime<Local>>,
        #[arg(long)]
        to: Option<DateTime<Local>>,
        /// Filter events whose `operation` matches this `LIKE` pattern.
        #[arg(long)]
        operation: Option<String>,
        /// Filter events targeting this uuid.
        #[arg(long)]
        uuid: Option<String>,
        #[arg(long, conflicts_with = "descending")]
        ascending: bool,
        #[arg(long, conflicts_with = "ascending")]
        descending: bool,
    },
    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completions { shell: Shell },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum IdentifyTarget {
    Original,
    Master,
    Access,
    Statutory,
}

#[derive(Debug, Subcommand)]
pub enum EditCommand {
    /// Set the action directive of the selected rows.
    Action {
        ids: Vec<String>,
        #[arg(value_enum)]
        action: ActionKind,
        reason: String,
        #[arg(long = "id-type", value_enum, default_value = "uuid")]
        id_type: SelectorKind,
        #[arg(long = "id-files")]
        id_files: bool,
        /// Raw `action_data` string to attach verbatim.
        #[arg(long, conflicts_with = "data_json")]
        data: Option<String>,
        /// `action_data` to attach, validated as JSON before being stored.
        #[arg(long)]
        data_json: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Rename the selected files on disk, rewriting their extension.
    Rename {
        ids: Vec<String>,
        extension: String,
        reason: String,
        #[arg(long = "id-type", value_enum, default_value = "uuid")]
        id_type: SelectorKind,
        #[arg(long = "id-files")]
        id_files: bool,
        /// Replace the final suffix if it looks like a valid extension, otherwise append.
        #[arg(long, conflicts_with_all = ["replace_all", "append"])]
        replace: bool,
        /// Strip every trailing valid-extension suffix, then append.
        #[arg(long, conflicts_with_all = ["replace", "append"])]
        replace_all: bool,
        /// Append the new extension unless the name already ends with it.
        #[arg(long, conflicts_with_all = ["replace", "replace_all"])]
        append: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove the selected rows from the database (the files on disk are untouched).
    Remove {
        ids: Vec<String>,
        reason: String,
        #[arg(long = "id-type", value_enum, default_value = "uuid")]
        id_type: SelectorKind,
        #[arg(long = "id-files")]
        id_files: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Undo every mutating event in the given time range, most recent first.
    Rollback {
        from: DateTime<Local>,
        to: DateTime<Local>,
        reason: String,
    },
}

impl EditCommand {
    pub fn rename_mode(&self) -> RenameMode {
        match self {
            EditCommand::Rename { replace_all, append, .. } => {
                if *replace_all {
                    RenameMode::All
                } else if *append {
                    RenameMode::Append
                } else {
                    RenameMode::Last
                }
            }
            _ => RenameMode::Last,
        }
    }
}
