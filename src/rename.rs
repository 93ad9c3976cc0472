//! Filename suffix computation for the `rename` action and the `edit rename` command.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;

use crate::catalogue::action::RenameAction;

static VALID_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.[a-zA-Z0-9]+$").unwrap());

/// The three suffix-rewrite strategies offered by `edit rename`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum RenameMode {
    /// Replace the final suffix if it looks like a valid extension, otherwise append.
    Last,
    /// Strip all trailing valid-extension suffixes, then append the new one.
    All,
    /// Append the new extension unless the name already ends with it (case-insensitively).
    Append,
}

fn case_insensitive_eq(a: &Path, b: &Path) -> bool {
    match (a.file_name(), b.file_name()) {
        (Some(a), Some(b)) => a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy()),
        _ => a == b,
    }
}

/// Compute the renamed path for `path` under `mode` with new extension `extension`
/// (without the leading dot). Returns `None` if the computed name is unchanged.
pub fn compute_new_path(path: &Path, extension: &str, mode: RenameMode) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let new_name = match mode {
        RenameMode::Last => {
            if let Some(dot) = file_name.rfind('.')
                && VALID_SUFFIX.is_match(&file_name[dot..])
            {
                format!("{}.{extension}", &file_name[..dot])
            } else {
                format!("{file_name}.{extension}")
            }
        }
        RenameMode::All => {
            let mut stem = file_name.as_str();
            while let Some(dot) = stem.rfind('.') {
                if VALID_SUFFIX.is_match(&stem[dot..]) {
                    stem = &stem[..dot];
                } else {
                    break;
                }
            }
            format!("{stem}.{extension}")
        }
        RenameMode::Append => {
            if file_name
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", extension.to_ascii_lowercase()))
            {
                file_name
            } else {
                format!("{file_name}.{extension}")
            }
        }
    };

    let new_path = path.with_file_name(new_name);
    if case_insensitive_eq(path, &new_path) {
        None
    } else {
        Some(new_path)
    }
}

/// Apply a catalogue-driven [`RenameAction`] to `path`. Returns `None` if the action should
/// be skipped (either a no-op rename, or `on_extension_mismatch` is set and `warning` does
/// not mention an extension mismatch).
pub fn plan_action_rename(
    path: &Path,
    action: &RenameAction,
    warning: Option<&str>,
) -> Option<PathBuf> {
    if action.on_extension_mismatch {
        let mismatched = warning
            .map(|w| w.to_ascii_lowercase().contains("extension mismatch"))
            .unwrap_or(false);
        if !mismatched {
            return None;
        }
    }

    let mode = if action.append {
        RenameMode::Append
    } else {
        RenameMode::Last
    };

    compute_new_path(path, &action.extension, mode)
}

/// Rename `old` to `new` on the filesystem. If a later step fails, callers should call
/// [`revert`] with the same pair to restore the original name.
pub fn rename(old: &Path, new: &Path) -> std::io::Result<()> {
    fs::rename(old, new)
}

/// Revert a rename performed by [`rename`], moving `new` back to `old`.
pub fn revert(new: &Path, old: &Path) -> std::io::Result<()> {
    fs::rename(new, old)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_mode_replaces_valid_suffix() {
        let p = compute_new_path(Path::new("/a/notes.md"), "txt", RenameMode::Last).unwrap();
        assert_eq!(p, Path::new("/a/notes.txt"));
    }

    #[test]
    fn last_mode_appends_when_no_valid_suffix() {
        let p = compute_new_path(Path::new("/a/notes"), "txt", RenameMode::Last).unwrap();
        assert_eq!(p, Path::new("/a/notes.txt"));
    }

    #[test]
    fn all_mode_strips_multiple_suffixes() {
        let p = compute_new_path(Path::new("/a/archive.tar.gz"), "zip", RenameMode::All).unwrap();
        assert_eq!(p, Path::new("/a/archive.zip"));
    }

    #[test]
    fn append_mode_is_noop_when_already_suffixed() {
        assert!(compute_new_path(Path::new("/a/notes.TXT"), "txt", RenameMode::Append).is_none());
    }

    #[test]
    fn case_insensitive_noop_detected() {
        assert!(compute_new_path(Path::new("/a/notes.txt"), "TXT", RenameMode::Last).is_none());
    }

    #[test]
    fn action_skipped_without_extension_mismatch() {
        let action = RenameAction {
            extension: "lwp".into(),
            append: false,
            on_extension_mismatch: true,
        };
        assert!(plan_action_rename(Path::new("/a/file.fail"), &action, None).is_none());
        assert!(
            plan_action_rename(Path::new("/a/file.fail"), &action, Some("Extension mismatch"))
                .is_some()
        );
    }
}
