//! The identification engine: the pipeline that turns a batch of file paths into resolved
//! `(checksum, puid, signature, warning, action)` tuples, applying renames and re-identifying
//! as needed.
use std::{
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::{
    catalogue::{action::ActionCatalogue, signature::SignatureCatalogue, Action},
    checksum::checksum_bytes,
    error::IdentifyError,
    logger::{info, warn},
    preservability::{self, Preservability},
    rename,
    siegfried::{self, Identification},
};

/// PUID assigned to a zero-byte file, bypassing the external identifier entirely.
const EMPTY_FILE_PUID: &str = "aca-error/1";

/// Tunables threaded through from [`crate::config::Config`].
pub struct IdentifyOptions<'a> {
    pub siegfried_binary: &'a str,
    pub signature_file: Option<&'a Path>,
    pub rerun_puids: &'a [String],
    pub markup_mismatch_puids: &'a [String],
}

/// The resolved outcome of identifying a single file.
pub struct FileIdentification {
    /// Final path, after any rename the resolved action applied.
    pub path: PathBuf,
    pub checksum: String,
    pub size: u64,
    pub puid: Option<String>,
    pub signature: Option<String>,
    pub warning: Option<String>,
    pub action: Option<Action>,
    /// Set if a rename was applied as part of identification, `(old_path, new_path)`.
    pub renamed: Option<(PathBuf, PathBuf)>,
    /// Set if identification hit a recoverable per-file error (e.g. image decode failure).
    pub recoverable_error: Option<String>,
}

/// A path paired with the bytes read from disk, computed once and reused for checksumming,
/// custom-signature matching, and preservability classification.
struct LoadedFile {
    path: PathBuf,
    content: Vec<u8>,
}

/// Identify every path in `paths`, running the external identifier once for the whole batch
/// and then resolving each file's action against the catalogues.
pub fn identify_batch(
    paths: &[PathBuf],
    signatures: &SignatureCatalogue,
    actions: &ActionCatalogue,
    opts: &IdentifyOptions,
) -> Result<Vec<FileIdentification>, IdentifyError> {
    let loaded: Vec<LoadedFile> = paths
        .par_iter()
        .map(|path| {
            let content = fs::read(path).map_err(|source| IdentifyError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(LoadedFile {
                path: path.clone(),
                content,
            })
        })
        .collect::<Result<Vec<_>, IdentifyError>>()?;

    let non_empty: Vec<PathBuf> = loaded
        .iter()
        .filter(|f| !f.content.is_empty())
        .map(|f| f.path.clone())
        .collect();

    let mut prelim = siegfried::identify_batch(opts.siegfried_binary, opts.signature_file, &non_empty)?;
    let mut prelim_by_path: std::collections::HashMap<PathBuf, Identification> = non_empty
        .into_iter()
        .zip(prelim.drain(..))
        .collect();

    let mut results = Vec::with_capacity(loaded.len());
    for file in loaded {
        let result = if file.content.is_empty() {
            resolve_empty_file(file.path, actions)
        } else {
            let identification = prelim_by_path
                .remove(&file.path)
                .unwrap_or(Identification {
                    puid: None,
                    signature: None,
                    warning: None,
                });
            resolve_file(file.path, file.content, identification, signatures, actions, opts)?
        };
        results.push(result);
    }
    Ok(results)
}

fn resolve_empty_file(path: PathBuf, actions: &ActionCatalogue) -> FileIdentification {
    let action = actions.get(EMPTY_FILE_PUID).cloned();
    FileIdentification {
        path,
        checksum: checksum_bytes(&[]),
        size: 0,
        puid: Some(EMPTY_FILE_PUID.to_string()),
        signature: Some("Empty file".to_string()),
        warning: Some("Error: File is empty".to_string()),
        action,
        renamed: None,
        recoverable_error: None,
    }
}

fn resolve_file(
    mut path: PathBuf,
    content: Vec<u8>,
    mut identification: Identification,
    signatures: &SignatureCatalogue,
    actions: &ActionCatalogue,
    opts: &IdentifyOptions,
) -> Result<FileIdentification, IdentifyError> {
    let checksum = checksum_bytes(&content);
    let size = content.len() as u64;

    let needs_rerun = identification.puid.is_none()
        || identification
            .puid
            .as_deref()
            .is_some_and(|p| opts.rerun_puids.iter().any(|r| r == p))
        || (identification
            .puid
            .as_deref()
            .is_some_and(|p| opts.markup_mismatch_puids.iter().any(|m| m == p))
            && identification
                .warning
                .as_deref()
                .is_some_and(|w| w.to_lowercase().contains("extension mismatch")));

    if needs_rerun {
        if let Some(custom) = signatures.identify(&content) {
            identification.puid = Some(custom.puid.clone());
            identification.signature = Some(custom.signature.clone());
            let actual_extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
            identification.warning = if actual_extension.eq_ignore_ascii_case(&custom.extension) {
                None
            } else {
                Some("Extension mismatch".to_string())
            };
        }
    }

    let mut recoverable_error = None;
    let mut action = identification
        .puid
        .as_deref()
        .and_then(|p| actions.get(p))
        .cloned();

    if let Preservability::NotPreservable(reason) =
        preservability::classify(&path, &content, size, identification.puid.as_deref())
    {
        info!("File '{}' is not preservable: {reason}", path.display());
        let mut warning = identification.warning.clone().unwrap_or_default();
        if !warning.is_empty() {
            warning.push_str("; ");
        }
        warning.push_str(&reason);
        identification.warning = Some(warning);
    }

    let mut renamed = None;
    if let Some(Action::Rename(rename_action)) = &action {
        if let Some(new_path) =
            rename::plan_action_rename(&path, rename_action, identification.warning.as_deref())
        {
            match rename::rename(&path, &new_path) {
                Ok(()) => {
                    renamed = Some((path.clone(), new_path.clone()));
                    path = new_path;
                    action = actions.get(identification.puid.as_deref().unwrap_or_default()).cloned();
                }
                Err(source) => {
                    warn!(
                        "Failed to rename '{}' to '{}': {source}",
                        path.display(),
                        new_path.display()
                    );
                    recoverable_error = Some(source.to_string());
                }
            }
        }
    }

    Ok(FileIdentification {
        path,
        checksum,
        size,
        puid: identification.puid,
        signature: identification.signature,
        warning: identification.warning,
        action,
        renamed,
        recoverable_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::action::load_actions;

    #[test]
    fn empty_file_short_circuits_to_fixed_identification() {
        let actions = load_actions(None).unwrap();
        let result = resolve_empty_file(PathBuf::from("/archive/empty.txt"), &actions);
        assert_eq!(result.puid.as_deref(), Some(EMPTY_FILE_PUID));
        assert_eq!(result.signature.as_deref(), Some("Empty file"));
        assert_eq!(result.size, 0);
    }
}
