//! Adapter around the external `siegfried` format identifier, invoked as a child process.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Command,
};

use serde::Deserialize;

use crate::{error::IdentifyError, logger::info};

#[derive(Debug, Deserialize)]
struct SiegfriedOutput {
    #[serde(default)]
    signature: String,
    files: Vec<SiegfriedFile>,
}

#[derive(Debug, Deserialize)]
struct SiegfriedFile {
    filename: String,
    #[serde(default)]
    errors: String,
    #[serde(default)]
    matches: Vec<SiegfriedMatch>,
}

#[derive(Debug, Deserialize)]
struct SiegfriedMatch {
    ns: String,
    id: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    warning: String,
}

/// A single file's raw identification result, before custom post-classification.
#[derive(Debug, Clone, Default)]
pub struct Identification {
    pub puid: Option<String>,
    pub signature: Option<String>,
    pub warning: Option<String>,
}

/// Run `<binary> -version -sig <sig>` once before any batch is submitted, to fail fast (and
/// with a clear error) if the configured siegfried binary or signature file is unusable.
pub fn preflight(binary: &str, signature_file: Option<&Path>) -> Result<(), IdentifyError> {
    let mut cmd = Command::new(binary);
    cmd.arg("-version");
    if let Some(sig) = signature_file {
        cmd.arg("-sig").arg(sig);
    }

    let status = cmd.status().map_err(|source| IdentifyError::SiegfriedLaunch {
        path: binary.to_owned(),
        source,
    })?;

    if !status.success() {
        return Err(IdentifyError::SiegfriedPreflight(binary.to_owned()));
    }
    Ok(())
}

/// Invoke `siegfried -json -multi <batch_size> <paths...>` and return one [`Identification`]
/// per input path, in the order the paths were given.
///
/// `binary` is the siegfried executable name or path; `signature_file`, if given, is passed
/// via `-sig`.
pub fn identify_batch(
    binary: &str,
    signature_file: Option<&Path>,
    paths: &[PathBuf],
) -> Result<Vec<Identification>, IdentifyError> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let mut cmd = Command::new(binary);
    cmd.arg("-json").arg("-multi").arg(paths.len().to_string());
    if let Some(sig) = signature_file {
        cmd.arg("-sig").arg(sig);
    }
    for path in paths {
        cmd.arg(path);
    }

    let output = cmd.output().map_err(|source| IdentifyError::SiegfriedLaunch {
        path: binary.to_owned(),
        source,
    })?;

    if !output.status.success() {
        return Err(IdentifyError::SiegfriedExitStatus(paths[0].clone()));
    }

    let parsed: SiegfriedOutput = serde_json::from_slice(&output.stdout)?;
    info!("siegfried signature file: {}", parsed.signature);

    let mut by_name: HashMap<String, SiegfriedFile> = parsed
        .files
        .into_iter()
        .map(|f| (f.filename.clone(), f))
        .collect();

    paths
        .iter()
        .map(|path| {
            let key = path.to_string_lossy().into_owned();
            let file = by_name
                .remove(&key)
                .ok_or_else(|| IdentifyError::MissingResult(path.clone()))?;
            Ok(resolve_identification(file))
        })
        .collect()
}

/// Pick the `pronom`-namespace match, normalizing `"UNKNOWN"` to `None` and composing
/// `signature` as `"<format> (<version>)"` when both parts are present.
fn resolve_identification(file: SiegfriedFile) -> Identification {
    let best = file
        .matches
        .iter()
        .find(|m| m.ns == "pronom")
        .or_else(|| file.matches.first());

    let mut warning: Vec<String> = Vec::new();
    if !file.errors.is_empty() {
        warning.push(file.errors.clone());
    }

    let (puid, signature) = match best {
        Some(m) => {
            if !m.warning.is_empty() {
                warning.push(m.warning.clone());
            }
            let puid = if m.id.is_empty() || m.id.eq_ignore_ascii_case("unknown") {
                None
            } else {
                Some(m.id.clone())
            };
            let signature = match (m.format.is_empty(), m.version.is_empty()) {
                (false, false) => Some(format!("{} ({})", m.format, m.version)),
                (false, true) => Some(m.format.clone()),
                _ => None,
            };
            (puid, signature)
        }
        None => (None, None),
    };

    Identification {
        puid,
        signature,
        warning: if warning.is_empty() {
            None
        } else {
            Some(warning.join("; "))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_normalizes_to_none() {
        let file = SiegfriedFile {
            filename: "a".into(),
            errors: String::new(),
            matches: vec![SiegfriedMatch {
                ns: "pronom".into(),
                id: "UNKNOWN".into(),
                format: String::new(),
                version: String::new(),
                warning: String::new(),
            }],
        };
        let id = resolve_identification(file);
        assert_eq!(id.puid, None);
    }

    #[test]
    fn composes_signature_from_format_and_version() {
        let file = SiegfriedFile {
            filename: "a".into(),
            errors: String::new(),
            matches: vec![SiegfriedMatch {
                ns: "pronom".into(),
                id: "fmt/276".into(),
                format: "OpenDocument Text".into(),
                version: "1.2".into(),
                warning: String::new(),
            }],
        };
        let id = resolve_identification(file);
        assert_eq!(id.puid.as_deref(), Some("fmt/276"));
        assert_eq!(id.signature.as_deref(), Some("OpenDocument Text (1.2)"));
    }
}
