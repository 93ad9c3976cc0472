use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while running the identification engine over a batch of files.
#[derive(Error, Debug)]
pub enum IdentifyError {
    #[error("failed to launch siegfried at '{path}': {source}")]
    SiegfriedLaunch { path: String, source: io::Error },
    #[error("siegfried exited with a non-zero status for batch starting at '{0}'")]
    SiegfriedExitStatus(PathBuf),
    #[error("siegfried pre-flight check ('{0} -version') failed or reported a non-zero exit")]
    SiegfriedPreflight(String),
    #[error("failed to parse siegfried output: {0}")]
    SiegfriedOutput(#[from] serde_json::Error),
    #[error("siegfried reported no result for '{0}'")]
    MissingResult(PathBuf),
    #[error("failed to read file '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to probe image dimensions for '{path}': {source}")]
    Image { path: PathBuf, source: image::ImageError },
    #[error("invalid custom signature catalogue entry for puid '{0}': {1}")]
    InvalidSignature(String, String),
}
