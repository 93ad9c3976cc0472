use std::fmt;

use thiserror::Error;

/// The kind of identifier a selector was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Uuid,
    Puid,
    RelativePath,
    RelativePathLike,
    Checksum,
    Warning,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uuid => "uuid",
            Self::Puid => "puid",
            Self::RelativePath => "relative_path",
            Self::RelativePathLike => "relative_path-like",
            Self::Checksum => "checksum",
            Self::Warning => "warning",
        })
    }
}

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("invalid uuid '{0}'")]
    InvalidUuid(String),
    #[error("failed to read id-file '{path}': {source}")]
    IdFile { path: String, source: std::io::Error },
}
