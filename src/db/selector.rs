//! Compiles the uniform identifier selector used by every mutating command into a parameterised
//! SQL predicate.
use std::{fs, path::Path};

use clap::ValueEnum;

use crate::error::SelectorError;

pub use crate::error::SelectorKind;

/// A compiled selector: the predicate fragment to embed after `WHERE`, and the bound values to
/// run it with, one query per identifier.
pub struct Selector {
    kind: SelectorKind,
    /// The deduplicated identifier tokens, in first-seen order.
    pub tokens: Vec<String>,
}

impl Selector {
    /// Build a selector from raw CLI tokens.
    ///
    /// If `id_files` is set, each token is instead read as a path to a newline-separated file of
    /// tokens. Tokens are deduplicated, preserving the order in which they first appear.
    pub fn new(kind: SelectorKind, raw: &[String], id_files: bool) -> Result<Self, SelectorError> {
        let mut tokens = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let mut push = |tok: String, seen: &mut std::collections::HashSet<String>| {
            if seen.insert(tok.clone()) {
                tokens.push(tok);
            }
        };

        if id_files {
            for path in raw {
                let contents = fs::read_to_string(path).map_err(|source| SelectorError::IdFile {
                    path: path.clone(),
                    source,
                })?;
                for line in contents.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        push(line.to_string(), &mut seen);
                    }
                }
            }
        } else {
            for tok in raw {
                push(tok.clone(), &mut seen);
            }
        }

        if kind == SelectorKind::Uuid {
            for tok in &tokens {
                if uuid::Uuid::parse_str(tok).is_err() {
                    return Err(SelectorError::InvalidUuid(tok.clone()));
                }
            }
        }

        Ok(Selector { kind, tokens })
    }

    /// The column this selector's kind resolves against.
    pub fn column(&self) -> &'static str {
        match self.kind {
            SelectorKind::Uuid => "uuid",
            SelectorKind::Puid => "puid",
            SelectorKind::RelativePath | SelectorKind::RelativePathLike => "relative_path",
            SelectorKind::Checksum => "checksum",
            SelectorKind::Warning => "warning",
        }
    }

    /// The `WHERE`-clause predicate fragment for this selector's kind, parameterised by `?1`.
    pub fn predicate(&self) -> String {
        match self.kind {
            SelectorKind::RelativePathLike => format!("{} LIKE ?1", self.column()),
            SelectorKind::Warning => "warning LIKE '%\"' || ?1 || '\"%'".to_string(),
            _ => format!("{} = ?1", self.column()),
        }
    }

    /// The value to bind for a given token, accounting for the `LIKE`-style kinds.
    pub fn bind_value(&self, token: &str) -> String {
        match self.kind {
            SelectorKind::RelativePathLike => format!("%{token}%"),
            _ => token.to_string(),
        }
    }
}

/// Parse a selector kind from its CLI flag name, matching [`SelectorKind::Display`].
pub fn parse_kind(flag: &str) -> Option<SelectorKind> {
    SelectorKind::value_variants()
        .iter()
        .find(|k| k.to_string() == flag)
        .copied()
}

impl ValueEnum for SelectorKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            SelectorKind::Uuid,
            SelectorKind::Puid,
            SelectorKind::RelativePath,
            SelectorKind::RelativePathLike,
            SelectorKind::Checksum,
            SelectorKind::Warning,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_seen_order() {
        let selector = Selector::new(
            SelectorKind::RelativePath,
            &["a".into(), "b".into(), "a".into(), "c".into()],
            false,
        )
        .unwrap();
        assert_eq!(selector.tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn uuid_kind_rejects_invalid_tokens() {
        let err = Selector::new(SelectorKind::Uuid, &["not-a-uuid".into()], false).unwrap_err();
        assert!(matches!(err, SelectorError::InvalidUuid(_)));
    }

    #[test]
    fn like_predicate_wraps_value_with_wildcards() {
        let selector =
            Selector::new(SelectorKind::RelativePathLike, &["foo".into()], false).unwrap();
        assert_eq!(selector.predicate(), "relative_path LIKE ?1");
        assert_eq!(selector.bind_value("foo"), "%foo%");
    }

    #[test]
    fn warning_predicate_tests_json_array_membership() {
        let selector = Selector::new(SelectorKind::Warning, &["mismatch".into()], false).unwrap();
        assert_eq!(selector.predicate(), "warning LIKE '%\"' || ?1 || '\"%'");
    }
}
