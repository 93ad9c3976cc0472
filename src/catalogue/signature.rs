use std::{env, fs::read_to_string, path::Path};

use data_encoding::HEXLOWER;
use regex::Regex;
use serde::Deserialize;

use crate::{
    error::ConfigError,
    logger::{debug, info},
};

/// How `bof` and `eof` combine when both are present in a [`CustomSignature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignatureOperator {
    And,
    Or,
}

/// Raw, not-yet-compiled form of a custom signature entry, as read from YAML.
#[derive(Debug, Clone, Deserialize)]
struct RawCustomSignature {
    puid: String,
    signature: String,
    extension: String,
    #[serde(default)]
    bof: Option<String>,
    #[serde(default)]
    eof: Option<String>,
    #[serde(default = "default_operator")]
    operator: SignatureOperator,
}

fn default_operator() -> SignatureOperator {
    SignatureOperator::And
}

/// A compiled custom byte-pattern signature, matched against the hex encoding of a
/// file's head and tail windows.
#[derive(Debug, Clone)]
pub struct CustomSignature {
    pub puid: String,
    pub signature: String,
    pub extension: String,
    pub bof: Option<Regex>,
    pub eof: Option<Regex>,
    pub operator: SignatureOperator,
}

impl CustomSignature {
    fn compile(raw: RawCustomSignature) -> Result<Self, ConfigError> {
        let compile = |pat: Option<String>, which: &str| -> Result<Option<Regex>, ConfigError> {
            pat.map(|p| {
                Regex::new(&p).map_err(|source| ConfigError::Regex {
                    context: format!("custom signature '{}' field '{which}'", raw.puid),
                    source,
                })
            })
            .transpose()
        };

        Ok(Self {
            bof: compile(raw.bof, "bof")?,
            eof: compile(raw.eof, "eof")?,
            puid: raw.puid,
            signature: raw.signature,
            extension: raw.extension,
            operator: raw.operator,
        })
    }

    /// Determine whether this signature matches the given hex-encoded head/tail windows.
    pub fn matches(&self, bof_hex: &str, eof_hex: &str) -> bool {
        let bof_match = self.bof.as_ref().map(|re| re.is_match(bof_hex));
        let eof_match = self.eof.as_ref().map(|re| re.is_match(eof_hex));

        match (bof_match, eof_match) {
            (Some(b), Some(e)) => match self.operator {
                SignatureOperator::And => b && e,
                SignatureOperator::Or => b || e,
            },
            (Some(b), None) => b,
            (None, Some(e)) => e,
            (None, None) => false,
        }
    }
}

/// An ordered collection of [`CustomSignature`]s; earlier entries take precedence.
#[derive(Debug, Clone, Default)]
pub struct SignatureCatalogue {
    signatures: Vec<CustomSignature>,
}

impl SignatureCatalogue {
    /// Hex-encode the first 2 KiB and last 1 KiB of `content` and return the first
    /// matching signature, in declaration order.
    pub fn identify(&self, content: &[u8]) -> Option<&CustomSignature> {
        const BOF_WINDOW: usize = 2048;
        const EOF_WINDOW: usize = 1024;

        let bof_len = content.len().min(BOF_WINDOW);
        let eof_start = content.len().saturating_sub(EOF_WINDOW);

        let bof_hex = HEXLOWER.encode(&content[..bof_len]);
        let eof_hex = HEXLOWER.encode(&content[eof_start..]);

        self.signatures
            .iter()
            .find(|sig| sig.matches(&bof_hex, &eof_hex))
    }

    fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
        let raw: Vec<RawCustomSignature> =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
                path: path.into(),
                source,
            })?;
        let signatures = raw
            .into_iter()
            .map(CustomSignature::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { signatures })
    }
}

const DEFAULT_SIGNATURES_YAML: &str = include_str!("default_signatures.yaml");

/// Load the custom signature catalogue. Respects the `DIGIARCH_CUSTOM_SIGNATURES`
/// environment variable if it is set and `override_path` is `None`; otherwise falls
/// back to the bundled default.
pub fn load_custom_signatures(
    override_path: Option<&Path>,
) -> Result<SignatureCatalogue, ConfigError> {
    let env_path = env::var_os("DIGIARCH_CUSTOM_SIGNATURES").map(std::path::PathBuf::from);
    match override_path.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            info!("Loading custom signature catalogue from '{}'", path.display());
            let text = read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            SignatureCatalogue::from_yaml(&text, &path.display().to_string())
        }
        None => {
            debug!("Using bundled default custom signature catalogue");
            SignatureCatalogue::from_yaml(DEFAULT_SIGNATURES_YAML, "<bundled>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_default_signatures_parse() {
        let cat = load_custom_signatures(None).unwrap();
        assert!(!cat.signatures.is_empty());
    }

    #[test]
    fn lotus_wordpro_magic_matches() {
        let cat = load_custom_signatures(None).unwrap();
        // Lotus WordPro documents begin with the magic bytes 57 6F 72 64 50 72 6F ("WordPro" ASCII prefix)
        let mut content = b"WordPro\x00 document body".to_vec();
        content.extend(std::iter::repeat(0u8).take(64));
        let matched = cat.identify(&content).expect("should match a signature");
        assert_eq!(matched.puid, "x-fmt/340");
    }

    #[test]
    fn and_operator_requires_both_windows() {
        let sig = CustomSignature {
            puid: "test/1".into(),
            signature: "Test".into(),
            extension: "tst".into(),
            bof: Some(Regex::new("^aa").unwrap()),
            eof: Some(Regex::new("bb$").unwrap()),
            operator: SignatureOperator::And,
        };
        assert!(sig.matches("aa11", "22bb"));
        assert!(!sig.matches("aa11", "2233"));
    }
}
