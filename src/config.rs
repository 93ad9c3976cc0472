mod validate;

use std::{fs::read_to_string, io, path::Path};

use anyhow::{anyhow, Error};
use serde::Deserialize;
use toml::from_str;

use crate::logger::{debug, info};
pub use validate::report_config_errors as validate;

/// The re-run set of PUIDs that are known to be systematically misidentified by the
/// external identifier and are always re-checked against the custom signature catalogue.
fn default_rerun_puids() -> Vec<String> {
    vec![
        "fmt/111".into(),
        "x-fmt/111".into(),
        "fmt/1600".into(),
        "fmt/1730".into(),
    ]
}

/// Markup-mimicking formats that are re-run through the custom matcher when Siegfried
/// reports an extension mismatch, since they are frequently confused with HTML/XML/ZIP.
fn default_markup_mismatch_puids() -> Vec<String> {
    vec![
        "fmt/96".into(),
        "fmt/101".into(),
        "fmt/583".into(),
        "x-fmt/263".into(),
    ]
}

fn default_batch_size() -> usize {
    100
}

fn default_siegfried_binary() -> String {
    "sf".into()
}

/// A direct representation of the configuration file used by the tool, for easy
/// deserialization from configuration files.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_rerun_puids")]
    pub rerun_puids: Vec<String>,
    #[serde(default = "default_markup_mismatch_puids")]
    pub markup_mismatch_puids: Vec<String>,
    #[serde(default = "default_siegfried_binary")]
    pub siegfried_binary: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            rerun_puids: default_rerun_puids(),
            markup_mismatch_puids: default_markup_mismatch_puids(),
            siegfried_binary: default_siegfried_binary(),
        }
    }
}

impl RawConfig {
    /// Load configuration by deserializing a toml file at the provided path, returning the
    /// default if `missing_ok` is true.
    fn load<P: AsRef<Path>>(path: P, missing_ok: bool) -> Result<Self, Error> {
        match read_to_string(&path) {
            Ok(st) => {
                info!(
                    "Loading configuration at path '{}'",
                    path.as_ref().display()
                );
                let config = from_str(&st)?;
                debug!("Using configuration:\n{config:?}");
                Ok(config)
            }
            Err(err) => {
                if missing_ok && err.kind() == io::ErrorKind::NotFound {
                    info!(
                        "Configuration file not found at path '{}'; using default configuration",
                        path.as_ref().display()
                    );
                    Ok(Self::default())
                } else {
                    Err(anyhow!("Failed to load configuration file: {err}"))
                }
            }
        }
    }

    /// Clamp `batch_size` to the hard ceiling of 1024 files per siegfried invocation.
    fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.clamp(1, 1024);
        self
    }
}

pub type Config = RawConfig;

#[cold]
pub fn write_default<W: ?Sized + io::Write>(writer: &mut W) -> Result<(), io::Error> {
    writer
        .write(include_str!("config/default_config.toml").as_bytes())
        .map(|_| ())
}

/// Attempt to load the configuration file from the provided path.
///
/// If `missing_ok` is true and the file is not found, this returns the default configuration.
pub fn load<P: AsRef<Path>>(path: P, missing_ok: bool) -> Result<Config, Error> {
    Ok(RawConfig::load(path, missing_ok)?.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let mut default_config_bytes = Vec::new();
        write_default(&mut default_config_bytes).unwrap();
        let st = String::from_utf8(default_config_bytes).unwrap();
        let cfg: RawConfig = from_str(&st).unwrap();

        assert_eq!(cfg, RawConfig::default());
    }
}
