use std::{collections::HashMap, env, fs::read_to_string, path::Path};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    logger::{debug, info},
};

/// Tag identifying an [`Action`] variant, independent of its parameters. Stored verbatim
/// in the `action` column of a file row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum ActionKind {
    Convert,
    Extract,
    Replace,
    Manual,
    Rename,
    Ignore,
    ReIdentify,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Convert => "convert",
            Self::Extract => "extract",
            Self::Replace => "replace",
            Self::Manual => "manual",
            Self::Rename => "rename",
            Self::Ignore => "ignore",
            Self::ReIdentify => "reidentify",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertAction {
    pub tool: String,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractAction {
    pub tool: String,
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceAction {
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAction {
    pub reason: String,
    #[serde(default)]
    pub process: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameAction {
    pub extension: String,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub on_extension_mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreAction {
    #[serde(default)]
    pub template: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReIdentifyAction {
    pub reason: String,
}

/// An action directive attached to an identified file, tagged by [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Convert(ConvertAction),
    Extract(ExtractAction),
    Replace(ReplaceAction),
    Manual(ManualAction),
    Rename(RenameAction),
    Ignore(IgnoreAction),
    ReIdentify(ReIdentifyAction),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Convert(_) => ActionKind::Convert,
            Self::Extract(_) => ActionKind::Extract,
            Self::Replace(_) => ActionKind::Replace,
            Self::Manual(_) => ActionKind::Manual,
            Self::Rename(_) => ActionKind::Rename,
            Self::Ignore(_) => ActionKind::Ignore,
            Self::ReIdentify(_) => ActionKind::ReIdentify,
        }
    }

    pub fn manual(reason: impl Into<String>, process: impl Into<String>) -> Self {
        Self::Manual(ManualAction {
            reason: reason.into(),
            process: process.into(),
        })
    }
}

/// Mapping from PUID to the [`Action`] that should be taken for files of that format.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalogue {
    by_puid: HashMap<String, Action>,
}

impl ActionCatalogue {
    pub fn get(&self, puid: &str) -> Option<&Action> {
        self.by_puid.get(puid)
    }

    fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
        let by_puid: HashMap<String, Action> =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
                path: path.into(),
                source,
            })?;
        Ok(Self { by_puid })
    }
}

const DEFAULT_ACTIONS_YAML: &str = include_str!("default_actions.yaml");

/// Load the action catalogue. Respects the `DIGIARCH_ACTIONS` environment variable if
/// it is set and `override_path` is `None`; otherwise falls back to the bundled default.
pub fn load_actions(override_path: Option<&Path>) -> Result<ActionCatalogue, ConfigError> {
    let env_path = env::var_os("DIGIARCH_ACTIONS").map(std::path::PathBuf::from);
    match override_path.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            info!("Loading action catalogue from '{}'", path.display());
            let text = read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            ActionCatalogue::from_yaml(&text, &path.display().to_string())
        }
        None => {
            debug!("Using bundled default action catalogue");
            ActionCatalogue::from_yaml(DEFAULT_ACTIONS_YAML, "<bundled>")
        }
    }
}

/// The conversion directive attached to a `MasterFile` row: which tool (if any) should
/// produce its access and statutory copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConvertAction {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub statutory: Option<String>,
}

/// Mapping from PUID to the [`MasterConvertAction`] that `identify master` should resolve.
#[derive(Debug, Clone, Default)]
pub struct MasterActionCatalogue {
    by_puid: HashMap<String, MasterConvertAction>,
}

impl MasterActionCatalogue {
    pub fn get(&self, puid: &str) -> Option<&MasterConvertAction> {
        self.by_puid.get(puid)
    }

    fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
        let by_puid: HashMap<String, MasterConvertAction> =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
                path: path.into(),
                source,
            })?;
        Ok(Self { by_puid })
    }
}

const DEFAULT_MASTER_ACTIONS_YAML: &str = include_str!("default_master_actions.yaml");

/// Load the master-convert-action catalogue. Respects `DIGIARCH_MASTER_ACTIONS` if it is
/// set and `override_path` is `None`; otherwise falls back to the bundled default.
pub fn load_master_actions(override_path: Option<&Path>) -> Result<MasterActionCatalogue, ConfigError> {
    let env_path = env::var_os("DIGIARCH_MASTER_ACTIONS").map(std::path::PathBuf::from);
    match override_path.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            info!("Loading master-convert-action catalogue from '{}'", path.display());
            let text = read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            MasterActionCatalogue::from_yaml(&text, &path.display().to_string())
        }
        None => {
            debug!("Using bundled default master-convert-action catalogue");
            MasterActionCatalogue::from_yaml(DEFAULT_MASTER_ACTIONS_YAML, "<bundled>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_default_actions_parse() {
        let cat = ActionCatalogue::from_yaml(DEFAULT_ACTIONS_YAML, "<bundled>").unwrap();
        assert!(cat.get("x-fmt/111").is_some());
    }

    #[test]
    fn bundled_default_master_actions_parse() {
        let cat = MasterActionCatalogue::from_yaml(DEFAULT_MASTER_ACTIONS_YAML, "<bundled>").unwrap();
        assert!(cat.get("fmt/412").is_some());
    }

    #[test]
    fn action_kind_round_trips() {
        let action = Action::manual("unidentified", "Identify and fix error.");
        assert_eq!(action.kind(), ActionKind::Manual);
        let yaml = serde_yaml::to_string(&action).unwrap();
        let back: Action = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(action, back);
    }
}
