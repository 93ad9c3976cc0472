use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse configuration file '{path}': {source}")]
    Toml { path: String, source: toml::de::Error },
    #[error("failed to parse catalogue file '{path}': {source}")]
    Yaml { path: String, source: serde_yaml::Error },
    #[error("invalid regex in {context}: {source}")]
    Regex { context: String, source: regex::Error },
}
