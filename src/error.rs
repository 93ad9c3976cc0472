//! # Error implementation
//! The main error types which result from normal usage.
mod config;
mod database;
mod identify;
mod selector;

use thiserror::Error;

pub use self::{
    config::ConfigError,
    database::DatabaseError,
    identify::IdentifyError,
    selector::{SelectorError, SelectorKind},
};

/// A trait for errors which have a representation which only depends on the variant, and not on
/// particular data associated with the error.
pub trait ShortError {
    /// Represent an error in short form.
    fn short_err(&self) -> &'static str;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Identification error: {0}")]
    Identify(#[from] IdentifyError),
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Self::Database(value.into())
    }
}
