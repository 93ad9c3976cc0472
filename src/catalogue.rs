//! Reference-file catalogues: the action catalogue and the custom signature catalogue.
//!
//! Both are YAML files with a bundled default, overridable by an environment variable
//! pointing at a user-supplied replacement.
pub mod action;
pub mod signature;

pub use action::{Action, ActionCatalogue, ActionKind, MasterActionCatalogue, MasterConvertAction};
pub use signature::{CustomSignature, SignatureCatalogue, SignatureOperator};
