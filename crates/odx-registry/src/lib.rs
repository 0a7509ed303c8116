//! Typed registry of target models, fields, and seed vocabularies for the
//! deterministic export pipeline.
//!
//! A registry document is parsed once (see [`Registry::from_yaml_str`]) and
//! run through [`Registry::validate`], which either yields a fully-typed,
//! internally-consistent [`Registry`] or a [`RegistryError`] describing every
//! problem found in a single pass. [`RegistryLoader`] adds `(path, mtime)`
//! caching on top for callers that repeatedly load the same file.

mod error;
mod loader;
mod types;
mod validate;

pub use error::{RegistryError, RegistryIssue};
pub use loader::RegistryLoader;
pub use types::{FieldSpec, FieldType, ModelSpec, Registry, SeedSpec};
