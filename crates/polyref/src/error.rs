//! Error types for reference storage, resolution and configuration

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TypeTag;

/// Main error type for reference operations.
///
/// Every failure is raised before any stored reference is touched, so an
/// `Err` never leaves a half-written reference behind.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// The owner type does not declare a reference with this name
    #[error("Unknown reference name '{name}' on {owner}")]
    UnknownReference {
        /// Type the lookup was made against
        owner: TypeTag,
        /// Requested reference name
        name: String,
    },

    /// Malformed call: incomplete (type, identifiers) pair, identifiers
    /// without a type in a filter, or a type lacking reference support
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is well-formed but the owner's state or configuration forbids it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The target object carries no identifier values yet
    #[error("Target object of type {type_tag} has no identifiers, must be persisted first")]
    NotPersisted {
        /// Runtime type of the unsaved target
        type_tag: TypeTag,
    },

    /// Stored identifiers could not be encoded or decoded
    #[error("Malformed identifiers for reference '{name}': {source}")]
    MalformedIdentifiers {
        /// Reference name whose column is affected
        name: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The repository failed while loading a referenced object
    #[error("Repository failed to load {type_tag}: {source}")]
    Repository {
        /// Type that was being loaded
        type_tag: TypeTag,
        /// Error reported by the repository
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Type registry lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ReferenceError {
    /// Report unknown reference names against `owner` (the runtime type of
    /// a record) instead of the type that declared the schema.
    pub(crate) fn reported_for(self, owner: &TypeTag) -> Self {
        match self {
            ReferenceError::UnknownReference { name, .. } => ReferenceError::UnknownReference {
                owner: owner.clone(),
                name,
            },
            other => other,
        }
    }
}

/// Errors raised while declaring types and reference schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Type has not been registered
    #[error("Unknown type: {0}")]
    UnknownType(TypeTag),

    /// Type was registered twice
    #[error("Type {0} is already registered")]
    DuplicateType(TypeTag),

    /// A schema declares the same reference name twice
    #[error("Reference '{name}' is declared twice on {owner}")]
    DuplicateReference {
        /// Declaring type
        owner: TypeTag,
        /// Duplicated name
        name: String,
    },
}

/// Errors raised while loading resolver configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration document is not valid
    #[error("Invalid resolver configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for reference operations
pub type Result<T> = std::result::Result<T, ReferenceError>;
