//! # Polyref
//!
//! Polymorphic references between mapped records.
//!
//! A relation in most mapping layers targets exactly one type. Polyref lets
//! a record hold named references that may point at records of *any*
//! permitted type, stored as a `(type, identifiers)` pair in two plain
//! columns instead of a foreign key.
//!
//! ## Architecture
//!
//! - **Type registry**: known types and their precomputed ancestor sets
//! - **Reference schema**: the references an owner type declares
//! - **Reference store**: per-record column storage for those references
//! - **Allow-list**: which target types each owner/reference pair accepts
//! - **Resolver**: loads and assigns live objects through the host's
//!   [`ObjectManager`], enforcing the allow-list
//!
//! ## Example
//!
//! ```
//! use polyref::{ReferenceSchema, ReferenceStore, TypeRegistry, TypeTag, AllowList};
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .register_with_schema(ReferenceSchema::builder("Comment").required("subject").build()?, &[])?;
//! registry.register("Article", &[])?;
//! registry.register("Draft", &["Article"])?;
//! registry.register("User", &[])?;
//!
//! let allow: AllowList = vec![("Comment", "subject", "Article")].into_iter().collect();
//! let comment = TypeTag::new("Comment");
//! assert!(allow.permits(&registry, &comment, "subject", &TypeTag::new("Draft")));
//! assert!(!allow.permits(&registry, &comment, "subject", &TypeTag::new("User")));
//!
//! let store: ReferenceStore = registry.new_store(&comment)?;
//! assert!(!store.is_nullable("subject")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allow_list;
pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod types;
pub mod value;

// Re-export main types
pub use allow_list::{AllowList, ReferenceRules};
pub use config::ResolverConfig;
pub use error::{ConfigError, ReferenceError, RegistryError, Result};
pub use filter::FilterCriteria;
pub use manager::ObjectManager;
pub use resolver::ReferenceResolver;
pub use schema::{ReferenceDefinition, ReferenceSchema, ReferenceSchemaBuilder};
pub use store::{HasReferences, Reference, ReferenceStore};
pub use types::{TypeRegistry, TypeTag};
pub use value::{Identifiers, Scalar};

/// Polyref version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
