//! Registry of known types, their ancestors and reference schemas

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::TypeTag;
use crate::error::{ReferenceError, RegistryError, Result};
use crate::schema::ReferenceSchema;
use crate::store::ReferenceStore;

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    /// Every ancestor, nearest first, excluding the type itself
    ancestors: IndexSet<TypeTag>,

    /// Schema declared directly on this type
    schema: Option<Arc<ReferenceSchema>>,
}

/// Known types with their precomputed ancestor sets.
///
/// Types are registered parents-first, so every ancestor set is complete
/// the moment a type is added and never changes afterwards. "Is `a` a kind
/// of `b`" is then a single set lookup.
///
/// # Example
///
/// ```
/// use polyref::{TypeRegistry, TypeTag};
///
/// let mut registry = TypeRegistry::new();
/// registry.register("Media", &[]).unwrap();
/// registry.register("Image", &["Media"]).unwrap();
/// registry.register("Thumbnail", &["Image"]).unwrap();
///
/// let thumb = TypeTag::new("Thumbnail");
/// assert!(registry.is_a(&thumb, &TypeTag::new("Media")));
/// assert!(!registry.is_a(&TypeTag::new("Media"), &thumb));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<TypeTag, TypeEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════

    /// Register a type with its direct supertypes.
    ///
    /// # Errors
    ///
    /// - `DuplicateType` if the type is already registered
    /// - `UnknownType` if a parent has not been registered yet
    pub fn register(
        &mut self,
        tag: impl Into<TypeTag>,
        parents: &[&str],
    ) -> std::result::Result<(), RegistryError> {
        self.insert(tag.into(), parents, None)
    }

    /// Register a reference-capable type; the schema's owner is the new type.
    ///
    /// Descendants registered later inherit the schema unless they declare
    /// their own.
    pub fn register_with_schema(
        &mut self,
        schema: ReferenceSchema,
        parents: &[&str],
    ) -> std::result::Result<(), RegistryError> {
        let tag = schema.owner().clone();
        self.insert(tag, parents, Some(Arc::new(schema)))
    }

    fn insert(
        &mut self,
        tag: TypeTag,
        parents: &[&str],
        schema: Option<Arc<ReferenceSchema>>,
    ) -> std::result::Result<(), RegistryError> {
        if self.types.contains_key(&tag) {
            return Err(RegistryError::DuplicateType(tag));
        }

        let parents: Vec<TypeTag> = parents.iter().map(TypeTag::new).collect();
        let mut ancestors = IndexSet::new();
        // Direct parents first, then their closures, so lookups walk
        // nearest-first.
        for parent in &parents {
            if !self.types.contains_key(parent) {
                return Err(RegistryError::UnknownType(parent.clone()));
            }
            ancestors.insert(parent.clone());
        }
        for parent in &parents {
            if let Some(entry) = self.types.get(parent) {
                ancestors.extend(entry.ancestors.iter().cloned());
            }
        }

        debug!(
            type_tag = %tag,
            ancestors = ancestors.len(),
            schema = schema.is_some(),
            "registered type"
        );
        self.types.insert(tag, TypeEntry { ancestors, schema });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Hierarchy Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Whether the type is registered
    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.types.contains_key(tag)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// No types registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Ancestors of a type, nearest first (empty for unregistered types)
    pub fn ancestors(&self, tag: &TypeTag) -> impl Iterator<Item = &TypeTag> {
        self.types
            .get(tag)
            .into_iter()
            .flat_map(|entry| entry.ancestors.iter())
    }

    /// Whether `ty` is `ancestor` itself or descends from it.
    ///
    /// Unregistered types only match themselves.
    pub fn is_a(&self, ty: &TypeTag, ancestor: &TypeTag) -> bool {
        ty == ancestor
            || self
                .types
                .get(ty)
                .is_some_and(|entry| entry.ancestors.contains(ancestor))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reference Schemas
    // ═══════════════════════════════════════════════════════════════════

    /// Reference schema in effect for a type: its own, or the nearest
    /// ancestor's. `None` if the type cannot hold references.
    pub fn schema_for(&self, tag: &TypeTag) -> Option<&Arc<ReferenceSchema>> {
        let entry = self.types.get(tag)?;
        entry.schema.as_ref().or_else(|| {
            entry
                .ancestors
                .iter()
                .find_map(|ancestor| self.types.get(ancestor)?.schema.as_ref())
        })
    }

    /// Whether records of this type can hold references
    pub fn supports_references(&self, tag: &TypeTag) -> bool {
        self.schema_for(tag).is_some()
    }

    /// Like [`TypeRegistry::schema_for`], failing for types without references.
    ///
    /// # Errors
    ///
    /// - `Registry(UnknownType)` if the type is not registered
    /// - `InvalidArgument` if the type cannot hold references
    pub fn require_schema(&self, tag: &TypeTag) -> Result<&Arc<ReferenceSchema>> {
        if !self.contains(tag) {
            return Err(RegistryError::UnknownType(tag.clone()).into());
        }
        self.schema_for(tag).ok_or_else(|| {
            ReferenceError::InvalidArgument(format!("Type {} does not support references", tag))
        })
    }

    /// Fresh, empty reference storage for a new record of `tag`.
    pub fn new_store(&self, tag: &TypeTag) -> Result<ReferenceStore> {
        let schema = self.require_schema(tag)?;
        Ok(ReferenceStore::for_type(tag.clone(), Arc::clone(schema)))
    }
}
