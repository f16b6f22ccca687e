//! Loading, assigning and validating polymorphic references
//!
//! Owner records only store `(type, identifiers)` pairs. Turning a live
//! object into such a pair, and a pair back into a live object, needs the
//! host's [`ObjectManager`]; checking whether a target is acceptable needs
//! the [`AllowList`]. The [`ReferenceResolver`] holds both.

use std::sync::Arc;

use tracing::debug;

use crate::allow_list::AllowList;
use crate::config::ResolverConfig;
use crate::error::{ReferenceError, Result};
use crate::filter::FilterCriteria;
use crate::manager::ObjectManager;
use crate::store::{HasReferences, Reference};
use crate::types::{TypeRegistry, TypeTag};

/// Shared service resolving references through an [`ObjectManager`].
///
/// Allow-list mutations take `&mut self`. Hosts that share a resolver
/// between threads wrap it in a lock and take the write side only to
/// reconfigure.
#[derive(Debug)]
pub struct ReferenceResolver<M> {
    manager: M,
    registry: Arc<TypeRegistry>,
    allow_list: AllowList,
}

impl<M: ObjectManager> ReferenceResolver<M> {
    /// Create a resolver with an empty allow-list (every target permitted).
    pub fn new(manager: M, registry: Arc<TypeRegistry>) -> Self {
        Self {
            manager,
            registry,
            allow_list: AllowList::new(),
        }
    }

    /// Create a resolver and apply `config`.
    pub fn with_config(manager: M, registry: Arc<TypeRegistry>, config: ResolverConfig) -> Self {
        let mut resolver = Self::new(manager, registry);
        resolver.set_options(config);
        resolver
    }

    /// Apply configuration.
    ///
    /// Replaces the whole allow-list when `allowed_targets` is present and
    /// leaves it untouched otherwise.
    pub fn set_options(&mut self, config: ResolverConfig) {
        if let Some(allowed_targets) = config.allowed_targets {
            self.set_allow_list(allowed_targets);
        }
    }

    /// The host object manager
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// The type registry used for hierarchy matching
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The current allow-list
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    // ═══════════════════════════════════════════════════════════════════
    // Object Resolution
    // ═══════════════════════════════════════════════════════════════════

    /// Load the object referenced by `name`, or `None` if the reference is
    /// unset.
    ///
    /// A reference to a record that no longer exists also yields `None`,
    /// as reported by the object manager.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the owner does not declare `name`
    /// - `Repository` if the object manager fails
    pub fn resolve<O>(&self, owner: &O, name: &str) -> Result<Option<M::Object>>
    where
        O: HasReferences + ?Sized,
    {
        let Some(reference) = owner.references().get(name)? else {
            return Ok(None);
        };

        debug!(
            owner = %owner.references().owner_type(),
            reference = name,
            target_type = %reference.target_type,
            "resolving reference"
        );
        self.load(&reference)
    }

    /// Load the object a `(type, identifiers)` pair points at, without an
    /// owner record. Inverse of [`ReferenceResolver::extract_reference_data`].
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the type name or the identifiers are empty
    /// - `Repository` if the object manager fails
    pub fn load(&self, reference: &Reference) -> Result<Option<M::Object>> {
        if reference.target_type.as_str().is_empty() || reference.identifiers.is_empty() {
            return Err(ReferenceError::InvalidArgument(
                "Both the target type and the identifiers of a reference must be set".to_string(),
            ));
        }

        debug!(
            target_type = %reference.target_type,
            fields = reference.identifiers.len(),
            "loading referenced object"
        );
        self.manager
            .find(&reference.target_type, &reference.identifiers)
            .map_err(|source| ReferenceError::Repository {
                type_tag: reference.target_type.clone(),
                source: Box::new(source),
            })
    }

    /// The `(type, identifiers)` pair identifying a live object.
    ///
    /// # Errors
    ///
    /// `NotPersisted` if the object has no identifier values yet.
    pub fn extract_reference_data(&self, object: &M::Object) -> Result<Reference> {
        let target_type = self.manager.type_of(object);
        let identifiers = self.manager.identifier_values(object);
        if identifiers.is_empty() {
            return Err(ReferenceError::NotPersisted {
                type_tag: target_type,
            });
        }
        Ok(Reference {
            target_type,
            identifiers,
        })
    }

    /// Point reference `name` of `owner` at `target`, or clear it for `None`.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the owner does not declare `name`
    /// - `InvalidState` if `target`'s type is not allowed for this reference,
    ///   or when clearing a required reference
    /// - `NotPersisted` if `target` has no identifier values yet
    pub fn assign<O>(&self, owner: &mut O, name: &str, target: Option<&M::Object>) -> Result<()>
    where
        O: HasReferences + ?Sized,
    {
        let Some(target) = target else {
            debug!(
                owner = %owner.references().owner_type(),
                reference = name,
                "clearing reference"
            );
            return owner.references_mut().set(name, None, None);
        };

        // Unknown names fail before the allow-list is consulted.
        owner.references().is_nullable(name)?;

        let owner_type = owner.references().owner_type().clone();
        let target_type = self.manager.type_of(target);
        if !self.is_allowed_type(&owner_type, name, &target_type) {
            return Err(not_allowed(&owner_type, name, &target_type));
        }

        let reference = self.extract_reference_data(target)?;
        debug!(
            owner = %owner_type,
            reference = name,
            target_type = %reference.target_type,
            "assigning reference"
        );
        owner.references_mut().set(
            name,
            Some(reference.target_type),
            Some(reference.identifiers),
        )
    }

    /// Clear reference `name` of `owner`.
    pub fn detach<O>(&self, owner: &mut O, name: &str) -> Result<()>
    where
        O: HasReferences + ?Sized,
    {
        self.assign(owner, name, None)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Allow-List
    // ═══════════════════════════════════════════════════════════════════

    /// Whether `target` may be stored in reference `name` of `owner`.
    ///
    /// Does not check that `owner` declares `name`.
    pub fn is_allowed_target<O>(&self, owner: &O, name: &str, target: &M::Object) -> bool
    where
        O: HasReferences + ?Sized,
    {
        let target_type = self.manager.type_of(target);
        self.is_allowed_type(owner.references().owner_type(), name, &target_type)
    }

    /// Type-level form of [`ReferenceResolver::is_allowed_target`].
    pub fn is_allowed_type(&self, owner_type: &TypeTag, name: &str, target_type: &TypeTag) -> bool {
        self.allow_list
            .permits(&self.registry, owner_type, name, target_type)
    }

    /// Target types configured for exactly this owner type and reference.
    ///
    /// Neither rules on ancestors of `owner_type` nor descendants of the
    /// listed types are included. Empty when the pair is unconfigured.
    pub fn allowed_targets(&self, owner_type: &TypeTag, name: &str) -> Vec<TypeTag> {
        self.allow_list.allowed_targets(owner_type, name)
    }

    /// Permit one more target type for an owner type and reference.
    pub fn add_allowed_target(
        &mut self,
        owner_type: impl Into<TypeTag>,
        name: impl Into<String>,
        target_type: impl Into<TypeTag>,
    ) {
        let (owner_type, name, target_type) = (owner_type.into(), name.into(), target_type.into());
        debug!(
            owner = %owner_type,
            reference = %name,
            target_type = %target_type,
            "allowing target type"
        );
        self.allow_list.add(owner_type, name, target_type);
    }

    /// Merge rules into the allow-list; incoming owner types replace
    /// existing entries for the same owner type as a whole.
    pub fn add_allowed_targets(&mut self, allowed_targets: AllowList) {
        debug!(owners = allowed_targets.len(), "merging allow-list");
        self.allow_list.merge(allowed_targets);
    }

    /// Replace the entire allow-list.
    pub fn set_allow_list(&mut self, allowed_targets: AllowList) {
        debug!(owners = allowed_targets.len(), "replacing allow-list");
        self.allow_list.replace(allowed_targets);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Query Filters
    // ═══════════════════════════════════════════════════════════════════

    /// Predicates selecting `owner_type` records whose reference `name`
    /// points at any record of exactly `target_type`.
    ///
    /// # Errors
    ///
    /// - `Registry(UnknownType)` if `owner_type` is not registered
    /// - `InvalidArgument` if `owner_type` cannot hold references
    /// - `InvalidState` if `target_type` is not allowed for the reference
    /// - `UnknownReference` if `owner_type` does not declare `name`
    pub fn class_filter_criteria(
        &self,
        owner_type: &TypeTag,
        name: &str,
        target_type: &TypeTag,
    ) -> Result<FilterCriteria> {
        let schema = self.registry.require_schema(owner_type)?;
        if !self.is_allowed_type(owner_type, name, target_type) {
            return Err(not_allowed(owner_type, name, target_type));
        }
        schema
            .filter_criteria(name, Some(target_type), None)
            .map_err(|e| e.reported_for(owner_type))
    }

    /// Predicates selecting `owner_type` records whose reference `name`
    /// points at `target`, or is unset for `None`.
    ///
    /// # Errors
    ///
    /// As [`ReferenceResolver::class_filter_criteria`], plus `NotPersisted`
    /// if `target` has no identifier values yet.
    pub fn entity_filter_criteria(
        &self,
        owner_type: &TypeTag,
        name: &str,
        target: Option<&M::Object>,
    ) -> Result<FilterCriteria> {
        let schema = self.registry.require_schema(owner_type)?;
        let Some(target) = target else {
            return schema
                .filter_criteria(name, None, None)
                .map_err(|e| e.reported_for(owner_type));
        };

        let reference = self.extract_reference_data(target)?;
        if !self.is_allowed_type(owner_type, name, &reference.target_type) {
            return Err(not_allowed(owner_type, name, &reference.target_type));
        }
        schema
            .filter_criteria(
                name,
                Some(&reference.target_type),
                Some(&reference.identifiers),
            )
            .map_err(|e| e.reported_for(owner_type))
    }
}

fn not_allowed(owner_type: &TypeTag, name: &str, target_type: &TypeTag) -> ReferenceError {
    ReferenceError::InvalidState(format!(
        "Type {} is not allowed for reference '{}' on {}",
        target_type, name, owner_type
    ))
}
