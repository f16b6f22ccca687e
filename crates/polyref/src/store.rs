//! Per-record storage of named references

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ReferenceError, Result};
use crate::filter::FilterCriteria;
use crate::schema::{encode_identifiers, ReferenceSchema};
use crate::types::TypeTag;
use crate::value::Identifiers;

/// A fully set reference: the target's type and its identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Type of the referenced record
    pub target_type: TypeTag,

    /// Identifier values of the referenced record
    pub identifiers: Identifiers,
}

impl Reference {
    /// Create a reference value
    pub fn new(target_type: impl Into<TypeTag>, identifiers: Identifiers) -> Self {
        Self {
            target_type: target_type.into(),
            identifiers,
        }
    }
}

/// Raw column contents of one reference slot.
///
/// Identifiers are kept in their encoded form so the column can take part
/// in equality filters and composite keys as a single scalar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Slot {
    type_tag: Option<TypeTag>,
    identifiers: Option<String>,
}

/// Storage for the references of one owner record.
///
/// Holds one slot per reference declared in the owner's schema. Slots are
/// created up front and never added or removed afterwards.
///
/// # Example
///
/// ```
/// use polyref::{Identifiers, ReferenceSchema, ReferenceStore, TypeTag};
/// use std::sync::Arc;
///
/// let schema = ReferenceSchema::builder("Source").nullable("owner").build().unwrap();
/// let mut store = ReferenceStore::new(Arc::new(schema));
///
/// store.set("owner", Some(TypeTag::new("User")), Some(Identifiers::single("id", 3))).unwrap();
/// let reference = store.get("owner").unwrap().unwrap();
/// assert_eq!(reference.target_type, TypeTag::new("User"));
///
/// store.set("owner", None, None).unwrap();
/// assert!(store.get("owner").unwrap().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceStore {
    owner_type: TypeTag,
    schema: Arc<ReferenceSchema>,
    slots: IndexMap<String, Slot>,
}

impl ReferenceStore {
    /// Create an empty store for a record of the schema's declaring type.
    pub fn new(schema: Arc<ReferenceSchema>) -> Self {
        let owner_type = schema.owner().clone();
        Self::for_type(owner_type, schema)
    }

    /// Create an empty store for a record of `owner_type`, which declares
    /// (or inherits) `schema`.
    pub fn for_type(owner_type: TypeTag, schema: Arc<ReferenceSchema>) -> Self {
        let slots = schema
            .reference_names()
            .into_iter()
            .map(|name| (name.to_string(), Slot::default()))
            .collect();
        Self {
            owner_type,
            schema,
            slots,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Schema Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Runtime type of the owning record
    pub fn owner_type(&self) -> &TypeTag {
        &self.owner_type
    }

    /// The reference declarations this store follows
    pub fn schema(&self) -> &Arc<ReferenceSchema> {
        &self.schema
    }

    /// All declared reference names, in declaration order
    pub fn reference_names(&self) -> Vec<&str> {
        self.schema.reference_names()
    }

    /// Whether the named reference may be empty.
    ///
    /// # Errors
    ///
    /// `UnknownReference` if the name is not declared.
    pub fn is_nullable(&self, name: &str) -> Result<bool> {
        self.schema.is_nullable(name).map_err(|e| e.reported_for(&self.owner_type))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reading and Writing
    // ═══════════════════════════════════════════════════════════════════

    /// The stored reference, or `None` if it is not fully set.
    ///
    /// A column holding an empty string, or identifiers decoding to an
    /// empty mapping, counts as unset.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the name is not declared
    /// - `MalformedIdentifiers` if the stored identifier column cannot be decoded
    pub fn get(&self, name: &str) -> Result<Option<Reference>> {
        let slot = self.slot(name)?;
        let (Some(target_type), Some(encoded)) = (
            slot.type_tag.as_ref().filter(|t| !t.as_str().is_empty()),
            slot.identifiers.as_deref().filter(|ids| !ids.is_empty()),
        ) else {
            return Ok(None);
        };

        let identifiers = Identifiers::decode(encoded).map_err(|source| {
            ReferenceError::MalformedIdentifiers {
                name: name.to_string(),
                source,
            }
        })?;
        if identifiers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Reference {
            target_type: target_type.clone(),
            identifiers,
        }))
    }

    /// Whether the named reference is currently set
    pub fn is_set(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.is_some())
    }

    /// Store or clear a reference.
    ///
    /// Type and identifiers must be given together or omitted together;
    /// an empty identifier mapping counts as omitted.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the name is not declared
    /// - `InvalidArgument` if only one of type and identifiers is given
    /// - `InvalidState` if clearing a required reference
    pub fn set(
        &mut self,
        name: &str,
        target_type: Option<TypeTag>,
        identifiers: Option<Identifiers>,
    ) -> Result<()> {
        let required = self.definition_required(name)?;
        let target_type = target_type.filter(|t| !t.as_str().is_empty());
        let identifiers = identifiers.filter(|ids| !ids.is_empty());

        let slot = match (target_type, identifiers) {
            (Some(target_type), Some(identifiers)) => Slot {
                identifiers: Some(encode_identifiers(name, &identifiers)?),
                type_tag: Some(target_type),
            },
            (None, None) if required => {
                return Err(ReferenceError::InvalidState(format!(
                    "Reference '{}' cannot be NULL",
                    name
                )));
            }
            (None, None) => Slot::default(),
            _ => {
                return Err(ReferenceError::InvalidArgument(
                    "When setting a reference, both target type and identifiers must be set or empty"
                        .to_string(),
                ));
            }
        };

        debug!(
            owner = %self.owner_type,
            reference = name,
            target_type = ?slot.type_tag.as_ref().map(TypeTag::as_str),
            "storing reference"
        );
        *self.slot_mut(name)? = slot;
        Ok(())
    }

    /// Query predicates for owners of this record's type whose reference
    /// `name` matches the given target. See [`ReferenceSchema::filter_criteria`].
    pub fn filter_criteria(
        &self,
        name: &str,
        target_type: Option<&TypeTag>,
        identifiers: Option<&Identifiers>,
    ) -> Result<FilterCriteria> {
        self.schema
            .filter_criteria(name, target_type, identifiers)
            .map_err(|e| e.reported_for(&self.owner_type))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Persistence Bridge
    // ═══════════════════════════════════════════════════════════════════

    /// Column values to persist, in declaration order.
    pub fn columns(&self) -> IndexMap<String, Option<String>> {
        let mut columns = IndexMap::with_capacity(self.slots.len() * 2);
        for definition in self.schema.definitions() {
            let slot = self.slots.get(&definition.name).cloned().unwrap_or_default();
            columns.insert(
                definition.type_column.clone(),
                slot.type_tag.map(|t| t.to_string()),
            );
            columns.insert(definition.identifiers_column.clone(), slot.identifiers);
        }
        columns
    }

    /// Hydrate one slot from persisted column values.
    ///
    /// The storage layer is trusted: values are taken as-is, without the
    /// checks [`ReferenceStore::set`] performs.
    pub fn load_columns(
        &mut self,
        name: &str,
        type_tag: Option<String>,
        identifiers: Option<String>,
    ) -> Result<()> {
        let slot = self.slot_mut(name)?;
        slot.type_tag = type_tag.map(TypeTag::from);
        slot.identifiers = identifiers;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.slots
            .get(name)
            .ok_or_else(|| ReferenceError::UnknownReference {
                owner: self.owner_type.clone(),
                name: name.to_string(),
            })
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot> {
        let owner = &self.owner_type;
        self.slots
            .get_mut(name)
            .ok_or_else(|| ReferenceError::UnknownReference {
                owner: owner.clone(),
                name: name.to_string(),
            })
    }

    fn definition_required(&self, name: &str) -> Result<bool> {
        self.schema
            .definition(name)
            .map(|d| d.required)
            .map_err(|e| e.reported_for(&self.owner_type))
    }
}

/// Capability of records that hold polymorphic references.
///
/// Implementors expose their [`ReferenceStore`]; everything else is
/// provided through it.
pub trait HasReferences {
    /// The record's reference storage
    fn references(&self) -> &ReferenceStore;

    /// Mutable access to the record's reference storage
    fn references_mut(&mut self) -> &mut ReferenceStore;

    /// Runtime type of the record
    fn owner_type(&self) -> &TypeTag {
        self.references().owner_type()
    }
}

impl HasReferences for ReferenceStore {
    fn references(&self) -> &ReferenceStore {
        self
    }

    fn references_mut(&mut self) -> &mut ReferenceStore {
        self
    }
}
