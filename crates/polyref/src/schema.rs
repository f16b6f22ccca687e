//! Type-level reference declarations
//!
//! A [`ReferenceSchema`] lists the named references an owner type can hold.
//! It answers every question that does not depend on a particular record
//! (names, nullability, column names, filter criteria), so class-level
//! queries never need a throwaway instance.

use indexmap::IndexMap;

use crate::error::{ReferenceError, RegistryError, Result};
use crate::filter::FilterCriteria;
use crate::types::TypeTag;
use crate::value::Identifiers;

/// Declaration of one named reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDefinition {
    /// The reference's name
    pub name: String,

    /// Whether the reference must always be set
    pub required: bool,

    /// Storage column holding the target type
    pub type_column: String,

    /// Storage column holding the encoded identifiers
    pub identifiers_column: String,
}

impl ReferenceDefinition {
    /// A reference that may be left empty
    pub fn nullable(name: impl Into<String>) -> Self {
        Self::with_requirement(name.into(), false)
    }

    /// A reference that must always point somewhere
    pub fn required(name: impl Into<String>) -> Self {
        Self::with_requirement(name.into(), true)
    }

    fn with_requirement(name: String, required: bool) -> Self {
        Self {
            type_column: format!("{}_class", name),
            identifiers_column: format!("{}_identifiers", name),
            name,
            required,
        }
    }

    /// Override the default `{name}_class` / `{name}_identifiers` columns
    pub fn with_columns(
        mut self,
        type_column: impl Into<String>,
        identifiers_column: impl Into<String>,
    ) -> Self {
        self.type_column = type_column.into();
        self.identifiers_column = identifiers_column.into();
        self
    }

    /// Inverse of `required`
    pub fn is_nullable(&self) -> bool {
        !self.required
    }
}

/// All references declared by one owner type, in declaration order.
///
/// # Example
///
/// ```
/// use polyref::{ReferenceSchema, TypeTag};
///
/// let schema = ReferenceSchema::builder("Comment")
///     .required("subject")
///     .nullable("reply_to")
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.reference_names(), vec!["subject", "reply_to"]);
/// assert!(schema.is_nullable("reply_to").unwrap());
///
/// let filter = schema
///     .filter_criteria("subject", Some(&TypeTag::new("Article")), None)
///     .unwrap();
/// assert_eq!(filter.get("subject_class"), Some(Some("Article")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSchema {
    owner: TypeTag,
    definitions: IndexMap<String, ReferenceDefinition>,
}

impl ReferenceSchema {
    /// Start declaring references for `owner`
    pub fn builder(owner: impl Into<TypeTag>) -> ReferenceSchemaBuilder {
        ReferenceSchemaBuilder {
            owner: owner.into(),
            definitions: Vec::new(),
        }
    }

    /// The declaring type
    pub fn owner(&self) -> &TypeTag {
        &self.owner
    }

    /// All declared reference names, in declaration order
    pub fn reference_names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Iterate the declarations
    pub fn definitions(&self) -> impl Iterator<Item = &ReferenceDefinition> {
        self.definitions.values()
    }

    /// Whether a reference with this name is declared
    pub fn declares(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Look up a declaration.
    ///
    /// # Errors
    ///
    /// `UnknownReference` if the name is not declared.
    pub fn definition(&self, name: &str) -> Result<&ReferenceDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| ReferenceError::UnknownReference {
                owner: self.owner.clone(),
                name: name.to_string(),
            })
    }

    /// Whether the named reference may be empty.
    pub fn is_nullable(&self, name: &str) -> Result<bool> {
        Ok(self.definition(name)?.is_nullable())
    }

    /// Build equality predicates selecting owners whose reference `name`
    /// matches the given target.
    ///
    /// - no type, no identifiers: the reference is unset (both columns NULL)
    /// - type only: the reference points at any record of that exact type
    /// - type and identifiers: the reference points at that one record
    ///
    /// An empty identifier mapping counts as no identifiers.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the name is not declared
    /// - `InvalidArgument` if identifiers are given without a type
    pub fn filter_criteria(
        &self,
        name: &str,
        target_type: Option<&TypeTag>,
        identifiers: Option<&Identifiers>,
    ) -> Result<FilterCriteria> {
        let definition = self.definition(name)?;
        let identifiers = identifiers.filter(|ids| !ids.is_empty());

        let mut criteria = FilterCriteria::new();
        match (target_type, identifiers) {
            (None, None) => {
                criteria.insert(definition.type_column.as_str(), None);
                criteria.insert(definition.identifiers_column.as_str(), None);
            }
            (Some(target_type), None) => {
                criteria.insert(
                    definition.type_column.as_str(),
                    Some(target_type.to_string()),
                );
            }
            (None, Some(_)) => {
                return Err(ReferenceError::InvalidArgument(
                    "When filtering by reference the target type must be set".to_string(),
                ));
            }
            (Some(target_type), Some(identifiers)) => {
                let encoded = encode_identifiers(name, identifiers)?;
                criteria.insert(
                    definition.type_column.as_str(),
                    Some(target_type.to_string()),
                );
                criteria.insert(definition.identifiers_column.as_str(), Some(encoded));
            }
        }
        Ok(criteria)
    }
}

pub(crate) fn encode_identifiers(name: &str, identifiers: &Identifiers) -> Result<String> {
    identifiers
        .encode()
        .map_err(|source| ReferenceError::MalformedIdentifiers {
            name: name.to_string(),
            source,
        })
}

/// Builder for [`ReferenceSchema`].
#[derive(Debug, Clone)]
pub struct ReferenceSchemaBuilder {
    owner: TypeTag,
    definitions: Vec<ReferenceDefinition>,
}

impl ReferenceSchemaBuilder {
    /// Declare a reference that may be empty
    pub fn nullable(self, name: impl Into<String>) -> Self {
        self.reference(ReferenceDefinition::nullable(name))
    }

    /// Declare a reference that must always be set
    pub fn required(self, name: impl Into<String>) -> Self {
        self.reference(ReferenceDefinition::required(name))
    }

    /// Declare a fully specified reference
    pub fn reference(mut self, definition: ReferenceDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// `DuplicateReference` if a name is declared twice.
    pub fn build(self) -> std::result::Result<ReferenceSchema, RegistryError> {
        let mut definitions = IndexMap::with_capacity(self.definitions.len());
        for definition in self.definitions {
            if definitions.contains_key(&definition.name) {
                return Err(RegistryError::DuplicateReference {
                    owner: self.owner,
                    name: definition.name,
                });
            }
            definitions.insert(definition.name.clone(), definition);
        }
        Ok(ReferenceSchema {
            owner: self.owner,
            definitions,
        })
    }
}
