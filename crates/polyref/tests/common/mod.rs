//! Shared fixtures: a small type hierarchy and an in-memory object manager
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use polyref::*;

pub const SOURCE: &str = "Source";
pub const SOURCE_CHILD: &str = "SourceChild";
pub const TARGET: &str = "Target";
pub const TARGET_CHILD: &str = "TargetChild";
pub const NOT_ALLOWED: &str = "NotAllowed";

pub fn tag(name: &str) -> TypeTag {
    TypeTag::new(name)
}

/// Source (nullable, required) <- SourceChild; Target <- TargetChild; NotAllowed
pub fn registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    let schema = ReferenceSchema::builder(SOURCE)
        .nullable("nullable")
        .required("required")
        .build()
        .unwrap();
    registry.register_with_schema(schema, &[]).unwrap();
    registry.register(SOURCE_CHILD, &[SOURCE]).unwrap();
    registry.register(TARGET, &[]).unwrap();
    registry.register(TARGET_CHILD, &[TARGET]).unwrap();
    registry.register(NOT_ALLOWED, &[]).unwrap();
    Arc::new(registry)
}

/// `{"Source": {"nullable": ["Target"]}}`; "required" is deliberately unlisted.
pub fn allow_list() -> AllowList {
    vec![(SOURCE, "nullable", TARGET)].into_iter().collect()
}

/// A mapped record; `id` is `None` until it has been saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub type_tag: TypeTag,
    pub id: Option<i64>,
}

impl Entity {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_tag: tag(type_name),
            id: None,
        }
    }

    pub fn saved(type_name: &str, id: i64) -> Self {
        Self {
            type_tag: tag(type_name),
            id: Some(id),
        }
    }
}

/// An owner record carrying its reference columns next to its own id.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: Option<i64>,
    pub references: ReferenceStore,
}

impl SourceRecord {
    pub fn new(registry: &TypeRegistry, type_name: &str) -> Self {
        Self {
            id: None,
            references: registry.new_store(&tag(type_name)).unwrap(),
        }
    }
}

impl HasReferences for SourceRecord {
    fn references(&self) -> &ReferenceStore {
        &self.references
    }

    fn references_mut(&mut self) -> &mut ReferenceStore {
        &mut self.references
    }
}

#[derive(Debug, thiserror::Error)]
#[error("database is offline")]
pub struct Offline;

/// Object manager over a list of saved entities that records every `find`.
#[derive(Debug, Default)]
pub struct InMemoryManager {
    pub entities: RefCell<Vec<Entity>>,
    pub finds: RefCell<Vec<(TypeTag, Identifiers)>>,
    pub offline: Cell<bool>,
}

impl InMemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity, assigning the next id
    pub fn persist(&self, entity: &mut Entity) {
        let mut entities = self.entities.borrow_mut();
        entity.id = Some(entities.len() as i64 + 1);
        entities.push(entity.clone());
    }

    pub fn insert(&self, entity: Entity) {
        self.entities.borrow_mut().push(entity);
    }
}

impl ObjectManager for InMemoryManager {
    type Object = Entity;
    type Error = Offline;

    fn type_of(&self, object: &Entity) -> TypeTag {
        object.type_tag.clone()
    }

    fn identifier_values(&self, object: &Entity) -> Identifiers {
        match object.id {
            Some(id) => Identifiers::single("id", id),
            None => Identifiers::new(),
        }
    }

    fn find(
        &self,
        type_tag: &TypeTag,
        identifiers: &Identifiers,
    ) -> std::result::Result<Option<Entity>, Offline> {
        self.finds
            .borrow_mut()
            .push((type_tag.clone(), identifiers.clone()));
        if self.offline.get() {
            return Err(Offline);
        }
        let id = identifiers.get("id").and_then(Scalar::as_i64);
        Ok(self
            .entities
            .borrow()
            .iter()
            .find(|e| &e.type_tag == type_tag && e.id == id)
            .cloned())
    }
}

pub fn resolver(manager: InMemoryManager) -> ReferenceResolver<InMemoryManager> {
    ReferenceResolver::with_config(
        manager,
        registry(),
        ResolverConfig::with_allowed_targets(allow_list()),
    )
}
