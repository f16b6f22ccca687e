//! Seam to the host's persistence layer

use crate::types::TypeTag;
use crate::value::Identifiers;

/// Access to the host's mapped objects.
///
/// The resolver never stores or loads records itself. It asks the object
/// manager for a live object's type and identifier values, and to load an
/// object back from a `(type, identifiers)` pair.
pub trait ObjectManager {
    /// Live object handle returned by loads and accepted as a target
    type Object;

    /// Failure reported by [`ObjectManager::find`]
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runtime type of a live object
    fn type_of(&self, object: &Self::Object) -> TypeTag;

    /// Identifier field values of a live object, in key order.
    ///
    /// An empty mapping means the object has not been persisted yet.
    fn identifier_values(&self, object: &Self::Object) -> Identifiers;

    /// Load the object of `type_tag` identified by `identifiers`.
    ///
    /// `Ok(None)` means no such object exists.
    fn find(
        &self,
        type_tag: &TypeTag,
        identifiers: &Identifiers,
    ) -> Result<Option<Self::Object>, Self::Error>;
}

impl<M: ObjectManager + ?Sized> ObjectManager for &M {
    type Object = M::Object;
    type Error = M::Error;

    fn type_of(&self, object: &Self::Object) -> TypeTag {
        (**self).type_of(object)
    }

    fn identifier_values(&self, object: &Self::Object) -> Identifiers {
        (**self).identifier_values(object)
    }

    fn find(
        &self,
        type_tag: &TypeTag,
        identifiers: &Identifiers,
    ) -> Result<Option<Self::Object>, Self::Error> {
        (**self).find(type_tag, identifiers)
    }
}
