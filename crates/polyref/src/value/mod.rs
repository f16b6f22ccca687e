//! Identifier values carried by references

mod identifiers;
mod scalar;

pub use identifiers::Identifiers;
pub use scalar::Scalar;
