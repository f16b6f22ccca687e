//! Which target types each owner type may reference
//!
//! The allow-list maps `owner type -> reference name -> target types`.
//! Anything it does not mention is unrestricted: an owner type missing from
//! the list, or a reference name missing under a listed owner, accepts every
//! target. Only a rule that names both the owner (or one of its ancestors)
//! and the reference can reject a target.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::types::{TypeRegistry, TypeTag};

/// Target types permitted per reference name, for one owner type.
pub type ReferenceRules = IndexMap<String, IndexSet<TypeTag>>;

/// Configured target restrictions, keyed by owner type.
///
/// Owner keys keep insertion order; rule evaluation walks them in that order.
///
/// # Example
///
/// ```
/// use polyref::{AllowList, TypeRegistry, TypeTag};
///
/// let mut registry = TypeRegistry::new();
/// registry.register("Post", &[]).unwrap();
/// registry.register("Image", &[]).unwrap();
/// registry.register("Video", &[]).unwrap();
///
/// let mut allow = AllowList::new();
/// allow.add("Post", "attachment", "Image");
///
/// let post = TypeTag::new("Post");
/// assert!(allow.permits(&registry, &post, "attachment", &TypeTag::new("Image")));
/// assert!(!allow.permits(&registry, &post, "attachment", &TypeTag::new("Video")));
/// // "cover" has no rule, so anything goes
/// assert!(allow.permits(&registry, &post, "cover", &TypeTag::new("Video")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    entries: IndexMap<TypeTag, ReferenceRules>,
}

impl AllowList {
    /// Create an empty allow-list (everything permitted)
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════

    /// Permit one more target type for an owner/reference pair.
    ///
    /// Creates the owner entry and the reference rule as needed. Adding a
    /// target that is already listed has no effect.
    pub fn add(
        &mut self,
        owner_type: impl Into<TypeTag>,
        name: impl Into<String>,
        target_type: impl Into<TypeTag>,
    ) {
        self.entries
            .entry(owner_type.into())
            .or_default()
            .entry(name.into())
            .or_default()
            .insert(target_type.into());
    }

    /// Merge another allow-list into this one, owner by owner.
    ///
    /// The merge is shallow: an incoming owner entry replaces the existing
    /// entry for the same owner as a whole, dropping any of its reference
    /// rules the incoming entry does not repeat. Owners only present on one
    /// side are kept.
    pub fn merge(&mut self, other: AllowList) {
        other.warn_empty_rules();
        self.entries.extend(other.entries);
    }

    /// Replace all owner entries with `other`'s.
    pub fn replace(&mut self, other: AllowList) {
        other.warn_empty_rules();
        *self = other;
    }

    /// Remove every restriction
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Target types listed for exactly this owner type and reference name.
    ///
    /// No hierarchy matching: rules configured on an ancestor of
    /// `owner_type` are not returned, nor are descendants of the listed
    /// targets. Empty when nothing is configured for the pair.
    pub fn allowed_targets(&self, owner_type: &TypeTag, name: &str) -> Vec<TypeTag> {
        self.entries
            .get(owner_type)
            .and_then(|rules| rules.get(name))
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Rules configured for exactly this owner type
    pub fn rules(&self, owner_type: &TypeTag) -> Option<&ReferenceRules> {
        self.entries.get(owner_type)
    }

    /// Owner types with configured rules, in insertion order
    pub fn owner_types(&self) -> impl Iterator<Item = &TypeTag> {
        self.entries.keys()
    }

    /// Number of configured owner types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No restrictions configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `target_type` may be stored in reference `name` of an
    /// `owner_type` record.
    ///
    /// Every owner key that `owner_type` is (or descends from) and that has
    /// a rule for `name` is consulted. The first listed target that
    /// `target_type` is (or descends from) permits the reference. If such
    /// rules exist but none lists a matching target, the reference is
    /// rejected. If no owner key has a rule for `name` at all, the pair is
    /// unconfigured and everything is permitted.
    ///
    /// The reference name itself is not checked against the owner's schema.
    pub fn permits(
        &self,
        registry: &TypeRegistry,
        owner_type: &TypeTag,
        name: &str,
        target_type: &TypeTag,
    ) -> bool {
        let mut rule_found = false;

        for (listed_owner, rules) in &self.entries {
            if !registry.is_a(owner_type, listed_owner) {
                continue;
            }
            let Some(targets) = rules.get(name) else {
                continue;
            };

            // A rule for this owner and reference exists, whether or not the
            // target matches it.
            rule_found = true;
            trace!(
                owner = %owner_type,
                rule_owner = %listed_owner,
                reference = name,
                target_type = %target_type,
                "checking allow-list rule"
            );

            if targets
                .iter()
                .any(|allowed| registry.is_a(target_type, allowed))
            {
                return true;
            }
        }

        !rule_found
    }

    fn warn_empty_rules(&self) {
        for (owner_type, rules) in &self.entries {
            for (name, targets) in rules {
                if targets.is_empty() {
                    warn!(
                        owner = %owner_type,
                        reference = %name,
                        "allow-list rule lists no target types; every target will be rejected"
                    );
                }
            }
        }
    }
}

impl<O, N, T> FromIterator<(O, N, T)> for AllowList
where
    O: Into<TypeTag>,
    N: Into<String>,
    T: Into<TypeTag>,
{
    fn from_iter<I: IntoIterator<Item = (O, N, T)>>(iter: I) -> Self {
        let mut allow = AllowList::new();
        for (owner_type, name, target_type) in iter {
            allow.add(owner_type, name, target_type);
        }
        allow
    }
}
