// ── Reference resolver ──
//
// Turns candidate IDs into validated references against a catalog listing.
// Pure: no I/O, and the catalog is never modified.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::model::{EntityId, FirewallGroupRef, ProfileRef};

/// A catalog listing entry that rules may reference.
pub trait CatalogItem {
    /// Entity label used in `NotFound` errors.
    const ENTITY_TYPE: &'static str;
    type Ref: Clone;

    fn id(&self) -> &EntityId;

    /// Whether the entry may be placed into general-purpose rules.
    fn is_eligible(&self) -> bool {
        true
    }

    fn to_ref(&self) -> Self::Ref;
}

// ── Catalog entries ─────────────────────────────────────────────────

/// Application-port profile as listed by the profile catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationPortProfileEntry {
    pub reference: ProfileRef,
    pub description: Option<String>,
}

/// Network-context profile as listed by the profile catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContextProfileEntry {
    pub reference: ProfileRef,
    pub description: Option<String>,
}

impl NetworkContextProfileEntry {
    /// Application-level-gateway profiles cannot be mixed into ordinary rules.
    pub fn is_alg(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| d.contains("ALG"))
    }
}

impl CatalogItem for FirewallGroupRef {
    const ENTITY_TYPE: &'static str = "firewall group";
    type Ref = FirewallGroupRef;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn to_ref(&self) -> Self::Ref {
        self.clone()
    }
}

impl CatalogItem for ApplicationPortProfileEntry {
    const ENTITY_TYPE: &'static str = "application port profile";
    type Ref = ProfileRef;

    fn id(&self) -> &EntityId {
        &self.reference.id
    }

    fn to_ref(&self) -> Self::Ref {
        self.reference.clone()
    }
}

impl CatalogItem for NetworkContextProfileEntry {
    const ENTITY_TYPE: &'static str = "network context profile";
    type Ref = ProfileRef;

    fn id(&self) -> &EntityId {
        &self.reference.id
    }

    fn is_eligible(&self) -> bool {
        !self.is_alg()
    }

    fn to_ref(&self) -> Self::Ref {
        self.reference.clone()
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Resolve `candidate_ids` against `catalog`, preserving candidate order.
///
/// Duplicate candidates collapse to their first occurrence. An ID missing
/// from the catalog fails with `NotFound`; ineligible entries are dropped.
pub fn resolve<T: CatalogItem>(
    candidate_ids: &[EntityId],
    catalog: &[T],
) -> Result<Vec<T::Ref>, CoreError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(candidate_ids.len());

    for id in candidate_ids {
        if !seen.insert(id) {
            continue;
        }
        let entry = catalog
            .iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| CoreError::not_found(T::ENTITY_TYPE, id.as_str()))?;
        if entry.is_eligible() {
            resolved.push(entry.to_ref());
        }
    }

    Ok(resolved)
}

/// Every eligible catalog entry, in catalog order.
pub fn resolve_all<T: CatalogItem>(catalog: &[T]) -> Vec<T::Ref> {
    catalog
        .iter()
        .filter(|item| item.is_eligible())
        .map(CatalogItem::to_ref)
        .collect()
}
