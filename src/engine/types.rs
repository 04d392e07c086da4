//! Core Identifiers, Relation Flags, and the Type Algebra
//!
//! This module defines the **fundamental identifiers, bit layouts, and type
//! algebra** used throughout the query matching core. These definitions form
//! the *semantic backbone* of the system and are shared across all subsystems,
//! including the component registry, tables, prefab resolution, and query
//! compilation.
//!
//! ## Entity Representation
//!
//! Entities are opaque 64-bit identifiers. The two highest bits are reserved
//! for relation flags embedded directly in archetype types:
//!
//! ```text
//! | CHILDOF | INSTANCEOF | entity id |
//! ```
//!
//! - **CHILDOF** marks a container relation: the flagged entry names the
//!   parent entity that contains the members of the table.
//! - **INSTANCEOF** marks a prefab inheritance relation: the flagged entry
//!   names the base entity whose components are shared with instances.
//! - The low bits below the flags form the *entity mask*.
//!
//! The bit layout is validated with compile-time assertions.
//!
//! ## Types
//!
//! An [`EntityType`] is a canonicalised, ascending-sorted sequence of entity
//! identifiers. Equal multisets have equal types, so a type uniquely
//! identifies an archetype table and can key the table map directly. Types
//! are immutable once interned by a table; the only growth operation is
//! [`EntityType::with`], which produces a new type.
//!
//! ## World-aware algebra
//!
//! Containment tests optionally follow INSTANCEOF links, which requires
//! access to the entity index. Those operations live here as free functions
//! taking a [`World`] reference, keeping the pure sequence operations and the
//! inheritance-aware ones side by side.

use crate::engine::world::World;


/// Globally unique entity identifier.
pub type EntityId = u64;
/// Identifier of an archetype table within the world's table store.
pub type TableId = u32;
/// Identifier of a query within the query registry.
pub type QueryId = u32;

/// Sentinel for "no entity". Also the null owner of an unresolved reference.
pub const INVALID_ENTITY: EntityId = 0;

/// Relation flag marking a container (parent) entry in a type.
pub const CHILDOF: EntityId = 1 << 63;
/// Relation flag marking a prefab inheritance entry in a type.
pub const INSTANCEOF: EntityId = 1 << 62;
/// Mask selecting the plain entity id below the relation flags.
pub const ENTITY_MASK: EntityId = INSTANCEOF - 1;

/// Reserved tag carried by prefab entities; tables holding it are filtered
/// out of query matching unless a query opts in.
pub const PREFAB_MARKER: EntityId = 1;
/// Reserved tag carried by disabled entities; tables holding it are filtered
/// out of query matching unless a query opts in.
pub const DISABLED_MARKER: EntityId = 2;
/// First identifier handed out by a fresh world.
pub const FIRST_USER_ENTITY: EntityId = 3;

const _: [(); 1] = [(); ((CHILDOF & INSTANCEOF) == 0) as usize];
const _: [(); 1] = [(); (((CHILDOF | INSTANCEOF) & ENTITY_MASK) == 0) as usize];
const _: [(); 1] = [(); ((PREFAB_MARKER & !ENTITY_MASK) == 0) as usize];
const _: [(); 1] = [(); ((DISABLED_MARKER & !ENTITY_MASK) == 0) as usize];

/// Tags `parent` as a container relation entry.
#[inline]
pub const fn childof(parent: EntityId) -> EntityId {
    CHILDOF | parent
}

/// Tags `base` as a prefab inheritance entry.
#[inline]
pub const fn instanceof(base: EntityId) -> EntityId {
    INSTANCEOF | base
}

/// Strips the relation flags from an identifier.
#[inline]
pub const fn entity_of(id: EntityId) -> EntityId {
    id & ENTITY_MASK
}

/// Canonical, ascending-sorted sequence of entity identifiers.
///
/// ## Purpose
/// An `EntityType` describes the exact component multiset of an archetype
/// table: plain entries are components, flagged entries are CHILDOF or
/// INSTANCEOF relations. Canonical ordering is total, so two types compare
/// equal exactly when their multisets are equal, which lets the world use a
/// type directly as the archetype key.
///
/// ## Invariants
/// - Entries are strictly ascending (sorted and deduplicated).
/// - A type is never mutated after a table interns it; [`EntityType::with`]
///   produces a new type instead.

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityType {
    entries: Vec<EntityId>,
}

impl EntityType {
    /// Creates the empty type.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a canonical type from an arbitrary id list.
    ///
    /// ## Behavior
    /// Sorts ascending and removes duplicates.
    pub fn from_ids(ids: &[EntityId]) -> Self {
        let mut entries = ids.to_vec();
        entries.sort_unstable();
        entries.dedup();
        Self { entries }
    }

    /// Returns the canonical entry sequence.
    #[inline]
    pub fn entries(&self) -> &[EntityId] {
        &self.entries
    }

    /// Number of entries in the type.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the type has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `id` is an entry of this type (flags included).
    #[inline]
    pub fn has(&self, id: EntityId) -> bool {
        self.entries.binary_search(&id).is_ok()
    }

    /// Position of `id` in the canonical order, if present.
    #[inline]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entries.binary_search(&id).ok()
    }

    /// Produces a new type with `id` added at its canonical position.
    ///
    /// Adding an entry that is already present returns an equal type.
    pub fn with(&self, id: EntityId) -> Self {
        let mut next = self.clone();
        next.insert(id);
        next
    }

    /// Inserts `id` at its canonical position, keeping entries deduplicated.
    pub(crate) fn insert(&mut self, id: EntityId) {
        if let Err(slot) = self.entries.binary_search(&id) {
            self.entries.insert(slot, id);
        }
    }
}

impl FromIterator<EntityId> for EntityType {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        let ids: Vec<EntityId> = iter.into_iter().collect();
        Self::from_ids(&ids)
    }
}

/// Returns a witness component from `sub` that is present in `sup`.
///
/// ## Purpose
/// The workhorse containment test of the matcher. `sup` is usually an
/// archetype type; `sub` is a query accumulator or an Or group.
///
/// ## Behavior
/// - With `match_all`, every element of `sub` must be present; the witness is
///   the **last** matched element and the scan short-circuits on the first
///   missing one.
/// - Without `match_all`, the **first** present element wins and the scan
///   short-circuits on it.
/// - With `search_prefabs`, INSTANCEOF entries of `sup` are followed
///   transitively. The caller guarantees the inheritance graph is acyclic.
///
/// Returns [`INVALID_ENTITY`] when nothing matches, and also for an empty
/// `sub`; callers guard empty accumulators before testing.

pub fn type_contains(
    world: &World,
    sup: &EntityType,
    sub: &EntityType,
    match_all: bool,
    search_prefabs: bool,
) -> EntityId {
    let mut witness = INVALID_ENTITY;

    for &component in sub.entries() {
        let present = owns_or_inherits(world, sup, component, search_prefabs);

        if match_all {
            if !present {
                return INVALID_ENTITY;
            }
            witness = component;
        } else if present {
            return component;
        }
    }

    witness
}

/// Returns `true` if `entity` is an entry of `sup`, optionally following
/// INSTANCEOF links.
#[inline]
pub fn type_has_entity(
    world: &World,
    sup: &EntityType,
    entity: EntityId,
    search_prefabs: bool,
) -> bool {
    owns_or_inherits(world, sup, entity, search_prefabs)
}

fn owns_or_inherits(
    world: &World,
    sup: &EntityType,
    component: EntityId,
    search_prefabs: bool,
) -> bool {
    if sup.has(component) {
        return true;
    }

    if search_prefabs {
        for &entry in sup.entries() {
            if entry & INSTANCEOF == 0 {
                continue;
            }

            let base = entry & ENTITY_MASK;
            if let Some(base_type) = world.get_type(base) {
                if owns_or_inherits(world, base_type, component, true) {
                    return true;
                }
            }
        }
    }

    false
}
