//! # Prefab and Container Resolution
//!
//! Helpers that follow CHILDOF and INSTANCEOF links to locate the entity
//! that actually stores a component. The plan builder uses them to bind
//! references; the matcher uses them for container-sourced terms.
//!
//! A missing record for a CHILDOF parent is a structural invariant violation
//! and panics: containers are spawned before their children.

use crate::engine::types::{
    entity_of, type_contains, type_has_entity, EntityId, EntityType, CHILDOF, INSTANCEOF,
    INVALID_ENTITY,
};
use crate::engine::world::World;


/// Locates the entity whose own type stores `component`.
///
/// ## Behavior
/// - When `start` is a live entity, its own type replaces `type_` as the
///   search root; owning the component directly resolves to `start` itself.
/// - Otherwise the INSTANCEOF links of the root type are searched depth
///   first for the prefab that owns the component.
///
/// ## Returns
/// The owning entity, or [`INVALID_ENTITY`] when no prefab in the
/// inheritance graph owns the component.
///
/// ## Panics
/// Panics when `start` names an entity without a record.

pub fn find_owning_entity(
    world: &World,
    start: EntityId,
    type_: &EntityType,
    component: EntityId,
) -> EntityId {
    let root: &EntityType = if start != INVALID_ENTITY {
        world
            .get_type(start)
            .expect("missing record while resolving a component owner")
    } else {
        type_
    };

    if root.has(component) {
        return start;
    }

    find_in_prefabs(world, root, component)
}

fn find_in_prefabs(world: &World, type_: &EntityType, component: EntityId) -> EntityId {
    for &entry in type_.entries() {
        if entry & INSTANCEOF == 0 {
            continue;
        }

        let base = entity_of(entry);
        let Some(base_type) = world.get_type(base) else {
            continue;
        };

        if base_type.has(component) {
            return base;
        }

        let deeper = find_in_prefabs(world, base_type, component);
        if deeper != INVALID_ENTITY {
            return deeper;
        }
    }

    INVALID_ENTITY
}

/// Searches the CHILDOF parents of `table_type` for one that provides any
/// (or all) of `sub`.
///
/// ## Behavior
/// For each CHILDOF entry, the parent's own type is dereferenced and tested
/// with [`type_contains`], following the parent's prefabs. The first parent
/// that satisfies the test wins.
///
/// ## Returns
/// `(parent, witness)` on success.
///
/// ## Panics
/// Panics when a CHILDOF entry names an entity without a record.

pub fn components_contains(
    world: &World,
    table_type: &EntityType,
    sub: &EntityType,
    match_all: bool,
) -> Option<(EntityId, EntityId)> {
    for &entry in table_type.entries() {
        if entry & CHILDOF == 0 {
            continue;
        }

        let parent = entity_of(entry);
        let parent_type = world
            .get_type(parent)
            .expect("missing record for a container parent");

        let witness = type_contains(world, parent_type, sub, match_all, true);
        if witness != INVALID_ENTITY {
            return Some((parent, witness));
        }
    }

    None
}

/// Singular fast path: the first CHILDOF parent providing `component`.
///
/// ## Panics
/// Panics when a CHILDOF entry names an entity without a record.

pub fn components_contains_component(
    world: &World,
    table_type: &EntityType,
    component: EntityId,
) -> Option<EntityId> {
    for &entry in table_type.entries() {
        if entry & CHILDOF == 0 {
            continue;
        }

        let parent = entity_of(entry);
        let parent_type = world
            .get_type(parent)
            .expect("missing record for a container parent");

        if type_has_entity(world, parent_type, component, true) {
            return Some(parent);
        }
    }

    None
}
