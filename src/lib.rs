//! # Quarry
//!
//! Query matching and archetype-column routing core for Entity-Component-
//! System worlds.
//!
//! ## Design Goals
//! - Archetype-granular matching: queries select whole tables, never single
//!   entities
//! - Declarative signatures with source qualifiers (self, owned, shared,
//!   container, entity, system, cascade) and operators (and, or, optional,
//!   not)
//! - Pre-computed per-column access plans: direct column, handle-only
//!   marker, or reference through the prefab/container graph
//! - Incremental re-matching as new tables appear
//!
//! Everything else of an ECS runtime (system scheduling, storage mutation,
//! change tracking beyond watches) belongs to the host.

#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::world::{ColumnRef, TableEvent, World};

pub use engine::registry::QueryRegistry;

pub use engine::query::{ColumnPlan, MatchedTable, Query, Reference};

pub use engine::signature::{
    FromKind,
    OpKind,
    Payload,
    Signature,
    SignatureBuilder,
    SignatureColumn,
};

pub use engine::types::{
    childof,
    entity_of,
    instanceof,
    type_contains,
    type_has_entity,
    EntityId,
    EntityType,
    QueryId,
    TableId,
    CHILDOF,
    DISABLED_MARKER,
    ENTITY_MASK,
    INSTANCEOF,
    INVALID_ENTITY,
    PREFAB_MARKER,
};

pub use engine::component::{ComponentInfo, ComponentRegistry};
pub use engine::entity::Record;
pub use engine::table::{Column, Table};

pub use engine::resolve::{
    components_contains,
    components_contains_component,
    find_owning_entity,
};

pub use engine::error::{
    EcsError,
    EcsResult,
    RegistryError,
    SignatureError,
    SpawnError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use quarry::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        childof,
        instanceof,
        ColumnPlan,
        EntityId,
        EntityType,
        QueryRegistry,
        SignatureBuilder,
        World,
        INVALID_ENTITY,
    };
}
