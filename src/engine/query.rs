//! # Query Compilation, Matching, and Column Planning
//!
//! This module is the heart of the core: it reduces a signature into a
//! compact matching summary, decides whether an archetype table satisfies a
//! query, and builds the per-column access plan for every matched table.
//!
//! ## Pipeline
//!
//! 1. **Postprocess** (once per query): a single pass over the signature
//!    accumulates per-kind types (`and_from_*`, `not_from_*`) used for fast
//!    table rejection, registers watches for fixed-entity sources, and
//!    records the cascade column. Negated columns are rewritten to the empty
//!    source afterwards so the plan builder can treat them uniformly as
//!    handle-only.
//! 2. **Match** (per table): ordered rejection tests: marker filters, the
//!    AND bulks, the NOT bulks, then the per-term checks for constructs the
//!    summary cannot capture (container terms, fixed-entity terms, Or
//!    groups).
//! 3. **Plan** (per matched table): every signature column is resolved to a
//!    [`ColumnPlan`]: a direct table column, a handle-only marker, or a
//!    reference to a component owned by another entity (container parent,
//!    prefab, fixed entity, or system).
//!
//! ## Shared-component semantics
//!
//! A `Shared` term matches when the components are *inheritable and not
//! owned*; an owned component overrides the shared source and rejects the
//! table. The negated rule is the exact dual. This asymmetry is the only
//! place owned-overrides-shared is enforced and is preserved verbatim.
//!
//! ## References
//!
//! A reference names the entity a column's data must be fetched from, plus a
//! versioned cache handle into that entity's column. Referenced entities are
//! watched so the host invalidates plans when they mutate. Cache handles go
//! stale when the owning column reallocates; resolution then misses and the
//! caller re-fetches through the world.

use crate::engine::resolve::{components_contains, components_contains_component, find_owning_entity};
use crate::engine::signature::{FromKind, OpKind, Signature};
use crate::engine::types::{
    type_contains, type_has_entity, EntityId, EntityType, TableId, INVALID_ENTITY,
};
use crate::engine::world::{ColumnRef, World};


/// Resolved access plan of one signature column within a matched table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPlan {
    /// Data lives in the table at this storage column (0 is the entity
    /// column, so component columns start at 1).
    Column(usize),
    /// No data to fetch: a tag, a handle-only term, or a missing optional.
    Handle,
    /// Data lives on another entity; index into the reference list.
    Reference(usize),
}

/// Plan entry naming an external entity a column's data is fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// Entity owning the referenced component, or the invalid entity for a
    /// cascade term matched against a root table.
    pub entity: EntityId,
    /// The referenced component.
    pub component: EntityId,
    /// Versioned handle into the owner's column; `None` when the owner is
    /// invalid.
    pub cached: Option<ColumnRef>,
}

impl Reference {
    /// Resolves the cached handle to the referenced element's bytes.
    ///
    /// Returns `None` when the owner is invalid or the cache went stale
    /// because the owning column reallocated.
    pub fn resolve<'w>(&self, world: &'w World) -> Option<&'w [u8]> {
        self.cached.as_ref().and_then(|handle| world.column_data(handle))
    }
}

/// Pre-computed access plan of one table matched by a query.
///
/// ## Invariants
/// - `columns` and `components` follow signature column order.
/// - References are numbered in signature order restricted to reference
///   terms.
/// - A table appears in a query's matched list at most once.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedTable {
    /// The matched table.
    pub table: TableId,
    /// Per-column access plan.
    pub columns: Vec<ColumnPlan>,
    /// Per-column resolved component (Or groups differ per table).
    pub components: Vec<EntityId>,
    /// External components the plan reads through.
    pub references: Vec<Reference>,
    /// Whether the underlying table currently holds rows.
    pub active: bool,
}

/// A compiled query: signature, matching summary, and matched tables.
///
/// ## Lifecycle
/// Born from a signature moved into the registry; the summary is computed
/// once; the matched-table list grows monotonically as tables appear.

pub struct Query {
    signature: Signature,
    system: EntityId,

    and_from_self: EntityType,
    and_from_owned: EntityType,
    and_from_shared: EntityType,
    and_from_system: EntityType,
    not_from_self: EntityType,
    not_from_owned: EntityType,
    not_from_shared: EntityType,
    not_from_component: EntityType,

    cascade_by: usize,
    has_refs: bool,
    tables: Vec<MatchedTable>,
}

impl Query {
    pub(crate) fn new(signature: Signature, system: EntityId) -> Self {
        Self {
            signature,
            system,
            and_from_self: EntityType::new(),
            and_from_owned: EntityType::new(),
            and_from_shared: EntityType::new(),
            and_from_system: EntityType::new(),
            not_from_self: EntityType::new(),
            not_from_owned: EntityType::new(),
            not_from_shared: EntityType::new(),
            not_from_component: EntityType::new(),
            cascade_by: 0,
            has_refs: false,
            tables: Vec::new(),
        }
    }

    /// The query's signature.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The system entity owning the query, or the invalid entity.
    #[inline]
    pub fn system(&self) -> EntityId {
        self.system
    }

    /// 1-based column index of the cascade term, or 0 when none exists.
    ///
    /// With several cascade terms the last one wins.
    #[inline]
    pub fn cascade_by(&self) -> usize {
        self.cascade_by
    }

    /// `true` iff at least one matched table reads through references.
    #[inline]
    pub fn has_refs(&self) -> bool {
        self.has_refs
    }

    /// Components read from the owning system entity.
    ///
    /// Table matching never consults these; system initialization in the
    /// host binds them against the system entity itself.
    #[inline]
    pub fn system_components(&self) -> &EntityType {
        &self.and_from_system
    }

    /// The matched tables in registration order.
    #[inline]
    pub fn tables(&self) -> &[MatchedTable] {
        &self.tables
    }

    /// Reduces the signature into the per-kind matching summary.
    ///
    /// ## Behavior
    /// Single pass over the columns:
    /// - fixed-entity columns watch their source,
    /// - cascade columns record their 1-based index (last wins),
    /// - Or columns contribute nothing (evaluated per table),
    /// - negated columns accumulate into `not_from_self/owned/shared` or
    ///   `not_from_component`; fixed-entity negation stays inline,
    /// - conjunctive columns accumulate into `and_from_self/owned/shared/
    ///   system`.
    ///
    /// Afterwards every negated column except fixed-entity negation is
    /// rewritten to the empty source: its constraint lives entirely in the
    /// summary, and the plan builder only needs to know no data is fetched.

    pub(crate) fn postprocess(&mut self, world: &mut World) {
        for (index, column) in self.signature.columns.iter_mut().enumerate() {
            let component = column.component();

            if column.from == FromKind::Entity {
                world.set_watch(column.source);
            } else if column.from == FromKind::Cascade {
                self.cascade_by = index + 1;
            } else if column.op == OpKind::Or {
                // Or groups are matched per table.
            } else if column.op == OpKind::Not {
                match column.from {
                    FromKind::This => self.not_from_self.insert(component),
                    FromKind::Owned => self.not_from_owned.insert(component),
                    FromKind::Shared => self.not_from_shared.insert(component),
                    _ => self.not_from_component.insert(component),
                }
            } else if column.op == OpKind::And {
                match column.from {
                    FromKind::This => self.and_from_self.insert(component),
                    FromKind::Owned => self.and_from_owned.insert(component),
                    FromKind::Shared => self.and_from_shared.insert(component),
                    FromKind::System => self.and_from_system.insert(component),
                    _ => {}
                }
            }

            if column.op == OpKind::Not && column.from != FromKind::Entity {
                column.from = FromKind::Empty;
            }
        }
    }

    /// Decides whether `table` satisfies this query.
    ///
    /// ## Behavior
    /// Ordered for cheap rejection: marker filters first, then the AND
    /// bulks, then the NOT bulks, then the per-term checks the summary
    /// cannot capture. `and_from_system` never constrains table matching.

    pub fn matches_table(&self, world: &World, table: TableId) -> bool {
        let table = world.table(table);
        let table_type = table.type_();

        if !self.signature.match_disabled && table.is_disabled_table() {
            return false;
        }

        if !self.signature.match_prefab && table.is_prefab_table() {
            return false;
        }

        if !self.and_from_self.is_empty()
            && type_contains(world, table_type, &self.and_from_self, true, true) == INVALID_ENTITY
        {
            return false;
        }

        if !self.and_from_owned.is_empty()
            && type_contains(world, table_type, &self.and_from_owned, true, false) == INVALID_ENTITY
        {
            return false;
        }

        if !self.and_from_shared.is_empty() {
            // Owned components override the shared source: reject tables that
            // own all of them, then require all to be reachable via prefabs.
            if type_contains(world, table_type, &self.and_from_shared, true, false)
                != INVALID_ENTITY
            {
                return false;
            }
            if type_contains(world, table_type, &self.and_from_shared, true, true)
                == INVALID_ENTITY
            {
                return false;
            }
        }

        if !self.not_from_self.is_empty()
            && type_contains(world, table_type, &self.not_from_self, false, true) != INVALID_ENTITY
        {
            return false;
        }

        if !self.not_from_owned.is_empty()
            && type_contains(world, table_type, &self.not_from_owned, false, false)
                != INVALID_ENTITY
        {
            return false;
        }

        if !self.not_from_shared.is_empty()
            && type_contains(world, table_type, &self.not_from_shared, false, false)
                == INVALID_ENTITY
            && type_contains(world, table_type, &self.not_from_shared, false, true)
                != INVALID_ENTITY
        {
            return false;
        }

        if !self.not_from_component.is_empty()
            && components_contains(world, table_type, &self.not_from_component, false).is_some()
        {
            return false;
        }

        for column in &self.signature.columns {
            match column.op {
                OpKind::And => match column.from {
                    FromKind::Container => {
                        if components_contains_component(world, table_type, column.component())
                            .is_none()
                        {
                            return false;
                        }
                    }
                    FromKind::Entity => {
                        let present = world
                            .get_type(column.source)
                            .map_or(false, |source_type| source_type.has(column.component()));
                        if !present {
                            return false;
                        }
                    }
                    // This/Owned/Shared are validated by the bulks; System,
                    // Empty, and Cascade terms do not constrain the table.
                    _ => {}
                },
                OpKind::Or => {
                    let Some(group) = column.group() else {
                        continue;
                    };
                    match column.from {
                        FromKind::This => {
                            if type_contains(world, table_type, group, false, true)
                                == INVALID_ENTITY
                            {
                                return false;
                            }
                        }
                        FromKind::Container => {
                            if components_contains(world, table_type, group, false).is_none() {
                                return false;
                            }
                        }
                        _ => {}
                    }
                }
                OpKind::Not => {
                    if column.from == FromKind::Entity {
                        let present = world
                            .get_type(column.source)
                            .map_or(false, |source_type| source_type.has(column.component()));
                        if present {
                            return false;
                        }
                    }
                }
                OpKind::Optional => {}
            }
        }

        true
    }

    /// Builds the per-column access plan for a table that matched.
    ///
    /// ## Behavior
    /// Walks the signature columns in order and decides each plan entry:
    /// - table-sourced columns resolve to a direct column, collapsing tags
    ///   and missing optionals to handle-only entries,
    /// - Or columns resolve their witness component first,
    /// - container, cascade, fixed-entity, and system columns bind an
    ///   external source entity,
    /// - sized components that are inherited or externally sourced become
    ///   references: the owning entity is resolved through the prefab chain,
    ///   watched, and cached behind a versioned column handle.
    ///
    /// The new matched table starts inactive; row population flips it.
    ///
    /// ## Panics
    /// Panics when a non-cascade reference resolves to no owning entity;
    /// matching has already guaranteed one exists.

    pub(crate) fn add_table(&mut self, world: &mut World, table: TableId) {
        let table_type = world.table(table).type_().clone();
        let column_count = self.signature.columns.len();

        let mut matched = MatchedTable {
            table,
            columns: Vec::with_capacity(column_count),
            components: Vec::with_capacity(column_count),
            references: Vec::new(),
            active: false,
        };

        for column in &self.signature.columns {
            let from = column.from;
            let op = column.op;

            debug_assert!(
                op != OpKind::Not || matches!(from, FromKind::Empty | FromKind::Entity),
                "negated columns must not carry a data source"
            );

            let mut entity = INVALID_ENTITY;
            let mut component = INVALID_ENTITY;
            let mut plan = ColumnPlan::Handle;
            let mut inherited = false;

            match from {
                FromKind::This | FromKind::Entity | FromKind::Owned | FromKind::Shared => {
                    match op {
                        OpKind::And | OpKind::Optional => component = column.component(),
                        OpKind::Or => {
                            if let Some(group) = column.group() {
                                component = type_contains(world, &table_type, group, false, true);
                            }
                        }
                        OpKind::Not => {}
                    }

                    if from == FromKind::Entity {
                        entity = column.source;
                    }
                }
                FromKind::Empty => {
                    component = column.component();
                }
                FromKind::Container | FromKind::Cascade => match op {
                    OpKind::And | OpKind::Optional => {
                        component = column.component();
                        if let Some(parent) =
                            components_contains_component(world, &table_type, component)
                        {
                            entity = parent;
                        }
                    }
                    OpKind::Or => {
                        if let Some(group) = column.group() {
                            if let Some((parent, witness)) =
                                components_contains(world, &table_type, group, false)
                            {
                                entity = parent;
                                component = witness;
                            }
                        }
                    }
                    OpKind::Not => {}
                },
                FromKind::System => {
                    if op == OpKind::And {
                        component = column.component();
                    }
                    entity = self.system;
                }
            }

            // Columns without an external source resolve against the table
            // itself. A miss here means the component is inherited from a
            // prefab and falls through to the reference logic.
            if entity == INVALID_ENTITY && from != FromKind::Empty && component != INVALID_ENTITY {
                match table_type.index_of(component) {
                    Some(position) => {
                        if world.components().size_of(component) > 0 {
                            plan = ColumnPlan::Column(position + 1);
                        }
                    }
                    None => inherited = true,
                }
            }

            if op == OpKind::Optional && !type_has_entity(world, &table_type, component, true) {
                plan = ColumnPlan::Handle;
                inherited = false;
            }

            // A column reads through a reference when it has an external
            // source, when its component is inherited, or when it is a
            // cascade term (root tables keep an empty slot so a later
            // reparent only has to fill it in). Tags never carry data and
            // never become references.
            if entity != INVALID_ENTITY || inherited || from == FromKind::Cascade {
                if world.components().size_of(component) > 0 {
                    let owner = match from {
                        FromKind::Entity | FromKind::Cascade => entity,
                        _ => find_owning_entity(world, entity, &table_type, component),
                    };

                    if from != FromKind::Cascade {
                        assert!(
                            owner != INVALID_ENTITY,
                            "reference component {component} has no owning entity"
                        );
                    }

                    let cached = if owner != INVALID_ENTITY {
                        world.set_watch(owner);
                        world.get_ptr(owner, component)
                    } else {
                        None
                    };

                    matched.references.push(Reference {
                        entity: owner,
                        component,
                        cached,
                    });
                    plan = ColumnPlan::Reference(matched.references.len() - 1);
                }
            }

            matched.columns.push(plan);
            matched.components.push(component);
        }

        if !matched.references.is_empty() {
            self.has_refs = true;
        }

        log::trace!(
            "planned table {table} ({} columns, {} references)",
            column_count,
            matched.references.len()
        );

        self.tables.push(matched);
    }

    /// Matches and plans `table` unless it is already registered.
    ///
    /// Returns `true` when the table joined the matched list. The
    /// deduplication here is what makes registration idempotent; the raw
    /// match-and-plan pair must not run twice for one table.
    pub(crate) fn register_table(&mut self, world: &mut World, table: TableId) -> bool {
        if self.tables.iter().any(|matched| matched.table == table) {
            return false;
        }

        if !self.matches_table(world, table) {
            return false;
        }

        self.add_table(world, table);
        true
    }

    /// Flips the active flag of a matched table, if registered.
    pub(crate) fn set_table_active(&mut self, table: TableId, active: bool) {
        if let Some(matched) = self.tables.iter_mut().find(|matched| matched.table == table) {
            matched.active = active;
        }
    }
}
