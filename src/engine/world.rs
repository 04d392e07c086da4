//! # World Context
//!
//! The `World` is the small context record the query core reads through: it
//! owns exactly the component registry, the entity index with its watch set,
//! and the table store. Nothing else of a host runtime lives here; systems,
//! schedulers, and storage mutation beyond row insertion belong to outer
//! layers.
//!
//! ## Design
//! - Tables live in a `Vec` keyed by creation order, which gives the stable
//!   iteration the matcher relies on; a map from [`EntityType`] to
//!   [`TableId`] provides get-or-create interning.
//! - Structural transitions (table created, first row inserted, last row
//!   removed) are queued as [`TableEvent`]s. The world does not hold the
//!   query registry; the caller drains the queue and forwards it, which keeps
//!   the borrow graph acyclic.
//! - Borrowed column access goes through versioned [`ColumnRef`] handles
//!   instead of raw pointers: a handle resolves to bytes only while the
//!   column's reallocation counter still matches the snapshot.
//!
//! ## Concurrency
//! Single-threaded cooperative: query creation, table creation, and plan
//! maintenance all run on the control thread, and no operation suspends.

use std::collections::HashMap;

use crate::engine::component::ComponentRegistry;
use crate::engine::entity::{EntityIndex, Record};
use crate::engine::error::{EcsResult, SpawnError};
use crate::engine::table::Table;
use crate::engine::types::{
    childof, instanceof, EntityId, EntityType, TableId, ENTITY_MASK, FIRST_USER_ENTITY,
    PREFAB_MARKER,
};


/// Structural table transition reported to the query layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableEvent {
    /// A table was interned for a new type.
    Created(TableId),
    /// A table received its first row.
    Activated(TableId),
    /// A table lost its last row.
    Deactivated(TableId),
}

/// Versioned handle to one element of a table column.
///
/// ## Purpose
/// Replaces the borrowed raw pointer of a cached reference: the handle names
/// `(table, column, row)` and snapshots the column's reallocation counter.
/// Resolution through [`World::column_data`] fails once the counter moves
/// on, so stale caches surface as a miss instead of a dangling pointer.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table owning the column.
    pub table: TableId,
    /// Storage column index (0 is the entity column).
    pub column: usize,
    /// Row of the referenced element.
    pub row: usize,
    /// Snapshot of the column's reallocation counter.
    pub version: u64,
}

/// Owner of the entity index, component registry, and table store.
pub struct World {
    components: ComponentRegistry,
    entities: EntityIndex,
    tables: Vec<Table>,
    table_ids: HashMap<EntityType, TableId>,
    events: Vec<TableEvent>,
    next_entity: EntityId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the reserved marker tags registered.
    pub fn new() -> Self {
        Self {
            components: ComponentRegistry::with_builtin_tags(),
            entities: EntityIndex::new(),
            tables: Vec::new(),
            table_ids: HashMap::new(),
            events: Vec::new(),
            next_entity: FIRST_USER_ENTITY,
        }
    }

    /// Allocates a fresh entity identifier without spawning storage.
    #[inline]
    fn alloc_entity(&mut self) -> EntityId {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }

    /// Registers a new sized component and returns its identifier.
    pub fn register_component(&mut self, size: usize) -> EcsResult<EntityId> {
        let id = self.alloc_entity();
        self.components.register(id, size)?;
        Ok(id)
    }

    /// Registers a new tag (presence-only component).
    pub fn register_tag(&mut self) -> EcsResult<EntityId> {
        self.register_component(0)
    }

    /// Read access to the component registry.
    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Returns the table with the given id.
    ///
    /// ## Panics
    /// Panics if `table` is not a live table id.
    #[inline]
    pub fn table(&self, table: TableId) -> &Table {
        &self.tables[table as usize]
    }

    /// Number of interned tables.
    #[inline]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Iterates all tables in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Returns the table storing `type_`, interning a new one if needed.
    ///
    /// ## Behavior
    /// - Every plain entry of a new type must be a registered component.
    /// - New tables queue a [`TableEvent::Created`] transition.
    ///
    /// ## Panics
    /// Panics if the type carries more than one prefab link.
    pub fn table_for_type(&mut self, type_: EntityType) -> EcsResult<TableId> {
        if let Some(&id) = self.table_ids.get(&type_) {
            return Ok(id);
        }

        for &entry in type_.entries() {
            if entry & !ENTITY_MASK == 0 && !self.components.is_component(entry) {
                return Err(SpawnError::UnregisteredComponent { component: entry }.into());
            }
        }

        let id = self.tables.len() as TableId;
        log::trace!("interning table {id} for type {:?}", type_.entries());

        self.table_ids.insert(type_.clone(), id);
        self.tables.push(Table::new(id, type_, &self.components));
        self.events.push(TableEvent::Created(id));
        Ok(id)
    }

    /// Spawns an entity whose component multiset is exactly `type_`.
    ///
    /// ## Behavior
    /// - Interns the type's table if it does not exist yet.
    /// - Inserts a zero-initialised row and records the entity's location.
    /// - Queues [`TableEvent::Activated`] when the table receives its first
    ///   row.
    pub fn spawn(&mut self, type_: EntityType) -> EcsResult<EntityId> {
        let table_id = self.table_for_type(type_)?;
        let entity = self.alloc_entity();

        let table = &mut self.tables[table_id as usize];
        let row = table.insert(entity);
        if table.row_count() == 1 {
            self.events.push(TableEvent::Activated(table_id));
        }

        self.entities.set(entity, Record { table: table_id, row });
        Ok(entity)
    }

    /// Spawns an entity contained by `parent` (a CHILDOF link is added).
    pub fn spawn_child(&mut self, parent: EntityId, type_: &EntityType) -> EcsResult<EntityId> {
        self.spawn(type_.with(childof(parent)))
    }

    /// Spawns an entity inheriting from `base` (an INSTANCEOF link is added).
    pub fn spawn_instance(&mut self, base: EntityId, type_: &EntityType) -> EcsResult<EntityId> {
        self.spawn(type_.with(instanceof(base)))
    }

    /// Spawns a prefab: an entity carrying the reserved prefab marker.
    pub fn spawn_prefab(&mut self, type_: &EntityType) -> EcsResult<EntityId> {
        self.spawn(type_.with(PREFAB_MARKER))
    }

    /// Removes `entity` and compacts its table row.
    ///
    /// ## Behavior
    /// - Swap-removes the row; the displaced entity's record is fixed up.
    /// - Queues [`TableEvent::Deactivated`] when the table becomes empty.
    ///
    /// ## Errors
    /// `StaleEntity` if the entity has no record.
    pub fn despawn(&mut self, entity: EntityId) -> EcsResult<()> {
        let Some(record) = self.entities.remove(entity) else {
            return Err(SpawnError::StaleEntity { entity }.into());
        };

        let table = &mut self.tables[record.table as usize];
        let moved = table.remove(record.row);
        let emptied = table.row_count() == 0;

        if let Some(moved_entity) = moved {
            self.entities.set(
                moved_entity,
                Record {
                    table: record.table,
                    row: record.row,
                },
            );
        }

        if emptied {
            self.events.push(TableEvent::Deactivated(record.table));
        }

        Ok(())
    }

    /// Returns the record of a spawned entity.
    #[inline]
    pub fn get_record(&self, entity: EntityId) -> Option<Record> {
        self.entities.get(entity)
    }

    /// Returns the type of a spawned entity.
    #[inline]
    pub fn get_type(&self, entity: EntityId) -> Option<&EntityType> {
        let record = self.entities.get(entity)?;
        Some(self.tables[record.table as usize].type_())
    }

    /// Returns `true` if `entity` owns `component` directly (no inheritance).
    pub fn has(&self, entity: EntityId, component: EntityId) -> bool {
        self.get_type(entity)
            .map_or(false, |type_| type_.has(component))
    }

    /// Borrows a versioned handle to `entity`'s storage of `component`.
    ///
    /// ## Behavior
    /// Returns `None` when the entity is not spawned, does not own the
    /// component directly, or the component is a tag.
    pub fn get_ptr(&self, entity: EntityId, component: EntityId) -> Option<ColumnRef> {
        let record = self.entities.get(entity)?;
        let table = &self.tables[record.table as usize];
        let column = table.column_of(component)?;

        if table.column(column).size == 0 {
            return None;
        }

        Some(ColumnRef {
            table: record.table,
            column,
            row: record.row,
            version: table.column(column).version,
        })
    }

    /// Resolves a column handle to the referenced element's bytes.
    ///
    /// ## Behavior
    /// Returns `None` once the column's reallocation counter has moved past
    /// the handle's snapshot, or when the handle is out of bounds.
    pub fn column_data(&self, handle: &ColumnRef) -> Option<&[u8]> {
        let table = self.tables.get(handle.table as usize)?;

        if table.column(handle.column).version != handle.version {
            return None;
        }

        table.column_ptr(handle.column, handle.row)
    }

    /// Marks `entity` as watched so the host emits invalidation on mutation.
    #[inline]
    pub fn set_watch(&mut self, entity: EntityId) {
        self.entities.set_watch(entity);
    }

    /// Returns `true` if `entity` is watched.
    #[inline]
    pub fn is_watched(&self, entity: EntityId) -> bool {
        self.entities.is_watched(entity)
    }

    /// Drains the queued structural transitions in occurrence order.
    pub fn drain_table_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }
}
