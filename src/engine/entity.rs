//! # Entity Index and Watch Set
//!
//! This module tracks where every spawned entity lives and which entities are
//! *watched* by queries.
//!
//! ## Purpose
//! - Map an entity to its [`Record`]: the table that stores its row and the
//!   row index within that table.
//! - Maintain the watch set: an entity is watched when at least one query
//!   holds a reference resolved through it, so the owning world must emit
//!   invalidation when the entity's components change.
//!
//! ## Invariants
//! - A record always reflects the entity's true row; row moves (swap-remove
//!   compaction) update the record in the same mutation.
//! - Watches are never removed during a query's life; the set only grows,
//!   matching the monotonic growth of matched-table lists.

use std::collections::{HashMap, HashSet};

use crate::engine::types::{EntityId, TableId};


/// Storage location of a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Table holding the entity's row.
    pub table: TableId,
    /// Row index within the table.
    pub row: usize,
}

/// Mapping from live entities to their storage locations, plus the watch set.
///
/// ## Concurrency
/// Mutated only by the world's control thread; no internal synchronization.

#[derive(Default)]
pub struct EntityIndex {
    records: HashMap<EntityId, Record>,
    watched: HashSet<EntityId>,
}

impl EntityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `entity`, if it is spawned.
    #[inline]
    pub fn get(&self, entity: EntityId) -> Option<Record> {
        self.records.get(&entity).copied()
    }

    /// Stores or replaces the record for `entity`.
    #[inline]
    pub fn set(&mut self, entity: EntityId, record: Record) {
        self.records.insert(entity, record);
    }

    /// Removes and returns the record for `entity`.
    #[inline]
    pub fn remove(&mut self, entity: EntityId) -> Option<Record> {
        self.records.remove(&entity)
    }

    /// Marks `entity` as watched.
    ///
    /// ## Behavior
    /// Idempotent; watching an already-watched entity is a no-op.
    #[inline]
    pub fn set_watch(&mut self, entity: EntityId) {
        self.watched.insert(entity);
    }

    /// Returns `true` if `entity` is watched.
    #[inline]
    pub fn is_watched(&self, entity: EntityId) -> bool {
        self.watched.contains(&entity)
    }
}
