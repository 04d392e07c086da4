//! # Query Registry
//!
//! Holds the set of live queries and keeps them consistent with the world's
//! table store: a query matches all existing tables eagerly at creation, and
//! every table created afterwards is offered to every live query exactly
//! once.
//!
//! ## Design
//! Queries live in slots addressed by stable [`QueryId`]s; freed slots are
//! reused. The registry never observes the world directly: the caller
//! drains the world's structural transitions and forwards them through
//! [`QueryRegistry::sync`], which keeps the borrow graph between the two
//! stores acyclic.

use crate::engine::query::Query;
use crate::engine::signature::Signature;
use crate::engine::types::{EntityId, QueryId, TableId, INVALID_ENTITY};
use crate::engine::world::{TableEvent, World};


/// Owner of all live queries.
#[derive(Default)]
pub struct QueryRegistry {
    queries: Vec<Option<Query>>,
}

impl QueryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `signature` into a query and matches all existing tables.
    ///
    /// ## Behavior
    /// The signature is moved into the query, the matching summary is
    /// computed once, and every table already interned in the world is
    /// matched and planned eagerly.
    pub fn new_query(&mut self, world: &mut World, signature: Signature) -> QueryId {
        self.new_query_for_system(world, signature, INVALID_ENTITY)
    }

    /// Like [`QueryRegistry::new_query`], binding system-sourced columns to
    /// `system`.
    pub fn new_query_for_system(
        &mut self,
        world: &mut World,
        signature: Signature,
        system: EntityId,
    ) -> QueryId {
        let mut query = Query::new(signature, system);
        query.postprocess(world);

        let mut matched = 0usize;
        for table in 0..world.table_count() as TableId {
            if query.register_table(world, table) {
                matched += 1;
            }
        }

        let id = self.insert(query);
        log::debug!("query {id} created, matched {matched} of {} tables", world.table_count());
        id
    }

    /// Releases a query and its matched-table plans.
    ///
    /// Returns `false` when the id does not name a live query.
    pub fn free_query(&mut self, id: QueryId) -> bool {
        match self.queries.get_mut(id as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Returns the query with the given id, if live.
    #[inline]
    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(id as usize).and_then(Option::as_ref)
    }

    /// Mutable access to the query with the given id, if live.
    #[inline]
    pub fn get_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.queries.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Number of live queries.
    pub fn len(&self) -> usize {
        self.queries.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if no queries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates live queries with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (QueryId, &Query)> {
        self.queries
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|query| (id as QueryId, query)))
    }

    /// Offers a newly created table to every live query.
    ///
    /// Registration is deduplicated per query, so offering the same table
    /// twice leaves existing plans untouched.
    pub fn table_created(&mut self, world: &mut World, table: TableId) {
        for slot in &mut self.queries {
            if let Some(query) = slot {
                query.register_table(world, table);
            }
        }
    }

    /// Propagates a table's activation transition to every matched query.
    pub fn table_activated(&mut self, table: TableId, active: bool) {
        for slot in &mut self.queries {
            if let Some(query) = slot {
                query.set_table_active(table, active);
            }
        }
    }

    /// Drains the world's structural transitions and applies them in order.
    pub fn sync(&mut self, world: &mut World) {
        for event in world.drain_table_events() {
            match event {
                TableEvent::Created(table) => self.table_created(world, table),
                TableEvent::Activated(table) => self.table_activated(table, true),
                TableEvent::Deactivated(table) => self.table_activated(table, false),
            }
        }
    }

    fn insert(&mut self, query: Query) -> QueryId {
        if let Some(free) = self.queries.iter().position(Option::is_none) {
            self.queries[free] = Some(query);
            return free as QueryId;
        }

        self.queries.push(Some(query));
        (self.queries.len() - 1) as QueryId
    }
}
