//! # Archetype Tables
//!
//! A [`Table`] is the unique home of all entities whose component multiset
//! equals a given [`EntityType`]. Storage is columnar: column 0 holds the
//! entity identifiers, and every type entry owns one column after it, in
//! canonical type order.
//!
//! ## Design
//! - A column is either *sized* (element stride > 0) or *tagless* (stride 0,
//!   permanently empty). Tags and relation entries produce tagless columns.
//! - Rows are kept dense with swap-remove semantics; the displaced entity is
//!   reported to the caller so its record can be fixed up.
//! - Every column carries a monotonically increasing `version` that is bumped
//!   whenever its buffer reallocates. Cached column references snapshot the
//!   version and become stale when it moves on, which replaces an explicit
//!   re-resolve signal between the storage and query layers.
//!
//! ## Invariants
//! - All sized columns hold exactly `row_count` elements.
//! - A type may carry at most one INSTANCEOF entry (one prefab link per
//!   table); violating this is a programming error and panics at
//!   construction.
//! - Column layout never changes after construction; only row counts do.

use crate::engine::component::ComponentRegistry;
use crate::engine::types::{
    entity_of, EntityId, EntityType, TableId, DISABLED_MARKER, ENTITY_MASK, INSTANCEOF,
    INVALID_ENTITY, PREFAB_MARKER,
};


/// One column of a table: a densely packed byte buffer with a fixed stride.
///
/// ## Invariants
/// - `data.len()` is always a multiple of `size` (sized columns).
/// - `version` strictly increases whenever `data`'s allocation moves.

pub struct Column {
    /// Byte stride of one element; zero for tagless columns.
    pub size: usize,
    /// Packed element storage; permanently empty for tagless columns.
    data: Vec<u8>,
    /// Reallocation counter consulted by cached references.
    pub version: u64,
}

impl Column {
    fn new(size: usize) -> Self {
        Self {
            size,
            data: Vec::new(),
            version: 0,
        }
    }

    /// Appends one zero-initialised element, tracking reallocation.
    fn push_zeroed(&mut self) {
        if self.size == 0 {
            return;
        }

        let before = self.data.as_ptr();
        self.data.resize(self.data.len() + self.size, 0);
        if self.data.as_ptr() != before {
            self.version += 1;
        }
    }

    /// Moves the last element into `row` and truncates (swap-remove).
    fn swap_remove(&mut self, row: usize) {
        if self.size == 0 {
            return;
        }

        let last = self.data.len() / self.size - 1;
        if row != last {
            let (head, tail) = self.data.split_at_mut(last * self.size);
            head[row * self.size..(row + 1) * self.size].copy_from_slice(&tail[..self.size]);
        }
        self.data.truncate(last * self.size);
    }

    /// Returns the bytes of the element at `row`, if in bounds.
    #[inline]
    pub fn row_bytes(&self, row: usize) -> Option<&[u8]> {
        if self.size == 0 {
            return None;
        }
        self.data.get(row * self.size..(row + 1) * self.size)
    }

}

/// Columnar storage for all entities sharing one [`EntityType`].
///
/// ## Purpose
/// Tables are what queries match against: the matcher inspects the type, the
/// plan builder maps signature columns onto table columns, and references
/// borrow into the columns of *other* tables through versioned handles.

pub struct Table {
    id: TableId,
    type_: EntityType,
    columns: Vec<Column>,
    prefab: EntityId,
}

impl Table {
    /// Builds an empty table for `type_`, laying out one column per entry.
    ///
    /// ## Behavior
    /// - Column 0 stores entity identifiers.
    /// - Sized components get a data column with the registered stride; tags
    ///   and relation entries get tagless columns.
    /// - The single INSTANCEOF entry, if present, is recorded as the table's
    ///   prefab link.
    ///
    /// ## Panics
    /// Panics if the type carries more than one INSTANCEOF entry.

    pub(crate) fn new(id: TableId, type_: EntityType, components: &ComponentRegistry) -> Self {
        let mut columns = Vec::with_capacity(type_.len() + 1);
        columns.push(Column::new(std::mem::size_of::<EntityId>()));

        let mut prefab = INVALID_ENTITY;
        for &entry in type_.entries() {
            if entry & INSTANCEOF != 0 {
                assert!(
                    prefab == INVALID_ENTITY,
                    "table type carries more than one prefab link"
                );
                prefab = entity_of(entry);
            }

            let size = if entry & !ENTITY_MASK != 0 {
                0
            } else {
                components.size_of(entry)
            };
            columns.push(Column::new(size));
        }

        Self {
            id,
            type_,
            columns,
            prefab,
        }
    }

    /// Identifier of this table in the world's store.
    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// The canonical type this table stores.
    #[inline]
    pub fn type_(&self) -> &EntityType {
        &self.type_
    }

    /// The prefab this table's entities inherit from, or the invalid entity.
    #[inline]
    pub fn prefab(&self) -> EntityId {
        self.prefab
    }

    /// Returns `true` if the table stores prefab entities themselves.
    #[inline]
    pub fn is_prefab_table(&self) -> bool {
        self.type_.has(PREFAB_MARKER)
    }

    /// Returns `true` if the table stores disabled entities.
    #[inline]
    pub fn is_disabled_table(&self) -> bool {
        self.type_.has(DISABLED_MARKER)
    }

    /// Number of rows currently stored.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.columns[0].data.len() / std::mem::size_of::<EntityId>()
    }

    /// Sum of the strides of all sized columns, excluding the entity column.
    pub fn bytes_per_row(&self) -> usize {
        self.columns[1..].iter().map(|column| column.size).sum()
    }

    /// Returns the column at `index` (0 is the entity column).
    #[inline]
    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Storage column index of `component`, counting the entity column.
    ///
    /// Position `i` in the type maps to column `i + 1`.
    #[inline]
    pub fn column_of(&self, component: EntityId) -> Option<usize> {
        self.type_.index_of(component).map(|position| position + 1)
    }

    /// Bytes of the element at `(column, row)`, if in bounds.
    ///
    /// Tagless columns hold no data and always return `None`.
    #[inline]
    pub fn column_ptr(&self, column: usize, row: usize) -> Option<&[u8]> {
        self.columns.get(column)?.row_bytes(row)
    }

    /// Appends a zero-initialised row for `entity` and returns its index.
    pub(crate) fn insert(&mut self, entity: EntityId) -> usize {
        let row = self.row_count();

        let entities = &mut self.columns[0];
        let before = entities.data.as_ptr();
        entities.data.extend_from_slice(&entity.to_le_bytes());
        if entities.data.as_ptr() != before {
            entities.version += 1;
        }

        for column in &mut self.columns[1..] {
            column.push_zeroed();
        }

        row
    }

    /// Removes `row` with swap-remove compaction.
    ///
    /// ## Returns
    /// The entity that was moved into `row` to fill the gap, if any; the
    /// caller must update that entity's record.
    pub(crate) fn remove(&mut self, row: usize) -> Option<EntityId> {
        let last = self.row_count() - 1;
        let moved = if row != last {
            Some(self.entity_at(last))
        } else {
            None
        };

        for column in &mut self.columns {
            column.swap_remove(row);
        }

        moved
    }

    /// Entity identifier stored at `row`.
    pub fn entity_at(&self, row: usize) -> EntityId {
        let bytes = self.columns[0]
            .row_bytes(row)
            .expect("row index out of bounds in entity column");
        EntityId::from_le_bytes(bytes.try_into().expect("entity column stride is eight bytes"))
    }
}
