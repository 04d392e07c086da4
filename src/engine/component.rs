//! # Component Registry
//!
//! This module provides the registry that binds entity identifiers to
//! component marker records. A *component* is simply an entity that carries a
//! [`ComponentInfo`] record with a byte `size`; a component whose size is
//! zero is a *tag* (presence-only, no storage).
//!
//! ## Purpose
//! Tables consult the registry when laying out their columns: sized
//! components receive a data column with the recorded stride, tags and
//! relation entries receive an empty tagless column. The plan builder
//! consults it to collapse tag terms and to decide whether a reference needs
//! backing storage.
//!
//! ## Invariants
//! - A component id is bound to at most one record for the lifetime of the
//!   world.
//! - Relation-flagged identifiers never name components.

use std::collections::HashMap;

use crate::engine::error::RegistryError;
use crate::engine::types::{EntityId, ENTITY_MASK, INVALID_ENTITY};


/// Marker record carried by every component entity.
///
/// ## Fields
/// - `size`: byte stride of one element in a table column. Zero marks a tag.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Byte stride of one stored element; zero for tags.
    pub size: usize,
}

impl ComponentInfo {
    /// Returns `true` if the component stores no data.
    #[inline]
    pub fn is_tag(&self) -> bool {
        self.size == 0
    }
}

/// Mapping from entity identifiers to their component marker records.
///
/// ## Design
/// The registry is a plain map; component identity is allocated by the world
/// (components are entities), so the registry only validates and stores the
/// association.

#[derive(Default)]
pub struct ComponentRegistry {
    infos: HashMap<EntityId, ComponentInfo>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the reserved marker tags.
    pub(crate) fn with_builtin_tags() -> Self {
        let mut registry = Self::default();
        registry
            .infos
            .insert(crate::engine::types::PREFAB_MARKER, ComponentInfo { size: 0 });
        registry
            .infos
            .insert(crate::engine::types::DISABLED_MARKER, ComponentInfo { size: 0 });
        registry
    }

    /// Binds `component` to a marker record with the given element size.
    ///
    /// ## Errors
    /// - `Reserved` if the id carries a relation flag or is the invalid
    ///   entity.
    /// - `Duplicate` if the id already has a record.
    pub fn register(&mut self, component: EntityId, size: usize) -> Result<(), RegistryError> {
        if component == INVALID_ENTITY || component & !ENTITY_MASK != 0 {
            return Err(RegistryError::Reserved { component });
        }

        if self.infos.contains_key(&component) {
            return Err(RegistryError::Duplicate { component });
        }

        self.infos.insert(component, ComponentInfo { size });
        Ok(())
    }

    /// Returns the marker record for `component`, if any.
    #[inline]
    pub fn info(&self, component: EntityId) -> Option<&ComponentInfo> {
        self.infos.get(&component)
    }

    /// Returns `true` if `component` has a marker record.
    #[inline]
    pub fn is_component(&self, component: EntityId) -> bool {
        self.infos.contains_key(&component)
    }

    /// Element size of `component`; zero for tags and unregistered ids.
    #[inline]
    pub fn size_of(&self, component: EntityId) -> usize {
        self.infos.get(&component).map_or(0, |info| info.size)
    }
}
