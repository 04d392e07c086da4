//! # Query Signatures
//!
//! A signature is the compiled form of a query expression: an ordered list of
//! *columns*, each combining a source kind ([`FromKind`]), an operator
//! ([`OpKind`]), and a payload that is either a single component or a type
//! (for Or groups). The dynamic text parser of a full runtime is out of
//! scope; signatures are assembled through [`SignatureBuilder`].
//!
//! ## Column semantics
//!
//! | from | data source |
//! |---|---|
//! | `This` | the matched table itself, owned or inherited |
//! | `Owned` | the matched table, owned columns only |
//! | `Shared` | a prefab of the matched table, never owned |
//! | `Container` | a CHILDOF parent of the matched table |
//! | `Entity` | a fixed entity named by `source` |
//! | `System` | the system entity owning the query |
//! | `Empty` | no data; the column passes a handle only |
//! | `Cascade` | like `Container`, optional, and recorded for sort logic |
//!
//! ## Validation
//! The builder rejects the shapes the matcher cannot evaluate: Or groups
//! with no alternatives and fixed-entity terms without a source. Everything
//! else is deferred to matching.

use crate::engine::error::SignatureError;
use crate::engine::types::{EntityId, EntityType, INVALID_ENTITY};


/// Source kind of a signature column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FromKind {
    /// Matched table, owned or inherited components.
    This,
    /// Matched table, owned components only.
    Owned,
    /// Inherited from a prefab, never owned by the table.
    Shared,
    /// A CHILDOF parent of the matched table.
    Container,
    /// A fixed entity named by the column's `source`.
    Entity,
    /// The system entity that owns the query.
    System,
    /// No data source; the column passes a handle only.
    Empty,
    /// Container-sourced term that also drives hierarchical ordering.
    Cascade,
}

/// Operator kind of a signature column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// The component must be present.
    And,
    /// At least one component of the group must be present.
    Or,
    /// The component may be absent; the plan marks it accordingly.
    Optional,
    /// The component must be absent.
    Not,
}

/// Payload of a signature column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// A single component identifier.
    Component(EntityId),
    /// A group of alternatives (Or columns).
    Type(EntityType),
}

/// One term of a query signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureColumn {
    /// Where the column's data comes from.
    pub from: FromKind,
    /// How the column constrains matching.
    pub op: OpKind,
    /// Component or Or group.
    pub payload: Payload,
    /// Fixed source entity; meaningful for [`FromKind::Entity`] only.
    pub source: EntityId,
}

impl SignatureColumn {
    /// The single component of this column, or the invalid entity for Or
    /// groups.
    #[inline]
    pub fn component(&self) -> EntityId {
        match &self.payload {
            Payload::Component(component) => *component,
            Payload::Type(_) => INVALID_ENTITY,
        }
    }

    /// The Or group of this column, if it carries one.
    #[inline]
    pub fn group(&self) -> Option<&EntityType> {
        match &self.payload {
            Payload::Component(_) => None,
            Payload::Type(group) => Some(group),
        }
    }
}

/// A validated query expression.
///
/// ## Invariants
/// - Column order is the order of construction; plans and references follow
///   it.
/// - `match_prefab` / `match_disabled` opt the query into tables carrying
///   the reserved markers.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    /// Ordered terms of the expression.
    pub columns: Vec<SignatureColumn>,
    /// Match tables that carry the prefab marker.
    pub match_prefab: bool,
    /// Match tables that carry the disabled marker.
    pub match_disabled: bool,
}

impl Signature {
    /// Number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the signature has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Consuming builder for [`Signature`] values.
///
/// ## Example
/// ```ignore
/// let sig = SignatureBuilder::new()
///     .term(position)
///     .optional(velocity)
///     .without(frozen)
///     .from_container(transform)
///     .build()?;
/// ```

#[derive(Default)]
pub struct SignatureBuilder {
    columns: Vec<SignatureColumn>,
    match_prefab: bool,
    match_disabled: bool,
}

impl SignatureBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw column. The typed helpers below cover the common
    /// shapes; this is the escape hatch for generated signatures.
    pub fn column(mut self, from: FromKind, op: OpKind, payload: Payload, source: EntityId) -> Self {
        self.columns.push(SignatureColumn {
            from,
            op,
            payload,
            source,
        });
        self
    }

    /// Requires `component` on the matched table (owned or inherited).
    pub fn term(self, component: EntityId) -> Self {
        self.component_column(FromKind::This, OpKind::And, component, INVALID_ENTITY)
    }

    /// Requires `component` to be owned by the matched table.
    pub fn owned(self, component: EntityId) -> Self {
        self.component_column(FromKind::Owned, OpKind::And, component, INVALID_ENTITY)
    }

    /// Requires `component` to be inherited and not owned.
    pub fn shared(self, component: EntityId) -> Self {
        self.component_column(FromKind::Shared, OpKind::And, component, INVALID_ENTITY)
    }

    /// Accepts tables with or without `component`.
    pub fn optional(self, component: EntityId) -> Self {
        self.component_column(FromKind::This, OpKind::Optional, component, INVALID_ENTITY)
    }

    /// Rejects tables carrying `component` (owned or inherited).
    pub fn without(self, component: EntityId) -> Self {
        self.component_column(FromKind::This, OpKind::Not, component, INVALID_ENTITY)
    }

    /// Rejects tables owning `component`.
    pub fn without_owned(self, component: EntityId) -> Self {
        self.component_column(FromKind::Owned, OpKind::Not, component, INVALID_ENTITY)
    }

    /// Rejects tables inheriting `component` without owning it.
    pub fn without_shared(self, component: EntityId) -> Self {
        self.component_column(FromKind::Shared, OpKind::Not, component, INVALID_ENTITY)
    }

    /// Rejects tables whose containers provide `component`.
    pub fn without_container(self, component: EntityId) -> Self {
        self.component_column(FromKind::Container, OpKind::Not, component, INVALID_ENTITY)
    }

    /// Requires at least one of `components` on the matched table.
    pub fn one_of(self, components: &[EntityId]) -> Self {
        self.group_column(FromKind::This, components)
    }

    /// Requires a container to provide at least one of `components`.
    pub fn one_of_container(self, components: &[EntityId]) -> Self {
        self.group_column(FromKind::Container, components)
    }

    /// Requires a CHILDOF parent of the table to provide `component`.
    pub fn from_container(self, component: EntityId) -> Self {
        self.component_column(FromKind::Container, OpKind::And, component, INVALID_ENTITY)
    }

    /// Reads `component` from a container when one provides it.
    pub fn optional_container(self, component: EntityId) -> Self {
        self.component_column(FromKind::Container, OpKind::Optional, component, INVALID_ENTITY)
    }

    /// Requires the fixed entity `source` to carry `component`.
    pub fn from_entity(self, source: EntityId, component: EntityId) -> Self {
        self.component_column(FromKind::Entity, OpKind::And, component, source)
    }

    /// Rejects when the fixed entity `source` carries `component`.
    pub fn without_entity(self, source: EntityId, component: EntityId) -> Self {
        self.component_column(FromKind::Entity, OpKind::Not, component, source)
    }

    /// Reads `component` from the system entity owning the query.
    pub fn from_system(self, component: EntityId) -> Self {
        self.component_column(FromKind::System, OpKind::And, component, INVALID_ENTITY)
    }

    /// Passes the handle of `component` without reading data.
    pub fn handle(self, component: EntityId) -> Self {
        self.component_column(FromKind::Empty, OpKind::And, component, INVALID_ENTITY)
    }

    /// Container-sourced term that also records the cascade column used by
    /// hierarchical ordering.
    pub fn cascade(self, component: EntityId) -> Self {
        self.component_column(FromKind::Cascade, OpKind::And, component, INVALID_ENTITY)
    }

    /// Opt into tables carrying the prefab marker.
    pub fn match_prefab(mut self) -> Self {
        self.match_prefab = true;
        self
    }

    /// Opt into tables carrying the disabled marker.
    pub fn match_disabled(mut self) -> Self {
        self.match_disabled = true;
        self
    }

    fn component_column(
        self,
        from: FromKind,
        op: OpKind,
        component: EntityId,
        source: EntityId,
    ) -> Self {
        self.column(from, op, Payload::Component(component), source)
    }

    fn group_column(self, from: FromKind, components: &[EntityId]) -> Self {
        self.column(
            from,
            OpKind::Or,
            Payload::Type(EntityType::from_ids(components)),
            INVALID_ENTITY,
        )
    }

    /// Validates and produces the signature.
    ///
    /// ## Errors
    /// - `EmptyOrGroup` for an Or column whose group has no alternatives.
    /// - `MissingSource` for a fixed-entity column naming no source.
    pub fn build(self) -> Result<Signature, SignatureError> {
        for (index, column) in self.columns.iter().enumerate() {
            if column.op == OpKind::Or {
                let empty = column.group().map_or(true, EntityType::is_empty);
                if empty {
                    return Err(SignatureError::EmptyOrGroup { column: index });
                }
            }

            if column.from == FromKind::Entity && column.source == INVALID_ENTITY {
                return Err(SignatureError::MissingSource { column: index });
            }
        }

        Ok(Signature {
            columns: self.columns,
            match_prefab: self.match_prefab,
            match_disabled: self.match_disabled,
        })
    }
}
