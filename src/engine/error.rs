//! Error types for world construction and signature compilation.
//!
//! This module declares focused, composable error types used across the
//! component registry, entity spawning, and signature building pipeline. Each
//! error carries enough context to make failures actionable while remaining
//! small and cheap to pass around or convert into the aggregate [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g.
//!   registering a reserved component id, spawning with an unregistered
//!   component, building an Or group with no alternatives).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcsError`].
//! * **Actionability:** Structured fields (offending ids, column indices)
//!   make logs useful without reproducing the issue.
//!
//! ## Fatal conditions
//! Violated structural invariants (a table with more than one prefab link, a
//! missing record for a container parent, a reference term whose owner cannot
//! be resolved) are programming errors and panic instead of returning a
//! variant. Everything in this module models recoverable misuse of the
//! public API.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::EntityId;


/// Convenience alias for results produced by the crate's fallible operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Returned when component registration is rejected.
///
/// ### Example
/// ```ignore
/// let pos = world.register_component(8)?;          // ok
/// let err = world.register_with_id(pos, 8);        // Duplicate
/// ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already bound to a component record.
    Duplicate {
        /// Offending component id.
        component: EntityId,
    },

    /// The id carries a relation flag or is a reserved builtin.
    Reserved {
        /// Offending component id.
        component: EntityId,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate { component } => {
                write!(f, "component {} is already registered", component)
            }
            RegistryError::Reserved { component } => {
                write!(f, "id {} is reserved and cannot name a component", component)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Returned when an entity cannot be spawned into a table.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// A plain (non-relation) entry of the spawned type has no component
    /// record, so no column layout can be derived for it.
    UnregisteredComponent {
        /// The entry without a component record.
        component: EntityId,
    },

    /// The entity handle does not name a live entity.
    StaleEntity {
        /// The dead or unknown entity.
        entity: EntityId,
    },
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::UnregisteredComponent { component } => {
                write!(f, "type entry {} is not a registered component", component)
            }
            SpawnError::StaleEntity { entity } => {
                write!(f, "stale or unknown entity reference {}", entity)
            }
        }
    }
}

impl std::error::Error for SpawnError {}

/// Returned when a signature fails build-time validation.
///
/// ## Context
/// The signature builder validates structure that the matcher and plan
/// builder rely on, so that malformed terms are rejected once at
/// construction instead of per table.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// An Or group contained no alternatives.
    EmptyOrGroup {
        /// Index of the offending column.
        column: usize,
    },

    /// A term sourced from a fixed entity named the invalid entity.
    MissingSource {
        /// Index of the offending column.
        column: usize,
    },
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::EmptyOrGroup { column } => {
                write!(f, "or group in column {} has no alternatives", column)
            }
            SignatureError::MissingSource { column } => {
                write!(f, "column {} reads from a fixed entity but names none", column)
            }
        }
    }
}

impl std::error::Error for SignatureError {}

/// Aggregate error for the crate's public operations.
///
/// `From<T>` conversions are implemented for the focused error types so
/// callers can use `?` across layers and still return a single expressive
/// type.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// Component registration failed.
    Registry(RegistryError),

    /// Entity spawning failed.
    Spawn(SpawnError),

    /// Signature validation failed.
    Signature(SignatureError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::Registry(e) => write!(f, "{e}"),
            EcsError::Spawn(e) => write!(f, "{e}"),
            EcsError::Signature(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcsError::Registry(e) => Some(e),
            EcsError::Spawn(e) => Some(e),
            EcsError::Signature(e) => Some(e),
        }
    }
}

impl From<RegistryError> for EcsError {
    fn from(e: RegistryError) -> Self {
        EcsError::Registry(e)
    }
}

impl From<SpawnError> for EcsError {
    fn from(e: SpawnError) -> Self {
        EcsError::Spawn(e)
    }
}

impl From<SignatureError> for EcsError {
    fn from(e: SignatureError) -> Self {
        EcsError::Signature(e)
    }
}
