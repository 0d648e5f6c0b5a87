//! Errors returned by registry lookups and mutations.

use thiserror::Error;

use crate::entity::Entity;

/// The error type for registry operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The entity does not currently hold a component of the requested type.
    #[error("{entity:?} has no {component} component")]
    ComponentNotPresent {
        entity: Entity,
        component: &'static str,
    },

    /// No system of the requested type has been added to the registry.
    #[error("system {0} is not registered")]
    SystemNotRegistered(&'static str),

    /// A system of this type is already registered.
    #[error("system {0} is already registered")]
    SystemAlreadyRegistered(&'static str),

    /// A system was borrowed while the registry needed to update it.
    ///
    /// This happens when `Registry::update` is called from inside a system's
    /// own update.
    #[error("system {0} is borrowed during a registry update")]
    SystemBusy(&'static str),

    /// No entity holds the given tag.
    #[error("no entity is tagged {0:?}")]
    UnknownTag(String),

    /// The group name has never been created.
    #[error("group {0:?} does not exist")]
    UnknownGroup(String),

    /// The entity handle refers to an entity which has been killed.
    #[error("{0:?} is stale or was never allocated")]
    StaleEntity(Entity),

    /// More component types were registered than a `Signature` can hold.
    #[error("cannot register {component}: at most {capacity} component types are supported")]
    CapacityExceeded {
        capacity: usize,
        component: &'static str,
    },
}

/// A `Result` using `EcsError`.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;
