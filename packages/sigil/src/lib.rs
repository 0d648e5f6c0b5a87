//! A small, signature-based entity component system.
//!
//! Entities are generational handles; components live in one dense `Pool`
//! per type; systems declare a `Signature` of required components and the
//! `Registry` keeps their entity lists in sync once per frame, in
//! `Registry::update`. An `EventBus` carries typed events between systems.

pub use component::{
    Component,
    ComponentTypeID,
    MAX_COMPONENTS,
};
pub use entity::{Entity, EntityMut};
pub use error::{EcsError, Result};
pub use event_bus::EventBus;
pub use pool::{AnyPool, Pool};
pub use registry::{Registry, RegistryConfig, DEFAULT_POOL_CAPACITY};
pub use signature::Signature;
pub use system::{System, SystemState};

pub mod component;
pub mod signature;
pub mod pool;
mod entity;
mod error;

pub mod registry;
pub mod system;
pub mod event_bus;
