//! Systems and their cached membership.
//!
//! A system declares the components it needs once, at construction. The
//! `Registry` keeps the system's entity list in sync with that signature
//! whenever `Registry::update` is called; systems never edit their own
//! membership.

use std::any::Any;
use std::collections::BTreeSet;

use crate::component::{Component, ComponentTypeID};
use crate::entity::Entity;
use crate::signature::Signature;

/// The signature and entity list shared by every system.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    signature: Signature,
    entities: Vec<Entity>,
    members: BTreeSet<Entity>,
}

impl SystemState {
    /// Create a system state which requires no components.
    pub fn new() -> SystemState {
        SystemState::default()
    }

    /// Require component `T` of every entity in this system.
    pub fn require_component<T: Component>(&mut self) -> &mut Self {
        self.signature.set(ComponentTypeID::of::<T>());
        self
    }

    /// Builder form of `require_component`.
    pub fn requires<T: Component>(mut self) -> Self {
        self.require_component::<T>();
        self
    }

    /// Return the components required by this system.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Return the entities currently matched to this system.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    pub(crate) fn add_entity_to_system(&mut self, entity: Entity) {
        if self.members.insert(entity) {
            self.entities.push(entity);
        }
    }

    pub(crate) fn remove_entity_from_system(&mut self, entity: Entity) {
        if self.members.remove(&entity) {
            self.entities.retain(|e| *e != entity);
        }
    }

    pub(crate) fn clear_entities(&mut self) {
        self.entities.clear();
        self.members.clear();
    }
}

/// A behaviour which runs over every entity matching its signature.
///
/// Implementors hold a `SystemState` and expose it; their per-frame logic is
/// an ordinary method of their own choosing.
///
/// ```rust,ignore
/// struct MovementSystem {
///     state: SystemState,
/// }
///
/// impl MovementSystem {
///     fn new() -> MovementSystem {
///         MovementSystem {
///             state: SystemState::new().requires::<Position>().requires::<Velocity>(),
///         }
///     }
/// }
///
/// impl System for MovementSystem {
///     fn state(&self) -> &SystemState { &self.state }
///     fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
/// }
/// ```
pub trait System: Any {
    fn state(&self) -> &SystemState;

    fn state_mut(&mut self) -> &mut SystemState;

    /// Return the components required by this system.
    fn signature(&self) -> &Signature {
        self.state().signature()
    }

    /// Return the entities this system should process this frame.
    fn system_entities(&self) -> &[Entity] {
        self.state().entities()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;

    #[derive(Debug, Default)]
    struct Sprite(u32);
    component!(Sprite);

    #[test]
    fn test_membership() {
        let mut state = SystemState::new().requires::<Sprite>();
        assert!(state.signature().test(ComponentTypeID::of::<Sprite>()));
        assert_eq!(state.signature().count(), 1);

        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        state.add_entity_to_system(a);
        state.add_entity_to_system(b);
        state.add_entity_to_system(a);
        assert_eq!(state.entities(), &[a, b]);

        state.remove_entity_from_system(a);
        assert_eq!(state.entities(), &[b]);
        assert!(!state.contains(a));

        state.add_entity_to_system(a);
        assert_eq!(state.entities(), &[b, a]);

        state.clear_entities();
        assert!(state.entities().is_empty());
        assert!(!state.contains(b));
    }
}
