//! Entity handles.
//!
//! An `Entity` is only an identifier: an index into the registry's tables and
//! a generation which is bumped every time the index is recycled. Handles to
//! killed entities are therefore rejected instead of silently aliasing the
//! next entity to reuse the index.

use std::fmt::{self, Debug, Formatter};

use crate::component::Component;
use crate::error::Result;
use crate::registry::Registry;

/// A handle to an entity in a `Registry`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Construct an entity handle from its raw parts.
    pub(crate) fn new(index: u32, generation: u32) -> Entity {
        Entity { index, generation }
    }

    /// Return the index of this entity.
    ///
    /// Indices are unique among live entities and are reused after a kill.
    pub fn id(&self) -> u32 {
        self.index
    }

    /// Return the index as a `usize`, for indexing pools.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Return how many times this index had been recycled when the handle
    /// was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl Debug for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// A mutable view of one entity, borrowed from its `Registry`.
///
/// Every method forwards to the registry method of the same name.
pub struct EntityMut<'a> {
    registry: &'a mut Registry,
    entity: Entity,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(registry: &'a mut Registry, entity: Entity) -> EntityMut<'a> {
        EntityMut { registry, entity }
    }

    /// Return the entity handle.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Return the index of the entity.
    pub fn id(&self) -> u32 {
        self.entity.id()
    }

    /// Queue this entity to be killed at the next `Registry::update`.
    pub fn kill(&mut self) -> Result<()> {
        self.registry.kill_entity(self.entity)
    }

    /// Attach (or overwrite) a component.
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.registry.add_component(self.entity, component)?;
        Ok(self)
    }

    pub fn remove_component<T: Component>(&mut self) -> Result<()> {
        self.registry.remove_component::<T>(self.entity)
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    pub fn get_component<T: Component>(&self) -> Result<&T> {
        self.registry.get_component::<T>(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.registry.get_component_mut::<T>(self.entity)
    }

    /// Tag this entity, replacing any tag it already had.
    pub fn tag(&mut self, tag: &str) -> Result<()> {
        self.registry.tag_entity(self.entity, tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.registry.entity_has_tag(self.entity, tag)
    }

    /// Move this entity into a group.
    pub fn group(&mut self, group: &str) -> Result<()> {
        self.registry.group_entity(self.entity, group)
    }

    pub fn belongs_to_group(&self, group: &str) -> bool {
        self.registry.entity_belongs_to_group(self.entity, group)
    }
}

impl<'a> Debug for EntityMut<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EntityMut({:?})", self.entity)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use crate::error::EcsError;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Fuel(u32);
    component!(Fuel);

    #[test]
    fn test_entity_ordering() {
        let a = Entity::new(1, 0);
        let b = Entity::new(2, 0);
        let a_reused = Entity::new(1, 1);

        assert!(a < b);
        assert_ne!(a, a_reused);
        assert_eq!(a.id(), a_reused.id());
        assert_eq!(format!("{:?}", a_reused), "Entity(1v1)");
    }

    #[test]
    fn test_entity_mut() {
        let mut registry = Registry::new();
        let handle = registry.create_entity();

        {
            let mut entity = registry.entity_mut(handle).unwrap();
            assert_eq!(entity.entity(), handle);
            assert_eq!(entity.id(), handle.id());
            assert!(!entity.has_component::<Fuel>());

            entity.add_component(Fuel(10)).unwrap();
            assert!(entity.has_component::<Fuel>());
            entity.get_component_mut::<Fuel>().unwrap().0 += 5;
            assert_eq!(entity.get_component::<Fuel>(), Ok(&Fuel(15)));

            entity.remove_component::<Fuel>().unwrap();
            assert!(!entity.has_component::<Fuel>());
            assert!(matches!(
                entity.get_component::<Fuel>(),
                Err(EcsError::ComponentNotPresent { .. })
            ));

            entity.tag("rocket").unwrap();
            assert!(entity.has_tag("rocket"));
            assert!(!entity.has_tag("lander"));

            entity.group("vehicles").unwrap();
            assert!(entity.belongs_to_group("vehicles"));
            entity.group("wrecks").unwrap();
            assert!(!entity.belongs_to_group("vehicles"));

            entity.kill().unwrap();
        }

        assert!(registry.is_alive(handle));
        registry.update().unwrap();
        assert!(!registry.is_alive(handle));
        assert!(matches!(registry.entity_mut(handle), Err(EcsError::StaleEntity(_))));
    }
}
