//! The registry which owns entities, components and systems.
//!
//! Structural changes (creating and killing entities, and component changes
//! which alter which systems an entity belongs to) are queued and only become
//! visible to systems when `Registry::update` is called. Component values
//! themselves are read and written immediately.

use std::any::{type_name, Any, TypeId};
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crossbeam_queue::SegQueue;

use crate::component::{Component, ComponentTypeID};
use crate::entity::{Entity, EntityMut};
use crate::error::{EcsError, Result};
use crate::pool::{AnyPool, Pool};
use crate::signature::Signature;
use crate::system::System;

use index::{GroupIndex, TagIndex};

mod index;

/// The number of slots a new pool starts with unless configured otherwise.
pub const DEFAULT_POOL_CAPACITY: usize = 100;

/// Settings for a new `Registry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// The number of slots each component pool is created with.
    pub initial_pool_capacity: usize,
    /// The number of entities to reserve table space for.
    pub initial_entity_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            initial_pool_capacity: DEFAULT_POOL_CAPACITY,
            initial_entity_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Per-index bookkeeping.
#[derive(Debug, Clone, Default)]
struct EntityMeta {
    generation: u32,
    alive: bool,
    signature: Signature,
}

struct SystemEntry {
    name: &'static str,
    system: Rc<RefCell<dyn System>>,
    instance: Rc<dyn Any>,
}

/// The central authority for entities, components and systems.
///
/// ```rust,ignore
/// let mut registry = Registry::new();
/// let movement = registry.add_system(MovementSystem::new())?;
///
/// let tank = registry.create_entity();
/// registry.add_component(tank, Position(0.0, 0.0))?;
/// registry.add_component(tank, Velocity(5.0, 0.0))?;
///
/// registry.update()?;
/// assert_eq!(movement.borrow().system_entities(), &[tank]);
/// ```
pub struct Registry {
    config: RegistryConfig,
    entities: Vec<EntityMeta>,
    free_ids: SegQueue<u32>,
    pools: Vec<Option<Box<dyn AnyPool>>>,

    systems: BTreeMap<TypeId, SystemEntry>,
    new_systems: Vec<TypeId>,

    entities_to_add: BTreeSet<Entity>,
    entities_to_refresh: BTreeSet<Entity>,
    entities_to_kill: BTreeSet<Entity>,

    tags: TagIndex,
    groups: GroupIndex,
}

impl Registry {
    /// Create a new registry with the default settings.
    pub fn new() -> Registry {
        Registry::with_config(RegistryConfig::default())
    }

    /// Create a new registry sized for `capacity` entities.
    pub fn with_capacity(capacity: usize) -> Registry {
        Registry::with_config(RegistryConfig {
            initial_pool_capacity: capacity,
            initial_entity_capacity: capacity,
        })
    }

    /// Create a new registry with the given settings.
    pub fn with_config(config: RegistryConfig) -> Registry {
        Registry {
            config,
            entities: Vec::with_capacity(config.initial_entity_capacity),
            free_ids: SegQueue::new(),
            pools: Vec::new(),

            systems: BTreeMap::new(),
            new_systems: Vec::new(),

            entities_to_add: BTreeSet::new(),
            entities_to_refresh: BTreeSet::new(),
            entities_to_kill: BTreeSet::new(),

            tags: TagIndex::default(),
            groups: GroupIndex::default(),
        }
    }

    /// Return the settings this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Create a new entity.
    ///
    /// Indices freed by killed entities are reused first, in the order they
    /// were freed. The entity joins matching systems at the next `update`.
    pub fn create_entity(&mut self) -> Entity {
        let entity = match self.free_ids.pop() {
            Some(index) => {
                let meta = &mut self.entities[index as usize];
                meta.alive = true;
                Entity::new(index, meta.generation)
            }
            None => {
                let index = self.entities.len() as u32;
                self.entities.push(EntityMeta {
                    alive: true,
                    ..EntityMeta::default()
                });

                let len = self.entities.len();
                for pool in self.pools.iter_mut().flatten() {
                    pool.resize(len);
                }

                Entity::new(index, 0)
            }
        };

        self.entities_to_add.insert(entity);
        tracing::trace!(?entity, "created entity");
        entity
    }

    /// Queue an entity to be killed at the next `update`.
    ///
    /// Killing an entity twice before `update` has no further effect.
    pub fn kill_entity(&mut self, entity: Entity) -> Result<()> {
        self.meta(entity)?;
        if self.entities_to_kill.insert(entity) {
            tracing::trace!(?entity, "queued entity kill");
        }
        Ok(())
    }

    /// Returns true if the entity has been created and not yet killed.
    ///
    /// Entities queued to be killed are alive until the next `update`.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.meta(entity).is_ok()
    }

    /// Return the number of alive entities.
    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|meta| meta.alive).count()
    }

    /// Return the number of entity indices ever allocated.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Borrow an entity to operate on it directly.
    pub fn entity_mut(&mut self, entity: Entity) -> Result<EntityMut<'_>> {
        self.meta(entity)?;
        Ok(EntityMut::new(self, entity))
    }

    /// Return the component signature of an entity.
    pub fn signature(&self, entity: Entity) -> Result<&Signature> {
        self.meta(entity).map(|meta| &meta.signature)
    }

    fn meta(&self, entity: Entity) -> Result<&EntityMeta> {
        match self.entities.get(entity.index()) {
            Some(meta) if meta.alive && meta.generation == entity.generation() => Ok(meta),
            _ => Err(EcsError::StaleEntity(entity)),
        }
    }

    fn meta_mut(&mut self, entity: Entity) -> Result<&mut EntityMeta> {
        match self.entities.get_mut(entity.index()) {
            Some(meta) if meta.alive && meta.generation == entity.generation() => Ok(meta),
            _ => Err(EcsError::StaleEntity(entity)),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attach a component to an entity, overwriting any existing value.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<()> {
        let component_type = ComponentTypeID::of::<T>();
        self.meta(entity)?;

        let len = self.entities.len();
        let pool = self.pool_entry::<T>(component_type);
        pool.resize(len);
        let written = pool.set(entity.index(), component);
        debug_assert!(written, "pool was resized to cover every entity index");

        self.meta_mut(entity)?.signature.set(component_type);
        self.entities_to_refresh.insert(entity);
        tracing::trace!(?entity, component = type_name::<T>(), "added component");
        Ok(())
    }

    /// Detach a component from an entity.
    ///
    /// Only the signature is updated; the stored value is left in place until
    /// it is overwritten or the entity is killed.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        let component_type = ComponentTypeID::of::<T>();
        self.require_component::<T>(entity)?;

        self.meta_mut(entity)?.signature.clear(component_type);
        self.entities_to_refresh.insert(entity);
        tracing::trace!(?entity, component = type_name::<T>(), "removed component");
        Ok(())
    }

    /// Returns true if the entity is alive and has a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.meta(entity)
            .map_or(false, |meta| meta.signature.test(ComponentTypeID::of::<T>()))
    }

    /// Get a reference to an entity's component.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        self.require_component::<T>(entity)?;
        self.pool::<T>()
            .and_then(|pool| pool.get(entity.index()))
            .ok_or_else(|| component_not_present::<T>(entity))
    }

    /// Get a mutable reference to an entity's component.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.require_component::<T>(entity)?;
        self.pool_mut::<T>()
            .and_then(|pool| pool.get_mut(entity.index()))
            .ok_or_else(|| component_not_present::<T>(entity))
    }

    /// Get the pool for a component type, if any entity has ever had one.
    pub fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        self.pools.get(ComponentTypeID::of::<T>().id())
            .and_then(Option::as_ref)
            .and_then(|pool| pool.as_any().downcast_ref::<Pool<T>>())
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut Pool<T>> {
        self.pools.get_mut(ComponentTypeID::of::<T>().id())
            .and_then(Option::as_mut)
            .and_then(|pool| pool.as_any_mut().downcast_mut::<Pool<T>>())
    }

    /// Get the pool for a component type, creating it if needed.
    fn pool_entry<T: Component>(&mut self, component_type: ComponentTypeID) -> &mut Pool<T> {
        let idx = component_type.id();
        if self.pools.len() <= idx {
            self.pools.resize_with(idx + 1, || None);
        }

        let initial_len = self.config.initial_pool_capacity.max(self.entities.len());
        let pool = self.pools[idx].get_or_insert_with(|| {
            tracing::debug!(component = type_name::<T>(), len = initial_len, "created component pool");
            Box::new(Pool::<T>::new(initial_len))
        });

        pool.as_any_mut()
            .downcast_mut::<Pool<T>>()
            .expect("component type IDs are unique per type")
    }

    fn require_component<T: Component>(&self, entity: Entity) -> Result<()> {
        let meta = self.meta(entity)?;
        if meta.signature.test(ComponentTypeID::of::<T>()) {
            Ok(())
        } else {
            Err(component_not_present::<T>(entity))
        }
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Register a system.
    ///
    /// Only one system of each type may be registered at a time. The system
    /// is populated with every matching entity at the next `update`.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<Rc<RefCell<S>>> {
        let type_id = TypeId::of::<S>();
        let name = type_name::<S>();
        if self.systems.contains_key(&type_id) {
            return Err(EcsError::SystemAlreadyRegistered(name));
        }

        let instance = Rc::new(RefCell::new(system));
        let erased: Rc<RefCell<dyn System>> = instance.clone();
        self.systems.insert(type_id, SystemEntry {
            name,
            system: erased,
            instance: instance.clone(),
        });
        self.new_systems.push(type_id);

        tracing::debug!(system = name, "added system");
        Ok(instance)
    }

    /// Unregister a system, returning it.
    pub fn remove_system<S: System>(&mut self) -> Result<Rc<RefCell<S>>> {
        let type_id = TypeId::of::<S>();
        let entry = self.systems.remove(&type_id)
            .ok_or(EcsError::SystemNotRegistered(type_name::<S>()))?;
        self.new_systems.retain(|id| *id != type_id);

        tracing::debug!(system = entry.name, "removed system");
        downcast_system::<S>(entry.instance)
    }

    /// Returns true if a system of type `S` is registered.
    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<S>())
    }

    /// Get the registered system of type `S`.
    pub fn get_system<S: System>(&self) -> Result<Rc<RefCell<S>>> {
        let entry = self.systems.get(&TypeId::of::<S>())
            .ok_or(EcsError::SystemNotRegistered(type_name::<S>()))?;
        downcast_system::<S>(entry.instance.clone())
    }

    /// Return the number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // =========================================================================
    // Tags & groups
    // =========================================================================

    /// Tag an entity, replacing any tag it (or the tag) had before.
    pub fn tag_entity(&mut self, entity: Entity, tag: &str) -> Result<()> {
        self.meta(entity)?;
        self.tags.tag(entity, tag);
        Ok(())
    }

    pub fn entity_has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.tags.has_tag(entity, tag)
    }

    /// Return the tag of an entity, if it has one.
    pub fn entity_tag(&self, entity: Entity) -> Option<&str> {
        self.tags.tag_of(entity)
    }

    /// Look up the entity holding a tag.
    pub fn get_entity_by_tag(&self, tag: &str) -> Result<Entity> {
        self.tags.entity(tag)
            .ok_or_else(|| EcsError::UnknownTag(tag.to_owned()))
    }

    /// Remove an entity's tag, returning it.
    pub fn remove_entity_tag(&mut self, entity: Entity) -> Option<String> {
        self.tags.remove(entity)
    }

    /// Put an entity into a group, moving it out of any previous group.
    pub fn group_entity(&mut self, entity: Entity, group: &str) -> Result<()> {
        self.meta(entity)?;
        self.groups.group(entity, group);
        Ok(())
    }

    pub fn entity_belongs_to_group(&self, entity: Entity, group: &str) -> bool {
        self.groups.belongs_to_group(entity, group)
    }

    /// Return the group of an entity, if it has one.
    pub fn entity_group(&self, entity: Entity) -> Option<&str> {
        self.groups.group_of(entity)
    }

    /// Return every entity in a group, ordered by handle.
    pub fn get_entities_by_group(&self, group: &str) -> Result<Vec<Entity>> {
        self.groups.entities(group)
            .map(|entities| entities.iter().copied().collect())
            .ok_or_else(|| EcsError::UnknownGroup(group.to_owned()))
    }

    /// Remove an entity from its group, returning the group name.
    pub fn remove_entity_group(&mut self, entity: Entity) -> Option<String> {
        self.groups.remove(entity)
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Apply all queued structural changes to the registered systems.
    ///
    /// 1. Newly added systems are populated with every matching entity.
    /// 2. Created entities, and entities whose components changed, join or
    ///    leave systems according to their signatures.
    /// 3. Killed entities leave every system; their signatures are cleared,
    ///    their component slots reset, and their indices freed for reuse.
    ///
    /// If any system is borrowed (for instance because `update` was called
    /// from within a system), this returns `EcsError::SystemBusy` and changes
    /// nothing.
    pub fn update(&mut self) -> Result<()> {
        let handles = self.system_handles();
        let mut systems = borrow_systems(&handles)?;

        let new_systems = std::mem::take(&mut self.new_systems);
        for (_, system) in systems.iter_mut().filter(|(id, _)| new_systems.contains(id)) {
            let state = system.state_mut();
            for (index, meta) in self.entities.iter().enumerate() {
                if meta.alive && meta.signature.is_superset_of(state.signature()) {
                    state.add_entity_to_system(Entity::new(index as u32, meta.generation));
                }
            }
        }

        let added = std::mem::take(&mut self.entities_to_add);
        let refreshed = std::mem::take(&mut self.entities_to_refresh);
        for entity in added.iter().chain(refreshed.difference(&added)) {
            let meta = match self.meta(*entity) {
                Ok(meta) => meta,
                Err(_) => continue,
            };

            for (_, system) in systems.iter_mut() {
                let state = system.state_mut();
                if meta.signature.is_superset_of(state.signature()) {
                    state.add_entity_to_system(*entity);
                } else {
                    state.remove_entity_from_system(*entity);
                }
            }
        }

        let killed = std::mem::take(&mut self.entities_to_kill);
        for entity in killed.iter().copied() {
            let meta = match self.entities.get_mut(entity.index()) {
                Some(meta) if meta.alive && meta.generation == entity.generation() => meta,
                _ => continue,
            };

            for (_, system) in systems.iter_mut() {
                system.state_mut().remove_entity_from_system(entity);
            }

            for component_type in meta.signature.iter() {
                if let Some(Some(pool)) = self.pools.get_mut(component_type.id()) {
                    pool.reset(entity.index());
                }
            }

            meta.signature.reset();
            meta.alive = false;
            meta.generation = meta.generation.wrapping_add(1);

            self.tags.remove(entity);
            self.groups.remove(entity);
            self.free_ids.push(entity.id());
        }

        tracing::debug!(
            added = added.len(),
            refreshed = refreshed.len(),
            killed = killed.len(),
            new_systems = new_systems.len(),
            "registry updated",
        );
        Ok(())
    }

    /// Kill every entity immediately and empty every system.
    ///
    /// Pending changes and component pools are discarded. Systems stay
    /// registered, and entity generations are kept so that old handles stay
    /// stale.
    pub fn clear(&mut self) -> Result<()> {
        let handles = self.system_handles();
        let mut systems = borrow_systems(&handles)?;
        for (_, system) in systems.iter_mut() {
            system.state_mut().clear_entities();
        }

        for pool in self.pools.iter_mut().flatten() {
            pool.clear();
        }
        self.pools.clear();

        for (index, meta) in self.entities.iter_mut().enumerate() {
            if meta.alive {
                meta.signature.reset();
                meta.alive = false;
                meta.generation = meta.generation.wrapping_add(1);
                self.free_ids.push(index as u32);
            }
        }

        self.entities_to_add.clear();
        self.entities_to_refresh.clear();
        self.entities_to_kill.clear();
        self.tags.clear();
        self.groups.clear();

        tracing::debug!(entities = self.entities.len(), "registry cleared");
        Ok(())
    }

    fn system_handles(&self) -> Vec<(TypeId, &'static str, Rc<RefCell<dyn System>>)> {
        self.systems.iter()
            .map(|(type_id, entry)| (*type_id, entry.name, entry.system.clone()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registry {{")?;
        writeln!(f, "  Entities: {} alive, {} allocated, {} free",
                 self.alive_count(), self.entities.len(), self.free_ids.len())?;

        writeln!(f, "  Pools:")?;
        for pool in self.pools.iter().flatten() {
            writeln!(f, "    {} - {} slots", pool.component_name(), pool.len())?;
        }

        writeln!(f, "  Systems:")?;
        for entry in self.systems.values() {
            match entry.system.try_borrow() {
                Ok(system) => writeln!(f, "    {} - {} entities, requires {:?}",
                                       entry.name, system.system_entities().len(), system.signature())?,
                Err(_) => writeln!(f, "    {} - <borrowed>", entry.name)?,
            }
        }

        writeln!(f, "}}")
    }
}

fn component_not_present<T: Component>(entity: Entity) -> EcsError {
    EcsError::ComponentNotPresent {
        entity,
        component: type_name::<T>(),
    }
}

fn downcast_system<S: System>(instance: Rc<dyn Any>) -> Result<Rc<RefCell<S>>> {
    instance.downcast::<RefCell<S>>()
        .map_err(|_| EcsError::SystemNotRegistered(type_name::<S>()))
}

/// Mutably borrow every system, failing if any of them is already borrowed.
fn borrow_systems<'a>(
    handles: &'a [(TypeId, &'static str, Rc<RefCell<dyn System>>)],
) -> Result<Vec<(TypeId, RefMut<'a, dyn System>)>> {
    handles.iter()
        .map(|(type_id, name, system)| {
            system.try_borrow_mut()
                .map(|system| (*type_id, system))
                .map_err(|_| EcsError::SystemBusy(*name))
        })
        .collect()
}
