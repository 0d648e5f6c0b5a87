//! Base definitions for components.
//!
//! Entities carry no data of their own: everything about an entity lives in
//! its components. This module provides means of defining and identifying
//! component types.
//!
//! Each component type is allocated a unique ID the first time it is used.
//! IDs are process-wide and start at 0. There is a macro (`component`) to help
//! you assign this unique ID.

use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::sync::{PoisonError, RwLock};

use once_cell::sync::{Lazy, OnceCell};

use crate::error::{EcsError, Result};

/// The maximum number of distinct component types a process may register.
///
/// This is also the width of every `Signature`.
pub const MAX_COMPONENTS: usize = 32;

/// A component type ID which is unique for a specific component type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeID(usize);

static COMPONENT_REGISTRY: Lazy<RwLock<ComponentRegistry>> =
    Lazy::new(|| RwLock::new(ComponentRegistry::new()));

impl ComponentTypeID {
    /// Construct a new `ComponentTypeID` from the inner value.
    pub(crate) fn new(inner: usize) -> ComponentTypeID {
        ComponentTypeID(inner)
    }

    /// Return the `ComponentTypeID` of `T`, registering it on first use.
    pub fn of<T: Component>() -> ComponentTypeID {
        T::component_type_id()
    }

    /// Allocate the next process-wide `ComponentTypeID` for `T`.
    ///
    /// Prefer `ComponentTypeID::of`, which only registers a type once.
    ///
    /// # Panics
    ///
    /// Panics if `MAX_COMPONENTS` types are already registered. This is a
    /// static configuration mistake rather than a runtime condition.
    pub fn register<T: Component>() -> ComponentTypeID {
        let name = type_name::<T>();
        let mut registry = COMPONENT_REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match registry.try_register(name) {
            Ok(id) => {
                tracing::debug!(component = name, id = id.0, "registered component type");
                id
            }
            Err(err) => panic!("{}", err),
        }
    }

    /// Fetch the registration for this `ComponentTypeID` returning None if it is
    /// missing from the registry.
    fn safe_registration(&self) -> Option<ComponentRegistration> {
        let registry = COMPONENT_REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        registry.get(*self)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }

    /// Return the name of this component type.
    pub fn name(&self) -> &'static str {
        self.safe_registration()
            .map_or("<unregistered>", |reg| reg.name())
    }
}

impl Debug for ComponentTypeID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.safe_registration() {
            Some(reg) => write!(f, "{}", reg.name()),
            None => write!(f, "ComponentTypeID(#{} missing)", self.0),
        }
    }
}

/// A ComponentRegistration records what is known about a registered type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentRegistration {
    type_id: ComponentTypeID,
    name: &'static str,
}

impl ComponentRegistration {
    /// Return the unique type ID for this `ComponentRegistration`.
    pub fn type_id(&self) -> ComponentTypeID {
        self.type_id
    }

    /// Get the name of this component type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A table of component types which hands out IDs in registration order.
///
/// The process-wide table behind `ComponentTypeID::of` is one of these with a
/// capacity of `MAX_COMPONENTS`.
#[derive(Debug)]
pub struct ComponentRegistry {
    component_types: Vec<ComponentRegistration>,
    capacity: usize,
}

impl ComponentRegistry {
    /// Create an empty registry which can hold `MAX_COMPONENTS` types.
    pub fn new() -> ComponentRegistry {
        ComponentRegistry::with_capacity(MAX_COMPONENTS)
    }

    /// Create an empty registry which can hold `capacity` types.
    pub fn with_capacity(capacity: usize) -> ComponentRegistry {
        ComponentRegistry {
            component_types: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a new type, returning its ID.
    pub fn try_register(&mut self, name: &'static str) -> Result<ComponentTypeID> {
        if self.component_types.len() >= self.capacity {
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity,
                component: name,
            });
        }

        let type_id = ComponentTypeID(self.component_types.len());
        self.component_types.push(ComponentRegistration { type_id, name });
        Ok(type_id)
    }

    /// Look up the registration of a type ID.
    pub fn get(&self, type_id: ComponentTypeID) -> Option<ComponentRegistration> {
        self.component_types.get(type_id.0).copied()
    }

    /// Return the number of registered types.
    pub fn len(&self) -> usize {
        self.component_types.len()
    }

    /// Returns true if no types have been registered.
    pub fn is_empty(&self) -> bool {
        self.component_types.is_empty()
    }

    /// Return the maximum number of types this registry accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        ComponentRegistry::new()
    }
}

/// A struct for lazily assigning unique `ComponentTypeID`s.
pub struct AutoComponentTypeID(OnceCell<ComponentTypeID>);

impl AutoComponentTypeID {
    /// Create a new `AutoComponentTypeID`.
    pub const fn new() -> AutoComponentTypeID {
        AutoComponentTypeID(OnceCell::new())
    }

    /// Get the `ComponentTypeID` this struct wraps.
    pub fn get<T: Component>(&self) -> ComponentTypeID {
        *self.0.get_or_init(ComponentTypeID::register::<T>)
    }
}

impl Default for AutoComponentTypeID {
    fn default() -> Self {
        AutoComponentTypeID::new()
    }
}

/// The component trait is implemented on all component types.
///
/// Components must implement `Default` so that pool slots can be filled
/// before a value is written to them.
pub trait Component: Debug + Default + 'static {
    /// Get the unique type ID of this component.
    ///
    /// Implementations must return the same ID on every call. Use the
    /// `component!` macro rather than implementing this by hand.
    fn component_type_id() -> ComponentTypeID;
}

/// Implement the `Component` trait on one or more types.
///
/// Component types must implement Debug and Default.
#[macro_export]
macro_rules! component {
    ($($i:ident),+ $(,)?) => {
        $(
            const _: () = {
                static INIT_TYPE: $crate::component::AutoComponentTypeID =
                    $crate::component::AutoComponentTypeID::new();

                impl $crate::component::Component for $i {
                    fn component_type_id() -> $crate::component::ComponentTypeID {
                        INIT_TYPE.get::<$i>()
                    }
                }
            };
        )+
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uniqueness() {
        #[derive(Debug, Clone, Copy, Default)]
        struct A;
        #[derive(Debug, Clone, Copy, Default)]
        struct B;

        component!(A, B);

        assert_ne!(ComponentTypeID::of::<A>(), ComponentTypeID::of::<B>());
        assert_eq!(ComponentTypeID::of::<A>(), ComponentTypeID::of::<A>());
        assert!(ComponentTypeID::of::<A>().id() < MAX_COMPONENTS);
        assert!(ComponentTypeID::of::<A>().name().ends_with("A"));
    }

    #[test]
    fn test_registration_order() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.is_empty());

        let a = registry.try_register("a").unwrap();
        let b = registry.try_register("b").unwrap();
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(registry.get(b).unwrap().name(), "b");
        assert_eq!(registry.get(b).unwrap().type_id(), b);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(ComponentTypeID::new(2)).is_none());
    }

    #[test]
    fn test_capacity() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.capacity(), MAX_COMPONENTS);
        for _ in 0..MAX_COMPONENTS {
            registry.try_register("filler").unwrap();
        }

        let err = registry.try_register("one_too_many").unwrap_err();
        assert_eq!(err, EcsError::CapacityExceeded {
            capacity: MAX_COMPONENTS,
            component: "one_too_many",
        });
        assert_eq!(registry.len(), MAX_COMPONENTS);
    }
}
