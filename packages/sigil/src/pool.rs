//! Dense per-type component storage.
//!
//! Every component type gets one `Pool`, indexed directly by entity index.
//! Pools are stored type-erased behind `AnyPool` and downcast back to
//! `Pool<T>` by the registry's generic accessors.

use std::any::{type_name, Any};

use crate::component::Component;

/// The non-generic capabilities of a `Pool`.
pub trait AnyPool: Any {
    /// Return the number of slots in the pool.
    fn len(&self) -> usize;

    /// Returns true if the pool has no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow the pool to at least `len` slots.
    fn resize(&mut self, len: usize);

    /// Restore the slot at `index` to its default value.
    fn reset(&mut self, index: usize);

    /// Remove every slot.
    fn clear(&mut self);

    /// Return the name of the stored component type.
    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Storage for a single component type, one slot per entity index.
///
/// Slots for entities which lack the component hold whatever value was last
/// written (or the default); the entity's `Signature` decides validity.
#[derive(Debug, Clone)]
pub struct Pool<T: Component> {
    data: Vec<T>,
}

impl<T: Component> Pool<T> {
    /// Create a pool with `len` default-initialized slots.
    pub fn new(len: usize) -> Pool<T> {
        let mut data = Vec::with_capacity(len);
        data.resize_with(len, T::default);
        Pool { data }
    }

    /// Return the number of slots.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the pool has no slots.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow to at least `len` slots, default-initializing the new ones.
    ///
    /// Pools never shrink.
    pub fn resize(&mut self, len: usize) {
        if len > self.data.len() {
            self.data.resize_with(len, T::default);
        }
    }

    /// Overwrite the slot at `index`.
    ///
    /// Returns false if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Get the slot at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Get the slot at `index` mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// Restore the slot at `index` to `T::default()`.
    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = T::default();
        }
    }

    /// Remove every slot.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate over every slot with its index.
    pub fn iter(&self) -> impl Iterator<Item=(usize, &T)> {
        self.data.iter().enumerate()
    }
}

impl<T: Component> AnyPool for Pool<T> {
    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn resize(&mut self, len: usize) {
        Pool::resize(self, len)
    }

    fn reset(&mut self, index: usize) {
        Pool::reset(self, index)
    }

    fn clear(&mut self) {
        Pool::clear(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Health(i32);
    component!(Health);

    #[test]
    fn test_pool_get_set() {
        let mut pool: Pool<Health> = Pool::new(4);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.get(2), Some(&Health(0)));

        assert!(pool.set(2, Health(75)));
        assert_eq!(pool.get(2), Some(&Health(75)));
        assert!(!pool.set(4, Health(1)));
        assert!(pool.get(4).is_none());

        pool.get_mut(2).unwrap().0 -= 5;
        assert_eq!(pool.get(2), Some(&Health(70)));

        pool.reset(2);
        assert_eq!(pool.get(2), Some(&Health(0)));

        pool.set(3, Health(8));
        let alive: Vec<_> = pool.iter().filter(|(_, h)| h.0 > 0).collect();
        assert_eq!(alive, vec![(3, &Health(8))]);
    }

    #[test]
    fn test_pool_resize() {
        let mut pool: Pool<Health> = Pool::new(2);
        pool.set(1, Health(9));

        pool.resize(10);
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.get(1), Some(&Health(9)));
        assert_eq!(pool.get(9), Some(&Health(0)));

        // Pools never shrink.
        pool.resize(3);
        assert_eq!(pool.len(), 10);

        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_erased() {
        let mut erased: Box<dyn AnyPool> = Box::new(Pool::<Health>::new(1));
        erased.resize(3);
        assert_eq!(erased.len(), 3);
        assert!(erased.component_name().ends_with("Health"));

        let pool = erased.as_any_mut().downcast_mut::<Pool<Health>>().unwrap();
        pool.set(2, Health(3));
        assert_eq!(pool.get(2), Some(&Health(3)));

        erased.clear();
        assert!(erased.is_empty());
    }
}
