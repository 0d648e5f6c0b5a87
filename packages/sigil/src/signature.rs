//! Signatures are fixed-width sets of component types.
//!
//! A `Signature` describes both which components an entity has and which
//! components a system requires. An entity matches a system when its
//! signature is a superset of the system's.

use std::fmt::{self, Debug, Formatter};
use std::ops::{BitAnd, BitOr};

use bit_vec::BitVec;

use crate::component::{Component, ComponentTypeID, MAX_COMPONENTS};

/// A set of component types, one bit per `ComponentTypeID`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(BitVec);

impl Signature {
    /// Create an empty signature.
    pub fn new() -> Signature {
        Signature(BitVec::from_elem(MAX_COMPONENTS, false))
    }

    /// Create a signature from a list of component types.
    pub fn from_types(component_types: impl IntoIterator<Item=ComponentTypeID>) -> Signature {
        let mut signature = Signature::new();
        for component_type in component_types {
            signature.set(component_type);
        }
        signature
    }

    /// Add a component type to this signature.
    pub fn set(&mut self, component_type: ComponentTypeID) {
        self.0.set(component_type.id(), true);
    }

    /// Add the component type of `T` to this signature.
    pub fn with<T: Component>(mut self) -> Signature {
        self.set(ComponentTypeID::of::<T>());
        self
    }

    /// Remove a component type from this signature.
    pub fn clear(&mut self, component_type: ComponentTypeID) {
        self.0.set(component_type.id(), false);
    }

    /// Returns true if this signature contains the given component type.
    pub fn test(&self, component_type: ComponentTypeID) -> bool {
        self.0.get(component_type.id()).unwrap_or(false)
    }

    /// Remove every component type from this signature.
    pub fn reset(&mut self) {
        self.0 = BitVec::from_elem(MAX_COMPONENTS, false);
    }

    /// Returns true if no component types are set.
    pub fn is_empty(&self) -> bool {
        self.0.none()
    }

    /// Return the number of component types in this signature.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|bit| *bit).count()
    }

    /// Iterate over the component types in this signature, in ID order.
    pub fn iter(&self) -> impl Iterator<Item=ComponentTypeID> + '_ {
        self.0.iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(idx, _)| ComponentTypeID::new(idx))
    }

    /// Return the intersection of two signatures.
    pub fn and(&self, other: &Signature) -> Signature {
        let mut result = self.clone();
        result.0.and(&other.0);
        result
    }

    /// Return the union of two signatures.
    pub fn or(&self, other: &Signature) -> Signature {
        let mut result = self.clone();
        result.0.or(&other.0);
        result
    }

    /// Returns true if every component type in `other` is also in this signature.
    pub fn is_superset_of(&self, other: &Signature) -> bool {
        self.and(other) == *other
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::new()
    }
}

impl<'a> BitAnd for &'a Signature {
    type Output = Signature;

    fn bitand(self, rhs: Self) -> Signature {
        self.and(rhs)
    }
}

impl<'a> BitOr for &'a Signature {
    type Output = Signature;

    fn bitor(self, rhs: Self) -> Signature {
        self.or(rhs)
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ids(raw: &[usize]) -> Signature {
        Signature::from_types(raw.iter().map(|id| ComponentTypeID::new(*id)))
    }

    #[test]
    fn test_set_clear() {
        let mut sig = Signature::new();
        assert!(sig.is_empty());

        sig.set(ComponentTypeID::new(3));
        sig.set(ComponentTypeID::new(31));
        assert!(sig.test(ComponentTypeID::new(3)));
        assert!(sig.test(ComponentTypeID::new(31)));
        assert!(!sig.test(ComponentTypeID::new(4)));
        assert_eq!(sig.count(), 2);

        sig.clear(ComponentTypeID::new(3));
        assert!(!sig.test(ComponentTypeID::new(3)));
        assert_eq!(sig.iter().map(|c| c.id()).collect::<Vec<_>>(), vec![31]);

        sig.reset();
        assert!(sig.is_empty());
    }

    #[test]
    fn test_superset() {
        let entity = ids(&[0, 1, 5]);
        let movement = ids(&[0, 1]);
        let render = ids(&[0, 2]);

        assert!(entity.is_superset_of(&movement));
        assert!(!entity.is_superset_of(&render));
        assert!(entity.is_superset_of(&Signature::new()));
        assert!(!Signature::new().is_superset_of(&movement));
        assert_eq!(&entity & &movement, movement);
        assert_eq!(&movement | &render, ids(&[0, 1, 2]));
    }

    #[test]
    fn test_with() {
        #[derive(Debug, Default)]
        struct Transform;
        crate::component!(Transform);

        let sig = Signature::new().with::<Transform>();
        assert!(sig.test(ComponentTypeID::of::<Transform>()));
        assert_eq!(sig.count(), 1);
        assert_eq!(sig, Signature::from_types([ComponentTypeID::of::<Transform>()]));
    }
}
