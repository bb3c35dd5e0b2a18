//! Per-element property storage.
//!
//! Every piece of per-element data (adjacency, positions, user attributes) is
//! a [`Property`]: a named array with one slot per element. A [`PropertySet`]
//! holds any number of properties of different value types for one element
//! kind and keeps them the same length, so adding an element extends all of
//! them at once.
//!
//! The set stores its properties as [`ErasedProperty`] trait objects, which
//! only expose the structural operations. Typed access goes through the
//! [`PropertyHandle`] returned by [`PropertySet::add`].
//!
//! ```
//! use hemesh::mesh::PropertySet;
//!
//! let mut set = PropertySet::new();
//! set.extend();
//! set.extend();
//!
//! let weights = set.add("weight", 1.0_f64);
//! set.get_mut(weights).unwrap().set(1, 4.0);
//!
//! assert_eq!(set.get(weights).unwrap().as_slice(), &[1.0, 4.0]);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A named array of values, one per element.
#[derive(Debug, Clone)]
pub struct Property<T> {
    name: String,
    default: T,
    values: Vec<T>,
}

impl<T: Clone> Property<T> {
    /// Create an empty property.
    pub fn new(name: impl Into<String>, default: T) -> Self {
        Self {
            name: name.into(),
            default,
            values: Vec::new(),
        }
    }

    /// Create a property with `len` default-valued slots.
    pub fn with_len(name: impl Into<String>, default: T, len: usize) -> Self {
        let values = vec![default.clone(); len];
        Self {
            name: name.into(),
            default,
            values,
        }
    }

    /// The property's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value given to new slots.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at slot `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> &T {
        &self.values[idx]
    }

    /// Mutable value at slot `idx`.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut T {
        &mut self.values[idx]
    }

    /// Overwrite slot `idx`.
    #[inline]
    pub fn set(&mut self, idx: usize, value: T) {
        self.values[idx] = value;
    }

    /// Reset slot `idx` to the default value.
    #[inline]
    pub fn reset(&mut self, idx: usize) {
        self.values[idx] = self.default.clone();
    }

    /// Reserve capacity for `additional` more slots.
    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    /// Remove all slots.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Append one default-valued slot.
    #[inline]
    pub fn push_default(&mut self) {
        self.values.push(self.default.clone());
    }

    /// The values as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// The values as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterate over the values.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }
}

/// Structural operations on a property, independent of its value type.
pub trait ErasedProperty: Send + Sync {
    /// The property's name.
    fn name(&self) -> &str;
    /// Number of slots.
    fn len(&self) -> usize;
    /// Whether there are no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Append one default-valued slot.
    fn extend(&mut self);
    /// Grow or shrink to `n` slots, filling with the default value.
    fn resize(&mut self, n: usize);
    /// Remove all slots.
    fn clear(&mut self);
    /// Reserve capacity for `additional` more slots.
    fn reserve(&mut self, additional: usize);
    /// Exchange two slots.
    fn swap_items(&mut self, i: usize, j: usize);
    /// Clone into a new box.
    fn clone_box(&self) -> Box<dyn ErasedProperty>;
    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;
    /// Upcast for typed mutable access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ErasedProperty for Property<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn extend(&mut self) {
        self.push_default();
    }

    fn resize(&mut self, n: usize) {
        self.values.resize(n, self.default.clone());
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    fn swap_items(&mut self, i: usize, j: usize) {
        self.values.swap(i, j);
    }

    fn clone_box(&self) -> Box<dyn ErasedProperty> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to a property inside a [`PropertySet`].
pub struct PropertyHandle<T> {
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyHandle<T> {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// Position of the property inside its set.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T> Clone for PropertyHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyHandle<T> {}

impl<T> PartialEq for PropertyHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<T> Eq for PropertyHandle<T> {}

impl<T> fmt::Debug for PropertyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyHandle({})", self.slot)
    }
}

/// A collection of same-length properties for one element kind.
///
/// The set tracks its own slot count, so properties registered after
/// elements were added are back-filled to the right length.
#[derive(Default)]
pub struct PropertySet {
    properties: Vec<Box<dyn ErasedProperty>>,
    by_name: HashMap<String, usize>,
    len: usize,
}

impl PropertySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new property, filled with `default` up to the current size.
    ///
    /// Names are not unique: registering the same name twice creates two
    /// properties and name lookup returns the most recent one.
    pub fn add<T>(&mut self, name: &str, default: T) -> PropertyHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = self.properties.len();
        self.properties
            .push(Box::new(Property::with_len(name, default, self.len)));
        self.by_name.insert(name.to_string(), slot);
        PropertyHandle::new(slot)
    }

    /// Typed access to a property.
    ///
    /// Returns `None` if the handle belongs to a different set.
    pub fn get<T: 'static>(&self, handle: PropertyHandle<T>) -> Option<&Property<T>> {
        self.properties
            .get(handle.slot)
            .and_then(|p| p.as_any().downcast_ref::<Property<T>>())
    }

    /// Typed mutable access to a property.
    pub fn get_mut<T: 'static>(&mut self, handle: PropertyHandle<T>) -> Option<&mut Property<T>> {
        self.properties
            .get_mut(handle.slot)
            .and_then(|p| p.as_any_mut().downcast_mut::<Property<T>>())
    }

    /// Look up the most recently registered property called `name` with value type `T`.
    pub fn find<T: 'static>(&self, name: &str) -> Option<PropertyHandle<T>> {
        let slot = *self.by_name.get(name)?;
        self.properties[slot]
            .as_any()
            .is::<Property<T>>()
            .then(|| PropertyHandle::new(slot))
    }

    /// Whether a property with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names of all registered properties, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties.iter().map(|p| p.name())
    }

    /// Number of registered properties.
    pub fn num_properties(&self) -> usize {
        self.properties.len()
    }

    /// Number of element slots.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Append one default-valued slot to every property.
    pub fn extend(&mut self) {
        for p in &mut self.properties {
            p.extend();
        }
        self.len += 1;
    }

    /// Resize every property to `n` slots.
    pub fn resize(&mut self, n: usize) {
        for p in &mut self.properties {
            p.resize(n);
        }
        self.len = n;
    }

    /// Reserve room for `additional` more slots in every property.
    pub fn reserve(&mut self, additional: usize) {
        for p in &mut self.properties {
            p.reserve(additional);
        }
    }

    /// Drop every slot; the registered properties remain.
    pub fn clear(&mut self) {
        for p in &mut self.properties {
            p.clear();
        }
        self.len = 0;
    }

    /// Exchange slots `i` and `j` in every property.
    pub fn swap_items(&mut self, i: usize, j: usize) {
        for p in &mut self.properties {
            p.swap_items(i, j);
        }
    }
}

impl Clone for PropertySet {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.iter().map(|p| p.clone_box()).collect(),
            by_name: self.by_name.clone(),
            len: self.len,
        }
    }
}

impl fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySet")
            .field("properties", &self.names().collect::<Vec<_>>())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_backfills() {
        let mut set = PropertySet::new();
        set.extend();
        set.extend();
        set.extend();

        let h = set.add("label", 7u8);
        let prop = set.get(h).unwrap();
        assert_eq!(prop.len(), 3);
        assert!(prop.iter().all(|&x| x == 7));
    }

    #[test]
    fn test_extend_keeps_lengths_equal() {
        let mut set = PropertySet::new();
        let a = set.add("a", 0i32);
        let b = set.add("b", String::from("x"));

        for _ in 0..5 {
            set.extend();
        }

        assert_eq!(set.size(), 5);
        assert_eq!(set.get(a).unwrap().len(), 5);
        assert_eq!(set.get(b).unwrap().len(), 5);
        assert_eq!(set.get(b).unwrap().get(4), "x");
    }

    #[test]
    fn test_resize_and_clear() {
        let mut set = PropertySet::new();
        let a = set.add("a", 1.5f64);
        set.resize(4);
        assert_eq!(set.get(a).unwrap().as_slice(), &[1.5; 4]);

        set.resize(2);
        assert_eq!(set.size(), 2);
        assert_eq!(set.get(a).unwrap().len(), 2);

        set.clear();
        assert_eq!(set.size(), 0);
        assert!(set.get(a).unwrap().is_empty());
        assert_eq!(set.num_properties(), 1);
    }

    #[test]
    fn test_swap_items() {
        let mut set = PropertySet::new();
        let a = set.add("a", 0usize);
        let b = set.add("b", 'z');
        set.resize(3);
        for i in 0..3 {
            set.get_mut(a).unwrap().set(i, i);
        }
        set.get_mut(b).unwrap().set(0, 'p');

        set.swap_items(0, 2);

        assert_eq!(set.get(a).unwrap().as_slice(), &[2, 1, 0]);
        assert_eq!(set.get(b).unwrap().as_slice(), &['z', 'z', 'p']);
    }

    #[test]
    fn test_find_by_name_last_write_wins() {
        let mut set = PropertySet::new();
        let first = set.add("n", 1i64);
        let second = set.add("n", 2i64);
        set.extend();

        let found = set.find::<i64>("n").unwrap();
        assert_eq!(found, second);
        assert_ne!(found, first);
        assert_eq!(*set.get(found).unwrap().get(0), 2);

        // Wrong value type is not found.
        assert!(set.find::<f32>("n").is_none());
        assert!(set.find::<i64>("missing").is_none());
    }

    #[test]
    fn test_handle_from_other_set_type_mismatch() {
        let mut a = PropertySet::new();
        let mut b = PropertySet::new();
        let _ = a.add("x", 0u32);
        let hb = b.add("y", 0.0f32);

        // Same slot, different value type.
        assert!(a.get(hb).is_none());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut set = PropertySet::new();
        let h = set.add("v", 0i32);
        set.extend();

        let mut copy = set.clone();
        copy.get_mut(h).unwrap().set(0, 9);

        assert_eq!(*set.get(h).unwrap().get(0), 0);
        assert_eq!(*copy.get(h).unwrap().get(0), 9);
    }
}
