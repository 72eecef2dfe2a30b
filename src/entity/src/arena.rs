use std::fmt;
use std::marker::PhantomData;

use derivative::Derivative;

/// A non-owning handle into an [`Arena`].
#[derive(Derivative)]
#[derivative(
    Clone(bound=""), Copy(bound=""), Eq(bound=""), Hash(bound=""),
    PartialEq(bound=""), PartialOrd(bound=""), Ord(bound=""),
)]
pub struct Id<T> {
    idx: u32,
    _ph: PhantomData<Box<T>>,
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

impl<T> Id<T> {
    fn new(idx: u32) -> Self {
        Id { idx, _ph: PhantomData }
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.idx
    }
}

/// Append-only storage. Ids are never invalidated, so a handle stays
/// meaningful for as long as the arena that issued it.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.items.len() as _
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn add(&mut self, value: T) -> Id<T> {
        let id = Id::new(self.len());
        self.items.push(value);
        id
    }

    #[inline]
    pub fn contains(&self, id: Id<T>) -> bool {
        id.idx < self.len()
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Id<T>, &T)> {
        self.items.iter().enumerate().map(|(i, x)| (Id::new(i as _), x))
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.idx as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.items.get_mut(id.idx as usize)
    }
}

impl<T> std::ops::Index<Id<T>> for Arena<T> {
    type Output = T;
    #[inline]
    fn index(&self, id: Id<T>) -> &Self::Output {
        &self.items[id.idx as usize]
    }
}

impl<T> std::ops::IndexMut<Id<T>> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, id: Id<T>) -> &mut Self::Output {
        &mut self.items[id.idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_test() {
        let mut arena = Arena::new();
        assert!(arena.is_empty());

        let zero = arena.add("zero");
        let one = arena.add("one");
        assert_ne!(zero, one);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[zero], "zero");
        assert_eq!(arena.get(one), Some(&"one"));

        *arena.get_mut(one).unwrap() = "uno";
        assert_eq!(arena[one], "uno");

        assert!(arena.contains(one));
        let mut other = Arena::<&str>::new();
        other.add("x");
        let far = other.add("y");
        assert!(!Arena::<&str>::new().contains(far));

        let names: Vec<_> = arena.iter().map(|(_, &name)| name).collect();
        assert_eq!(names, ["zero", "uno"]);
    }
}
