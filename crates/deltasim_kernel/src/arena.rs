//! Append-only, handle-indexed storage for per-run kernel objects.
//!
//! Signals, events and processes live in arenas owned by one
//! [`Simulation`](crate::Simulation); their handles are plain indices that are
//! only meaningful for that run.

use std::marker::PhantomData;

/// A copyable handle into an [`Arena`].
pub trait Handle: Copy {
    /// Builds a handle from its slot index.
    fn from_index(index: u32) -> Self;

    /// The slot index of this handle.
    fn index(self) -> u32;
}

/// Declares a `u32` newtype handle.
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
        pub struct $name(u32);

        impl $crate::arena::Handle for $name {
            fn from_index(index: u32) -> Self {
                Self(index)
            }

            fn index(self) -> u32 {
                self.0
            }
        }

        impl $name {
            /// The raw slot index, for diagnostics.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

pub(crate) use handle;

/// Dense storage; items are never removed, so handles stay valid for the run.
#[derive(Debug)]
pub struct Arena<H: Handle, T> {
    items: Vec<T>,
    _marker: PhantomData<H>,
}

impl<H: Handle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<H: Handle, T> Arena<H, T> {
    /// Stores `item` and returns its handle.
    pub fn alloc(&mut self, item: T) -> H {
        let handle = H::from_index(self.items.len() as u32);
        self.items.push(item);
        handle
    }

    /// Looks up a handle; `None` if it was not issued by this arena.
    pub fn get(&self, handle: H) -> Option<&T> {
        self.items.get(handle.index() as usize)
    }

    /// Mutable lookup; `None` if the handle was not issued by this arena.
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(handle.index() as usize)
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates `(handle, item)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (H::from_index(i as u32), item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    handle!(
        /// Test handle.
        TestId
    );

    #[test]
    fn alloc_assigns_sequential_handles() {
        let mut arena: Arena<TestId, &str> = Arena::default();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let mut other: Arena<TestId, u8> = Arena::default();
        other.alloc(1);
        other.alloc(2);
        let foreign = other.alloc(3);

        let arena: Arena<TestId, u8> = Arena::default();
        assert!(arena.is_empty());
        assert!(arena.get(foreign).is_none());
    }

    #[test]
    fn iteration_order() {
        let mut arena: Arena<TestId, u32> = Arena::default();
        arena.alloc(10);
        arena.alloc(20);
        let pairs: Vec<(u32, u32)> = arena.iter().map(|(h, v)| (h.as_raw(), *v)).collect();
        assert_eq!(pairs, vec![(0, 10), (1, 20)]);
    }
}
