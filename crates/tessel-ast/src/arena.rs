use std::{fmt, hash::Hash, marker::PhantomData, ops::Index};

use serde_derive::{Deserialize, Serialize};

/// The slot number behind a node key.
pub trait Key: Copy + fmt::Debug + Ord + Hash + 'static {
    /// The slot this key names.
    fn slot(self) -> usize;
    /// The key naming `slot`.
    fn from_slot(slot: usize) -> Self;
}

/// Append-only node storage.
///
/// Every insertion gets the next slot, and slots are never
/// reused, so a key identifies exactly one allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arena<K, V> {
    slots: Vec<V>,
    #[serde(skip)]
    _key: PhantomData<fn() -> K>,
}

impl<K, V> Arena<K, V> {
    /// Creates an empty arena.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            _key: PhantomData,
        }
    }

    /// The number of allocated slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Reports whether nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K: Key, V> Arena<K, V> {
    /// Stores `value` in a fresh slot.
    pub fn insert(&mut self, value: V) -> K {
        let key = K::from_slot(self.slots.len());
        self.slots.push(value);
        key
    }

    /// The value in `key`'s slot, or `None` if the key was
    /// minted by another arena.
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.slot())
    }

    /// Walks the slots in allocation order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (K, &V)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(slot, v)| (K::from_slot(slot), v))
    }
}

impl<K: Key, V> Index<K> for Arena<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.slots[key.slot()]
    }
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a node key type.
macro_rules! new_key_type {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Debug,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            Hash,
            ::serde_derive::Serialize,
            ::serde_derive::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $name(usize);

        impl $crate::arena::Key for $name {
            fn slot(self) -> usize {
                self.0
            }

            fn from_slot(slot: usize) -> Self {
                Self(slot)
            }
        }
    };
}
pub(crate) use new_key_type;
