use std::{
    hash::{
        BuildHasher,
        Hash,
    },
    iter::FusedIterator,
};

use hashbrown::HashTable;
use slab::Slab;
use tracing::trace;

use crate::{
    RandomState,
    Touch,
};

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct Ptr(usize);

impl std::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Ptr::null() {
            write!(f, "Ptr(null)")
        } else {
            write!(f, "Ptr({})", self.0)
        }
    }
}

impl Default for Ptr {
    fn default() -> Self {
        Ptr::null()
    }
}

impl Ptr {
    fn null() -> Self {
        Ptr(usize::MAX)
    }

    fn is_null(&self) -> bool {
        *self == Ptr::null()
    }

    fn unchecked_from(index: usize) -> Self {
        debug_assert_ne!(index, usize::MAX, "Index must not be usize::MAX");
        Ptr(index)
    }

    fn unchecked_get(self) -> usize {
        self.0
    }

    fn get(self) -> Option<usize> {
        if self.is_null() {
            None
        } else {
            Some(self.unchecked_get())
        }
    }
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Ptr,
    next: Ptr,
}

/// A hash map that remembers an ordering of its entries and can reorder them
/// in O(1).
///
/// Entries are kept on a doubly-linked list running from the head (oldest) to
/// the tail (newest). New keys are appended at the tail unless inserted with
/// [`Touch::AsOld`], and any keyed access may move an entry to either end
/// through its [`Touch`] argument. Nodes live in a slab arena and link to one
/// another by index, so the list holds no owning pointers.
///
/// Iteration, [`for_each`](Self::for_each), [`keys`](Self::keys),
/// [`values`](Self::values) and [`to_pairs`](Self::to_pairs) all run head to
/// tail.
///
/// # Time Complexity
/// - Get/Set/Remove/Contains: O(1) average, O(n) worst case
/// - Touch/Shift: O(1)
/// - Trim to `n`: O(len - n)
///
/// # Examples
///
/// ```
/// use touchmap::{
///     LinkedMap,
///     Touch,
/// };
///
/// let mut map = LinkedMap::new();
/// map.set("a", 1, Touch::None);
/// map.set("b", 2, Touch::None);
/// map.set("c", 3, Touch::None);
///
/// // Reading "a" as new moves it behind "c".
/// assert_eq!(map.get(&"a", Touch::AsNew), Some(&1));
/// assert_eq!(map.to_pairs(), [("b", 2), ("c", 3), ("a", 1)]);
///
/// // `shift` always takes from the oldest end.
/// assert_eq!(map.shift(), Some(2));
///
/// map.trim_old(1);
/// assert_eq!(map.to_pairs(), [("a", 1)]);
/// ```
#[derive(Clone)]
pub struct LinkedMap<K, V> {
    head: Ptr,
    tail: Ptr,
    nodes: Slab<Node<K, V>>,
    table: HashTable<Ptr>,
    hasher: RandomState,
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for LinkedMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedMap")
            .field("len", &self.len())
            .field("head", &self.oldest().map(|(key, _)| key))
            .field("tail", &self.newest().map(|(key, _)| key))
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> Default for LinkedMap<K, V> {
    fn default() -> Self {
        LinkedMap {
            head: Ptr::null(),
            tail: Ptr::null(),
            nodes: Slab::new(),
            table: HashTable::new(),
            hasher: RandomState::default(),
        }
    }
}

impl<K, V> LinkedMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries before it
    /// reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        LinkedMap {
            head: Ptr::null(),
            tail: Ptr::null(),
            nodes: Slab::with_capacity(capacity),
            table: HashTable::with_capacity(capacity),
            hasher: RandomState::default(),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry from the map.
    pub fn clear(&mut self) {
        self.table.clear();
        self.nodes.clear();
        self.head = Ptr::null();
        self.tail = Ptr::null();
    }

    /// Returns the oldest entry (the head) without reordering anything.
    pub fn oldest(&self) -> Option<(&K, &V)> {
        let node = self.nodes.get(self.head.get()?)?;
        Some((&node.key, &node.value))
    }

    /// Returns the newest entry (the tail) without reordering anything.
    pub fn newest(&self) -> Option<(&K, &V)> {
        let node = self.nodes.get(self.tail.get()?)?;
        Some((&node.key, &node.value))
    }

    /// Removes the oldest entry and returns its value, or `None` if the map
    /// is empty.
    pub fn shift(&mut self) -> Option<V> {
        self.shift_entry().map(|(_, value)| value)
    }

    /// Removes the oldest entry and returns it as a key-value pair, or `None`
    /// if the map is empty.
    pub fn shift_entry(&mut self) -> Option<(K, V)> {
        if self.head.is_null() {
            return None;
        }
        Some(self.remove_ptr(self.head))
    }

    /// Removes entries from the oldest end until at most `new_size` remain.
    ///
    /// Does nothing if the map already holds `new_size` entries or fewer, and
    /// is equivalent to [`clear`](Self::clear) when `new_size` is zero. The
    /// removed values are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use touchmap::LinkedMap;
    ///
    /// let mut map: LinkedMap<_, _> = (0..5).map(|i| (i, i * 10)).collect();
    /// map.trim_old(2);
    /// assert_eq!(map.to_pairs(), [(3, 30), (4, 40)]);
    ///
    /// map.trim_old(0);
    /// assert!(map.is_empty());
    /// ```
    pub fn trim_old(&mut self, new_size: usize) {
        let len = self.len();
        if new_size >= len {
            return;
        }
        if new_size == 0 {
            self.clear();
        } else {
            for _ in new_size..len {
                self.remove_ptr(self.head);
            }
        }
        trace!(dropped = len - new_size, len = new_size, "trimmed oldest entries");
    }

    /// Calls `visit` with each value and key, oldest first.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&V, &K),
    {
        for (key, value) in self.iter() {
            visit(value, key);
        }
    }

    /// Returns an iterator over the entries, oldest first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            ptr: self.head,
            remaining: self.len(),
            nodes: &self.nodes,
        }
    }

    /// Returns an iterator over the keys, oldest first.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values, oldest first.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Exports the entries as an ordered list of pairs, oldest first.
    ///
    /// Feeding the result to [`from_pairs`](Self::from_pairs) rebuilds a map
    /// with the same order and contents.
    pub fn to_pairs(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Shrinks the index and the node arena as much as possible.
    pub fn shrink_to_fit(&mut self) {
        let nodes = &self.nodes;
        self.table
            .shrink_to_fit(|ptr| nodes[ptr.unchecked_get()].hash);
        self.nodes.shrink_to_fit();
    }

    fn touch_ptr(&mut self, ptr: Ptr, touch: Touch) {
        match touch {
            Touch::None => {}
            Touch::AsOld => {
                if self.head != ptr {
                    self.unlink(ptr);
                    self.link_as_head(ptr);
                }
            }
            Touch::AsNew => {
                if self.tail != ptr {
                    self.unlink(ptr);
                    self.link_as_tail(ptr);
                }
            }
        }
    }

    fn link_as_head(&mut self, ptr: Ptr) {
        let old_head = self.head;
        let node = &mut self.nodes[ptr.unchecked_get()];
        node.prev = Ptr::null();
        node.next = old_head;

        match old_head.get() {
            Some(index) => self.nodes[index].prev = ptr,
            None => self.tail = ptr,
        }
        self.head = ptr;
    }

    fn link_as_tail(&mut self, ptr: Ptr) {
        let old_tail = self.tail;
        let node = &mut self.nodes[ptr.unchecked_get()];
        node.prev = old_tail;
        node.next = Ptr::null();

        match old_tail.get() {
            Some(index) => self.nodes[index].next = ptr,
            None => self.head = ptr,
        }
        self.tail = ptr;
    }

    fn unlink(&mut self, ptr: Ptr) {
        let node = &mut self.nodes[ptr.unchecked_get()];
        let prev = std::mem::take(&mut node.prev);
        let next = std::mem::take(&mut node.next);

        match prev.get() {
            Some(index) => self.nodes[index].next = next,
            None => self.head = next,
        }
        match next.get() {
            Some(index) => self.nodes[index].prev = prev,
            None => self.tail = prev,
        }
    }

    #[track_caller]
    fn remove_ptr(&mut self, ptr: Ptr) -> (K, V) {
        let hash = self.nodes[ptr.unchecked_get()].hash;
        match self.table.find_entry(hash, |k| *k == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => unreachable!("Pointer not found in table: {ptr:?}"),
        }

        self.unlink(ptr);
        let node = self.nodes.remove(ptr.unchecked_get());
        (node.key, node.value)
    }
}

impl<K: Hash + Eq, V> LinkedMap<K, V> {
    fn get_ptr(&self, key: &K) -> Option<Ptr> {
        let hash = self.hasher.hash_one(key);
        self.table
            .find(hash, |k| self.nodes[k.unchecked_get()].key == *key)
            .copied()
    }

    /// Returns `true` if the map contains `key`. Never reorders.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get_ptr(key).is_some()
    }

    /// Returns the value for `key`, repositioning the entry according to
    /// `touch` first. Returns `None` and changes nothing if the key is absent.
    pub fn get(&mut self, key: &K, touch: Touch) -> Option<&V> {
        let ptr = self.get_ptr(key)?;
        self.touch_ptr(ptr, touch);
        Some(&self.nodes[ptr.unchecked_get()].value)
    }

    /// Mutable version of [`get`](Self::get).
    pub fn get_mut(&mut self, key: &K, touch: Touch) -> Option<&mut V> {
        let ptr = self.get_ptr(key)?;
        self.touch_ptr(ptr, touch);
        Some(&mut self.nodes[ptr.unchecked_get()].value)
    }

    /// Returns the value for `key` without reordering. This is
    /// [`get`](Self::get) with [`Touch::None`] through a shared borrow.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let ptr = self.get_ptr(key)?;
        Some(&self.nodes[ptr.unchecked_get()].value)
    }

    /// Inserts or updates the value for `key`.
    ///
    /// An existing entry keeps its position unless `touch` says otherwise, and
    /// its previous value is returned. A new entry is placed at the head for
    /// [`Touch::AsOld`] and at the tail otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use touchmap::{
    ///     LinkedMap,
    ///     Touch,
    /// };
    ///
    /// let mut map = LinkedMap::new();
    /// assert_eq!(map.set(1, "one", Touch::None), None);
    /// assert_eq!(map.set(2, "two", Touch::None), None);
    ///
    /// // Updating in place keeps the order.
    /// assert_eq!(map.set(1, "ONE", Touch::None), Some("one"));
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 2]);
    ///
    /// // Updating as new moves the entry to the tail.
    /// map.set(1, "uno", Touch::AsNew);
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [2, 1]);
    /// ```
    pub fn set(&mut self, key: K, value: V, touch: Touch) -> Option<V> {
        let hash = self.hasher.hash_one(&key);
        let existing = self
            .table
            .find(hash, |k| self.nodes[k.unchecked_get()].key == key)
            .copied();

        if let Some(ptr) = existing {
            let old = std::mem::replace(&mut self.nodes[ptr.unchecked_get()].value, value);
            self.touch_ptr(ptr, touch);
            return Some(old);
        }

        let ptr = Ptr::unchecked_from(self.nodes.insert(Node {
            key,
            value,
            hash,
            prev: Ptr::null(),
            next: Ptr::null(),
        }));
        let nodes = &self.nodes;
        self.table
            .insert_unique(hash, ptr, |k| nodes[k.unchecked_get()].hash);

        match touch {
            Touch::AsOld => self.link_as_head(ptr),
            Touch::None | Touch::AsNew => self.link_as_tail(ptr),
        }
        None
    }

    /// Removes `key` and returns its value, or `None` if it was absent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key` and returns the stored key-value pair.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let ptr = self.get_ptr(key)?;
        Some(self.remove_ptr(ptr))
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Replaces the contents of the map with `pairs`.
    ///
    /// The map is cleared and each pair is inserted with [`Touch::None`] in the
    /// order given, so the first pair becomes the oldest entry. A repeated key
    /// keeps the position of its first occurrence and the value of its last.
    pub fn from_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(pairs);
    }

    /// Asserts every structural invariant of the list and its index.
    ///
    /// This walks the whole map and is only meant for tests and fuzzing.
    #[doc(hidden)]
    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub fn debug_validate(&self) {
        assert_eq!(
            self.table.len(),
            self.nodes.len(),
            "Index and arena should have the same length"
        );

        if self.is_empty() {
            assert!(self.head.is_null(), "Head pointer should be null");
            assert!(self.tail.is_null(), "Tail pointer should be null");
            return;
        }

        assert!(!self.head.is_null(), "Head pointer is invalid");
        assert!(!self.tail.is_null(), "Tail pointer is invalid");
        assert!(
            self.nodes[self.head.unchecked_get()].prev.is_null(),
            "Head should not have a previous link"
        );
        assert!(
            self.nodes[self.tail.unchecked_get()].next.is_null(),
            "Tail should not have a next link"
        );
        if self.len() == 1 {
            assert_eq!(self.head, self.tail, "Single entry should be head and tail");
        }

        let mut prev = Ptr::null();
        let mut ptr = self.head;
        let mut walked = 0;
        while let Some(index) = ptr.get() {
            let node = &self.nodes[index];
            assert_eq!(node.prev, prev, "Broken back link at {ptr:?}");
            assert_eq!(
                node.hash,
                self.hasher.hash_one(&node.key),
                "Stale hash at {ptr:?}"
            );
            assert_eq!(
                self.get_ptr(&node.key),
                Some(ptr),
                "Index does not resolve {ptr:?}"
            );

            walked += 1;
            assert!(walked <= self.len(), "Cycle in linked list");
            prev = ptr;
            ptr = node.next;
        }

        assert_eq!(prev, self.tail, "Walk should end at the tail");
        assert_eq!(walked, self.len(), "Unreachable nodes in the arena");
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for LinkedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = LinkedMap::with_capacity(iter.size_hint().0);
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for LinkedMap<K, V> {
    /// Inserts each pair with [`Touch::None`].
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value, Touch::None);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a LinkedMap<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for LinkedMap<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    /// Consumes the map, yielding its entries oldest first.
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            ptr: self.head,
            nodes: self.nodes,
        }
    }
}

/// Iterator over the entries of a [`LinkedMap`], oldest first.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    ptr: Ptr,
    remaining: usize,
    nodes: &'a Slab<Node<K, V>>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            ptr: self.ptr,
            remaining: self.remaining,
            nodes: self.nodes,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        let node = nodes.get(self.ptr.get()?)?;
        self.ptr = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the keys of a [`LinkedMap`], oldest first.
#[derive(Debug, Clone)]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over the values of a [`LinkedMap`], oldest first.
#[derive(Debug, Clone)]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Owning iterator over the entries of a [`LinkedMap`], oldest first.
#[derive(Debug)]
pub struct IntoIter<K, V> {
    ptr: Ptr,
    nodes: Slab<Node<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.ptr.get()?;
        let node = self.nodes.remove(index);
        self.ptr = node.next;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.nodes.len(), Some(self.nodes.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}
