/// Where an accessed or inserted entry lands in a [`LinkedMap`]'s ordering.
///
/// The ordering runs from the head (oldest) to the tail (newest). Every keyed
/// operation on [`LinkedMap`] that can reorder takes a `Touch`, and
/// [`LruCache`] always passes [`Touch::AsNew`] on reads and writes.
///
/// Repositioning is an O(1) unlink and relink; it never creates or destroys
/// entries.
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
/// map.set("c", 3, Touch::AsOld);
///
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["c", "a", "b"]);
///
/// map.get(&"c", Touch::AsNew);
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
/// ```
///
/// [`LinkedMap`]: crate::LinkedMap
/// [`LruCache`]: crate::LruCache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Touch {
    /// Leave the entry where it is. New entries are appended at the tail.
    #[default]
    None,
    /// Move the entry to the head, making it the next one to be evicted.
    AsOld,
    /// Move the entry to the tail, making it the most recently used.
    AsNew,
}
