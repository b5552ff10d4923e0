use std::hash::Hash;

use tracing::{
    debug,
    warn,
};

use crate::{
    CacheConfig,
    Iter,
    Keys,
    LinkedMap,
    Touch,
    Values,
    config::DEFAULT_RATIO,
};

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        warn!("NaN eviction ratio, using {DEFAULT_RATIO}");
        return DEFAULT_RATIO;
    }
    let clamped = ratio.clamp(0.0, 1.0);
    if clamped != ratio {
        debug!(ratio, clamped, "eviction ratio clamped");
    }
    clamped
}

/// A least-recently-used cache that evicts in batches.
///
/// Built on [`LinkedMap`]: every successful [`get`](Self::get) and every
/// [`set`](Self::set) moves the entry to the newest end, and
/// [`peek`](Self::peek) reads without reordering.
///
/// Whenever a write leaves more than [`limit`](Self::limit) entries, the
/// oldest entries are dropped until `round(limit * ratio)` remain. With the
/// default ratio of `1.0` this trims to exactly `limit`, one entry at a time.
/// A smaller ratio evicts deeper in a single pass, so the next several inserts
/// run without any eviction at all.
///
/// Changing the limit or the ratio applies the same check immediately.
///
/// # Time Complexity
/// - Get/Peek/Set/Remove/Contains: O(1) average, O(n) worst case
/// - Eviction pass: O(evicted)
///
/// # Examples
///
/// ```
/// use touchmap::LruCache;
///
/// let mut cache = LruCache::new(2);
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.set("c", 3); // Evicts "a"
/// assert!(!cache.contains_key(&"a"));
///
/// cache.get(&"b"); // Mark as recently used
/// cache.set("d", 4); // Evicts "c"
///
/// assert_eq!(cache.to_pairs(), [("b", 2), ("d", 4)]);
/// ```
///
/// Batch eviction with a ratio below one:
///
/// ```
/// use touchmap::LruCache;
///
/// let mut cache = LruCache::with_ratio(4, 0.5);
/// for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
///     cache.set(key, i);
/// }
/// assert_eq!(cache.len(), 4);
///
/// // The fifth entry overflows the limit, and the cache drops to 4 * 0.5.
/// cache.set("e", 4);
/// assert_eq!(cache.to_pairs(), [("d", 3), ("e", 4)]);
/// ```
#[derive(Clone)]
pub struct LruCache<K, V> {
    map: LinkedMap<K, V>,
    limit: usize,
    ratio: f64,
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("limit", &self.limit)
            .field("ratio", &self.ratio)
            .field("map", &self.map)
            .finish()
    }
}

impl<K, V> LruCache<K, V> {
    /// Creates an empty cache holding at most `limit` entries, trimming to
    /// exactly `limit` on overflow.
    pub fn new(limit: usize) -> Self {
        Self::with_ratio(limit, DEFAULT_RATIO)
    }

    /// Creates an empty cache that trims to `round(limit * ratio)` entries on
    /// overflow. `ratio` is clamped to `[0, 1]`; NaN falls back to `1.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use touchmap::LruCache;
    ///
    /// let cache = LruCache::<u32, u32>::with_ratio(10, 5.0);
    /// assert_eq!(cache.ratio(), 1.0);
    ///
    /// let cache = LruCache::<u32, u32>::with_ratio(10, -1.0);
    /// assert_eq!(cache.ratio(), 0.0);
    /// ```
    pub fn with_ratio(limit: usize, ratio: f64) -> Self {
        LruCache {
            map: LinkedMap::new(),
            limit,
            ratio: clamp_ratio(ratio),
        }
    }

    /// Creates an empty cache sized by `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_ratio(config.limit, config.ratio)
    }

    /// Returns the effective configuration, with the ratio as clamped.
    pub fn config(&self) -> CacheConfig {
        CacheConfig {
            limit: self.limit,
            ratio: self.ratio,
        }
    }

    /// Returns the maximum number of entries kept after a write.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Sets the limit and immediately evicts if the cache is over it.
    ///
    /// # Examples
    ///
    /// ```
    /// use touchmap::LruCache;
    ///
    /// let mut cache = LruCache::new(5);
    /// for i in 0..5 {
    ///     cache.set(i, i);
    /// }
    ///
    /// cache.set_limit(2);
    /// assert_eq!(cache.keys().copied().collect::<Vec<_>>(), [3, 4]);
    /// ```
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.check_trim();
    }

    /// Returns the fraction of the limit retained after an eviction pass.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Sets the ratio, clamped to `[0, 1]`, and immediately evicts if the
    /// cache is over its limit.
    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = clamp_ratio(ratio);
        self.check_trim();
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Removes every entry from the cache.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns the least recently used entry without reordering.
    pub fn oldest(&self) -> Option<(&K, &V)> {
        self.map.oldest()
    }

    /// Returns the most recently used entry without reordering.
    pub fn newest(&self) -> Option<(&K, &V)> {
        self.map.newest()
    }

    /// Removes the least recently used entry and returns its value.
    pub fn shift(&mut self) -> Option<V> {
        self.map.shift()
    }

    /// Removes the least recently used entry and returns it as a pair.
    pub fn shift_entry(&mut self) -> Option<(K, V)> {
        self.map.shift_entry()
    }

    /// Drops the least recently used entries until at most `new_size`
    /// remain. See [`LinkedMap::trim_old`].
    pub fn trim_old(&mut self, new_size: usize) {
        self.map.trim_old(new_size);
    }

    /// Calls `visit` with each value and key, least recently used first.
    pub fn for_each<F>(&self, visit: F)
    where
        F: FnMut(&V, &K),
    {
        self.map.for_each(visit);
    }

    /// Returns an iterator over the entries, least recently used first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    /// Returns an iterator over the keys, least recently used first.
    pub fn keys(&self) -> Keys<'_, K, V> {
        self.map.keys()
    }

    /// Returns an iterator over the values, least recently used first.
    pub fn values(&self) -> Values<'_, K, V> {
        self.map.values()
    }

    /// Exports the entries as pairs, least recently used first.
    pub fn to_pairs(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.map.to_pairs()
    }

    /// Consumes the cache and returns the underlying map.
    pub fn into_inner(self) -> LinkedMap<K, V> {
        self.map
    }

    fn check_trim(&mut self) {
        let len = self.map.len();
        if len <= self.limit {
            return;
        }

        let target = (self.limit as f64 * self.ratio).round() as usize;
        self.map.trim_old(target);
        debug!(
            evicted = len - self.map.len(),
            len = self.map.len(),
            limit = self.limit,
            ratio = self.ratio,
            "lru cache over limit, evicted oldest entries"
        );
    }
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Returns `true` if the cache contains `key`. Never reorders.
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the value for `key` and marks it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.map.get(key, Touch::AsNew)
    }

    /// Mutable version of [`get`](Self::get).
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key, Touch::AsNew)
    }

    /// Returns the value for `key` without changing its recency.
    ///
    /// # Examples
    ///
    /// ```
    /// use touchmap::LruCache;
    ///
    /// let mut cache = LruCache::new(3);
    /// cache.set("a", 1);
    /// cache.set("b", 2);
    ///
    /// assert_eq!(cache.peek(&"a"), Some(&1));
    /// // "a" is still the oldest entry.
    /// assert_eq!(cache.shift(), Some(1));
    /// ```
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.peek(key)
    }

    /// Inserts or updates `key` as the most recently used entry, then evicts
    /// if the cache is over its limit. Returns the previous value, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let old = self.map.set(key, value, Touch::AsNew);
        self.check_trim();
        old
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    /// Removes `key` and returns the stored key-value pair.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.map.remove_entry(key)
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        self.map.delete(key)
    }

    /// Replaces the contents of the cache with `pairs`.
    ///
    /// The cache is cleared and every pair goes through [`set`](Self::set), so
    /// the last pair ends up most recently used and an import larger than the
    /// limit keeps only the newest entries.
    pub fn from_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(pairs);
    }

    /// Asserts the structural invariants of the underlying map and that the
    /// cache is within its limit.
    #[doc(hidden)]
    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub fn debug_validate(&self) {
        self.map.debug_validate();
        assert!(
            self.map.len() <= self.limit,
            "Cache holds {} entries over a limit of {}",
            self.map.len(),
            self.limit
        );
        assert!(
            (0.0..=1.0).contains(&self.ratio),
            "Ratio out of range: {}",
            self.ratio
        );
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for LruCache<K, V> {
    /// Inserts each pair through [`LruCache::set`].
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for LruCache<K, V> {
    type IntoIter = crate::IntoIter<K, V>;
    type Item = (K, V);

    /// Consumes the cache, yielding entries least recently used first.
    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;
    use proptest::prelude::*;

    use super::*;

    fn keys<K: Copy, V>(cache: &LruCache<K, V>) -> Vec<K> {
        cache.keys().copied().collect()
    }

    #[test]
    #[timeout(1000)]
    fn test_lru_trivial() {
        let mut lru = LruCache::new(3);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);

        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"b"), Some(&2));
        assert_eq!(lru.get(&"c"), Some(&3));

        lru.get(&"a");
        lru.set("d", 4);

        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"b"), None);
        lru.debug_validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_strict_lru_eviction() {
        let mut lru = LruCache::with_ratio(2, 1.0);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);
        assert_eq!(lru.len(), 2);
        assert_eq!(keys(&lru), ["b", "c"]);

        lru.get(&"b");
        lru.set("d", 4);
        assert_eq!(lru.to_pairs(), [("b", 2), ("d", 4)]);
        lru.debug_validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_batch_eviction() {
        let mut lru = LruCache::with_ratio(4, 0.5);
        for key in ["a", "b", "c", "d"] {
            lru.set(key, ());
        }
        assert_eq!(lru.len(), 4);

        lru.set("e", ());
        assert_eq!(keys(&lru), ["d", "e"]);
        lru.debug_validate();

        // Two more inserts fit before the next pass.
        lru.set("f", ());
        lru.set("g", ());
        assert_eq!(lru.len(), 4);
        lru.set("h", ());
        assert_eq!(keys(&lru), ["g", "h"]);
    }

    #[test]
    #[timeout(1000)]
    fn test_batch_eviction_rounds() {
        let mut lru = LruCache::with_ratio(3, 0.5);
        for i in 0..4 {
            lru.set(i, i);
        }
        // round(1.5) == 2
        assert_eq!(keys(&lru), [2, 3]);
    }

    #[test]
    #[timeout(1000)]
    fn test_zero_ratio_clears_on_overflow() {
        let mut lru = LruCache::with_ratio(2, 0.0);
        lru.set(1, 1);
        lru.set(2, 2);
        lru.set(3, 3);
        assert!(lru.is_empty());
        lru.debug_validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_zero_limit_keeps_nothing() {
        let mut lru = LruCache::new(0);
        assert_eq!(lru.set("a", 1), None);
        assert!(lru.is_empty());
        assert_eq!(lru.get(&"a"), None);
    }

    #[test]
    #[timeout(1000)]
    fn test_update_existing_does_not_evict() {
        let mut lru = LruCache::new(2);
        lru.set("a", 1);
        lru.set("b", 2);

        assert_eq!(lru.set("a", 10), Some(1));
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.to_pairs(), [("b", 2), ("a", 10)]);
    }

    #[test]
    #[timeout(1000)]
    fn test_peek_does_not_promote() {
        let mut lru = LruCache::new(3);
        lru.set("a", 1);
        lru.set("b", 2);

        assert_eq!(lru.peek(&"a"), Some(&1));
        assert_eq!(lru.peek(&"z"), None);
        assert_eq!(lru.shift(), Some(1));
    }

    #[test]
    #[timeout(1000)]
    fn test_get_promotes() {
        let mut lru = LruCache::new(10);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);

        lru.get(&"a");
        assert_eq!(lru.shift(), Some(2));
        assert_eq!(lru.newest(), Some((&"a", &1)));
    }

    #[test]
    #[timeout(1000)]
    fn test_get_mut_promotes() {
        let mut lru = LruCache::new(2);
        lru.set(1, String::from("one"));
        lru.set(2, String::from("two"));

        if let Some(value) = lru.get_mut(&1) {
            value.push('!');
        }
        lru.set(3, String::from("three"));

        assert_eq!(
            lru.to_pairs(),
            [(1, String::from("one!")), (3, String::from("three"))]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_miss_leaves_state_unchanged() {
        let mut lru = LruCache::new(3);
        lru.set(1, 1);
        lru.set(2, 2);

        assert_eq!(lru.get(&3), None);
        assert_eq!(lru.remove(&3), None);
        assert!(!lru.delete(&3));
        assert_eq!(keys(&lru), [1, 2]);
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_and_delete() {
        let mut lru = LruCache::new(3);
        lru.set(1, "one");
        lru.set(2, "two");
        lru.set(3, "three");

        assert_eq!(lru.remove(&2), Some("two"));
        assert_eq!(lru.remove_entry(&1), Some((1, "one")));
        assert!(lru.delete(&3));
        assert!(lru.is_empty());
        lru.debug_validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_set_limit_trims() {
        let mut lru = LruCache::new(6);
        for i in 0..6 {
            lru.set(i, i);
        }

        lru.set_limit(10);
        assert_eq!(lru.len(), 6);

        lru.set_limit(3);
        assert_eq!(lru.limit(), 3);
        assert_eq!(keys(&lru), [3, 4, 5]);
        lru.debug_validate();

        lru.set_limit(0);
        assert!(lru.is_empty());
    }

    #[test]
    #[timeout(1000)]
    fn test_set_limit_uses_ratio() {
        let mut lru = LruCache::with_ratio(8, 0.5);
        for i in 0..8 {
            lru.set(i, i);
        }

        lru.set_limit(4);
        assert_eq!(keys(&lru), [6, 7]);
    }

    #[test]
    #[timeout(1000)]
    fn test_ratio_clamps() {
        let mut lru = LruCache::<i32, i32>::with_ratio(4, -1.0);
        assert_eq!(lru.ratio(), 0.0);

        lru.set_ratio(5.0);
        assert_eq!(lru.ratio(), 1.0);

        lru.set_ratio(0.25);
        assert_eq!(lru.ratio(), 0.25);

        lru.set_ratio(f64::NAN);
        assert_eq!(lru.ratio(), 1.0);

        lru.set_ratio(f64::NEG_INFINITY);
        assert_eq!(lru.ratio(), 0.0);
    }

    #[test]
    #[timeout(1000)]
    fn test_set_ratio_checks_limit() {
        let mut lru = LruCache::new(4);
        for i in 0..4 {
            lru.set(i, i);
        }

        // Within the limit, so nothing is evicted.
        lru.set_ratio(0.5);
        assert_eq!(lru.len(), 4);

        lru.set(4, 4);
        assert_eq!(keys(&lru), [3, 4]);
    }

    #[test]
    #[timeout(1000)]
    fn test_config_round_trip() {
        let config = CacheConfig::default().with_limit(12).with_ratio(2.0);
        let lru = LruCache::<u8, u8>::from_config(&config);

        assert_eq!(lru.limit(), 12);
        assert_eq!(
            lru.config(),
            CacheConfig {
                limit: 12,
                ratio: 1.0
            }
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_from_pairs_goes_through_set() {
        let mut lru = LruCache::new(3);
        lru.set("stale", 0);

        lru.from_pairs([("a", 1), ("b", 2), ("c", 3), ("d", 4), ("b", 20)]);
        assert_eq!(lru.to_pairs(), [("c", 3), ("d", 4), ("b", 20)]);
        lru.debug_validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_trim_old_and_clear() {
        let mut lru = LruCache::new(10);
        lru.extend((0..5).map(|i| (i, i)));

        lru.trim_old(2);
        assert_eq!(keys(&lru), [3, 4]);

        lru.trim_old(0);
        assert!(lru.is_empty());

        lru.set(1, 1);
        lru.clear();
        assert!(lru.is_empty());
        assert_eq!(lru.oldest(), None);
    }

    #[test]
    #[timeout(1000)]
    fn test_for_each_and_iterators() {
        let mut lru = LruCache::new(5);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);
        lru.get(&"a");

        let mut seen = Vec::new();
        lru.for_each(|value, key| seen.push((*key, *value)));
        assert_eq!(seen, [("b", 2), ("c", 3), ("a", 1)]);
        assert_eq!(lru.values().copied().collect::<Vec<_>>(), [2, 3, 1]);
        assert_eq!((&lru).into_iter().count(), 3);
        assert_eq!(
            lru.into_iter().collect::<Vec<_>>(),
            [("b", 2), ("c", 3), ("a", 1)]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_into_inner() {
        let mut lru = LruCache::new(2);
        lru.set(1, 1);
        lru.set(2, 2);
        let mut map = lru.into_inner();
        map.set(3, 3, Touch::AsOld);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [3, 1, 2]);
    }

    proptest! {
        /// The cache never exceeds its limit and matches a vector model.
        #[test]
        fn prop_matches_batch_lru_model(
            limit in 0usize..12,
            ratio in 0.0f64..=1.0,
            ops in prop::collection::vec((0u8..24, any::<bool>()), 0..300)
        ) {
            let mut lru = LruCache::with_ratio(limit, ratio);
            let mut model: Vec<u8> = Vec::new();

            for (key, is_set) in ops {
                let position = model.iter().position(|k| *k == key);
                if is_set {
                    if let Some(index) = position {
                        model.remove(index);
                    }
                    model.push(key);
                    if model.len() > limit {
                        let target = (limit as f64 * ratio).round() as usize;
                        model.drain(..model.len() - target);
                    }
                    lru.set(key, u32::from(key));
                } else {
                    if let Some(index) = position {
                        model.remove(index);
                        model.push(key);
                    }
                    prop_assert_eq!(lru.get(&key).is_some(), position.is_some());
                }

                lru.debug_validate();
                prop_assert!(lru.len() <= limit);
                prop_assert_eq!(lru.keys().copied().collect::<Vec<_>>(), model.clone());
            }
        }
    }
}
