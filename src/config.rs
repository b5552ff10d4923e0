/// Limit used by [`CacheConfig::default`].
pub const DEFAULT_LIMIT: usize = 100;

/// Ratio used by [`CacheConfig::default`] and [`LruCache::new`]: trim to
/// exactly the limit.
///
/// [`LruCache::new`]: crate::LruCache::new
pub const DEFAULT_RATIO: f64 = 1.0;

/// Sizing for an [`LruCache`].
///
/// `limit` is the most entries the cache may hold once a call returns.
/// `ratio` is the share of `limit` kept after an eviction pass; it is clamped
/// to `[0, 1]` when the cache is built, not here.
///
/// With the `serde` feature this type is (de)serializable, and missing fields
/// fall back to the defaults.
///
/// # Examples
///
/// ```
/// use touchmap::{
///     CacheConfig,
///     LruCache,
/// };
///
/// let config = CacheConfig::default().with_limit(4).with_ratio(0.5);
/// let mut cache = LruCache::from_config(&config);
/// for key in ["a", "b", "c", "d", "e"] {
///     cache.set(key, ());
/// }
///
/// // Overflowing the limit trims down to 4 * 0.5 entries.
/// assert_eq!(cache.keys().copied().collect::<Vec<_>>(), ["d", "e"]);
/// ```
///
/// [`LruCache`]: crate::LruCache
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Maximum number of entries kept after any mutating call.
    pub limit: usize,
    /// Fraction of `limit` retained after an eviction pass.
    pub ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            limit: DEFAULT_LIMIT,
            ratio: DEFAULT_RATIO,
        }
    }
}

impl CacheConfig {
    /// Replaces the limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replaces the ratio.
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }
}
