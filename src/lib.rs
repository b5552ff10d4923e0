#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

mod config;
mod linked_map;
mod lru;
#[cfg(feature = "serde")]
mod serialize;
mod touch;

pub use config::{
    CacheConfig,
    DEFAULT_LIMIT,
    DEFAULT_RATIO,
};
pub use linked_map::{
    IntoIter,
    Iter,
    Keys,
    LinkedMap,
    Values,
};
pub use lru::LruCache;
pub use touch::Touch;

#[cfg(not(feature = "ahash"))]
type RandomState = std::hash::RandomState;
#[cfg(feature = "ahash")]
type RandomState = ahash::RandomState;
