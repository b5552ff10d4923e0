//! Serde bridge for [`LinkedMap`]: a sequence of `(key, value)` pairs, oldest
//! first.

use std::{
    fmt,
    hash::Hash,
    marker::PhantomData,
};

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::{
        SeqAccess,
        Visitor,
    },
};

use crate::{
    LinkedMap,
    Touch,
};

// Caps preallocation from an untrusted length hint.
const MAX_PREALLOCATED: usize = 4096;

impl<K: Serialize, V: Serialize> Serialize for LinkedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

struct PairsVisitor<K, V>(PhantomData<fn() -> (K, V)>);

impl<'de, K, V> Visitor<'de> for PairsVisitor<K, V>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
{
    type Value = LinkedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence of key-value pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATED);
        let mut map = LinkedMap::with_capacity(capacity);
        while let Some((key, value)) = seq.next_element::<(K, V)>()? {
            map.set(key, value, Touch::None);
        }
        Ok(map)
    }
}

impl<'de, K, V> Deserialize<'de> for LinkedMap<K, V>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(PairsVisitor(PhantomData))
    }
}
