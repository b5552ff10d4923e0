#![no_main]

use fuzz_lib::MapOperation;
use libfuzzer_sys::fuzz_target;
use touchmap::{
    LinkedMap,
    LruCache,
    Touch,
};

fn model_touch(model: &mut Vec<(u8, u8)>, index: usize, touch: Touch) {
    match touch {
        Touch::None => {}
        Touch::AsOld => {
            let entry = model.remove(index);
            model.insert(0, entry);
        }
        Touch::AsNew => {
            let entry = model.remove(index);
            model.push(entry);
        }
    }
}

fn ratio_from(raw: u8) -> f64 {
    // Covers values below 0 and above 1 to exercise clamping.
    f64::from(raw) / 100.0 - 0.5
}

fuzz_target!(|data: (u8, u8, Vec<MapOperation>)| {
    let (limit_raw, ratio_raw, operations) = data;

    let mut map = LinkedMap::<u8, u8>::new();
    let mut model: Vec<(u8, u8)> = Vec::new();

    let mut lru = LruCache::<u8, u8>::with_ratio(usize::from(limit_raw % 16), ratio_from(ratio_raw));

    for op in operations {
        match op {
            MapOperation::Set(key, value, touch) => {
                let touch = touch.0;
                let expected = match model.iter().position(|(k, _)| *k == key) {
                    Some(index) => {
                        let old = std::mem::replace(&mut model[index].1, value);
                        model_touch(&mut model, index, touch);
                        Some(old)
                    }
                    None => {
                        if touch == Touch::AsOld {
                            model.insert(0, (key, value));
                        } else {
                            model.push((key, value));
                        }
                        None
                    }
                };
                assert_eq!(map.set(key, value, touch), expected);

                let old_len = lru.len();
                let contained_before = lru.contains_key(&key);
                lru.set(key, value);

                assert!(lru.len() <= lru.limit());
                if !contained_before && old_len < lru.limit() {
                    assert_eq!(lru.len(), old_len + 1);
                }
                // A zero ratio can empty the cache; otherwise the new entry survives.
                if !lru.is_empty() {
                    assert_eq!(lru.newest(), Some((&key, &value)));
                }
            }

            MapOperation::Get(key, touch) => {
                let touch = touch.0;
                let expected = model.iter().position(|(k, _)| *k == key).map(|index| {
                    let value = model[index].1;
                    model_touch(&mut model, index, touch);
                    value
                });
                assert_eq!(map.get(&key, touch).copied(), expected);

                let contains_before = lru.contains_key(&key);
                let result = lru.get(&key).copied();
                assert_eq!(result.is_some(), contains_before);
                if let Some(value) = result {
                    assert_eq!(lru.newest(), Some((&key, &value)));
                }
            }

            MapOperation::Peek(key) => {
                let expected = model.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
                assert_eq!(map.peek(&key).copied(), expected);

                let oldest_before = lru.oldest().map(|(k, v)| (*k, *v));
                let contains_before = lru.contains_key(&key);
                assert_eq!(lru.peek(&key).is_some(), contains_before);
                assert_eq!(lru.oldest().map(|(k, v)| (*k, *v)), oldest_before);
            }

            MapOperation::Remove(key) => {
                let expected = model
                    .iter()
                    .position(|(k, _)| *k == key)
                    .map(|index| model.remove(index).1);
                assert_eq!(map.remove(&key), expected);

                let contains_before = lru.contains_key(&key);
                let len_before = lru.len();
                assert_eq!(lru.delete(&key), contains_before);
                assert!(!lru.contains_key(&key));
                if contains_before {
                    assert_eq!(lru.len(), len_before - 1);
                } else {
                    assert_eq!(lru.len(), len_before);
                }
            }

            MapOperation::Shift => {
                let expected = if model.is_empty() {
                    None
                } else {
                    Some(model.remove(0))
                };
                assert_eq!(map.shift_entry(), expected);

                let oldest = lru.oldest().map(|(k, v)| (*k, *v));
                assert_eq!(lru.shift_entry(), oldest);
            }

            MapOperation::Clear => {
                model.clear();
                map.clear();
                lru.clear();
                assert!(map.is_empty());
                assert!(lru.is_empty());
            }

            MapOperation::TrimOld(new_size) => {
                let new_size = usize::from(new_size % 32);
                if new_size < model.len() {
                    model.drain(..model.len() - new_size);
                }
                map.trim_old(new_size);

                let len_before = lru.len();
                lru.trim_old(new_size);
                assert_eq!(lru.len(), len_before.min(new_size));
            }

            MapOperation::SetLimit(limit) => {
                lru.set_limit(usize::from(limit % 16));
                assert!(lru.len() <= lru.limit());
            }

            MapOperation::SetRatio(raw) => {
                lru.set_ratio(ratio_from(raw));
                assert!((0.0..=1.0).contains(&lru.ratio()));
                assert!(lru.len() <= lru.limit());
            }

            MapOperation::RoundTrip => {
                let pairs = map.to_pairs();
                let mut copy = LinkedMap::new();
                copy.from_pairs(pairs.clone());
                copy.debug_validate();
                assert_eq!(copy.to_pairs(), pairs);
            }
        }

        map.debug_validate();
        lru.debug_validate();
        assert_eq!(map.len(), model.len());
        assert_eq!(map.is_empty(), model.is_empty());
        assert_eq!(map.to_pairs(), model);
    }
});
