use touchmap::{
    CacheConfig,
    LinkedMap,
    LruCache,
    Touch,
};

#[test]
fn test_serialize_as_ordered_pairs() {
    let mut map = LinkedMap::new();
    map.set("b".to_string(), 2, Touch::None);
    map.set("a".to_string(), 1, Touch::AsOld);
    map.set("c".to_string(), 3, Touch::None);

    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"[["a",1],["b",2],["c",3]]"#);
}

#[test]
fn test_deserialize_keeps_input_order() {
    let map: LinkedMap<u32, String> =
        serde_json::from_str(r#"[[3,"three"],[1,"one"],[2,"two"]]"#).unwrap();
    assert_eq!(
        map.to_pairs(),
        [
            (3, "three".to_string()),
            (1, "one".to_string()),
            (2, "two".to_string())
        ]
    );
}

#[test]
fn test_json_round_trip() {
    let mut map = LinkedMap::new();
    for i in 0u16..10 {
        map.set(i, i * i, Touch::None);
    }
    map.get(&4, Touch::AsNew);
    map.get(&7, Touch::AsOld);

    let json = serde_json::to_string(&map).unwrap();
    let copy: LinkedMap<u16, u16> = serde_json::from_str(&json).unwrap();
    assert_eq!(copy.to_pairs(), map.to_pairs());
}

#[test]
fn test_deserialize_rejects_non_sequence() {
    let result: Result<LinkedMap<u32, u32>, _> = serde_json::from_str(r#"{"a":1}"#);
    assert!(result.is_err());
}

#[test]
fn test_config_defaults_fill_missing_fields() {
    let config: CacheConfig = serde_json::from_str(r#"{"limit":8}"#).unwrap();
    assert_eq!(config, CacheConfig::default().with_limit(8));

    let config: CacheConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, CacheConfig::default());
}

#[test]
fn test_config_builds_clamped_cache() {
    let config: CacheConfig = serde_json::from_str(r#"{"limit":4,"ratio":7.5}"#).unwrap();
    let cache = LruCache::<u8, u8>::from_config(&config);
    assert_eq!(cache.limit(), 4);
    assert_eq!(cache.ratio(), 1.0);
}
