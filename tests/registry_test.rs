use memlab::{BlockRegistry, SimConfig, SimError};
use proptest::prelude::*;

#[test]
fn test_insert_lookup_remove() {
    let mut registry = BlockRegistry::from_config(&SimConfig::default()).unwrap();
    assert_eq!(registry.bucket_count(), 10);

    registry.insert("buffer", 256).unwrap();
    let record = registry.lookup("buffer").unwrap();
    assert_eq!(record.size, 256);
    assert_eq!(record.length, 256);

    let removed = registry.remove("buffer").unwrap();
    assert_eq!(removed.key, "buffer");
    assert!(registry.lookup("buffer").is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_absent_keys() {
    let mut registry = BlockRegistry::new(10, 1024).unwrap();
    assert!(registry.lookup("ghost").is_none());
    assert!(matches!(registry.remove("ghost"), Err(SimError::NotFound(_))));
}

#[test]
fn test_duplicate_key_is_rejected() {
    let mut registry = BlockRegistry::new(10, 1024).unwrap();
    registry.insert("a", 10).unwrap();
    let err = registry.insert("a", 20).unwrap_err();
    assert!(matches!(err, SimError::AllocationFailed { ref key, .. } if key == "a"));
    assert_eq!(registry.lookup("a").unwrap().size, 10);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_arena_exhaustion_fails_allocation() {
    let mut registry = BlockRegistry::new(4, 64).unwrap();
    registry.insert("big", 60).unwrap();
    assert!(matches!(registry.insert("more", 8), Err(SimError::AllocationFailed { .. })));
    assert!(matches!(registry.insert("empty", 0), Err(SimError::InvalidParameter { .. })));

    registry.remove("big").unwrap();
    registry.insert("more", 8).unwrap();
    assert_eq!(registry.free_bytes(), 56);
}

#[test]
fn test_records_own_their_bytes() {
    let mut registry = BlockRegistry::new(10, 128).unwrap();
    registry.insert("left", 4).unwrap();
    registry.insert("right", 4).unwrap();

    registry.bytes_mut("left").unwrap().copy_from_slice(b"ping");
    registry.bytes_mut("right").unwrap().copy_from_slice(b"pong");
    assert_eq!(registry.bytes("left").unwrap(), b"ping");
    assert_eq!(registry.bytes("right").unwrap(), b"pong");

    registry.remove("left").unwrap();
    registry.insert("again", 4).unwrap();
    assert_eq!(registry.lookup("again").unwrap().offset, 0);
    assert_eq!(registry.bytes("again").unwrap(), &[0u8; 4]);
}

#[test]
fn test_list_all_orders_by_bucket() {
    let mut registry = BlockRegistry::new(10, 1024).unwrap();
    // "a" -> 7, "ab" and "ba" -> 5, "c" -> 9
    for key in ["a", "ab", "c", "ba"] {
        registry.insert(key, 1).unwrap();
    }
    let listed: Vec<(usize, &str)> =
        registry.list_all().into_iter().map(|(bucket, r)| (bucket, r.key.as_str())).collect();
    assert_eq!(listed, vec![(5, "ba"), (5, "ab"), (7, "a"), (9, "c")]);

    let empty = registry.buckets().filter(|(_, chain)| chain.clone().next().is_none()).count();
    assert_eq!(empty, 7);
}

#[test]
fn test_remove_from_deep_single_bucket_chain() {
    const KEYS: usize = 5_000;
    let mut registry = BlockRegistry::new(1, 1 << 16).unwrap();
    for i in 0..KEYS {
        registry.insert(&format!("k{i}"), 1).unwrap();
    }

    // The oldest record sits at the tail of the only chain.
    let tail = registry.remove("k0").unwrap();
    assert_eq!(tail.offset, 0);
    let middle = registry.remove(&format!("k{}", KEYS / 2)).unwrap();
    assert_eq!(middle.offset, KEYS / 2);

    assert_eq!(registry.len(), KEYS - 2);
    assert!(registry.lookup("k0").is_none());
    assert!(registry.lookup(&format!("k{}", KEYS - 1)).is_some());
    assert_eq!(registry.free_bytes(), (1 << 16) - (KEYS - 2));
}

#[test]
fn test_small_arena_config_from_json() {
    let config = SimConfig::from_json(r#"{ "arena_capacity": 512, "bucket_count": 3 }"#).unwrap();
    assert_eq!(config.max_request, 512);

    let mut registry = BlockRegistry::from_config(&config).unwrap();
    assert_eq!(registry.bucket_count(), 3);
    registry.insert("all", 512).unwrap();
    assert_eq!(registry.free_bytes(), 0);
}

proptest! {
    #[test]
    fn test_registry_matches_std_map(keys in proptest::collection::vec("[a-z]{1,4}", 1..40)) {
        let mut registry = BlockRegistry::new(10, 1 << 16).unwrap();
        let mut model = std::collections::HashMap::new();

        for (i, key) in keys.iter().enumerate() {
            let size = i + 1;
            let inserted = registry.insert(key, size).is_ok();
            prop_assert_eq!(inserted, !model.contains_key(key));
            model.entry(key.clone()).or_insert(size);
        }
        prop_assert_eq!(registry.len(), model.len());
        for (key, size) in &model {
            prop_assert_eq!(registry.lookup(key).map(|r| r.size), Some(*size));
        }
        for key in model.keys() {
            prop_assert!(registry.remove(key).is_ok());
            prop_assert!(registry.lookup(key).is_none());
        }
        prop_assert_eq!(registry.free_bytes(), 1 << 16);
    }
}
