//! ChunkCache Tests
//!
//! Tests verify:
//! - Basic insert/get/remove
//! - Size tracking
//! - Segment-wise prefix lookups and eviction
//! - Conditional eviction
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use chunkstore::fs::ChunkCache;
use chunkstore::StorageKey;

// =============================================================================
// Helper Functions
// =============================================================================

fn key(segments: &[&str]) -> StorageKey {
    StorageKey::from(segments)
}

fn cache_with(entries: &[(StorageKey, &'static str)]) -> ChunkCache {
    let cache = ChunkCache::new();
    for (k, data) in entries.iter().cloned() {
        cache.insert(k, Bytes::from_static(data.as_bytes()));
    }
    cache
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_cache_is_empty() {
    let cache = ChunkCache::new();
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_insert_and_get() {
    let cache = ChunkCache::new();

    cache.insert(key(&["doc1", "a"]), Bytes::from_static(b"value1"));

    assert_eq!(cache.get(&key(&["doc1", "a"])), Some(Bytes::from_static(b"value1")));
    assert!(cache.contains(&key(&["doc1", "a"])));
    assert_eq!(cache.get(&key(&["doc1"])), None);
}

#[test]
fn test_insert_overwrites_and_tracks_size() {
    let cache = ChunkCache::new();

    assert_eq!(cache.insert(key(&["k"]), Bytes::from_static(b"12345")), 5);
    assert_eq!(cache.insert(key(&["k"]), Bytes::from_static(b"12")), 2);
    assert_eq!(cache.insert(key(&["j"]), Bytes::from_static(b"123")), 5);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&key(&["k"])), Some(Bytes::from_static(b"12")));
}

#[test]
fn test_remove() {
    let cache = cache_with(&[(key(&["k"]), "abc")]);

    assert_eq!(cache.remove(&key(&["k"])), Some(Bytes::from_static(b"abc")));
    assert_eq!(cache.remove(&key(&["k"])), None);
    assert!(cache.is_empty());
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_clear() {
    let cache = cache_with(&[(key(&["a"]), "1"), (key(&["b"]), "22")]);

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.size(), 0);
}

// =============================================================================
// Prefix Tests
// =============================================================================

#[test]
fn test_keys_with_prefix_is_segment_wise() {
    let cache = cache_with(&[
        (key(&["doc1"]), "root"),
        (key(&["doc1", "a"]), "1"),
        (key(&["doc1", "b", "x"]), "2"),
        (key(&["doc10", "a"]), "3"),
        (key(&["doc", "1"]), "4"),
        (key(&["doc2", "a"]), "5"),
    ]);

    let keys = cache.keys_with_prefix(&key(&["doc1"]));

    assert_eq!(
        keys,
        vec![key(&["doc1"]), key(&["doc1", "a"]), key(&["doc1", "b", "x"])]
    );
}

#[test]
fn test_keys_with_empty_prefix_returns_everything() {
    let cache = cache_with(&[(key(&["a"]), "1"), (key(&["b", "c"]), "2")]);

    assert_eq!(cache.keys_with_prefix(&StorageKey::root()).len(), 2);
}

#[test]
fn test_remove_prefix() {
    let cache = cache_with(&[
        (key(&["ab", "c"]), "1"),
        (key(&["ab", "c", "d"]), "22"),
        (key(&["ab", "cd"]), "333"),
        (key(&["a", "bc"]), "4444"),
    ]);

    let evicted = cache.remove_prefix(&key(&["ab", "c"]));

    assert_eq!(evicted, 2);
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&key(&["ab", "cd"])));
    assert!(cache.contains(&key(&["a", "bc"])));
    assert_eq!(cache.size(), 7);
}

#[test]
fn test_remove_prefix_with_no_matches() {
    let cache = cache_with(&[(key(&["a"]), "1")]);

    assert_eq!(cache.remove_prefix(&key(&["b"])), 0);
    assert_eq!(cache.len(), 1);
}

// =============================================================================
// Conditional Eviction Tests
// =============================================================================

#[test]
fn test_remove_if_unchanged_evicts_matching_value() {
    let cache = cache_with(&[(key(&["k"]), "mine")]);

    assert!(cache.remove_if_unchanged(&key(&["k"]), &Bytes::from_static(b"mine")));
    assert!(cache.is_empty());
}

#[test]
fn test_remove_if_unchanged_keeps_newer_value() {
    let cache = cache_with(&[(key(&["k"]), "newer")]);

    assert!(!cache.remove_if_unchanged(&key(&["k"]), &Bytes::from_static(b"older")));
    assert_eq!(cache.get(&key(&["k"])), Some(Bytes::from_static(b"newer")));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts_of_distinct_keys() {
    let cache = Arc::new(ChunkCache::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..100 {
                    let k = StorageKey::from(vec![format!("doc{t}"), format!("{i}")]);
                    cache.insert(k, Bytes::from(vec![t as u8; 4]));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("thread should not panic");
    }

    assert_eq!(cache.len(), 800);
    assert_eq!(cache.size(), 3200);
    assert_eq!(cache.keys_with_prefix(&key(&["doc3"])).len(), 100);
}
