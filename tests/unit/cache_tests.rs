/*!
 * Tests for the result cache shared between threads and policies
 */

use std::sync::Arc;
use std::thread;

use sqlchat::database::SqlValue;
use sqlchat::translation::{CachePolicy, QueryResult, ResultCache};

fn answer(sql: &str, marks: i64) -> Arc<QueryResult> {
    Arc::new(QueryResult {
        sql: sql.to_string(),
        columns: vec!["MARKS".to_string()],
        rows: vec![vec![SqlValue::Integer(marks)]],
        elapsed_secs: 0.002,
        ..QueryResult::default()
    })
}

#[test]
fn test_default_shouldBeLruWith256Entries() {
    let cache = ResultCache::default();
    assert_eq!(cache.policy(), CachePolicy::Lru { capacity: 256 });
    assert!(cache.is_empty());
}

#[test]
fn test_lookup_withDifferentCaseOrWhitespace_shouldMiss() {
    let cache = ResultCache::unbounded();
    cache.store("Show all students", answer("SELECT * FROM STUDENT", 90));

    assert!(cache.lookup("Show all students").is_some());
    assert!(cache.lookup("show all students").is_none());
    assert!(cache.lookup("Show all students ").is_none());
}

#[test]
fn test_lookup_shouldReturnStoredResultUnchanged() {
    let cache = ResultCache::lru(4);
    let stored = answer("SELECT MARKS FROM STUDENT", 90);
    cache.store("marks", Arc::clone(&stored));

    let found = cache.lookup("marks").unwrap();
    assert!(Arc::ptr_eq(&found, &stored));
    assert_eq!(found.elapsed_secs, 0.002);
}

#[test]
fn test_lru_withRecentLookup_shouldKeepTouchedEntry() {
    let cache = ResultCache::lru(2);
    cache.store("first", answer("SELECT 1", 1));
    cache.store("second", answer("SELECT 2", 2));

    // "first" becomes most recently used, so "second" is evicted next
    assert!(cache.lookup("first").is_some());
    cache.store("third", answer("SELECT 3", 3));

    assert!(cache.lookup("first").is_some());
    assert!(cache.lookup("second").is_none());
    assert!(cache.lookup("third").is_some());
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_store_fromManyThreads_shouldKeepEveryEntryWhenUnbounded() {
    let cache = ResultCache::unbounded();

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let question = format!("question {} from worker {}", i, t);
                    cache.store(&question, answer("SELECT 1", i));
                    assert!(cache.lookup(&question).is_some());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(cache.len(), 400);
    let (hits, misses, rate) = cache.stats();
    assert_eq!(hits, 400);
    assert_eq!(misses, 0);
    assert_eq!(rate, 1.0);
}

#[test]
fn test_store_fromManyThreads_shouldNeverExceedLruCapacity() {
    let cache = ResultCache::lru(16);

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    cache.store(&format!("{}-{}", t, i), answer("SELECT 1", i));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(cache.len(), 16);
}

#[test]
fn test_clear_shouldEmptyCacheAndResetStats() {
    let cache = ResultCache::lru(8);
    cache.store("q", answer("SELECT 1", 1));
    cache.lookup("q");
    cache.lookup("missing");

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.stats(), (0, 0, 0.0));
}
