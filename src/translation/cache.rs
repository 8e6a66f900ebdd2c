/*!
 * Result caching keyed by the natural-language question.
 *
 * Keys are the exact question text: case-sensitive, no trimming or other
 * normalization. Only the pipeline writes to the cache, and only after a
 * question has been translated and executed successfully.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::pipeline::QueryResult;

/// How the cache bounds its size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never evict
    Unbounded,
    /// Evict the least recently used entry once `capacity` is reached
    Lru { capacity: usize },
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Lru { capacity: 256 }
    }
}

struct CacheInner {
    map: HashMap<String, Arc<QueryResult>>,
    /// Least recently used key at the front
    order: VecDeque<String>,
    /// Bumped by every `clear`
    generation: u64,
}

impl CacheInner {
    fn touch(&mut self, question: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == question) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }
}

/// Cache of completed query results
pub struct ResultCache {
    inner: Arc<Mutex<CacheInner>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    policy: CachePolicy,
}

impl ResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
                generation: 0,
            })),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            policy,
        }
    }

    /// A cache that never evicts
    pub fn unbounded() -> Self {
        Self::new(CachePolicy::Unbounded)
    }

    /// A least-recently-used cache holding at most `capacity` results
    pub fn lru(capacity: usize) -> Self {
        Self::new(CachePolicy::Lru { capacity })
    }

    /// Get the result stored for exactly this question
    pub fn lookup(&self, question: &str) -> Option<Arc<QueryResult>> {
        let mut inner = self.inner.lock();

        match inner.map.get(question).cloned() {
            Some(result) => {
                if matches!(self.policy, CachePolicy::Lru { .. }) {
                    inner.touch(question);
                }
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}'", truncate_text(question, 40));
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for '{}'", truncate_text(question, 40));
                None
            }
        }
    }

    /// Insert or overwrite the result for `question`
    pub fn store(&self, question: &str, result: Arc<QueryResult>) {
        let mut inner = self.inner.lock();
        Self::store_locked(&mut inner, self.policy, question, result);
    }

    /// Current generation; changes whenever the cache is cleared
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Store `result` only if the cache has not been cleared since
    /// `generation` was read. Returns whether the result was stored.
    pub fn store_if_current(&self, question: &str, result: Arc<QueryResult>, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("Discarding stale result for '{}'", truncate_text(question, 40));
            return false;
        }
        Self::store_locked(&mut inner, self.policy, question, result);
        true
    }

    fn store_locked(inner: &mut CacheInner, policy: CachePolicy, question: &str, result: Arc<QueryResult>) {
        if inner.map.insert(question.to_string(), result).is_some() {
            inner.touch(question);
            return;
        }
        inner.order.push_back(question.to_string());

        if let CachePolicy::Lru { capacity } = policy {
            while inner.map.len() > capacity {
                let Some(evicted) = inner.order.pop_front() else {
                    break;
                };
                inner.map.remove(&evicted);
                debug!("Evicted cached result for '{}'", truncate_text(&evicted, 40));
            }
        }
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Drop every entry and reset the statistics
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
        inner.generation += 1;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Result cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map.is_empty()
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

/// Clones share storage and statistics
impl Clone for ResultCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            policy: self.policy,
        }
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
