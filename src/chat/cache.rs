//! In-memory response cache keyed by a hash of query, history, and session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::types::Source;
use crate::history::HistoryMessage;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub rag_output: String,
    pub no_rag_output: Option<String>,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CachedAnswer>,
    /// Insertion order for oldest-first eviction.
    order: VecDeque<String>,
}

pub struct ChatCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ChatCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache key over the query, the visible history, and the session.
    ///
    /// The same question asked after different conversation turns must not
    /// collide, so each prior message's role and content feed the hash.
    pub fn query_hash(session_id: &str, query: &str, history: &[HistoryMessage]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(session_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(query.as_bytes());
        for message in history {
            hasher.update([0u8]);
            hasher.update(message.role.as_bytes());
            hasher.update([0xFFu8]);
            hasher.update(message.content.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<CachedAnswer> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.entries.get(key) {
            Some(answer) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(answer.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, answer: CachedAnswer) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.insert(key.clone(), answer).is_none() {
            inner.order.push_back(key);
        }

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            entries: inner.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, content: &str) -> HistoryMessage {
        HistoryMessage {
            id: 0,
            session_id: "s1".to_string(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: String::new(),
            additional_kwargs: None,
        }
    }

    fn answer(text: &str) -> CachedAnswer {
        CachedAnswer {
            rag_output: text.to_string(),
            no_rag_output: None,
            sources: Vec::new(),
        }
    }

    #[test]
    fn query_hash_is_stable_and_history_sensitive() {
        let history = vec![message("human", "hi"), message("ai", "hello")];

        let a = ChatCache::query_hash("s1", "what is rust?", &history);
        let b = ChatCache::query_hash("s1", "what is rust?", &history);
        assert_eq!(a, b);

        let different_history = vec![message("human", "hi")];
        let c = ChatCache::query_hash("s1", "what is rust?", &different_history);
        assert_ne!(a, c);

        let different_session = ChatCache::query_hash("s2", "what is rust?", &history);
        assert_ne!(a, different_session);
    }

    #[test]
    fn hit_and_miss_counters_track_lookups() {
        let cache = ChatCache::new(8);

        assert!(cache.get("k1").is_none());
        cache.insert("k1".to_string(), answer("a"));
        assert!(cache.get("k1").is_some());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn evicts_oldest_entry_at_capacity() {
        let cache = ChatCache::new(2);

        cache.insert("k1".to_string(), answer("a"));
        cache.insert("k2".to_string(), answer("b"));
        cache.insert("k3".to_string(), answer("c"));

        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert_eq!(cache.stats().entries, 2);
    }
}
