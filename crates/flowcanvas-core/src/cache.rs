//! Bounded store of finished executions, keyed by execution id.
//!
//! Least-recently-used entries are evicted once `capacity` is reached; entries older than the
//! optional TTL are dropped on access.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::runtime::ExecutionResult;

pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry {
    result: ExecutionResult,
    inserted_at: Instant,
}

#[derive(Default)]
struct Bookkeeping {
    lru_order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Bookkeeping {
    fn touch(&mut self, key: &str) {
        self.lru_order.retain(|k| k != key);
        self.lru_order.push_back(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.lru_order.retain(|k| k != key);
    }
}

pub struct ExecutionCache {
    entries: DashMap<String, CacheEntry>,
    book: Mutex<Bookkeeping>,
    config: CacheConfig,
}

impl Default for ExecutionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ExecutionCache {
    /// A zero capacity is treated as one.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            book: Mutex::new(Bookkeeping::default()),
            config: CacheConfig {
                capacity: config.capacity.max(1),
                ..config
            },
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Store `result` under its execution id, evicting the least recently used entry when full.
    pub fn insert(&self, result: ExecutionResult) {
        let key = result.execution_id.clone();
        let mut book = self.book();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
        book.touch(&key);
        while self.entries.len() > self.config.capacity {
            let Some(oldest) = book.lru_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            book.evictions += 1;
            debug!(execution_id = %oldest, "evicted cached execution result");
        }
    }

    /// Look up an execution; refreshes its recency. Expired entries are removed and reported
    /// as missing.
    pub fn get(&self, execution_id: &str) -> Option<ExecutionResult> {
        let mut book = self.book();
        let found = match self.entries.get(execution_id) {
            Some(entry) if self.is_expired(&entry) => None,
            Some(entry) => Some(entry.result.clone()),
            None => {
                book.misses += 1;
                return None;
            }
        };
        match found {
            Some(result) => {
                book.hits += 1;
                book.touch(execution_id);
                Some(result)
            }
            None => {
                self.entries.remove(execution_id);
                book.forget(execution_id);
                book.misses += 1;
                debug!(execution_id, "dropped expired execution result");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let book = self.book();
        CacheStats {
            entries: self.entries.len(),
            hits: book.hits,
            misses: book.misses,
            evictions: book.evictions,
        }
    }
}
