// regcache.rs - Compiled-program cache.
// Programs are immutable once built, so the cache hands out shared `Arc`s.
// Insertion order is kept for eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::RegexError;
use crate::oniguruma::OnigOptionType;
use crate::regcomp::onig_new;
use crate::regenc::OnigEncoding;
use crate::regint::{RegexType, DEFAULT_REGEX_CACHE_SIZE};
use crate::regsyntax::OnigSyntaxType;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    pattern: Vec<u8>,
    options: OnigOptionType,
    syntax: &'static str,
    encoding: &'static str,
}

#[derive(Default)]
struct CacheInner {
    map: HashMap<CacheKey, Arc<RegexType>>,
    order: VecDeque<CacheKey>,
}

/// Bounded cache of compiled programs keyed by pattern, options, syntax and
/// encoding. When full, the oldest insertion is evicted.
pub struct RegexCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl RegexCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        RegexCache {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached program for this key, compiling and inserting it on a
    /// miss. Compile errors are returned and nothing is cached.
    pub fn get_or_compile(
        &self,
        pattern: &[u8],
        option: OnigOptionType,
        enc: OnigEncoding,
        syntax: &'static OnigSyntaxType,
    ) -> Result<Arc<RegexType>, RegexError> {
        let key = CacheKey {
            pattern: pattern.to_vec(),
            options: option,
            syntax: syntax.name,
            encoding: enc.name(),
        };
        if let Some(reg) = self.lock().map.get(&key) {
            log::debug!("regex cache hit: {:?}", String::from_utf8_lossy(pattern));
            return Ok(Arc::clone(reg));
        }

        log::debug!("regex cache miss: {:?}", String::from_utf8_lossy(pattern));
        let reg = Arc::new(onig_new(pattern, option, enc, syntax)?);
        if self.capacity == 0 {
            return Ok(reg);
        }

        let mut inner = self.lock();
        if let Some(existing) = inner.map.get(&key) {
            return Ok(Arc::clone(existing));
        }
        while inner.map.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.map.insert(key, Arc::clone(&reg));
        Ok(reg)
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        RegexCache::new(DEFAULT_REGEX_CACHE_SIZE)
    }
}

/// The process-wide cache.
pub fn onig_cache_global() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::default)
}
