//! Byte-budgeted LRU for entry data.
//!
//! Recency order comes from [`LruCache`]; the byte budget is enforced by
//! popping least recently used entries until the new one fits. An entry
//! larger than the whole budget is never cached.

use bytes::Bytes;
use lru::LruCache;
use tiger_formats::TagHash;

/// LRU cache of entry bytes bounded by total size.
#[derive(Debug)]
pub struct ByteCache {
    /// Maximum total bytes held.
    budget: usize,
    /// Bytes currently held.
    used: usize,
    entries: LruCache<TagHash, Bytes>,
}

impl ByteCache {
    /// Create a cache holding at most `budget` bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            entries: LruCache::unbounded(),
        }
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: TagHash) -> Option<Bytes> {
        self.entries.get(&key).cloned()
    }

    /// Insert an entry, evicting least recently used entries to stay within
    /// budget. Returns the number of evicted entries.
    pub fn insert(&mut self, key: TagHash, data: Bytes) -> usize {
        if data.len() > self.budget {
            return 0;
        }

        self.remove(key);

        let mut evicted = 0;
        while self.used + data.len() > self.budget {
            let Some((_, oldest)) = self.entries.pop_lru() else {
                break;
            };
            self.used -= oldest.len();
            evicted += 1;
        }

        self.used += data.len();
        self.entries.put(key, data);
        evicted
    }

    /// Drop one entry.
    pub fn remove(&mut self, key: TagHash) -> Option<Bytes> {
        let data = self.entries.pop(&key)?;
        self.used -= data.len();
        Some(data)
    }

    /// Whether `key` is cached, without touching its position.
    pub fn contains(&self, key: TagHash) -> bool {
        self.entries.contains(&key)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently held.
    pub const fn used_bytes(&self) -> usize {
        self.used
    }

    /// Configured budget.
    pub const fn budget(&self) -> usize {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: u32) -> TagHash {
        TagHash(0x8080_0000 + index)
    }

    fn blob(len: usize) -> Bytes {
        Bytes::from(vec![0xAB; len])
    }

    #[test]
    fn test_lru_basic() {
        let mut cache = ByteCache::new(30);
        assert!(cache.is_empty());

        assert_eq!(cache.insert(key(1), blob(10)), 0);
        assert_eq!(cache.insert(key(2), blob(10)), 0);
        assert_eq!(cache.insert(key(3), blob(10)), 0);
        assert_eq!(cache.used_bytes(), 30);

        // Adding a 4th should evict the first
        assert_eq!(cache.insert(key(4), blob(10)), 1);
        assert!(!cache.contains(key(1)));
        assert_eq!(cache.len(), 3);
        assert!(cache.used_bytes() <= cache.budget());
    }

    #[test]
    fn test_get_refreshes_position() {
        let mut cache = ByteCache::new(30);
        cache.insert(key(1), blob(10));
        cache.insert(key(2), blob(10));
        cache.insert(key(3), blob(10));

        assert!(cache.get(key(1)).is_some());
        cache.insert(key(4), blob(10));
        assert!(cache.contains(key(1)));
        assert!(!cache.contains(key(2)));
    }

    #[test]
    fn test_contains_does_not_refresh() {
        let mut cache = ByteCache::new(20);
        cache.insert(key(1), blob(10));
        cache.insert(key(2), blob(10));

        assert!(cache.contains(key(1)));
        cache.insert(key(3), blob(10));
        assert!(!cache.contains(key(1)));
        assert!(cache.contains(key(2)));
    }

    #[test]
    fn test_large_insert_evicts_several() {
        let mut cache = ByteCache::new(30);
        cache.insert(key(1), blob(10));
        cache.insert(key(2), blob(10));
        cache.insert(key(3), blob(10));
        assert_eq!(cache.insert(key(4), blob(25)), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 25);
    }

    #[test]
    fn test_oversized_entry_not_cached() {
        let mut cache = ByteCache::new(8);
        cache.insert(key(1), blob(4));
        assert_eq!(cache.insert(key(2), blob(9)), 0);
        assert!(!cache.contains(key(2)));
        assert!(cache.contains(key(1)));

        let mut disabled = ByteCache::new(0);
        disabled.insert(key(1), blob(1));
        assert!(disabled.is_empty());
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut cache = ByteCache::new(30);
        cache.insert(key(1), blob(10));
        cache.insert(key(1), blob(20));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 20);
        assert_eq!(cache.remove(key(1)).map(|b| b.len()), Some(20));
        assert_eq!(cache.used_bytes(), 0);
    }
}
