//! Entry reads over a package set.
//!
//! All mutable read state (byte cache, in-flight reads, open file handles)
//! lives in a [`Generation`] next to the immutable [`PackageSet`] it belongs
//! to. A reload builds a new generation and swaps the pointer; reads that
//! started before the swap keep their own `Arc` and finish against the old
//! state without touching the new one.

use crate::cache::ByteCache;
use crate::package_set::{EntryMetadata, PackageInfo, PackageSet, scan_directory};
use crate::{Result, StoreConfig, StorageError, hash64_cache};
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tiger_formats::package::inflate_entry;
use tiger_formats::{ContentId, TagHash, TagHash64};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Snapshot of store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entry loads that went to a package file.
    pub file_reads: u64,
    /// Reads answered from the byte cache.
    pub cache_hits: u64,
    /// Reads that waited on another caller's in-flight load.
    pub coalesced_waits: u64,
    /// Entries evicted from the byte cache.
    pub evictions: u64,
    /// Retried read attempts.
    pub retries: u64,
}

#[derive(Debug, Default)]
struct StoreCounters {
    file_reads: AtomicU64,
    cache_hits: AtomicU64,
    coalesced_waits: AtomicU64,
    evictions: AtomicU64,
    retries: AtomicU64,
}

impl StoreCounters {
    fn snapshot(&self) -> StoreStats {
        StoreStats {
            file_reads: self.file_reads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced_waits: self.coalesced_waits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Lazily opened file handle of one package.
#[derive(Debug)]
struct PackageHandle {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl PackageHandle {
    fn new(info: &PackageInfo) -> Self {
        Self {
            path: info.path.clone(),
            file: Mutex::new(None),
        }
    }

    /// Read the stored bytes of an entry. A failed read drops the handle so
    /// the next attempt reopens the file.
    fn read_entry(&self, meta: &EntryMetadata) -> Result<Vec<u8>> {
        let mut guard = self.file.lock();
        let mut file = match guard.take() {
            Some(file) => file,
            None => File::open(&self.path)?,
        };

        let mut data = vec![0u8; meta.size as usize];
        file.seek(SeekFrom::Start(u64::from(meta.offset)))?;
        file.read_exact(&mut data)?;
        *guard = Some(file);
        Ok(data)
    }
}

/// One loaded state of the package set.
#[derive(Debug)]
struct Generation {
    number: u64,
    set: PackageSet,
    cache: Mutex<ByteCache>,
    inflight: DashMap<TagHash, Arc<OnceCell<Bytes>>>,
    handles: DashMap<u16, Arc<PackageHandle>>,
}

impl Generation {
    fn new(number: u64, set: PackageSet, cache_budget: usize) -> Self {
        Self {
            number,
            set,
            cache: Mutex::new(ByteCache::new(cache_budget)),
            inflight: DashMap::new(),
            handles: DashMap::new(),
        }
    }

    fn handle(&self, tag: TagHash, package_id: u16) -> Result<Arc<PackageHandle>> {
        if let Some(handle) = self.handles.get(&package_id) {
            return Ok(handle.clone());
        }
        let info = self
            .set
            .package(package_id)
            .ok_or(StorageError::NotFound(ContentId::Local(tag)))?;
        Ok(self
            .handles
            .entry(package_id)
            .or_insert_with(|| Arc::new(PackageHandle::new(info)))
            .clone())
    }
}

/// Scan the configured directory and attach the hash64 table, from the
/// persisted cache when it matches.
fn load_package_set(config: &StoreConfig) -> Result<PackageSet> {
    let scan = scan_directory(&config.package_dir)?;
    let fingerprint = scan.fingerprint();

    let Some(cache_path) = config.hash64_cache_path.as_deref() else {
        return Ok(PackageSet::from_scan(&config.package_dir, scan, None));
    };

    match hash64_cache::load(cache_path, fingerprint) {
        Ok(Some(table)) => return Ok(PackageSet::from_scan(&config.package_dir, scan, Some(table))),
        Ok(None) => {}
        Err(e) => warn!("Discarding hash64 cache {}: {}", cache_path.display(), e),
    }

    let set = PackageSet::from_scan(&config.package_dir, scan, None);
    if let Err(e) = hash64_cache::save(cache_path, fingerprint, set.hash64_table()) {
        warn!("Failed to write hash64 cache {}: {}", cache_path.display(), e);
    }
    Ok(set)
}

/// Addressable store over a directory of package files.
///
/// `PackageStore` is `Send + Sync`; share it through an `Arc`.
#[derive(Debug)]
pub struct PackageStore {
    config: StoreConfig,
    state: RwLock<Arc<Generation>>,
    counters: StoreCounters,
}

impl PackageStore {
    /// Validate the configuration, scan the package directory and build the
    /// metadata and hash64 tables.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let set = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || load_package_set(&config))
                .await
                .map_err(|e| StorageError::ConcurrencyError(e.to_string()))??
        };

        info!(
            "Opened package store at {} with {} packages",
            config.package_dir.display(),
            set.package_count()
        );

        let generation = Generation::new(0, set, config.cache_budget_bytes);
        Ok(Self {
            config,
            state: RwLock::new(Arc::new(generation)),
            counters: StoreCounters::default(),
        })
    }

    fn snapshot(&self) -> Arc<Generation> {
        self.state.read().clone()
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current generation number, bumped by every [`reload`](Self::reload).
    pub fn generation(&self) -> u64 {
        self.state.read().number
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }

    /// Metadata of the entry addressed by `tag`.
    pub fn metadata(&self, tag: TagHash) -> Result<EntryMetadata> {
        self.snapshot().set.metadata(tag)
    }

    /// Translate a 64-bit hash into a package hash.
    pub fn global_to_local(&self, hash: TagHash64) -> Result<TagHash> {
        self.snapshot().set.global_to_local(hash)
    }

    /// Reduce any byte-addressing identifier to a package hash.
    pub fn canonicalize(&self, id: ContentId) -> Result<TagHash> {
        self.snapshot().set.canonicalize(id)
    }

    /// Number of packages in the current generation.
    pub fn package_count(&self) -> usize {
        self.snapshot().set.package_count()
    }

    /// Number of entries in the current generation.
    pub fn entry_count(&self) -> usize {
        self.snapshot().set.entry_count()
    }

    /// Number of hash64 mappings in the current generation.
    pub fn hash64_count(&self) -> usize {
        self.snapshot().set.hash64_table().len()
    }

    /// Kept packages of the current generation, in id order.
    pub fn packages(&self) -> Vec<Arc<PackageInfo>> {
        self.snapshot().set.packages().cloned().collect()
    }

    /// Read the bytes of any byte-addressing identifier.
    pub async fn read_content(&self, id: ContentId) -> Result<Bytes> {
        let tag = self.canonicalize(id)?;
        self.read(tag).await
    }

    /// Read the bytes of the entry addressed by `tag`.
    ///
    /// Redirect entries are followed once. Concurrent reads of the same entry
    /// share one file read.
    pub async fn read(&self, tag: TagHash) -> Result<Bytes> {
        let state = self.snapshot();

        let mut meta = state.set.metadata(tag)?;
        let mut target = tag;
        if meta.is_redirect() {
            target = meta.reference;
            meta = state
                .set
                .metadata(target)
                .map_err(|_| StorageError::NotFound(ContentId::Local(tag)))?;
            if meta.is_redirect() {
                warn!("{} redirects to redirect {}", tag, target);
                return Err(StorageError::NotFound(ContentId::Local(tag)));
            }
            debug!("{} redirects to {}", tag, target);
        }

        if let Some(bytes) = state.cache.lock().get(target) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(bytes);
        }

        let cell = state
            .inflight
            .entry(target)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let performed = AtomicBool::new(false);
        let result = {
            let performed = &performed;
            let generation = &*state;
            cell.get_or_try_init(|| async move {
                performed.store(true, Ordering::Relaxed);
                self.load(generation, target, meta).await
            })
            .await
            .cloned()
        };

        if !performed.load(Ordering::Relaxed) {
            self.counters.coalesced_waits.fetch_add(1, Ordering::Relaxed);
        }
        state
            .inflight
            .remove_if(&target, |_, current| Arc::ptr_eq(current, &cell));

        result
    }

    async fn load(&self, state: &Generation, tag: TagHash, meta: EntryMetadata) -> Result<Bytes> {
        if let Some(bytes) = state.cache.lock().get(tag) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(bytes);
        }

        let file_size = state
            .set
            .package(meta.package_id)
            .map_or(0, |package| package.file_size);
        let end = u64::from(meta.offset) + u64::from(meta.size);
        if end > file_size {
            return Err(StorageError::Corruption(format!(
                "{tag}: data at {:#x}+{:#x} exceeds package size {file_size:#x}",
                meta.offset, meta.size
            )));
        }

        let handle = state.handle(tag, meta.package_id)?;
        self.counters.file_reads.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Reading {} ({} bytes at {:#x}) from package {:#x}",
            tag, meta.size, meta.offset, meta.package_id
        );

        let stored = self
            .config
            .retry
            .execute(|attempt| {
                if attempt > 0 {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                }
                let handle = handle.clone();
                async move {
                    tokio::task::spawn_blocking(move || handle.read_entry(&meta))
                        .await
                        .map_err(|e| StorageError::ConcurrencyError(e.to_string()))?
                }
            })
            .await;

        let stored = match stored {
            Ok(stored) => stored,
            Err(e @ StorageError::Io(_)) => {
                warn!("Giving up on {} after retries: {}", tag, e);
                return Err(StorageError::NotFound(ContentId::Local(tag)));
            }
            Err(e) => return Err(e),
        };

        let bytes = if meta.is_compressed() {
            let inflated = inflate_entry(&stored).map_err(|e| {
                StorageError::Corruption(format!("{tag}: zlib stream is invalid: {e}"))
            })?;
            Bytes::from(inflated)
        } else {
            Bytes::from(stored)
        };

        let evicted = state.cache.lock().insert(tag, bytes.clone());
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
        Ok(bytes)
    }

    /// Rescan the package directory and swap in a new generation.
    ///
    /// Cached bytes, in-flight reads and file handles of the old generation
    /// are dropped with it.
    pub async fn reload(&self) -> Result<()> {
        let set = {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || load_package_set(&config))
                .await
                .map_err(|e| StorageError::ConcurrencyError(e.to_string()))??
        };

        let mut state = self.state.write();
        let number = state.number + 1;
        *state = Arc::new(Generation::new(number, set, self.config.cache_budget_bytes));
        info!(
            "Reloaded package store at {}, generation {}",
            self.config.package_dir.display(),
            number
        );
        Ok(())
    }

    /// Drop all cached entry bytes of the current generation.
    pub fn clear_cache(&self) {
        self.snapshot().cache.lock().clear();
    }
}
