//! Cached, concurrent tag resolution.
//!
//! [`TagGraph`] turns identifiers into shared domain values. Each package
//! hash is parsed at most once per store generation: concurrent callers for
//! the same hash wait on one per-key `OnceCell`, and the cell is only filled
//! after the value is fully assembled. When the store reloads, the next
//! resolve starts from an empty cache.
//!
//! Resolution of nested references goes through a [`ResolveContext`], which
//! carries the chain of tags being assembled. Every tag that waits on an
//! unfinished cell is recorded in a per-generation wait graph; a wait that
//! would close a loop in that graph fails with [`TagError::Cycle`] instead of
//! blocking. This covers references back to an ancestor as well as loops
//! between siblings assembled concurrently or by separate resolves.

use crate::registry::{TagKind, TagRegistry, TypedTag};
use crate::types::{
    ControlRig, Entity, Material, Model, PhysicsModel, ShaderBytecode, Skeleton, Texture,
};
use crate::{Result, Tag, TagError};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tiger_formats::{BinaryCursor, ContentId, TagHash};
use tiger_storage::PackageStore;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type TagCell = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Parsed tags of one store generation.
struct TagCache {
    generation: u64,
    cells: DashMap<TagHash, TagCell>,
    /// Tag being assembled to the unfinished tags it is waiting on.
    waits: Mutex<HashMap<TagHash, Vec<TagHash>>>,
}

impl TagCache {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            cells: DashMap::new(),
            waits: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `waiter` blocks on `target`, unless `target` already
    /// (transitively) waits on `waiter`.
    fn begin_wait(&self, waiter: TagHash, target: TagHash) -> bool {
        let mut waits = self.waits.lock();
        if reaches(&waits, target, waiter) {
            return false;
        }
        waits.entry(waiter).or_default().push(target);
        true
    }

    fn end_wait(&self, waiter: TagHash, target: TagHash) {
        let mut waits = self.waits.lock();
        if let Some(targets) = waits.get_mut(&waiter) {
            if let Some(position) = targets.iter().position(|&t| t == target) {
                targets.swap_remove(position);
            }
            if targets.is_empty() {
                waits.remove(&waiter);
            }
        }
    }
}

/// Whether `to` is reachable from `from` over wait edges.
fn reaches(waits: &HashMap<TagHash, Vec<TagHash>>, from: TagHash, to: TagHash) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if seen.insert(node)
            && let Some(next) = waits.get(&node)
        {
            stack.extend(next.iter().copied());
        }
    }
    false
}

/// Wait edge held while a tag under assembly waits on another tag.
struct WaitEdge<'a> {
    cache: &'a TagCache,
    waiter: TagHash,
    target: TagHash,
}

impl<'a> WaitEdge<'a> {
    fn new(cache: &'a TagCache, waiter: TagHash, target: TagHash) -> Result<Self> {
        if !cache.begin_wait(waiter, target) {
            debug!("{} waiting on {} would deadlock", waiter, target);
            return Err(TagError::Cycle(target));
        }
        Ok(Self {
            cache,
            waiter,
            target,
        })
    }
}

impl Drop for WaitEdge<'_> {
    fn drop(&mut self) {
        self.cache.end_wait(self.waiter, self.target);
    }
}

/// Removes a cell that its initializer left empty (error or cancellation).
struct UnfilledCellGuard<'a> {
    cells: &'a DashMap<TagHash, TagCell>,
    tag: TagHash,
    cell: &'a TagCell,
    performed: &'a AtomicBool,
}

impl Drop for UnfilledCellGuard<'_> {
    fn drop(&mut self) {
        if self.performed.load(Ordering::Relaxed) && !self.cell.initialized() {
            self.cells
                .remove_if(&self.tag, |_, current| Arc::ptr_eq(current, self.cell));
        }
    }
}

/// Snapshot of graph counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Tags parsed and assembled.
    pub parses: u64,
    /// Resolves answered by an already parsed or in-progress tag.
    pub hits: u64,
    /// Tags currently cached.
    pub cached: usize,
}

/// Cached tag resolver over a [`PackageStore`].
pub struct TagGraph {
    store: Arc<PackageStore>,
    registry: TagRegistry,
    cache: RwLock<Arc<TagCache>>,
    parses: AtomicU64,
    hits: AtomicU64,
}

impl std::fmt::Debug for TagGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagGraph")
            .field("registry", &self.registry)
            .field("cached", &self.cache.read().cells.len())
            .finish_non_exhaustive()
    }
}

impl TagGraph {
    /// Graph with the built-in type-tag table.
    pub fn new(store: Arc<PackageStore>) -> Self {
        Self::with_registry(store, TagRegistry::default())
    }

    /// Graph with a custom type-tag table.
    pub fn with_registry(store: Arc<PackageStore>, registry: TagRegistry) -> Self {
        let generation = store.generation();
        Self {
            store,
            registry,
            cache: RwLock::new(Arc::new(TagCache::new(generation))),
            parses: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<PackageStore> {
        &self.store
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Resolve `id` as `T`. Absent identifiers resolve to `None`.
    pub async fn resolve<T: Tag>(&self, id: impl Into<ContentId>) -> Result<Option<Arc<T>>> {
        ResolveContext::root(self).resolve(id.into()).await
    }

    /// Like [`resolve`](Self::resolve), with missing entries and decode
    /// failures reported as `None`.
    pub async fn resolve_optional<T: Tag>(&self, id: impl Into<ContentId>) -> Option<Arc<T>> {
        ResolveContext::root(self).resolve_optional(id.into()).await
    }

    /// Resolve `id` as whatever kind its entry's type-tag names.
    pub async fn resolve_typed(&self, id: impl Into<ContentId>) -> Result<TypedTag> {
        ResolveContext::root(self).resolve_typed(id.into()).await
    }

    /// Resolve `id` as the kind registered for `type_tag`.
    pub async fn resolve_as(&self, type_tag: u32, id: impl Into<ContentId>) -> Result<TypedTag> {
        ResolveContext::root(self).resolve_as(type_tag, id.into()).await
    }

    /// Drop every cached tag.
    pub fn clear(&self) {
        let mut cache = self.cache.write();
        *cache = Arc::new(TagCache::new(cache.generation));
    }

    /// Counter snapshot.
    pub fn stats(&self) -> GraphStats {
        let cached = self
            .cache
            .read()
            .cells
            .iter()
            .filter(|cell| cell.value().initialized())
            .count();
        GraphStats {
            parses: self.parses.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            cached,
        }
    }

    /// Cache of the store's current generation, replacing a stale one.
    fn current_cache(&self) -> Arc<TagCache> {
        let generation = self.store.generation();
        {
            let cache = self.cache.read();
            if cache.generation == generation {
                return cache.clone();
            }
        }

        let mut cache = self.cache.write();
        if cache.generation != generation {
            debug!(
                "Store moved to generation {}, dropping {} cached tags",
                generation,
                cache.cells.len()
            );
            *cache = Arc::new(TagCache::new(generation));
        }
        cache.clone()
    }

    async fn load<T: Tag>(&self, tag: TagHash, parent: &ResolveContext<'_>) -> Result<Arc<T>> {
        let cache = self.current_cache();
        let cell: TagCell = cache.cells.entry(tag).or_default().clone();

        let wait = match parent.current() {
            Some(waiter) if !cell.initialized() => Some(WaitEdge::new(&cache, waiter, tag)?),
            _ => None,
        };

        let performed = AtomicBool::new(false);
        let guard = UnfilledCellGuard {
            cells: &cache.cells,
            tag,
            cell: &cell,
            performed: &performed,
        };

        let value = {
            let performed = &performed;
            cell.get_or_try_init(|| async move {
                performed.store(true, Ordering::Relaxed);
                self.parse::<T>(tag, parent).await
            })
            .await?
            .clone()
        };
        drop(guard);
        drop(wait);

        if !performed.load(Ordering::Relaxed) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        value
            .downcast::<T>()
            .map_err(|_| TagError::TypeMismatch {
                tag,
                expected: T::NAME,
            })
    }

    /// Whether an entry stored under `type_tag` decodes as `T`, directly or
    /// through a registered alias.
    fn accepts<T: Tag>(&self, type_tag: u32) -> bool {
        type_tag == T::TYPE_TAG
            || self
                .registry
                .lookup(type_tag)
                .is_some_and(|kind| kind.type_tag() == T::TYPE_TAG)
    }

    async fn parse<T: Tag>(
        &self,
        tag: TagHash,
        parent: &ResolveContext<'_>,
    ) -> Result<Arc<dyn Any + Send + Sync>> {
        let meta = self.store.metadata(tag)?;
        if !self.accepts::<T>(meta.type_tag) {
            return Err(TagError::TypeMismatch {
                tag,
                expected: T::NAME,
            });
        }

        let bytes = self.store.read(tag).await?;
        let record = BinaryCursor::new(&bytes).read_record(T::SCHEMA)?;

        let ctx = parent.child(tag);
        let value = T::assemble(record, bytes, &ctx).await?;

        self.parses.fetch_add(1, Ordering::Relaxed);
        debug!("Parsed {} as {}", tag, T::NAME);
        Ok(Arc::new(value))
    }
}

/// Resolution state threaded through tag assembly.
///
/// Holds the chain of tags currently being assembled, outermost first.
#[derive(Debug, Clone)]
pub struct ResolveContext<'g> {
    graph: &'g TagGraph,
    ancestors: Vec<TagHash>,
}

impl<'g> ResolveContext<'g> {
    fn root(graph: &'g TagGraph) -> Self {
        Self {
            graph,
            ancestors: Vec::new(),
        }
    }

    fn child(&self, tag: TagHash) -> Self {
        let mut ancestors = Vec::with_capacity(self.ancestors.len() + 1);
        ancestors.extend_from_slice(&self.ancestors);
        ancestors.push(tag);
        Self {
            graph: self.graph,
            ancestors,
        }
    }

    pub fn graph(&self) -> &'g TagGraph {
        self.graph
    }

    /// Tag being assembled, `None` at the root.
    pub fn current(&self) -> Option<TagHash> {
        self.ancestors.last().copied()
    }

    /// Tags being assembled, outermost first.
    pub fn ancestors(&self) -> &[TagHash] {
        &self.ancestors
    }

    /// Resolve `id` as `T`. Absent identifiers resolve to `None`.
    pub async fn resolve<T: Tag>(&self, id: impl Into<ContentId>) -> Result<Option<Arc<T>>> {
        let id = id.into();
        if id.is_absent() {
            return Ok(None);
        }

        let tag = self.graph.store.canonicalize(id)?;
        if self.ancestors.contains(&tag) {
            return Err(TagError::Cycle(tag));
        }

        self.graph.load::<T>(tag, self).await.map(Some)
    }

    /// Resolve a reference that is allowed to be missing or broken.
    ///
    /// Missing entries read as `None`; any other failure is logged and also
    /// reads as `None`, so sibling references keep resolving.
    pub async fn resolve_optional<T: Tag>(&self, id: impl Into<ContentId>) -> Option<Arc<T>> {
        let id = id.into();
        match self.resolve::<T>(id).await {
            Ok(value) => value,
            Err(e) if e.is_absent() => {
                debug!("{} {} is absent: {}", T::NAME, id, e);
                None
            }
            Err(e) => {
                warn!(
                    "Failed to resolve {} as {} from {:?}: {}",
                    id,
                    T::NAME,
                    self.current(),
                    e
                );
                None
            }
        }
    }

    /// Resolve `id` as the kind its entry's type-tag names.
    pub async fn resolve_typed(&self, id: impl Into<ContentId>) -> Result<TypedTag> {
        let id = id.into();
        if id.is_absent() {
            return Ok(TypedTag::Empty);
        }
        let tag = self.graph.store.canonicalize(id)?;
        let meta = self.graph.store.metadata(tag)?;
        self.resolve_as(meta.type_tag, tag).await
    }

    /// Resolve `id` as the kind registered for `type_tag`.
    ///
    /// Unregistered type-tags yield [`TypedTag::Unknown`] without touching
    /// storage.
    pub async fn resolve_as(&self, type_tag: u32, id: impl Into<ContentId>) -> Result<TypedTag> {
        let id = id.into();
        let Some(kind) = self.graph.registry.lookup(type_tag) else {
            return Ok(TypedTag::Unknown(type_tag));
        };
        if id.is_absent() {
            return Ok(TypedTag::Empty);
        }

        Ok(match kind {
            TagKind::Entity => self
                .resolve::<Entity>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::Entity),
            TagKind::Model => self
                .resolve::<Model>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::Model),
            TagKind::PhysicsModel => self
                .resolve::<PhysicsModel>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::PhysicsModel),
            TagKind::Skeleton => self
                .resolve::<Skeleton>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::Skeleton),
            TagKind::ControlRig => self
                .resolve::<ControlRig>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::ControlRig),
            TagKind::Material => self
                .resolve::<Material>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::Material),
            TagKind::Texture => self
                .resolve::<Texture>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::Texture),
            TagKind::ShaderBytecode => self
                .resolve::<ShaderBytecode>(id)
                .await?
                .map_or(TypedTag::Empty, TypedTag::ShaderBytecode),
        })
    }

    /// [`resolve_as`](Self::resolve_as) for one slot of a resource list.
    ///
    /// Missing entries read as [`TypedTag::Empty`]. Any other failure is
    /// logged and reads as [`TypedTag::Unknown`].
    pub async fn resolve_as_optional(&self, type_tag: u32, id: impl Into<ContentId>) -> TypedTag {
        let id = id.into();
        match self.resolve_as(type_tag, id).await {
            Ok(value) => value,
            Err(e) if e.is_absent() => TypedTag::Empty,
            Err(e) => {
                warn!(
                    "Failed to resolve {} with type {:#010x} from {:?}: {}",
                    id,
                    type_tag,
                    self.current(),
                    e
                );
                TypedTag::Unknown(type_tag)
            }
        }
    }
}
