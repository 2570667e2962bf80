use crate::{
    error::{PoolError, PoolResult},
    scheduler::runtime_handle,
    Catalog, GetComponent, PoolAllocator, PoolKey, PoolNode, Poolable, RegistryConfig,
    SourceEntry, Space, Spawn, Vec3,
};
use core::{
    any::type_name,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};
use crossbeam_queue::SegQueue;
use std::{collections::HashMap, sync::Arc};

/// The parent handle type of the nodes an allocator produces.
pub type ParentOf<K, A> = <<A as PoolAllocator<K>>::Node as PoolNode>::Parent;

/// Identifier the registry assigns to every instance it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// Slot state word: acquisition epoch in the high bits, lifecycle tag in the
// low two.
const IDLE: u64 = 0;
const ACQUIRED: u64 = 1;
const DETACHED: u64 = 2;
const TAG_BITS: u32 = 2;
const TAG_MASK: u64 = (1 << TAG_BITS) - 1;
const EPOCH_MASK: u64 = u64::MAX >> TAG_BITS;

#[inline(always)]
fn pack(epoch: u64, tag: u64) -> u64 {
    ((epoch & EPOCH_MASK) << TAG_BITS) | tag
}

#[inline(always)]
fn unpack(word: u64) -> (u64, u64) {
    (word >> TAG_BITS, word & TAG_MASK)
}

struct Slot<K, N> {
    id: InstanceId,
    kind: K,
    node: N,
    poolable: bool,
    state: AtomicU64,
}

impl<K, N: PoolNode> Slot<K, N> {
    fn poolable(&self) -> Option<&dyn Poolable> {
        if self.poolable {
            self.node.as_poolable()
        } else {
            None
        }
    }
}

/// A lease on an acquired instance.
///
/// Cloning the lease does not clone the instance: every clone names the same
/// node and the same acquisition. Only one release per acquisition is
/// accepted, later ones are refused with [`PoolError::NotAcquired`] or
/// [`PoolError::StaleLease`].
pub struct Pooled<K, N> {
    slot: Arc<Slot<K, N>>,
    epoch: u64,
}

impl<K: Copy, N> Pooled<K, N> {
    /// The instance's id.
    pub fn id(&self) -> InstanceId {
        self.slot.id
    }

    /// The kind the instance was cloned for.
    pub fn kind(&self) -> K {
        self.slot.kind
    }

    /// The acquisition this lease belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The node handle.
    pub fn node(&self) -> &N {
        &self.slot.node
    }
}

impl<K, N> Clone for Pooled<K, N> {
    fn clone(&self) -> Self {
        Pooled {
            slot: Arc::clone(&self.slot),
            epoch: self.epoch,
        }
    }
}

impl<K, N> Deref for Pooled<K, N> {
    type Target = N;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.slot.node
    }
}

impl<K: fmt::Debug, N> fmt::Debug for Pooled<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("id", &self.slot.id)
            .field("kind", &self.slot.kind)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl<K, N> PartialEq for Pooled<K, N> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot) && self.epoch == other.epoch
    }
}

impl<K, N> Eq for Pooled<K, N> {}

impl<K, N> Hash for Pooled<K, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.id.hash(state);
        self.epoch.hash(state);
    }
}

/// Counters of a single kind's pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances waiting in the queue.
    pub idle: usize,
    /// Instances currently leased to callers.
    pub acquired: usize,
    /// Instances ever created for the kind.
    pub live: usize,
    /// Instances dropped from the queue because something else had activated
    /// them.
    pub discarded: usize,
}

struct KindPool<K, N: PoolNode> {
    container: N::Parent,
    idle: SegQueue<Arc<Slot<K, N>>>,
    live: AtomicUsize,
    discarded: AtomicUsize,
}

struct Inner<K, A: PoolAllocator<K>> {
    allocator: A,
    catalog: Catalog<K, A::Template>,
    config: RegistryConfig,
    pools: HashMap<K, KindPool<K, A::Node>>,
    next_id: AtomicU64,
}

/// Owns one FIFO queue of idle instances per kind and serves acquire and
/// release.
///
/// The registry is a cheap handle: clones share the same pools. It is built
/// once from a [`Catalog`] and pre-warms every pool on construction.
pub struct PoolRegistry<K: PoolKey, A: PoolAllocator<K>> {
    inner: Arc<Inner<K, A>>,
}

impl<K: PoolKey, A: PoolAllocator<K>> Clone for PoolRegistry<K, A> {
    fn clone(&self) -> Self {
        PoolRegistry {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PoolKey, A: PoolAllocator<K>> fmt::Debug for PoolRegistry<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.inner.pools.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn allocate_slot<K: PoolKey, A: PoolAllocator<K>>(
    allocator: &A,
    next_id: &AtomicU64,
    pool: &KindPool<K, A::Node>,
    entry: &SourceEntry<K, A::Template>,
    template: &A::Template,
    state: u64,
) -> Arc<Slot<K, A::Node>> {
    let node = allocator.allocate(template, &pool.container);
    node.set_active(false);
    if entry.auto_destroy {
        allocator.mark_auto_destroy(&node);
    }
    let poolable = node.as_poolable().is_some();
    pool.live.fetch_add(1, Ordering::Relaxed);

    Arc::new(Slot {
        id: InstanceId(next_id.fetch_add(1, Ordering::Relaxed)),
        kind: entry.kind,
        node,
        poolable,
        state: AtomicU64::new(state),
    })
}

impl<K: PoolKey, A: PoolAllocator<K>> PoolRegistry<K, A> {
    /// Builds and pre-warms a pool for every usable catalog entry with the
    /// default [`RegistryConfig`].
    pub fn new(catalog: Catalog<K, A::Template>, allocator: A) -> Self {
        Self::with_config(catalog, allocator, RegistryConfig::default())
    }

    /// Builds and pre-warms a pool for every usable catalog entry.
    ///
    /// Entries are visited in category order. An entry without a template is
    /// logged and gets no pool; a repeated kind keeps the pool built for its
    /// first declaration.
    pub fn with_config(
        catalog: Catalog<K, A::Template>,
        allocator: A,
        config: RegistryConfig,
    ) -> Self {
        let next_id = AtomicU64::new(0);
        let mut pools = HashMap::with_capacity(catalog.len());

        for category in catalog.categories() {
            for entry in &category.entries {
                let Some(template) = entry.template.as_ref() else {
                    tracing::error!(kind = ?entry.kind, "source template is missing, no pool created");
                    continue;
                };
                if pools.contains_key(&entry.kind) {
                    continue;
                }

                let pool = KindPool {
                    container: allocator.create_container(&entry.kind),
                    idle: SegQueue::new(),
                    live: AtomicUsize::new(0),
                    discarded: AtomicUsize::new(0),
                };
                let count = config.prewarm_count(entry.min_count);
                for _ in 0..count {
                    let slot =
                        allocate_slot(&allocator, &next_id, &pool, entry, template, pack(0, IDLE));
                    pool.idle.push(slot);
                }
                tracing::debug!(
                    kind = ?entry.kind,
                    category = %category.name,
                    count,
                    "pool pre-warmed"
                );
                pools.insert(entry.kind, pool);
            }
        }

        PoolRegistry {
            inner: Arc::new(Inner {
                allocator,
                catalog,
                config,
                pools,
                next_id,
            }),
        }
    }

    fn pool(&self, kind: K) -> PoolResult<&KindPool<K, A::Node>, K> {
        self.inner
            .pools
            .get(&kind)
            .ok_or(PoolError::UnknownPool { kind })
    }

    /// Acquires an instance of `kind`, logging and returning `None` when none
    /// can be handed out.
    ///
    /// Every acquire is fallible: a depleted pool that may not grow yields
    /// nothing.
    pub fn acquire(
        &self,
        kind: K,
        spawn: &Spawn<ParentOf<K, A>>,
    ) -> Option<Pooled<K, A::Node>> {
        self.try_acquire(kind, spawn).inspect_err(PoolError::log).ok()
    }

    /// Acquires an instance of `kind` and places it as `spawn` describes.
    ///
    /// The oldest idle instance is taken first. Idle instances found active
    /// are dropped from the queue. When the queue runs dry a new instance is
    /// created if the kind allows growth.
    pub fn try_acquire(
        &self,
        kind: K,
        spawn: &Spawn<ParentOf<K, A>>,
    ) -> PoolResult<Pooled<K, A::Node>, K> {
        let pool = self.pool(kind)?;
        let auto_release = match spawn.auto_release {
            Some(delay) => Some((runtime_handle(kind)?, delay)),
            None => None,
        };

        let lease = match self.take_idle(pool) {
            Some(lease) => lease,
            None => self.grow(kind, pool)?,
        };

        let node = lease.node();
        if let Some(canvas) = &spawn.canvas {
            node.set_parent(canvas, false);
        }
        if let Some(parent) = &spawn.parent {
            node.set_parent(parent, spawn.space == Space::World);
        }
        if let Some(position) = spawn.position {
            node.set_position(position, spawn.space);
        }
        node.reset_scale();
        node.set_active(true);

        if let Some(poolable) = lease.slot.poolable() {
            poolable.on_acquire();
        }

        if let Some((runtime, delay)) = auto_release {
            self.spawn_auto_release(&runtime, &lease, kind, delay);
        }
        Ok(lease)
    }

    fn take_idle(&self, pool: &KindPool<K, A::Node>) -> Option<Pooled<K, A::Node>> {
        while let Some(slot) = pool.idle.pop() {
            let word = slot.state.load(Ordering::Acquire);
            let (epoch, tag) = unpack(word);
            if tag == IDLE && !slot.node.is_active() {
                let next = epoch.wrapping_add(1) & EPOCH_MASK;
                if slot
                    .state
                    .compare_exchange(word, pack(next, ACQUIRED), Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return Some(Pooled { slot, epoch: next });
                }
            }

            slot.state.store(pack(epoch, DETACHED), Ordering::Release);
            pool.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                kind = ?slot.kind,
                instance = %slot.id,
                "discarding pooled instance that is already active"
            );
        }
        None
    }

    fn grow(&self, kind: K, pool: &KindPool<K, A::Node>) -> PoolResult<Pooled<K, A::Node>, K> {
        let (entry, template) = self
            .inner
            .catalog
            .source_entry(kind)
            .filter(|entry| entry.allow_grow)
            .and_then(|entry| Some((entry, entry.template.as_ref()?)))
            .ok_or(PoolError::Depleted { kind })?;

        let slot = allocate_slot(
            &self.inner.allocator,
            &self.inner.next_id,
            pool,
            entry,
            template,
            pack(1, ACQUIRED),
        );
        tracing::debug!(
            kind = ?kind,
            instance = %slot.id,
            live = pool.live.load(Ordering::Relaxed),
            "pool grew past its pre-warmed instances"
        );
        Ok(Pooled { slot, epoch: 1 })
    }

    /// Acquires an instance and looks up its `C` component.
    ///
    /// Logs and returns `None` when nothing can be acquired or the instance
    /// has no such component.
    pub fn acquire_component<C>(
        &self,
        kind: K,
        spawn: &Spawn<ParentOf<K, A>>,
    ) -> Option<(Pooled<K, A::Node>, C)>
    where
        A::Node: GetComponent<C>,
    {
        self.try_acquire_component(kind, spawn)
            .inspect_err(PoolError::log)
            .ok()
    }

    /// Acquires an instance and looks up its `C` component.
    ///
    /// An instance lacking the component goes straight back to its pool.
    pub fn try_acquire_component<C>(
        &self,
        kind: K,
        spawn: &Spawn<ParentOf<K, A>>,
    ) -> PoolResult<(Pooled<K, A::Node>, C), K>
    where
        A::Node: GetComponent<C>,
    {
        let lease = self.try_acquire(kind, spawn)?;
        match lease.node().get_component() {
            Some(component) => Ok((lease, component)),
            None => {
                if let Err(err) = self.try_release(&lease, kind, Space::World) {
                    err.log_release();
                }
                Err(PoolError::MissingComponent {
                    kind,
                    instance: lease.id(),
                    component: type_name::<C>(),
                })
            }
        }
    }

    /// Returns an instance to the pool of `kind`, logging instead of failing
    /// when the release is refused.
    pub fn release(&self, instance: &Pooled<K, A::Node>, kind: K, space: Space) {
        if let Err(err) = self.try_release(instance, kind, space) {
            err.log_release();
        }
    }

    /// Returns an instance to the pool of `kind`.
    ///
    /// The instance gets its release callback, is parented back under the
    /// kind's container, moved to the origin of `space`, has its rotation
    /// reset, is deactivated and queued at the tail. Each acquisition is
    /// released at most once.
    pub fn try_release(
        &self,
        instance: &Pooled<K, A::Node>,
        kind: K,
        space: Space,
    ) -> PoolResult<(), K> {
        let pool = self.pool(kind)?;
        let slot = &instance.slot;
        if slot.kind != kind {
            return Err(PoolError::WrongPool {
                expected: kind,
                actual: slot.kind,
                instance: slot.id,
            });
        }

        if let Err(word) = slot.state.compare_exchange(
            pack(instance.epoch, ACQUIRED),
            pack(instance.epoch, IDLE),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            let instance = slot.id;
            return Err(match unpack(word) {
                (_, ACQUIRED) => PoolError::StaleLease { kind, instance },
                _ => PoolError::NotAcquired { kind, instance },
            });
        }

        if let Some(poolable) = slot.poolable() {
            poolable.on_release();
        }
        let node = &slot.node;
        node.set_parent(&pool.container, true);
        node.set_position(Vec3::ZERO, space);
        node.reset_rotation();
        node.set_active(false);

        pool.idle.push(Arc::clone(slot));
        Ok(())
    }

    /// Counters of the pool for `kind`, if one was built.
    pub fn stats(&self, kind: K) -> Option<PoolStats> {
        let pool = self.inner.pools.get(&kind)?;
        let idle = pool.idle.len();
        let live = pool.live.load(Ordering::Relaxed);
        let discarded = pool.discarded.load(Ordering::Relaxed);
        Some(PoolStats {
            idle,
            acquired: live.saturating_sub(idle).saturating_sub(discarded),
            live,
            discarded,
        })
    }

    /// Number of idle instances queued for `kind`.
    pub fn idle_count(&self, kind: K) -> Option<usize> {
        self.inner.pools.get(&kind).map(|pool| pool.idle.len())
    }

    /// The container idle instances of `kind` live under.
    pub fn container(&self, kind: K) -> Option<&ParentOf<K, A>> {
        self.inner.pools.get(&kind).map(|pool| &pool.container)
    }

    /// Whether a pool was built for `kind`.
    pub fn contains(&self, kind: K) -> bool {
        self.inner.pools.contains_key(&kind)
    }

    /// Kinds that have a pool, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = K> + '_ {
        self.inner.pools.keys().copied()
    }

    /// The catalog the registry was built from.
    pub fn catalog(&self) -> &Catalog<K, A::Template> {
        &self.inner.catalog
    }

    /// The registry settings.
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// The host allocator.
    pub fn allocator(&self) -> &A {
        &self.inner.allocator
    }
}
