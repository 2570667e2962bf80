#![allow(dead_code)]

use prefab_pool::*;
use serde::Deserialize;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ItemKind {
    QuestItem,
    AchievementItem,
    RewardDisplayItem,
    TimingOfferRewardItem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prefab {
    pub name: String,
    #[serde(default)]
    pub poolable: bool,
    #[serde(default)]
    pub label: Option<String>,
}

impl Prefab {
    pub fn new(name: &str) -> Self {
        Prefab {
            name: name.to_owned(),
            poolable: false,
            label: None,
        }
    }

    pub fn poolable(mut self) -> Self {
        self.poolable = true;
        self
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Acquire,
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label(pub String);

#[derive(Debug)]
struct NodeState {
    prefab: Prefab,
    active: AtomicBool,
    auto_destroy: AtomicBool,
    parent: Mutex<(Container, bool)>,
    position: Mutex<(Vec3, Space)>,
    rotation_resets: AtomicUsize,
    scale_resets: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

/// A scene node handle backed by shared state.
#[derive(Debug, Clone)]
pub struct Node(Arc<NodeState>);

impl Node {
    pub fn prefab(&self) -> &Prefab {
        &self.0.prefab
    }

    /// Activates the node behind the pool's back.
    pub fn force_active(&self) {
        self.0.active.store(true, Ordering::SeqCst);
    }

    pub fn parent(&self) -> Container {
        self.0.parent.lock().unwrap().0.clone()
    }

    pub fn kept_world_transform(&self) -> bool {
        self.0.parent.lock().unwrap().1
    }

    pub fn position(&self) -> (Vec3, Space) {
        *self.0.position.lock().unwrap()
    }

    pub fn rotation_resets(&self) -> usize {
        self.0.rotation_resets.load(Ordering::SeqCst)
    }

    pub fn scale_resets(&self) -> usize {
        self.0.scale_resets.load(Ordering::SeqCst)
    }

    pub fn has_auto_destroy(&self) -> bool {
        self.0.auto_destroy.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.calls.lock().unwrap().clone()
    }
}

impl Poolable for NodeState {
    fn on_acquire(&self) {
        self.calls.lock().unwrap().push(Call::Acquire);
    }

    fn on_release(&self) {
        self.calls.lock().unwrap().push(Call::Release);
    }
}

impl PoolNode for Node {
    type Parent = Container;

    fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }

    fn set_active(&self, active: bool) {
        self.0.active.store(active, Ordering::SeqCst);
    }

    fn set_parent(&self, parent: &Container, keep_world_transform: bool) {
        *self.0.parent.lock().unwrap() = (parent.clone(), keep_world_transform);
    }

    fn set_position(&self, position: Vec3, space: Space) {
        *self.0.position.lock().unwrap() = (position, space);
    }

    fn reset_rotation(&self) {
        self.0.rotation_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_scale(&self) {
        self.0.scale_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn as_poolable(&self) -> Option<&dyn Poolable> {
        if self.0.prefab.poolable {
            Some(&*self.0)
        } else {
            None
        }
    }
}

impl GetComponent<Label> for Node {
    fn get_component(&self) -> Option<Label> {
        self.0.prefab.label.clone().map(Label)
    }
}

/// Allocates [`Node`]s and counts how many it made.
#[derive(Debug, Default)]
pub struct TestScene {
    allocated: AtomicUsize,
}

impl TestScene {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }
}

impl PoolAllocator<ItemKind> for TestScene {
    type Template = Prefab;
    type Node = Node;

    fn create_container(&self, kind: &ItemKind) -> Container {
        Container(format!("Pool_{kind:?}"))
    }

    fn allocate(&self, template: &Prefab, container: &Container) -> Node {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Node(Arc::new(NodeState {
            prefab: template.clone(),
            // Freshly cloned nodes start out active, like engine instances do.
            active: AtomicBool::new(true),
            auto_destroy: AtomicBool::new(false),
            parent: Mutex::new((container.clone(), true)),
            position: Mutex::new((Vec3::ZERO, Space::World)),
            rotation_resets: AtomicUsize::new(0),
            scale_resets: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }))
    }

    fn mark_auto_destroy(&self, node: &Node) {
        node.0.auto_destroy.store(true, Ordering::SeqCst);
    }
}

pub type Registry = PoolRegistry<ItemKind, TestScene>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Log output collected by [`capture_logs`].
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Routes every event on the current thread into the returned buffer until
/// the guard is dropped.
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}

pub fn catalog(entries: Vec<SourceEntry<ItemKind, Prefab>>) -> Catalog<ItemKind, Prefab> {
    Catalog::new(vec![Category::new("UI", entries)])
}

/// A registry over `entries` whose pools are pre-warmed with exactly
/// `max(min_count, floor)` instances.
pub fn registry(entries: Vec<SourceEntry<ItemKind, Prefab>>, floor: usize) -> Registry {
    init_tracing();
    PoolRegistry::with_config(
        catalog(entries),
        TestScene::default(),
        RegistryConfig {
            default_pool_size: floor,
        },
    )
}
