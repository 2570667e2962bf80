use crate::{Poolable, Space, Vec3};

/// A trait defining the interface the registry uses to create pooled nodes.
///
/// The host application implements it on top of its scene graph: containers
/// are the organizational parents each kind's idle instances live under, and
/// nodes are cloned from templates described in the [`Catalog`].
///
/// [`Catalog`]: crate::Catalog
pub trait PoolAllocator<K>: Send + Sync + 'static {
    /// The prototype a node is cloned from.
    type Template: Send + Sync + 'static;

    /// The handle to a pooled node.
    type Node: PoolNode;

    /// Creates the container all instances of `kind` are parented under while
    /// they sit in the pool.
    fn create_container(&self, kind: &K) -> <Self::Node as PoolNode>::Parent;

    /// Creates a new node by cloning `template` under `container`.
    fn allocate(
        &self,
        template: &Self::Template,
        container: &<Self::Node as PoolNode>::Parent,
    ) -> Self::Node;

    /// Attaches the self-identifying marker to a freshly allocated node of a
    /// kind configured with `auto_destroy`.
    ///
    /// By default, this method does nothing.
    #[inline(always)]
    fn mark_auto_destroy(&self, _node: &Self::Node) {}
}

/// The capability set the registry needs from a scene node: it can be
/// activated, reparented and positioned.
///
/// Nodes are handles. Every method takes `&self` and clones refer to the same
/// underlying object, so the registry and the caller holding a lease see the
/// same state.
pub trait PoolNode: Clone + Send + Sync + 'static {
    /// The handle to a node other nodes can be parented under.
    type Parent: Clone + Send + Sync + 'static;

    /// Whether the node is currently active in the scene.
    fn is_active(&self) -> bool;

    /// Activates or deactivates the node.
    fn set_active(&self, active: bool);

    /// Moves the node under `parent`. With `keep_world_transform` the node
    /// keeps its world placement, otherwise its local transform is kept.
    fn set_parent(&self, parent: &Self::Parent, keep_world_transform: bool);

    /// Places the node in world or parent-local coordinates.
    fn set_position(&self, position: Vec3, space: Space);

    /// Resets the local rotation to identity.
    fn reset_rotation(&self);

    /// Resets the local scale to [`Vec3::ONE`].
    fn reset_scale(&self);

    /// Exposes the node's [`Poolable`] callbacks, if it has any.
    ///
    /// The registry asks once per node, when the node is allocated.
    #[inline(always)]
    fn as_poolable(&self) -> Option<&dyn Poolable> {
        None
    }
}

/// Typed capability lookup on a node, the equivalent of fetching a component
/// off a scene object.
pub trait GetComponent<C>: PoolNode {
    /// Returns the `C` attached to this node, if any.
    fn get_component(&self) -> Option<C>;
}
