/// Lifecycle callbacks for nodes that need to prepare or tidy up when they
/// leave or re-enter their pool.
///
/// Implementing it is optional, a node opts in through
/// [`PoolNode::as_poolable`](crate::PoolNode::as_poolable).
pub trait Poolable {
    /// Called once per acquisition, after the node has been placed and
    /// activated.
    fn on_acquire(&self);

    /// Called once per release, before the node is reparented and
    /// deactivated.
    fn on_release(&self);
}
