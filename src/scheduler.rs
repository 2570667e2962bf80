use crate::{
    error::{PoolError, PoolResult},
    PoolAllocator, PoolKey, PoolRegistry, Pooled, Space,
};
use core::time::Duration;
use tokio::runtime::Handle;

/// Handle of the tokio runtime the caller is running on.
pub(crate) fn runtime_handle<K: PoolKey>(kind: K) -> PoolResult<Handle, K> {
    Handle::try_current().map_err(|_| PoolError::NoRuntime { kind })
}

impl<K: PoolKey, A: PoolAllocator<K>> PoolRegistry<K, A> {
    /// Releases `instance` back to the pool of `kind` once `delay` has
    /// elapsed, in world space.
    ///
    /// The release runs as a task on the current tokio runtime and cannot be
    /// cancelled. If the lease was released by other means before it fires,
    /// the scheduled release is skipped, even when the instance has been
    /// acquired again in the meantime.
    pub fn schedule_auto_release(
        &self,
        instance: &Pooled<K, A::Node>,
        kind: K,
        delay: Duration,
    ) -> PoolResult<(), K> {
        let runtime = runtime_handle(kind)?;
        self.spawn_auto_release(&runtime, instance, kind, delay);
        Ok(())
    }

    pub(crate) fn spawn_auto_release(
        &self,
        runtime: &Handle,
        instance: &Pooled<K, A::Node>,
        kind: K,
        delay: Duration,
    ) {
        let registry = self.clone();
        let instance = instance.clone();

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match registry.try_release(&instance, kind, Space::World) {
                Ok(()) => {
                    tracing::debug!(kind = ?kind, instance = %instance.id(), "auto-released");
                }
                Err(err @ (PoolError::NotAcquired { .. } | PoolError::StaleLease { .. })) => {
                    tracing::debug!(kind = ?kind, instance = %instance.id(), "auto-release skipped: {err}");
                }
                Err(err) => err.log_release(),
            }
        });
    }
}
