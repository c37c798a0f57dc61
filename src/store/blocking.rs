//! Bridging the synchronous store API into async callers

use super::traits::{StagingStore, StoreError, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Run a store call on the blocking pool, bounded by `timeout`.
///
/// A timeout or a panicked call surfaces as `StoreError::Connectivity`;
/// the blocking call itself is left to finish in the background.
pub async fn call_with_timeout<T, F>(
    store: &Arc<dyn StagingStore>,
    timeout: Duration,
    call: F,
) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn StagingStore) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let task = tokio::task::spawn_blocking(move || call(store.as_ref()));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(StoreError::Connectivity(format!("store call failed: {}", join))),
        Err(_) => Err(StoreError::Connectivity(format!(
            "store call timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Run a store call that must not be abandoned, such as a write.
///
/// Past `timeout` the call is logged as slow and still awaited, so the
/// caller always sees what the store actually did.
pub async fn call_to_completion<T, F>(
    store: &Arc<dyn StagingStore>,
    timeout: Duration,
    call: F,
) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn StagingStore) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let mut task = tokio::task::spawn_blocking(move || call(store.as_ref()));

    let joined = match tokio::time::timeout(timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "store call exceeded its timeout; waiting for it to finish"
            );
            task.await
        }
    };
    joined.map_err(|join| StoreError::Connectivity(format!("store call failed: {}", join)))?
}
