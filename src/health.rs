use anyhow::Result;

use crate::store::MessageStore;

/// Verifies that the persistent store is reachable.
pub async fn health_check(store: &dyn MessageStore) -> Result<()> {
    store.ping().await
}
