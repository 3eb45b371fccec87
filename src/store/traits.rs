use crate::store::Dataset;

/// Access to the entity store. Reads see a consistent view; writes run
/// exclusively, so a version check made inside `write` holds until the
/// closure returns.
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    /// Run a read-only query against the current state
    async fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&Dataset) -> T + Send + 'static,
        T: Send + 'static;

    /// Run a mutation with exclusive access to the state
    async fn write<T, F>(&self, mutation: F) -> T
    where
        F: FnOnce(&mut Dataset) -> T + Send + 'static,
        T: Send + 'static;
}

pub trait Store: EntityStore + 'static {}
impl<T: EntityStore + 'static> Store for T {}
