use parking_lot::RwLock;

use crate::store::traits::EntityStore;
use crate::store::Dataset;

/// Process-local store holding the whole dataset behind one lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    dataset: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new(max_changeset_elements: u64) -> Self {
        Self::with_dataset(Dataset::new(max_changeset_elements))
    }

    /// Wrap an already populated dataset, e.g. one built from fixtures
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: RwLock::new(dataset),
        }
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryStore {
    async fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&Dataset) -> T + Send + 'static,
        T: Send + 'static,
    {
        let dataset = self.dataset.read();
        query(&dataset)
    }

    async fn write<T, F>(&self, mutation: F) -> T
    where
        F: FnOnce(&mut Dataset) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut dataset = self.dataset.write();
        mutation(&mut dataset)
    }
}
