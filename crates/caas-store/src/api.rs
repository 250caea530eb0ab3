use crate::domain::types::Counter;
use crate::error::Result;
use crate::store::counter::CounterStore;
use crate::store::traits::CounterSession;

#[async_trait::async_trait]
pub trait CounterService: Send + Sync {
    /// Increments `name` by one and reads back its new value.
    async fn increment_and_get(&self, name: &str) -> Result<Counter>;
}

#[async_trait::async_trait]
impl<S: CounterSession> CounterService for CounterStore<S> {
    async fn increment_and_get(&self, name: &str) -> Result<Counter> {
        self.increment_counter(name).await
    }
}
