//! Subscription registry
//!
//! The registry is the only shared mutable state of the service. Every
//! operation touches a single row keyed by endpoint, so implementations need
//! per-row atomicity only.

use async_trait::async_trait;

use crate::{error::Error, model::Subscription};

pub use self::memory::MemoryRegistry;

mod memory;
mod postgre;

#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Inserts the subscription or replaces the keys of an existing row with
    /// the same endpoint. The original `created_at` is kept.
    async fn upsert(&self, subscription: Subscription) -> Result<(), Error>;

    /// Deletes by endpoint. Removing an unknown endpoint is not an error.
    async fn remove(&self, endpoint: &str) -> Result<(), Error>;

    async fn list_all(&self) -> Result<Vec<Subscription>, Error>;

    async fn count(&self) -> Result<i64, Error>;
}
