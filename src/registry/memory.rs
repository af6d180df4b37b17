use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SubscriptionRegistry;
use crate::{error::Error, model::Subscription};

/// Process-local registry. Used when no `DATABASE_URL` is configured and as
/// the registry in tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    items: RwLock<HashMap<String, Subscription>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, endpoint: &str) -> bool {
        self.items.read().await.contains_key(endpoint)
    }

    pub async fn get(&self, endpoint: &str) -> Option<Subscription> {
        self.items.read().await.get(endpoint).cloned()
    }
}

#[async_trait]
impl SubscriptionRegistry for MemoryRegistry {
    async fn upsert(&self, subscription: Subscription) -> Result<(), Error> {
        let mut items = self.items.write().await;
        match items.get_mut(&subscription.endpoint) {
            Some(existing) => {
                existing.p256dh = subscription.p256dh;
                existing.auth = subscription.auth;
                existing.expiration = subscription.expiration;
                existing.user_agent = subscription.user_agent;
            },
            None => {
                items.insert(subscription.endpoint.to_owned(), subscription);
            },
        }
        Ok(())
    }

    async fn remove(&self, endpoint: &str) -> Result<(), Error> {
        self.items.write().await.remove(endpoint);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscription>, Error> {
        let items = self.items.read().await;
        Ok(items.values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, Error> {
        let items = self.items.read().await;
        Ok(i64::try_from(items.len()).unwrap_or(i64::MAX))
    }
}
