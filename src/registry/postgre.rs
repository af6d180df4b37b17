use async_trait::async_trait;

use super::SubscriptionRegistry;
use crate::{
    error::Error,
    model::{Subscription, Table},
};

fn storage_error(error: sqlx::Error) -> Error {
    Error::StorageError(error.to_string())
}

#[async_trait]
impl SubscriptionRegistry for Table<Subscription> {
    async fn upsert(&self, subscription: Subscription) -> Result<(), Error> {
        self.insert_or_replace(&subscription)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn remove(&self, endpoint: &str) -> Result<(), Error> {
        self.delete(endpoint).await.map_err(storage_error)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscription>, Error> {
        self.get_all().await.map_err(storage_error)
    }

    async fn count(&self) -> Result<i64, Error> {
        self.get_count().await.map_err(storage_error)
    }
}
