use super::QueryResult;
use crate::model::{Subscription, Table};
use sqlx::error::Error;

impl Table<Subscription> {
    pub async fn insert_or_replace(
        &self,
        subscription: &Subscription,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO subscription (endpoint, p256dh, auth, expiration, user_agent, created_at)
            VALUES($1, $2, $3, $4, $5, $6)
            ON CONFLICT (endpoint) DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                expiration = EXCLUDED.expiration,
                user_agent = EXCLUDED.user_agent
            "#,
        )
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(subscription.expiration)
        .bind(&subscription.user_agent)
        .bind(subscription.created_at)
        .execute(&self.pool)
        .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM subscription WHERE endpoint=$1
            "#,
        )
        .bind(endpoint)
        .execute(&self.pool)
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT
                endpoint, p256dh, auth, expiration, user_agent, created_at
            FROM "subscription"
            "#,
        )
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    pub async fn get_count(&self) -> Result<i64, Error> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*)
            FROM "subscription"
            "#,
        )
        .persistent(true)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }
}
