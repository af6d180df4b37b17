use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One registered push channel, keyed by `endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub expiration: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(endpoint: &str, p256dh: &str, auth: &str) -> Self {
        Subscription {
            endpoint: endpoint.to_owned(),
            p256dh: p256dh.to_owned(),
            auth: auth.to_owned(),
            expiration: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }
}
