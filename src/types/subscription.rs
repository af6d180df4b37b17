use serde::Deserialize;

/// Body of `POST /notifications/subscribe`, the browser's `PushSubscription`
/// serialized with `toJSON()`.
///
/// Every field is optional at the serde level so missing values surface as a
/// validation error with the service's error body instead of an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, alias = "expirationTime")]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub keys: Option<Keys>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Keys {
    #[serde(default)]
    pub p256dh: Option<String>,
    #[serde(default)]
    pub auth: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Unsubscribe {
    #[serde(default)]
    pub endpoint: Option<String>,
}
