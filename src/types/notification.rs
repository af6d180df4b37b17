use std::fmt;

use serde::{Deserialize, Serialize};

/// A request to notify every subscriber, e.g. after a game state change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIntent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

impl NotificationIntent {
    pub fn new(title: &str, body: &str) -> Self {
        NotificationIntent {
            title: title.to_owned(),
            body: body.to_owned(),
            ..Default::default()
        }
    }
}

/// Topic identifier for a notification. Game ids arrive either as numbers or
/// strings depending on the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CorrelationId::Number(value) => write!(f, "{}", value),
            CorrelationId::Text(value) => write!(f, "{}", value),
        }
    }
}

/// Notification as delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: PayloadData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadData {
    pub url: String,
    pub correlation_id: Option<String>,
    pub timestamp: i64,
}
