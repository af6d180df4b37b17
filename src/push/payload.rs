use chrono::{DateTime, Utc};

use crate::{
    configuration::Config,
    error::Error,
    types::{NotificationIntent, NotificationPayload, PayloadData},
};

/// Largest plaintext a single aes128gcm record can carry for Web Push
/// (4096 byte record, minus header, padding delimiter and tag).
pub const MAX_PAYLOAD_SIZE: usize = 3993;

/// Push services accept topics of at most 32 URL-safe characters.
const TOPIC_LENGTH: usize = 32;

/// A built notification together with its wire bytes.
#[derive(Debug, Clone)]
pub struct SerializedPayload {
    pub content: NotificationPayload,
    pub bytes: Vec<u8>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    pub icon: String,
    pub badge: String,
    pub default_url: String,
}

impl PayloadBuilder {
    pub fn new(config: &Config) -> Self {
        PayloadBuilder {
            icon: config.notification_icon.to_owned(),
            badge: config.notification_badge.to_owned(),
            default_url: config.notification_default_url.to_owned(),
        }
    }

    pub fn build(
        &self,
        intent: &NotificationIntent,
        at: DateTime<Utc>,
    ) -> Result<SerializedPayload, Error> {
        let (title, body) = validate(intent)?;

        let timestamp = at.timestamp_millis();
        let correlation_id = intent.correlation_id.as_ref().map(|c| c.to_string());

        let tag = match &correlation_id {
            Some(id) => format!("topic-{}", id),
            None => format!("notification-{}", timestamp),
        };

        let url = match intent.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_owned(),
            _ => self.default_url.to_owned(),
        };

        let topic = correlation_id
            .as_ref()
            .map(|_| sha256::digest(tag.as_str())[..TOPIC_LENGTH].to_owned());

        let content = NotificationPayload {
            title: title.to_owned(),
            body: body.to_owned(),
            icon: self.icon.to_owned(),
            badge: self.badge.to_owned(),
            tag,
            data: PayloadData {
                url,
                correlation_id,
                timestamp,
            },
        };

        let bytes = serde_json::to_vec(&content)?;

        if bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::ValidationError(format!(
                "notification payload is {} bytes, limit is {}",
                bytes.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        Ok(SerializedPayload {
            content,
            bytes,
            topic,
        })
    }
}

/// Checks that title and body are present, returning them trimmed.
pub fn validate(intent: &NotificationIntent) -> Result<(&str, &str), Error> {
    let title = intent.title.trim();
    let body = intent.body.trim();

    if title.is_empty() {
        return Err(Error::ValidationError(String::from("title is required")));
    }

    if body.is_empty() {
        return Err(Error::ValidationError(String::from("body is required")));
    }

    Ok((title, body))
}
