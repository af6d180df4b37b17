use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::SerializedPayload;
use crate::{
    configuration::{Config, VapidKeys},
    error::Error,
    model::Subscription,
    provider::HTTP,
    types::{Claims, PushHeader, Urgency},
};

/// VAPID tokens may be valid for at most 24 hours.
const VAPID_TOKEN_LIFETIME: i64 = 12 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    None,
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub endpoint: String,
    pub success: bool,
    pub error_class: ErrorClass,
    pub status_code: Option<u16>,
}

impl DeliveryOutcome {
    pub fn delivered(endpoint: &str, status_code: u16) -> Self {
        DeliveryOutcome {
            endpoint: endpoint.to_owned(),
            success: true,
            error_class: ErrorClass::None,
            status_code: Some(status_code),
        }
    }

    pub fn failed(
        endpoint: &str,
        error_class: ErrorClass,
        status_code: Option<u16>,
    ) -> Self {
        DeliveryOutcome {
            endpoint: endpoint.to_owned(),
            success: false,
            error_class,
            status_code,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.error_class == ErrorClass::Permanent
    }
}

/// Sends one payload to one subscription.
///
/// Implementations never fail: every problem is reported through the
/// returned [`DeliveryOutcome`].
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &SerializedPayload,
    ) -> DeliveryOutcome;
}

/// Maps a push service status code to an error class. Only the configured
/// "gone" codes are permanent.
pub fn classify_status(status: u16, permanent_codes: &[u16]) -> ErrorClass {
    if (200..300).contains(&status) {
        return ErrorClass::None;
    }

    if permanent_codes.contains(&status) {
        return ErrorClass::Permanent;
    }

    ErrorClass::Transient
}

/// Web Push transport: VAPID authentication and aes128gcm payload encryption.
pub struct WebPush {
    http: HTTP,
    key: EncodingKey,
    public_key: String,
    mail_to: String,
    ttl: i64,
    urgency: Urgency,
    status_code_to_delete: Vec<u16>,
}

impl WebPush {
    pub fn new(
        config: &Config,
        vapid: &VapidKeys,
        http: HTTP,
    ) -> Result<Self, Error> {
        let key = EncodingKey::from_ec_pem(&vapid.private_key)?;

        Ok(WebPush {
            http,
            key,
            public_key: vapid.public_key.to_owned(),
            mail_to: config.mail_to.to_owned(),
            ttl: config.push_ttl,
            urgency: config.push_urgency,
            status_code_to_delete: config.status_code_to_delete.clone(),
        })
    }

    fn authorization(&self, endpoint: &Url) -> Result<String, Error> {
        let aud = vapid_audience(endpoint)?;
        let sub = format!("mailto:{}", &self.mail_to);
        let exp = Utc::now().timestamp() + VAPID_TOKEN_LIFETIME;

        let claims = Claims { aud, sub, exp };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.key)?;

        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }

    async fn try_send(
        &self,
        subscription: &Subscription,
        payload: &SerializedPayload,
    ) -> Result<u16, Error> {
        let url = Url::parse(&subscription.endpoint)?;
        let authorization = self.authorization(&url)?;

        let p256dh = BASE64_URL.decode(subscription.p256dh.trim_end_matches('='))?;
        let auth = BASE64_URL.decode(subscription.auth.trim_end_matches('='))?;
        let data = ece::encrypt(&p256dh, &auth, &payload.bytes)?;

        let push_header = PushHeader {
            ttl: self.ttl,
            urgency: self.urgency,
            topic: payload.topic.clone(),
        };

        self.http
            .post_push(url.as_str(), authorization, &push_header, data)
            .await
    }
}

#[async_trait]
impl DeliveryTransport for WebPush {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &SerializedPayload,
    ) -> DeliveryOutcome {
        let endpoint = subscription.endpoint.as_str();

        match self.try_send(subscription, payload).await {
            Ok(status) => match classify_status(status, &self.status_code_to_delete) {
                ErrorClass::None => {
                    debug!("Push delivered to {} ({})", endpoint, status);
                    DeliveryOutcome::delivered(endpoint, status)
                },
                class => {
                    warn!(
                        "Push to {} rejected with status {} ({:?})",
                        endpoint, status, class
                    );
                    DeliveryOutcome::failed(endpoint, class, Some(status))
                },
            },
            Err(e) => {
                warn!("Push to {} failed: {}", endpoint, e);
                DeliveryOutcome::failed(endpoint, ErrorClass::Transient, None)
            },
        }
    }
}

/// The VAPID `aud` claim is the origin of the push service.
fn vapid_audience(endpoint: &Url) -> Result<String, Error> {
    if endpoint.host().is_none() {
        return Err(Error::InvalidOption {
            option: String::from("host"),
        });
    }

    Ok(endpoint.origin().ascii_serialization())
}
