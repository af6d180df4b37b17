use std::{str::FromStr, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};

use crate::{configuration::Config, error::Error, types::PushHeader};

const USER_AGENT: &str = "league-notifier";

#[derive(Debug, Clone)]
pub struct HTTP {
    client: Client,
}

impl HTTP {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(HTTP { client })
    }

    /// Posts an encrypted Web Push message and returns the push service's
    /// status code.
    pub async fn post_push(
        &self,
        url: &str,
        authorization: String,
        push_header: &PushHeader,
        data: Vec<u8>,
    ) -> Result<u16, Error> {
        let mut header_map = HeaderMap::new();

        header_map.insert(
            HeaderName::from_str("user-agent")?,
            HeaderValue::from_str(USER_AGENT)?,
        );
        header_map.insert(
            HeaderName::from_str("authorization")?,
            HeaderValue::from_str(authorization.as_str())?,
        );
        header_map.insert(
            HeaderName::from_str("content-encoding")?,
            HeaderValue::from_str("aes128gcm")?,
        );
        header_map.insert(
            HeaderName::from_str("content-type")?,
            HeaderValue::from_str("application/octet-stream")?,
        );
        header_map.insert(
            HeaderName::from_str("ttl")?,
            HeaderValue::from_str(&push_header.ttl.to_string())?,
        );
        header_map.insert(
            HeaderName::from_str("urgency")?,
            HeaderValue::from_str(&push_header.urgency.to_string())?,
        );

        if let Some(topic) = &push_header.topic {
            header_map.insert(
                HeaderName::from_str("topic")?,
                HeaderValue::from_str(topic)?,
            );
        }

        let data = self
            .client
            .post(url)
            .headers(header_map)
            .body(data)
            .send()
            .await?;
        let status = data.status().as_u16();

        Ok(status)
    }
}
