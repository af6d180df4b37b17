use chrono::{DateTime, Utc};
use url::Url;

use crate::error::Error;

/// Returns the trimmed value, or a validation error naming `field` when it is
/// missing or blank.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, Error> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::ValidationError(format!("{} is required", field))),
    }
}

/// Push endpoints are absolute http(s) URLs issued by the browser's push
/// service.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, Error> {
    let url = Url::parse(endpoint).map_err(|e| {
        Error::ValidationError(format!("endpoint is not a valid url: {}", e))
    })?;

    match url.scheme() {
        "https" | "http" if url.host().is_some() => Ok(url),
        _ => Err(Error::ValidationError(String::from(
            "endpoint must be an http(s) url",
        ))),
    }
}

/// Converts a browser `expirationTime` (milliseconds since epoch).
pub fn parse_expiration(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, Error> {
    let Some(ms) = ms else {
        return Ok(None);
    };

    let at = DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        Error::DecodeDateTimeError(format!("Subscription date parse {}", ms))
    })?;

    Ok(Some(at))
}
