use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    push::{validate, DispatchSummary},
    types::NotificationIntent,
};

/// Broadcasts the notification to every registered subscription. Per-endpoint
/// delivery failures are reported in `results`, not as an error.
#[post("/send")]
pub async fn index(
    state: web::Data<AppState<State>>,
    intent: web::Json<NotificationIntent>,
) -> Result<HttpResponse, Error> {
    validate(&intent)?;

    let dispatcher = state.dispatcher.as_ref().ok_or_else(|| {
        Error::ConfigurationError(String::from("push credentials are not configured"))
    })?;

    let summary = dispatcher.dispatch_detached(intent.into_inner()).await?;

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        message: format!(
            "Notification sent to {} of {} subscriptions",
            summary.successful, summary.total
        ),
        results: Results::from(&summary),
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    pub message: String,
    pub results: Results,
}

#[derive(Debug, Serialize)]
pub struct Results {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

impl From<&DispatchSummary> for Results {
    fn from(summary: &DispatchSummary) -> Self {
        Results {
            successful: summary.successful,
            failed: summary.failed,
            total: summary.total,
        }
    }
}
