use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::required,
    types,
};

/// Removing an endpoint that is not registered is still a success.
#[post("/unsubscribe")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<types::Unsubscribe>,
) -> Result<HttpResponse, Error> {
    let endpoint = required(data.endpoint.as_deref(), "endpoint")?;

    state.registry.remove(endpoint).await?;
    info!("Subscription removed {}", endpoint);

    Ok(HttpResponse::Ok().json(Response { success: true }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
}
