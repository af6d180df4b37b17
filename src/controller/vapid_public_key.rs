use actix_web::{get, web, HttpResponse, Result};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
};

#[get("/vapid-public-key")]
pub async fn index(
    state: web::Data<AppState<State>>,
) -> Result<HttpResponse, Error> {
    let vapid = state.config.vapid.as_ref().ok_or_else(|| {
        Error::ConfigurationError(String::from("push credentials are not configured"))
    })?;

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        public_key: vapid.public_key.to_owned(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    pub public_key: String,
}
