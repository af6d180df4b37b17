use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{parse_endpoint, parse_expiration, required},
    model, types,
};

#[post("/subscribe")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    subscription: web::Json<types::Subscription>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let endpoint = required(subscription.endpoint.as_deref(), "endpoint")?;
    let keys = subscription.keys.as_ref();
    let p256dh = required(keys.and_then(|k| k.p256dh.as_deref()), "keys.p256dh")?;
    let auth = required(keys.and_then(|k| k.auth.as_deref()), "keys.auth")?;

    parse_endpoint(endpoint)?;
    let expiration = parse_expiration(subscription.expiration_time)?;

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|item| item.to_str().ok())
        .map(str::to_owned);

    let data = model::Subscription {
        expiration,
        user_agent,
        ..model::Subscription::new(endpoint, p256dh, auth)
    };

    state.registry.upsert(data).await?;
    info!("Subscription registered {}", endpoint);

    Ok(HttpResponse::Ok().json(Response { success: true }))
}

#[get("/subscribe")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
) -> Result<HttpResponse, Error> {
    let count = state.registry.count().await?;

    Ok(HttpResponse::Ok().json(CountResponse {
        success: true,
        count,
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub count: i64,
}
