//! Temperature service: `GET /temperature/{cep}`.

use std::{error::Error as _, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{cep::CEP_LEN, config::TemperatureConfig, resolver::TemperatureResolver};

const INVALID_ZIPCODE: &str = "invalid zipcode";
const ZIPCODE_NOT_FOUND: &str = "can not find zipcode";

#[derive(Debug, Clone)]
pub struct TemperatureState {
    resolver: TemperatureResolver,
}

impl TemperatureState {
    pub fn new(resolver: TemperatureResolver) -> Self {
        Self { resolver }
    }
}

/// Router with the temperature route and the shared middleware stack.
pub fn router(config: &TemperatureConfig, http: Client) -> Router {
    let state = TemperatureState::new(TemperatureResolver::from_config(config, http));
    super::apply_middleware(routes(state), "temperature", config.server.request_timeout())
}

/// Bare routes, without middleware.
pub fn routes(state: TemperatureState) -> Router {
    Router::new()
        .route("/temperature/{cep}", get(temperature_handler))
        .route("/temperature/", get(missing_cep_handler))
        .with_state(Arc::new(state))
}

async fn missing_cep_handler() -> Response {
    (StatusCode::BAD_REQUEST, INVALID_ZIPCODE).into_response()
}

async fn temperature_handler(
    State(state): State<Arc<TemperatureState>>,
    cep: Result<Path<String>, PathRejection>,
) -> Response {
    let Ok(Path(cep)) = cep else {
        debug!("rejecting undecodable zip code path segment");
        return (StatusCode::BAD_REQUEST, INVALID_ZIPCODE).into_response();
    };

    // Only the length is checked here; the gateway owns full validation.
    if cep.is_empty() || cep.chars().count() != CEP_LEN {
        debug!(%cep, "rejecting zip code with wrong length");
        return (StatusCode::BAD_REQUEST, INVALID_ZIPCODE).into_response();
    }

    match state.resolver.resolve(&cep).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            let cause = err.source().map(ToString::to_string).unwrap_or_default();
            warn!(%cep, error = %err, %cause, "could not resolve temperature");
            (StatusCode::NOT_FOUND, ZIPCODE_NOT_FOUND).into_response()
        }
    }
}
