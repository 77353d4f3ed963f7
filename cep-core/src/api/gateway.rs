//! Validation gateway: `POST /zipcode`.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::Client;
use tracing::{Instrument, Span, error, field::Empty, info, info_span, warn};

use crate::{
    cep::Cep,
    config::GatewayConfig,
    error::GatewayError,
    model::{ErrorMessage, PostalCodeRequest, TemperatureResult},
    telemetry,
};

/// Immutable per-process state of the gateway.
#[derive(Debug, Clone)]
pub struct GatewayState {
    http: Client,
    temperature_service_url: String,
}

impl GatewayState {
    pub fn new(http: Client, temperature_service_url: impl Into<String>) -> Self {
        let url = temperature_service_url.into().trim_end_matches('/').to_string();
        Self { http, temperature_service_url: url }
    }

    pub fn from_config(config: &GatewayConfig, http: Client) -> Self {
        Self::new(http, config.temperature_service_url.clone())
    }

    fn temperature_url(&self, cep: &Cep) -> String {
        format!("{}/temperature/{}", self.temperature_service_url, cep)
    }
}

/// Router with the gateway route and the shared middleware stack.
pub fn router(config: &GatewayConfig, http: Client) -> Router {
    let state = GatewayState::from_config(config, http);
    super::apply_middleware(routes(state), "zip-code-validation", config.server.request_timeout())
}

/// Bare routes, without middleware.
pub fn routes(state: GatewayState) -> Router {
    Router::new().route("/zipcode", post(zipcode_handler)).with_state(Arc::new(state))
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorMessage::new(self.to_string()))).into_response()
    }
}

async fn zipcode_handler(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<TemperatureResult>, GatewayError> {
    let span = info_span!(
        "validate zipcode",
        zip_code = Empty,
        otel.status_code = Empty,
    );

    let result = forward(&state, &body).instrument(span.clone()).await;
    span.record("otel.status_code", if result.is_ok() { "OK" } else { "ERROR" });
    result.map(Json)
}

async fn forward(state: &GatewayState, body: &[u8]) -> Result<TemperatureResult, GatewayError> {
    let request = PostalCodeRequest::from_json(body).map_err(|e| {
        info!(error = %e, "rejecting undecodable request body");
        GatewayError::MalformedRequest
    })?;

    Span::current().record("zip_code", request.cep.as_str());

    let cep = Cep::try_from(request.cep.as_str()).map_err(|e| {
        info!(error = %e, "rejecting invalid zip code");
        GatewayError::InvalidZipcode
    })?;

    let url = state.temperature_url(&cep);
    let call_span = info_span!(
        "call temperature service",
        otel.kind = "client",
        url = %url,
        http.status_code = Empty,
    );

    let mut headers = HeaderMap::new();
    telemetry::inject_context(&call_span, &mut headers);

    let res = state
        .http
        .get(&url)
        .headers(headers)
        .send()
        .instrument(call_span.clone())
        .await
        .map_err(|e| {
            warn!(parent: &call_span, error = %e, "temperature service unreachable");
            GatewayError::Unreachable
        })?;

    let status = res.status();
    call_span.record("http.status_code", status.as_u16());

    if !status.is_success() {
        warn!(%status, "temperature service returned an error");
        return Err(GatewayError::Upstream(status));
    }

    let bytes = res.bytes().instrument(call_span).await.map_err(|e| {
        error!(error = %e, "failed to read temperature service response");
        GatewayError::UndecodableResponse
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        error!(error = %e, "failed to decode temperature service response");
        GatewayError::UndecodableResponse
    })
}
