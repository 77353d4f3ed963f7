//! HTTP surface of both services.

pub mod gateway;
pub mod temperature;

use std::time::Duration;

use axum::{Router, body::Body, http::Request, http::Response, http::StatusCode};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{Span, field::Empty};

use crate::telemetry;

/// Wrap `router` in the middleware stack shared by both services.
///
/// Outermost first: request id, request-id propagation, tracing (with the
/// inbound trace context as parent), panic recovery, request timeout.
pub fn apply_middleware(router: Router, service: &'static str, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");

                    let span = tracing::info_span!(
                        "http_request",
                        otel.name = %format!("{} {}", req.method(), req.uri().path()),
                        otel.kind = "server",
                        service,
                        method = %req.method(),
                        uri = %req.uri().path(),
                        request_id = %request_id,
                        status = Empty,
                        latency_ms = Empty,
                        trace_id = Empty,
                    );

                    telemetry::set_parent_from_headers(&span, req.headers());
                    span
                })
                .on_response(|res: &Response<Body>, latency: Duration, span: &Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis() as u64);
                    tracing::info!(parent: span, status = res.status().as_u16(), "request finished");
                }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
