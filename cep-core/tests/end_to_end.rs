use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header::CONTENT_TYPE},
    routing::get,
};
use cep_core::{
    GatewayConfig, TemperatureConfig,
    api::{gateway, temperature},
    config::ServerConfig,
    server::serve_listener,
    telemetry::{self, TRACEPARENT},
};
use httpmock::prelude::*;
use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

const TRACE_PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_listener(listener, router, std::future::pending()));
    addr
}

fn temperature_config(cep_url: String, weather_url: String) -> TemperatureConfig {
    TemperatureConfig {
        cep_service_url: cep_url,
        weather_api_url: weather_url,
        weather_api_key: "test-key".to_string(),
        ..TemperatureConfig::default()
    }
}

async fn spawn_temperature(config: &TemperatureConfig) -> SocketAddr {
    spawn(temperature::router(config, Client::new())).await
}

async fn spawn_gateway(temperature_addr: SocketAddr) -> SocketAddr {
    let config = GatewayConfig {
        temperature_service_url: format!("http://{temperature_addr}"),
        ..GatewayConfig::default()
    };
    spawn(gateway::router(&config, Client::new())).await
}

async fn post_zipcode(gateway_addr: SocketAddr, body: &str) -> reqwest::Response {
    Client::new()
        .post(format!("http://{gateway_addr}/zipcode"))
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn valid_cep_returns_temperatures() {
    let upstream = MockServer::start_async().await;
    let address = upstream
        .mock_async(|when, then| {
            when.method(GET).path("/ws/01001000");
            then.status(200).json_body(json!({"cep": "01001-000", "localidade": "São Paulo", "uf": "SP"}));
        })
        .await;
    let weather = upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/current.json")
                .query_param("key", "test-key")
                .query_param("q", "sao paulo")
                .query_param("aqi", "no");
            then.status(200).json_body(json!({
                "location": {"name": "Sao Paulo"},
                "current": {"temp_c": 25.0, "last_updated_epoch": 1_700_000_000}
            }));
        })
        .await;

    let config = temperature_config(upstream.url("/ws"), upstream.url("/v1/current.json"));
    let gateway_addr = spawn_gateway(spawn_temperature(&config).await).await;

    let res = post_zipcode(gateway_addr, r#"{"cep":"01001000"}"#).await;

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"city": "São Paulo", "temp_C": 25.0, "temp_F": 77.0, "temp_K": 298.15}));
    address.assert_async().await;
    weather.assert_async().await;
}

#[tokio::test]
async fn invalid_cep_never_reaches_temperature_service() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let stub = Router::new().route(
        "/temperature/{cep}",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }
        }),
    );
    let gateway_addr = spawn_gateway(spawn(stub).await).await;

    let res = post_zipcode(gateway_addr, r#"{"cep":"123"}"#).await;

    assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"message": "invalid zipcode"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_cep_is_not_found_end_to_end() {
    let upstream = MockServer::start_async().await;
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/ws/99999999");
            then.status(200).json_body(json!({"erro": true}));
        })
        .await;

    let config = temperature_config(upstream.url("/ws"), upstream.url("/v1/current.json"));
    let temperature_addr = spawn_temperature(&config).await;

    let direct = reqwest::get(format!("http://{temperature_addr}/temperature/99999999")).await.unwrap();
    assert_eq!(direct.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(direct.text().await.unwrap(), "can not find zipcode");

    let gateway_addr = spawn_gateway(temperature_addr).await;
    let res = post_zipcode(gateway_addr, r#"{"cep":"99999999"}"#).await;

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"message": "error from service B"}));
}

#[tokio::test]
async fn address_provider_404_is_relayed_by_gateway() {
    let upstream = MockServer::start_async().await;
    let address = upstream
        .mock_async(|when, then| {
            when.method(GET).path("/ws/00000000");
            then.status(404).body("not found");
        })
        .await;
    let weather = upstream
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(200).json_body(json!({"current": {"temp_c": 25.0}}));
        })
        .await;

    let config = temperature_config(upstream.url("/ws"), upstream.url("/v1/current.json"));
    let temperature_addr = spawn_temperature(&config).await;

    let direct = reqwest::get(format!("http://{temperature_addr}/temperature/00000000")).await.unwrap();
    assert_eq!(direct.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(direct.text().await.unwrap(), "can not find zipcode");

    let gateway_addr = spawn_gateway(temperature_addr).await;
    let res = post_zipcode(gateway_addr, r#"{"cep":"00000000"}"#).await;

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"message": "error from service B"}));
    address.assert_calls_async(2).await;
    weather.assert_calls_async(0).await;
}

#[tokio::test]
async fn unreachable_weather_provider_is_not_found() {
    let upstream = MockServer::start_async().await;
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/ws/01001000");
            then.status(200).json_body(json!({"localidade": "São Paulo", "uf": "SP"}));
        })
        .await;

    let config =
        temperature_config(upstream.url("/ws"), "http://127.0.0.1:1/v1/current.json".to_string());
    let temperature_addr = spawn_temperature(&config).await;

    let res = reqwest::get(format!("http://{temperature_addr}/temperature/01001000")).await.unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "can not find zipcode");
}

#[tokio::test]
async fn slow_downstream_hits_request_timeout() {
    let stub = Router::new().route(
        "/temperature/{cep}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let temperature_addr = spawn(stub).await;

    let config = GatewayConfig {
        temperature_service_url: format!("http://{temperature_addr}"),
        server: ServerConfig { request_timeout_secs: 1, ..ServerConfig::default() },
        ..GatewayConfig::default()
    };
    let gateway_addr = spawn(gateway::router(&config, Client::new())).await;

    let res = post_zipcode(gateway_addr, r#"{"cep":"01001000"}"#).await;

    assert_eq!(res.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let config = GatewayConfig::default();
    let app = gateway::router(&config, Client::new());

    let req = Request::builder()
        .method("POST")
        .uri("/zipcode")
        .header("x-request-id", "req-42")
        .body(Body::from(r#"{"cep":"1"}"#))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.headers()["x-request-id"], "req-42");
}

#[tokio::test(flavor = "current_thread")]
async fn trace_context_reaches_temperature_service() {
    global::set_text_map_propagator(TraceContextPropagator::new());
    let provider = SdkTracerProvider::builder().build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("e2e")));
    let _guard = tracing::subscriber::set_default(subscriber);

    let seen: Arc<Mutex<Option<String>>> = Arc::default();
    let captured = seen.clone();
    let stub = Router::new().route(
        "/temperature/{cep}",
        get(move |headers: HeaderMap| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = telemetry::get_traceparent(&headers).map(str::to_string);
                Json(json!({"city": "São Paulo", "temp_C": 25.0, "temp_F": 77.0, "temp_K": 298.15}))
            }
        }),
    );
    let temperature_addr = spawn(stub).await;

    let config = GatewayConfig {
        temperature_service_url: format!("http://{temperature_addr}"),
        ..GatewayConfig::default()
    };
    let app = gateway::router(&config, Client::new());

    let req = Request::builder()
        .method("POST")
        .uri("/zipcode")
        .header(CONTENT_TYPE, "application/json")
        .header(TRACEPARENT, TRACE_PARENT)
        .body(Body::from(r#"{"cep":"01001000"}"#))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let forwarded = seen.lock().unwrap().clone().expect("traceparent forwarded");
    assert_eq!(telemetry::parse_trace_id(&forwarded), telemetry::parse_trace_id(TRACE_PARENT));
    assert_ne!(forwarded, TRACE_PARENT);
}
