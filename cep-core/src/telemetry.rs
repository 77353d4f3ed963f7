//! Logging and distributed tracing setup.
//!
//! Every process installs a W3C Trace Context propagator and an
//! OpenTelemetry tracer provider, so trace context travels between the
//! gateway and the temperature service even when no exporter is configured.
//! Spans are exported over OTLP only when an endpoint is set.

use anyhow::{Context as _, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    KeyValue, global,
    propagation::{Extractor, Injector},
    trace::TracerProvider as _,
};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{OtlpProtocol, TelemetryConfig};

/// W3C Trace Context header name.
pub const TRACEPARENT: &str = "traceparent";

/// Keeps the tracer provider alive; call [`TelemetryGuard::shutdown`] before
/// exiting so buffered spans are flushed.
#[derive(Debug)]
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "failed to flush spans on shutdown");
        }
    }
}

/// Install the global subscriber: env filter, fmt (text or JSON) and the
/// OpenTelemetry layer.
pub fn init(service_name: &str, cfg: &TelemetryConfig) -> Result<TelemetryGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let provider = build_tracer_provider(service_name, cfg)?;
    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(service_name.to_string());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let filter = EnvFilter::try_new(&cfg.log_filter)
        .with_context(|| format!("Invalid log filter: {}", cfg.log_filter))?;

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);
    if cfg.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    tracing::info!(
        service = service_name,
        otlp_endpoint = cfg.otlp_endpoint.as_deref().unwrap_or("none"),
        "telemetry initialized"
    );

    Ok(TelemetryGuard { provider })
}

fn build_tracer_provider(service_name: &str, cfg: &TelemetryConfig) -> Result<SdkTracerProvider> {
    let resource = Resource::builder_empty()
        .with_attributes([KeyValue::new("service.name", service_name.to_string())])
        .build();

    let mut builder = SdkTracerProvider::builder().with_resource(resource);

    if let Some(endpoint) = cfg.otlp_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        let exporter = match cfg.otlp_protocol {
            OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build(),
            OtlpProtocol::HttpProtobuf => opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .build(),
        }
        .with_context(|| format!("Failed to build OTLP exporter for {endpoint}"))?;

        builder = builder.with_batch_exporter(exporter);
    }

    Ok(builder.build())
}

struct HeadersExtractor<'a>(&'a HeaderMap);

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

struct HeadersInjector<'a>(&'a mut HeaderMap);

impl Injector for HeadersInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(val)) =
            (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value))
        {
            self.0.insert(name, val);
        }
    }
}

/// Make the trace context carried by `headers` the parent of `span`.
pub fn set_parent_from_headers(span: &Span, headers: &HeaderMap) {
    let parent_cx =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeadersExtractor(headers)));
    let _ = span.set_parent(parent_cx);

    if let Some(trace_id) = get_traceparent(headers).and_then(parse_trace_id) {
        span.record("trace_id", trace_id.as_str());
    }
}

/// Write the trace context of `span` into outbound `headers`.
pub fn inject_context(span: &Span, headers: &mut HeaderMap) {
    let cx = span.context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeadersInjector(headers));
    });
}

pub fn get_traceparent(headers: &HeaderMap) -> Option<&str> {
    headers.get(TRACEPARENT)?.to_str().ok()
}

/// Trace id of a `00-{trace_id}-{span_id}-{flags}` header.
pub fn parse_trace_id(traceparent: &str) -> Option<String> {
    let parts: Vec<&str> = traceparent.split('-').collect();
    if parts.len() == 4 && parts[0] == "00" && parts[1].len() == 32 {
        Some(parts[1].to_string())
    } else {
        None
    }
}
