use std::path::PathBuf;

use cep_core::{
    GatewayConfig,
    api::gateway,
    config::OtlpProtocol,
    provider::build_http_client,
    server, telemetry,
};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI struct.
///
/// Every setting can come from a flag or an environment variable; both win
/// over the `--config` file, which wins over the built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "cep-gateway", version, about = "Postal code validation gateway")]
pub struct Cli {
    /// TOML file with the gateway configuration.
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Name reported in logs and traces.
    #[arg(long, env = "SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Base URL of the temperature service.
    #[arg(long, env = "TEMPERATURE_SERVICE_URL")]
    pub temperature_service_url: Option<String>,

    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Upper bound for handling one request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Connect timeout for calls to the temperature service, in seconds.
    #[arg(long, env = "CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,

    /// OTLP collector endpoint; spans are not exported when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// `grpc` or `http/protobuf`.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_PROTOCOL")]
    pub otlp_protocol: Option<OtlpProtocol>,

    /// Log filter directives, e.g. `info,cep_core=debug`.
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        let guard = telemetry::init(&config.service_name, &config.telemetry)?;
        tracing::info!(
            service = %config.service_name,
            temperature_service_url = %config.temperature_service_url,
            "starting gateway"
        );

        let http = build_http_client(config.server.connect_timeout())?;
        let router = gateway::router(&config, http);
        let result = server::serve(router, &config.server.bind_addr()).await;

        guard.shutdown();
        result
    }

    fn load_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)?,
            None => GatewayConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(name) = &self.service_name {
            config.service_name = name.clone();
        }
        if let Some(url) = &self.temperature_service_url {
            config.temperature_service_url = url.clone();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.server.request_timeout_secs = secs;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.server.connect_timeout_secs = secs;
        }
        if let Some(endpoint) = &self.otlp_endpoint {
            config.telemetry.otlp_endpoint = Some(endpoint.clone());
        }
        if let Some(protocol) = self.otlp_protocol {
            config.telemetry.otlp_protocol = protocol;
        }
        if let Some(filter) = &self.log_filter {
            config.telemetry.log_filter = filter.clone();
        }
        if let Some(format) = self.log_format {
            config.telemetry.json_logs = format == LogFormat::Json;
        }
    }
}
