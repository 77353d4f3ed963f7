use std::path::PathBuf;

use cep_core::{
    TemperatureConfig,
    api::temperature,
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
/// Flags and environment variables win over the `--config` file, which wins
/// over the built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "cep-temperature", version, about = "Temperature by Brazilian postal code")]
pub struct Cli {
    /// TOML file with the service configuration.
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Base URL of the address lookup service; `/<cep>` is appended.
    #[arg(long, env = "CEP_SERVICE_URL")]
    pub cep_service_url: Option<String>,

    #[arg(long, env = "WEATHER_API_URL")]
    pub weather_api_url: Option<String>,

    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_PROTOCOL")]
    pub otlp_protocol: Option<OtlpProtocol>,

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
            cep_service_url = %config.cep_service_url,
            weather_api_url = %config.weather_api_url,
            "starting temperature service"
        );

        let http = build_http_client(config.server.connect_timeout())?;
        let router = temperature::router(&config, http);
        let result = server::serve(router, &config.server.bind_addr()).await;

        guard.shutdown();
        result
    }

    fn load_config(&self) -> anyhow::Result<TemperatureConfig> {
        let mut config = match &self.config {
            Some(path) => TemperatureConfig::load(path)?,
            None => TemperatureConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut TemperatureConfig) {
        if let Some(name) = &self.service_name {
            config.service_name = name.clone();
        }
        if let Some(url) = &self.cep_service_url {
            config.cep_service_url = url.clone();
        }
        if let Some(url) = &self.weather_api_url {
            config.weather_api_url = url.clone();
        }
        if let Some(key) = &self.weather_api_key {
            config.weather_api_key = key.clone();
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
