use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr, time::Duration};

use crate::error::ConfigError;

/// Listener and timeout settings shared by both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Ceiling applied to every inbound request.
    pub request_timeout_secs: u64,
    /// Connect timeout of the outbound HTTP client.
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid { field: "port", reason: "must be > 0".into() });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// Wire protocol of the OTLP span exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtlpProtocol {
    #[default]
    #[serde(rename = "grpc")]
    Grpc,
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
}

impl OtlpProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtlpProtocol::Grpc => "grpc",
            OtlpProtocol::HttpProtobuf => "http/protobuf",
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtlpProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grpc" => Ok(OtlpProtocol::Grpc),
            "http/protobuf" | "http" => Ok(OtlpProtocol::HttpProtobuf),
            _ => Err(ConfigError::Invalid {
                field: "otlp_protocol",
                reason: format!("unknown protocol '{s}', expected grpc or http/protobuf"),
            }),
        }
    }
}

/// Logging and span export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info` or `cep_core=debug,info`.
    pub log_filter: String,
    pub json_logs: bool,
    /// Spans are only exported when an endpoint is set.
    pub otlp_endpoint: Option<String>,
    pub otlp_protocol: OtlpProtocol,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            json_logs: false,
            otlp_endpoint: None,
            otlp_protocol: OtlpProtocol::default(),
        }
    }
}

/// Configuration of the validation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub service_name: String,
    /// Base URL of the temperature service; `/temperature/<cep>` is appended.
    pub temperature_service_url: String,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: "zip-code-validation".to_string(),
            temperature_service_url: "http://localhost:8081".to_string(),
            server: ServerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("temperature_service_url", &self.temperature_service_url)?;
        self.server.validate()
    }
}

/// Configuration of the temperature service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub service_name: String,
    /// Base URL of the address provider; `/<cep>` is appended.
    pub cep_service_url: String,
    pub weather_api_url: String,
    pub weather_api_key: String,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            service_name: "temperature".to_string(),
            cep_service_url: String::new(),
            weather_api_url: "http://api.weatherapi.com/v1/current.json".to_string(),
            weather_api_key: String::new(),
            server: ServerConfig { port: 8081, ..ServerConfig::default() },
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl TemperatureConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("cep_service_url", &self.cep_service_url)?;
        require_url("weather_api_url", &self.weather_api_url)?;
        if self.weather_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("weather_api_key"));
        }
        self.server.validate()
    }
}

fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let cfg = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(cfg)
}

fn require_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(field));
    }
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl { field, value: value.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("cep-core-{}-{name}", std::process::id()));
        let mut file = fs::File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn gateway_defaults() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.service_name, "zip-code-validation");
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.server.request_timeout(), Duration::from_secs(60));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn temperature_defaults_need_urls_and_key() {
        let cfg = TemperatureConfig::default();
        assert_eq!(cfg.server.port, 8081);

        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("cep_service_url")));
    }

    #[test]
    fn temperature_requires_api_key() {
        let cfg = TemperatureConfig {
            cep_service_url: "https://viacep.com.br/ws".to_string(),
            ..TemperatureConfig::default()
        };

        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("weather_api_key")));
    }

    #[test]
    fn rejects_non_http_urls() {
        let cfg = GatewayConfig {
            temperature_service_url: "ftp://temperature".to_string(),
            ..GatewayConfig::default()
        };

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("temperature_service_url"));
    }

    #[test]
    fn rejects_zero_port() {
        let mut cfg = GatewayConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_partial_toml_keeping_defaults() {
        let path = write_temp(
            "temperature.toml",
            r#"
                cep_service_url = "http://cep.local/ws"
                weather_api_key = "KEY"

                [server]
                port = 9090

                [telemetry]
                otlp_endpoint = "http://collector:4318"
                otlp_protocol = "http/protobuf"
            "#,
        );

        let cfg = TemperatureConfig::load(&path).expect("config loads");
        fs::remove_file(&path).ok();

        assert_eq!(cfg.service_name, "temperature");
        assert_eq!(cfg.cep_service_url, "http://cep.local/ws");
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.telemetry.otlp_protocol, OtlpProtocol::HttpProtobuf);
        assert_eq!(cfg.telemetry.log_filter, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = GatewayConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let path = write_temp("broken.toml", "port = [");
        let err = GatewayConfig::load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn otlp_protocol_parses() {
        assert_eq!("grpc".parse::<OtlpProtocol>().unwrap(), OtlpProtocol::Grpc);
        assert_eq!("HTTP/protobuf".parse::<OtlpProtocol>().unwrap(), OtlpProtocol::HttpProtobuf);
        assert!("thrift".parse::<OtlpProtocol>().is_err());
    }
}
