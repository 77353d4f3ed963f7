//! Core library for the CEP services.
//!
//! This crate defines:
//! - Postal code validation and city name normalization
//! - Address and weather providers behind async traits
//! - The temperature resolver and the HTTP routers of both services
//! - Configuration, logging and distributed tracing setup
//!
//! It is used by `cep-gateway` and `cep-temperature`.

pub mod api;
pub mod cep;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod sanitize;
pub mod server;
pub mod telemetry;

pub use cep::Cep;
pub use config::{GatewayConfig, TemperatureConfig};
pub use error::{CepError, ConfigError, GatewayError, ProviderError, ResolveError};
pub use model::{Address, ErrorMessage, PostalCodeRequest, TemperatureResult, WeatherReading};
pub use provider::{AddressProvider, WeatherProvider};
pub use resolver::TemperatureResolver;
