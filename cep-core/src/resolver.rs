//! Postal code → address → weather → converted temperature.

use std::sync::Arc;

use reqwest::Client;
use tracing::{Instrument, Span, debug, field::Empty, info_span, warn};

use crate::{
    config::TemperatureConfig,
    error::{ProviderError, ResolveError},
    model::TemperatureResult,
    provider::{AddressProvider, ViaCepProvider, WeatherApiProvider, WeatherProvider},
    sanitize::sanitize_city,
};

/// Chains the two upstream lookups for one postal code.
///
/// The weather query depends on the city returned by the address lookup, so
/// the calls are always made one after the other.
#[derive(Debug, Clone)]
pub struct TemperatureResolver {
    address: Arc<dyn AddressProvider>,
    weather: Arc<dyn WeatherProvider>,
}

impl TemperatureResolver {
    pub fn new(address: Arc<dyn AddressProvider>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { address, weather }
    }

    /// Resolver backed by the HTTP providers named in `config`.
    pub fn from_config(config: &TemperatureConfig, http: Client) -> Self {
        let address = ViaCepProvider::new(http.clone(), config.cep_service_url.clone());
        let weather = WeatherApiProvider::new(
            http,
            config.weather_api_url.clone(),
            config.weather_api_key.clone(),
        );
        Self::new(Arc::new(address), Arc::new(weather))
    }

    pub async fn resolve(&self, cep: &str) -> Result<TemperatureResult, ResolveError> {
        let span = info_span!(
            "get temperature",
            zip_code = cep,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );

        let result = self.resolve_inner(cep).instrument(span.clone()).await;
        match &result {
            Ok(_) => {
                span.record("otel.status_code", "OK");
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("otel.status_message", err.to_string().as_str());
            }
        }
        result
    }

    async fn resolve_inner(&self, cep: &str) -> Result<TemperatureResult, ResolveError> {
        let address_span = info_span!(
            "get address",
            url = Empty,
            state = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        let address = self.address.lookup(cep).instrument(address_span.clone()).await;
        let address = close_step(&address_span, address).map_err(ResolveError::Address)?;

        if let Some(state) = &address.state {
            address_span.record("state", state.as_str());
        }

        let city = sanitize_city(&address.city);
        debug!(city = %address.city, state = ?address.state, query = %city, "resolved address");

        let weather_span = info_span!(
            "get weather",
            url = Empty,
            observed_at = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        let reading = self.weather.current(&city).instrument(weather_span.clone()).await;
        let reading = close_step(&weather_span, reading).map_err(ResolveError::Weather)?;
        if let Some(observed_at) = reading.observed_at {
            weather_span.record("observed_at", observed_at.to_rfc3339().as_str());
        }

        Ok(TemperatureResult::from_celsius(address.city, reading.temperature_celsius))
    }
}

fn close_step<T>(span: &Span, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
    match &result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            warn!(parent: span, error = %err, "upstream lookup failed");
            span.record("otel.status_code", "ERROR");
            span.record("otel.status_message", err.to_string().as_str());
        }
    }
    result
}
