use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{Span, debug};

use crate::{error::ProviderError, model::WeatherReading};

use super::{WeatherProvider, send_for_body};

const PROVIDER: &str = "weather provider";
const REDACTED: &str = "REDACTED";

/// Current weather from WeatherAPI.com:
/// `GET <base>?key=<api-key>&q=<city>&aqi=no`.
#[derive(Clone)]
pub struct WeatherApiProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), api_key: api_key.into(), http }
    }
}

impl fmt::Debug for WeatherApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherApiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &REDACTED)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: Option<WaLocation>,
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, city: &str) -> Result<WeatherReading, ProviderError> {
        let request = self
            .http
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")]);

        let url = request.try_clone().and_then(|r| r.build().ok()).map(|r| redact_key(r.url()));
        if let Some(url) = url {
            Span::current().record("url", url.as_str());
        }

        let body = send_for_body(PROVIDER, request).await?;

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Decode { provider: PROVIDER, source })?;

        if let Some(location) = &parsed.location {
            debug!(query = city, location = %location.name, "weather provider matched location");
        }

        Ok(WeatherReading {
            temperature_celsius: parsed.current.temp_c,
            observed_at: parsed.current.last_updated_epoch.and_then(unix_to_utc),
        })
    }
}

/// Copy of `url` with the `key` query parameter masked.
fn redact_key(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
