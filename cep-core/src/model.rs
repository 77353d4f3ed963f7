use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body accepted by the gateway's `POST /zipcode`.
///
/// A missing or `null` `cep` decodes as an empty string so that it is
/// rejected by validation (422) rather than by decoding (400).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostalCodeRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cep: String,
}

impl PostalCodeRequest {
    /// Decode a request body. Anything but a JSON object is an error.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let object: Map<String, Value> = serde_json::from_slice(body)?;
        Self::deserialize(Value::Object(object))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of the address lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub city: String,
    pub state: Option<String>,
}

/// Current reading returned by the weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature_celsius: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Final response of both services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureResult {
    pub city: String,
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    #[serde(rename = "temp_F")]
    pub temp_f: f64,
    #[serde(rename = "temp_K")]
    pub temp_k: f64,
}

impl TemperatureResult {
    /// Build the result from a Celsius reading. No rounding is applied.
    pub fn from_celsius(city: impl Into<String>, celsius: f64) -> Self {
        Self {
            city: city.into(),
            temp_c: celsius,
            temp_f: celsius_to_fahrenheit(celsius),
            temp_k: celsius_to_kelvin(celsius),
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + 273.15
}

/// JSON error body returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
