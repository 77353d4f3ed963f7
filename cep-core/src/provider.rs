use crate::{
    error::ProviderError,
    model::{Address, WeatherReading},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::{fmt::Debug, time::Duration};

pub mod viacep;
pub mod weatherapi;

pub use viacep::ViaCepProvider;
pub use weatherapi::WeatherApiProvider;

/// Maps a postal code to an address.
#[async_trait]
pub trait AddressProvider: Send + Sync + Debug {
    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError>;
}

/// Maps a (sanitized) city name to its current weather.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, city: &str) -> Result<WeatherReading, ProviderError>;
}

/// Build the process-wide outbound HTTP client.
///
/// Only the connect phase is bounded here; the whole exchange is bounded by
/// the server-wide request timeout of the calling service.
pub fn build_http_client(connect_timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}

/// Send `request` and return the body of a successful response.
pub(crate) async fn send_for_body(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<String, ProviderError> {
    let res = request
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
