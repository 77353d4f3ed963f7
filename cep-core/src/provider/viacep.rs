use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::Span;

use crate::{error::ProviderError, model::Address};

use super::{AddressProvider, send_for_body};

const PROVIDER: &str = "address provider";

/// Address lookup against a ViaCEP-compatible service: `GET <base>/<cep>`.
#[derive(Debug, Clone)]
pub struct ViaCepProvider {
    base_url: String,
    http: Client,
}

impl ViaCepProvider {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn lookup_url(&self, cep: &str) -> String {
        format!("{}/{}", self.base_url, cep)
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(alias = "localidade")]
    city: Option<String>,
    #[serde(alias = "uf")]
    state: Option<String>,
    /// ViaCEP answers unknown codes with `200 {"erro": true}`.
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_error_marker(&self) -> bool {
        match &self.erro {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => s != "false",
            Some(_) => true,
        }
    }
}

#[async_trait]
impl AddressProvider for ViaCepProvider {
    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError> {
        let url = self.lookup_url(cep);
        Span::current().record("url", url.as_str());

        let body = send_for_body(PROVIDER, self.http.get(&url)).await?;

        let parsed: ViaCepResponse = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Decode { provider: PROVIDER, source })?;

        if parsed.is_error_marker() {
            return Err(ProviderError::NotFound { provider: PROVIDER, query: cep.to_string() });
        }

        let city = match parsed.city {
            Some(city) if !city.trim().is_empty() => city,
            Some(_) => {
                return Err(ProviderError::NotFound {
                    provider: PROVIDER,
                    query: cep.to_string(),
                });
            }
            None => {
                return Err(ProviderError::Decode {
                    provider: PROVIDER,
                    source: <serde_json::Error as serde::de::Error>::missing_field("city"),
                });
            }
        };

        Ok(Address { city, state: parsed.state })
    }
}
