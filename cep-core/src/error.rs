use http::StatusCode;
use thiserror::Error;

/// A postal code that is not exactly eight ASCII digits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CepError {
    #[error("invalid zipcode: {0:?}")]
    Invalid(String),
}

/// Failure talking to one upstream provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {provider} failed")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} responded with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("failed to parse {provider} response")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} has no entry for {query}")]
    NotFound { provider: &'static str, query: String },
}

/// Failure of the address → weather chain.
///
/// The HTTP boundary collapses every variant into the same not-found
/// response; the variant is only kept for logs and span status.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("address lookup failed")]
    Address(#[source] ProviderError),

    #[error("weather lookup failed")]
    Weather(#[source] ProviderError),
}

/// Configuration that cannot be used to start a service.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid URL for `{field}`: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Client-facing failures of the validation gateway.
///
/// The display strings are the `message` bodies sent to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Body is not a JSON object with a string `cep`.
    #[error("invalid zipcode")]
    MalformedRequest,

    /// `cep` is not exactly eight digits.
    #[error("invalid zipcode")]
    InvalidZipcode,

    /// The temperature service could not be reached.
    #[error("error calling service B")]
    Unreachable,

    /// The temperature service answered with a non-success status.
    #[error("error from service B")]
    Upstream(StatusCode),

    /// The temperature service answered 2xx with an unexpected body.
    #[error("error decoding response from service B")]
    UndecodableResponse,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedRequest => StatusCode::BAD_REQUEST,
            GatewayError::InvalidZipcode => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Unreachable | GatewayError::UndecodableResponse => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Upstream(status) => *status,
        }
    }
}
