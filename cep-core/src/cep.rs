//! Brazilian postal code (CEP) validation.

use std::{fmt, str::FromStr};

use crate::error::CepError;

/// Number of digits in a CEP.
pub const CEP_LEN: usize = 8;

/// Returns `true` when `code` is exactly eight ASCII digits (`^\d{8}$`).
pub fn is_valid(code: &str) -> bool {
    code.len() == CEP_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// A postal code that has passed [`is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cep(String);

impl Cep {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Cep {
    type Error = CepError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if is_valid(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(CepError::Invalid(value.to_owned()))
        }
    }
}

impl FromStr for Cep {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cep::try_from(s)
    }
}

impl AsRef<str> for Cep {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
