//! Device addresses

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{DeviceError, Result};

/// Base URL of a lighting device
///
/// Accepts `host`, `host:port` or a full `http(s)://host[:port]` URL. Paths,
/// queries and credentials are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    base: String,
}

impl DeviceAddress {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || DeviceError::InvalidAddress(input.to_string());

        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let url = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            Url::parse(&format!("http://{}", trimmed))
        }
        .map_err(|_| invalid())?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid());
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Normalized base URL without a trailing slash
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Absolute URL of an API path such as `/json/state`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl FromStr for DeviceAddress {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
