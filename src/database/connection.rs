//! Catalog service connection
//!
//! This module provides the backend enum and the client construction logic
//! that turns a configured endpoint into a catalog service handle.

use crate::database::contract::CatalogService;
use crate::database::http::HttpCatalogService;
use crate::database::memory::InMemoryCatalogService;
use crate::error::{Result, ShellError};
use std::str::FromStr;

/// Supported service backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBackend {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
    /// Process-local in-memory service
    Memory,
}

impl ServiceBackend {
    /// Parse an endpoint URL to determine the backend
    pub fn from_url(url: &str) -> Result<Self> {
        let url_lower = url.to_lowercase();

        if url_lower.starts_with("http://") {
            Ok(ServiceBackend::Http)
        } else if url_lower.starts_with("https://") {
            Ok(ServiceBackend::Https)
        } else if url_lower.starts_with("memory://") || url_lower.starts_with("memory:") {
            Ok(ServiceBackend::Memory)
        } else {
            Err(ShellError::Initialization(format!(
                "Unable to determine service type from endpoint: {}",
                url
            )))
        }
    }

    /// Get the name of this backend
    pub fn name(&self) -> &str {
        match self {
            ServiceBackend::Http => "HTTP",
            ServiceBackend::Https => "HTTPS",
            ServiceBackend::Memory => "in-memory",
        }
    }
}

impl FromStr for ServiceBackend {
    type Err = ShellError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(ServiceBackend::Http),
            "https" => Ok(ServiceBackend::Https),
            "memory" | "mem" => Ok(ServiceBackend::Memory),
            _ => Err(ShellError::Config(format!("unsupported scheme: {}", s))),
        }
    }
}

impl std::fmt::Display for ServiceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build a client handle for `endpoint`
///
/// The client is created regardless of whether the service is reachable;
/// reachability is established by the bootstrap probe.
pub fn create_client(endpoint: &str, timeout_secs: u64) -> Result<Box<dyn CatalogService>> {
    match ServiceBackend::from_url(endpoint)? {
        ServiceBackend::Http | ServiceBackend::Https => {
            Ok(Box::new(HttpCatalogService::with_timeout(endpoint, timeout_secs)?))
        }
        ServiceBackend::Memory => Ok(Box::new(InMemoryCatalogService::with_endpoint(endpoint))),
    }
}
