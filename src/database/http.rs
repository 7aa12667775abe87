//! HTTP catalog service client
//!
//! Implements the catalog service contract against a remote service speaking
//! JSON over HTTP. All requests go below `{endpoint}/rest`:
//!
//! - `GET    /system/catalogs`                      list catalogs
//! - `POST   /system/catalogs`                      define a catalog
//! - `DELETE /system/catalogs/{name}`               delete a catalog
//! - `GET    /{catalog}/collections`                list entity collections
//! - `GET    /{catalog}/collections/{type}/size`    entity count
//! - `PUT    /{catalog}/collections/{type}/schema`  define an entity schema

use crate::database::contract::{CatalogDescriptor, CatalogService, CatalogSession, SessionId};
use crate::database::schema::EntitySchema;
use crate::error::{Result, ShellError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for HTTP requests (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct DefineCatalogRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionEntry {
    entity_type: String,
}

#[derive(Debug, Deserialize)]
struct CollectionSize {
    size: u64,
}

/// Shared request plumbing for the service and its sessions
#[derive(Clone)]
struct HttpTransport {
    endpoint: String,
    base: Url,
    client: Client,
}

impl HttpTransport {
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ShellError::Initialization(format!("endpoint {} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map a transport failure, keeping unreachable endpoints distinguishable
    fn map_send_error(&self, error: reqwest::Error) -> ShellError {
        if error.is_connect() || error.is_timeout() {
            ShellError::connectivity(&self.endpoint, error)
        } else {
            ShellError::Http(error)
        }
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        Err(status_error(&self.endpoint, status, message))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, segments: &[&str]) -> Result<T> {
        let response = self
            .client
            .get(self.url(segments)?)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.check_status(response).await?;
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Error for a non-success status
///
/// Gateway failures in front of the service count as the service being
/// unreachable, so the startup probe keeps retrying them.
fn status_error(endpoint: &str, status: StatusCode, message: String) -> ShellError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            ShellError::connectivity(endpoint, format!("{}: {}", status, message))
        }
        StatusCode::NOT_FOUND => ShellError::NotFound(message),
        _ => ShellError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

/// Catalog service reached over HTTP
pub struct HttpCatalogService {
    transport: HttpTransport,
    next_session_id: Arc<AtomicU64>,
}

impl HttpCatalogService {
    /// Create a client for `endpoint` with the default timeout
    ///
    /// No request is made; the service does not need to be running.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client for `endpoint` with a custom request timeout
    pub fn with_timeout(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let base = Url::parse(endpoint)
            .and_then(|url| url.join("rest/"))
            .map_err(|e| ShellError::Initialization(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ShellError::Initialization(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            transport: HttpTransport {
                endpoint: endpoint.to_string(),
                base,
                client,
            },
            next_session_id: Arc::new(AtomicU64::new(1)),
        })
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn catalog_names(&self) -> Result<BTreeSet<String>> {
        let catalogs: Vec<CatalogDescriptor> = self.transport.get(&["system", "catalogs"]).await?;
        Ok(catalogs.into_iter().map(|c| c.name).collect())
    }

    async fn define_catalog(&self, name: &str) -> Result<CatalogDescriptor> {
        let transport = &self.transport;
        let response = transport
            .client
            .post(transport.url(&["system", "catalogs"])?)
            .json(&DefineCatalogRequest { name })
            .send()
            .await
            .map_err(|e| transport.map_send_error(e))?;
        let response = transport.check_status(response).await?;
        let text = response.text().await.map_err(|e| transport.map_send_error(e))?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete_catalog_if_exists(&self, name: &str) -> Result<bool> {
        let transport = &self.transport;
        let response = transport
            .client
            .delete(transport.url(&["system", "catalogs", name])?)
            .send()
            .await
            .map_err(|e| transport.map_send_error(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        transport.check_status(response).await?;
        Ok(true)
    }

    async fn open_read_write_session(&self, catalog: &str) -> Result<Box<dyn CatalogSession>> {
        // Sessions are client-side handles; make sure the catalog is there first.
        if !self.catalog_exists(catalog).await? {
            return Err(ShellError::NotFound(format!("catalog `{}`", catalog)));
        }
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        Ok(Box::new(HttpCatalogSession {
            id,
            catalog: catalog.to_string(),
            transport: self.transport.clone(),
            closed: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        // reqwest releases pooled connections when the client is dropped
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.transport.endpoint
    }
}

/// Session handle bound to a catalog of an [`HttpCatalogService`]
pub struct HttpCatalogSession {
    id: SessionId,
    catalog: String,
    transport: HttpTransport,
    closed: bool,
}

impl HttpCatalogSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ShellError::NotFound(format!("session {}", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSession for HttpCatalogSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn catalog_name(&self) -> &str {
        &self.catalog
    }

    async fn entity_types(&self) -> Result<BTreeSet<String>> {
        self.ensure_open()?;
        let entries: Vec<CollectionEntry> =
            self.transport.get(&[self.catalog.as_str(), "collections"]).await?;
        Ok(entries.into_iter().map(|e| e.entity_type).collect())
    }

    async fn entity_collection_size(&self, entity_type: &str) -> Result<u64> {
        self.ensure_open()?;
        let size: CollectionSize = self
            .transport
            .get(&[self.catalog.as_str(), "collections", entity_type, "size"])
            .await?;
        Ok(size.size)
    }

    async fn define_entity_schema(&self, schema: &EntitySchema) -> Result<()> {
        self.ensure_open()?;
        let transport = &self.transport;
        let response = transport
            .client
            .put(transport.url(&[self.catalog.as_str(), "collections", schema.name.as_str(), "schema"])?)
            .json(schema)
            .send()
            .await
            .map_err(|e| transport.map_send_error(e))?;
        transport.check_status(response).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
