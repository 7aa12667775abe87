//! Catalog service contract
//!
//! Trait-based abstraction over the remote catalog service. The shell only
//! talks to the service through these traits, so the session holder and the
//! command dispatcher work the same against the HTTP client and the in-memory
//! service.

use crate::database::schema::EntitySchema;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a session handle, unique per client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Catalog as reported by the service after it was defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    /// Catalog name, possibly normalized by the server
    pub name: String,
    /// Schema version of the catalog
    #[serde(default)]
    pub version: u64,
}

/// Client connection to the catalog service
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Names of all catalogs known to the service
    async fn catalog_names(&self) -> Result<BTreeSet<String>>;

    /// Whether a catalog with the given name exists
    async fn catalog_exists(&self, name: &str) -> Result<bool> {
        Ok(self.catalog_names().await?.contains(name))
    }

    /// Define a new catalog
    async fn define_catalog(&self, name: &str) -> Result<CatalogDescriptor>;

    /// Delete a catalog, returning `false` if it did not exist
    async fn delete_catalog_if_exists(&self, name: &str) -> Result<bool>;

    /// Open a read/write session bound to `catalog`
    async fn open_read_write_session(&self, catalog: &str) -> Result<Box<dyn CatalogSession>>;

    /// Release the connection
    async fn close(&self) -> Result<()>;

    /// Human-readable endpoint description
    fn endpoint(&self) -> &str;
}

/// Read/write session bound to exactly one catalog
#[async_trait]
pub trait CatalogSession: Send + Sync {
    /// Identity of this handle
    fn id(&self) -> SessionId;

    /// Catalog this session is bound to
    fn catalog_name(&self) -> &str;

    /// Names of entity collections in the catalog
    async fn entity_types(&self) -> Result<BTreeSet<String>>;

    /// Number of entities stored in a collection
    async fn entity_collection_size(&self, entity_type: &str) -> Result<u64>;

    /// Define (or replace) the schema of an entity collection
    async fn define_entity_schema(&self, schema: &EntitySchema) -> Result<()>;

    /// Close the session
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(7).to_string(), "#7");
    }

    #[test]
    fn test_descriptor_version_defaults() {
        let descriptor: CatalogDescriptor = serde_json::from_str(r#"{"name":"shop"}"#).unwrap();
        assert_eq!(descriptor.name, "shop");
        assert_eq!(descriptor.version, 0);
    }
}
