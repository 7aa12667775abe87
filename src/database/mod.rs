//! Database module
//!
//! This module provides the catalog service contract, its HTTP and in-memory
//! implementations, and the entity schema structures.

pub mod connection;
pub mod contract;
pub mod http;
pub mod memory;
pub mod schema;

// Re-exports
pub use connection::{create_client, ServiceBackend};
pub use contract::{CatalogDescriptor, CatalogService, CatalogSession, SessionId};
pub use memory::InMemoryCatalogService;
pub use schema::{example_schemas, AttributeSchema, AttributeType, EntitySchema};
