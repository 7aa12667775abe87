//! In-memory catalog service
//!
//! Process-local implementation of the catalog service contract, selected by
//! `memory://` endpoints. Used for demos and as the backing service in tests.

use crate::database::contract::{CatalogDescriptor, CatalogService, CatalogSession, SessionId};
use crate::database::schema::EntitySchema;
use crate::error::{Result, ShellError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Collection {
    schema: Option<EntitySchema>,
    entity_count: u64,
}

#[derive(Debug, Default)]
struct Catalog {
    version: u64,
    collections: BTreeMap<String, Collection>,
}

#[derive(Debug, Default)]
struct Store {
    catalogs: BTreeMap<String, Catalog>,
    next_session_id: u64,
    live_sessions: BTreeSet<SessionId>,
    closed: bool,
}

/// Catalog service keeping everything in process memory
#[derive(Debug, Clone)]
pub struct InMemoryCatalogService {
    endpoint: String,
    store: Arc<Mutex<Store>>,
}

impl InMemoryCatalogService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::with_endpoint("memory://local")
    }

    /// Create an empty service reporting the given endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            store: Arc::new(Mutex::new(Store::default())),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        lock(&self.store)
    }

    /// Store `count` entities in a collection, creating it when missing
    pub fn seed_entities(&self, catalog: &str, entity_type: &str, count: u64) -> Result<()> {
        let mut store = self.store();
        let catalog = store
            .catalogs
            .get_mut(catalog)
            .ok_or_else(|| ShellError::NotFound(format!("catalog `{}`", catalog)))?;
        catalog
            .collections
            .entry(entity_type.to_string())
            .or_default()
            .entity_count += count;
        Ok(())
    }

    /// Sessions opened and not yet closed
    pub fn live_sessions(&self) -> Vec<SessionId> {
        self.store().live_sessions.iter().copied().collect()
    }

    /// Whether `close()` was called on the service
    pub fn is_closed(&self) -> bool {
        self.store().closed
    }
}

impl Default for InMemoryCatalogService {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn ensure_open(store: &Store, endpoint: &str) -> Result<()> {
    if store.closed {
        return Err(ShellError::connectivity(endpoint, "client is closed"));
    }
    Ok(())
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn catalog_names(&self) -> Result<BTreeSet<String>> {
        let store = self.store();
        ensure_open(&store, &self.endpoint)?;
        Ok(store.catalogs.keys().cloned().collect())
    }

    async fn define_catalog(&self, name: &str) -> Result<CatalogDescriptor> {
        let mut store = self.store();
        ensure_open(&store, &self.endpoint)?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ShellError::InvalidCatalogName(name));
        }
        let catalog = store.catalogs.entry(name.clone()).or_default();
        catalog.version += 1;
        Ok(CatalogDescriptor {
            name,
            version: catalog.version,
        })
    }

    async fn delete_catalog_if_exists(&self, name: &str) -> Result<bool> {
        let mut store = self.store();
        ensure_open(&store, &self.endpoint)?;
        Ok(store.catalogs.remove(name).is_some())
    }

    async fn open_read_write_session(&self, catalog: &str) -> Result<Box<dyn CatalogSession>> {
        let mut store = self.store();
        ensure_open(&store, &self.endpoint)?;
        if !store.catalogs.contains_key(catalog) {
            return Err(ShellError::NotFound(format!("catalog `{}`", catalog)));
        }
        store.next_session_id += 1;
        let id = SessionId(store.next_session_id);
        store.live_sessions.insert(id);
        Ok(Box::new(InMemorySession {
            id,
            catalog: catalog.to_string(),
            store: Arc::clone(&self.store),
            closed: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        let mut store = self.store();
        store.closed = true;
        store.live_sessions.clear();
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Session handle into an [`InMemoryCatalogService`]
#[derive(Debug)]
pub struct InMemorySession {
    id: SessionId,
    catalog: String,
    store: Arc<Mutex<Store>>,
    closed: bool,
}

impl InMemorySession {
    fn with_catalog<T>(&self, f: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        if self.closed {
            return Err(ShellError::NotFound(format!("session {}", self.id)));
        }
        let mut store = lock(&self.store);
        let catalog = store
            .catalogs
            .get_mut(&self.catalog)
            .ok_or_else(|| ShellError::NotFound(format!("catalog `{}`", self.catalog)))?;
        f(catalog)
    }
}

#[async_trait]
impl CatalogSession for InMemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn catalog_name(&self) -> &str {
        &self.catalog
    }

    async fn entity_types(&self) -> Result<BTreeSet<String>> {
        self.with_catalog(|catalog| Ok(catalog.collections.keys().cloned().collect()))
    }

    async fn entity_collection_size(&self, entity_type: &str) -> Result<u64> {
        self.with_catalog(|catalog| {
            catalog
                .collections
                .get(entity_type)
                .map(|collection| collection.entity_count)
                .ok_or_else(|| ShellError::NotFound(format!("entity collection `{}`", entity_type)))
        })
    }

    async fn define_entity_schema(&self, schema: &EntitySchema) -> Result<()> {
        self.with_catalog(|catalog| {
            catalog
                .collections
                .entry(schema.name.clone())
                .or_default()
                .schema = Some(schema.clone());
            catalog.version += 1;
            Ok(())
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.store).live_sessions.remove(&self.id);
        }
        Ok(())
    }
}
