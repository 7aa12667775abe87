//! Session holder
//!
//! Single-slot owner of the catalog service client and of the one read/write
//! session the shell keeps open. Every transition between the holder states
//! goes through this type, which is what keeps at most one live session per
//! process: a new session is only opened after the previous one was released.

use crate::database::contract::{CatalogService, CatalogSession};
use crate::error::{Result, ShellError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Observable state of the holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HolderState {
    /// No client attached
    Disconnected,
    /// Client attached, no session open
    Connected,
    /// Client attached and a session open on `catalog`
    SessionOpen { catalog: String },
}

/// Result of [`SessionHolder::open_session`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A session on the same catalog was already open; nothing changed
    AlreadyOpen { catalog: String },
    /// A new session was opened while none was open
    Opened { catalog: String },
    /// The session on `previous` was terminated and one on `opened` started
    Switched { previous: String, opened: String },
    /// The catalog does not exist; nothing changed
    NotFound { catalog: String },
}

impl fmt::Display for OpenOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenOutcome::AlreadyOpen { catalog } => {
                write!(f, "There is already opened session to catalog `{}`.", catalog)
            }
            OpenOutcome::Opened { catalog } => {
                write!(f, "Session to catalog `{}` opened.", catalog)
            }
            OpenOutcome::Switched { previous, opened } => write!(
                f,
                "Existing session to catalog `{}` terminated.\nSession to catalog `{}` opened.",
                previous, opened
            ),
            OpenOutcome::NotFound { catalog } => {
                write!(f, "Catalog `{}` doesn't exist.", catalog)
            }
        }
    }
}

/// Result of [`SessionHolder::close_session`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The session on `catalog` was terminated
    Closed { catalog: String },
    /// There was nothing to close
    NoneOpen,
}

impl fmt::Display for CloseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseOutcome::Closed { catalog } => {
                write!(f, "Existing session to catalog `{}` terminated.", catalog)
            }
            CloseOutcome::NoneOpen => write!(f, "No session is currently opened."),
        }
    }
}

/// Owner of the client handle and the active session
#[derive(Default)]
pub struct SessionHolder {
    client: Option<Box<dyn CatalogService>>,
    session: Option<Box<dyn CatalogSession>>,
}

impl SessionHolder {
    /// Create a disconnected holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a holder owning `client`
    pub fn with_client(client: Box<dyn CatalogService>) -> Self {
        Self {
            client: Some(client),
            session: None,
        }
    }

    /// Attach the client; a holder owns at most one client for its lifetime
    pub fn attach_client(&mut self, client: Box<dyn CatalogService>) -> Result<()> {
        if self.client.is_some() {
            return Err(ShellError::Initialization(
                "a client is already attached".to_string(),
            ));
        }
        self.client = Some(client);
        Ok(())
    }

    /// Current client, if connected
    pub fn client(&self) -> Option<&dyn CatalogService> {
        self.client.as_deref()
    }

    /// Current session, if one is open
    pub fn session(&self) -> Option<&dyn CatalogSession> {
        self.session.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Current state of the holder
    pub fn state(&self) -> HolderState {
        match (&self.client, &self.session) {
            (None, _) => HolderState::Disconnected,
            (Some(_), None) => HolderState::Connected,
            (Some(_), Some(session)) => HolderState::SessionOpen {
                catalog: session.catalog_name().to_string(),
            },
        }
    }

    /// Open a read/write session on `catalog`
    ///
    /// Reuses a session already bound to `catalog`. A session bound to another
    /// catalog is closed before the new one is opened. If opening fails after
    /// the old session was closed, the holder is left without a session.
    pub async fn open_session(&mut self, catalog: &str) -> Result<OpenOutcome> {
        let client = self.client.as_deref().ok_or(ShellError::NotConnected)?;

        if !client.catalog_exists(catalog).await? {
            return Ok(OpenOutcome::NotFound {
                catalog: catalog.to_string(),
            });
        }

        if let Some(session) = self.session.as_deref() {
            if session.catalog_name() == catalog {
                return Ok(OpenOutcome::AlreadyOpen {
                    catalog: catalog.to_string(),
                });
            }
        }

        let previous = self.release_session().await;

        let client = self.client.as_deref().ok_or(ShellError::NotConnected)?;
        let session = client.open_read_write_session(catalog).await?;
        info!(catalog, session = %session.id(), "session opened");
        self.session = Some(session);

        Ok(match previous {
            Some(previous) => OpenOutcome::Switched {
                previous,
                opened: catalog.to_string(),
            },
            None => OpenOutcome::Opened {
                catalog: catalog.to_string(),
            },
        })
    }

    /// Close the open session, if any
    pub async fn close_session(&mut self) -> Result<CloseOutcome> {
        Ok(match self.release_session().await {
            Some(catalog) => CloseOutcome::Closed { catalog },
            None => CloseOutcome::NoneOpen,
        })
    }

    /// Close the session if it is bound to `catalog`
    ///
    /// Used before `catalog` is deleted so no handle outlives its catalog.
    /// Returns whether a session was closed.
    pub async fn invalidate_session_for(&mut self, catalog: &str) -> bool {
        let bound = self
            .session
            .as_deref()
            .is_some_and(|session| session.catalog_name() == catalog);
        if bound {
            self.release_session().await;
        }
        bound
    }

    /// Release session and client
    ///
    /// Each step is attempted even if the previous one failed. Calling this
    /// again, or on an empty holder, does nothing.
    pub async fn shutdown(&mut self) {
        self.release_session().await;

        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => info!(endpoint = client.endpoint(), "client closed"),
                Err(e) => warn!(endpoint = client.endpoint(), error = %e, "failed to close client"),
            }
        }
    }

    /// Take the session out of the slot and close it, returning its catalog
    async fn release_session(&mut self) -> Option<String> {
        let mut session = self.session.take()?;
        let catalog = session.catalog_name().to_string();
        match session.close().await {
            Ok(()) => info!(catalog = %catalog, session = %session.id(), "session closed"),
            Err(e) => warn!(catalog = %catalog, error = %e, "failed to close session"),
        }
        Some(catalog)
    }
}

/// Holder shared between the REPL task and the shutdown path
///
/// Only the REPL task mutates the holder while the shell runs; the shutdown
/// path takes the lock once the REPL has stopped or a signal arrived.
pub type SharedHolder = Arc<Mutex<SessionHolder>>;

/// Wrap a holder for sharing
pub fn create_shared_holder(holder: SessionHolder) -> SharedHolder {
    Arc::new(Mutex::new(holder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contract::{CatalogDescriptor, SessionId};
    use crate::database::memory::InMemoryCatalogService;
    use crate::database::schema::EntitySchema;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex as StdMutex;

    async fn holder_with(catalogs: &[&str]) -> (SessionHolder, InMemoryCatalogService) {
        let service = InMemoryCatalogService::new();
        for catalog in catalogs {
            service.define_catalog(catalog).await.unwrap();
        }
        let holder = SessionHolder::with_client(Box::new(service.clone()));
        (holder, service)
    }

    #[tokio::test]
    async fn test_reopen_same_catalog_is_noop() {
        let (mut holder, service) = holder_with(&["shop"]).await;

        let first = holder.open_session("shop").await.unwrap();
        assert_eq!(first, OpenOutcome::Opened { catalog: "shop".to_string() });
        let id = holder.session().unwrap().id();

        let second = holder.open_session("shop").await.unwrap();
        assert_eq!(second, OpenOutcome::AlreadyOpen { catalog: "shop".to_string() });
        assert_eq!(holder.session().unwrap().id(), id);
        assert_eq!(service.live_sessions(), vec![id]);
    }

    #[tokio::test]
    async fn test_switch_closes_previous_session() {
        let (mut holder, service) = holder_with(&["a", "b"]).await;

        holder.open_session("a").await.unwrap();
        let old = holder.session().unwrap().id();

        let outcome = holder.open_session("b").await.unwrap();
        assert_eq!(
            outcome,
            OpenOutcome::Switched {
                previous: "a".to_string(),
                opened: "b".to_string()
            }
        );
        assert_eq!(
            outcome.to_string(),
            "Existing session to catalog `a` terminated.\nSession to catalog `b` opened."
        );

        let live = service.live_sessions();
        assert_eq!(live.len(), 1);
        assert_ne!(live[0], old);
        assert_eq!(holder.state(), HolderState::SessionOpen { catalog: "b".to_string() });
    }

    #[tokio::test]
    async fn test_open_missing_catalog_keeps_state() {
        let (mut holder, _service) = holder_with(&["shop"]).await;
        holder.open_session("shop").await.unwrap();
        let id = holder.session().unwrap().id();

        let outcome = holder.open_session("nope").await.unwrap();
        assert_eq!(outcome.to_string(), "Catalog `nope` doesn't exist.");
        assert_eq!(holder.session().unwrap().id(), id);
    }

    #[tokio::test]
    async fn test_close_without_session() {
        let (mut holder, _service) = holder_with(&[]).await;
        let outcome = holder.close_session().await.unwrap();
        assert_eq!(outcome, CloseOutcome::NoneOpen);
        assert_eq!(outcome.to_string(), "No session is currently opened.");
        assert_eq!(holder.state(), HolderState::Connected);
    }

    #[tokio::test]
    async fn test_close_reports_catalog() {
        let (mut holder, service) = holder_with(&["shop"]).await;
        holder.open_session("shop").await.unwrap();

        let outcome = holder.close_session().await.unwrap();
        assert_eq!(outcome.to_string(), "Existing session to catalog `shop` terminated.");
        assert!(!holder.has_session());
        assert!(service.live_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_holder() {
        let mut holder = SessionHolder::new();
        assert_eq!(holder.state(), HolderState::Disconnected);
        assert!(matches!(
            holder.open_session("shop").await,
            Err(ShellError::NotConnected)
        ));
        assert_eq!(holder.close_session().await.unwrap(), CloseOutcome::NoneOpen);
        holder.shutdown().await;
    }

    #[tokio::test]
    async fn test_attach_client_only_once() {
        let mut holder = SessionHolder::new();
        holder
            .attach_client(Box::new(InMemoryCatalogService::new()))
            .unwrap();
        assert!(holder
            .attach_client(Box::new(InMemoryCatalogService::new()))
            .is_err());
    }

    #[tokio::test]
    async fn test_invalidate_only_matching_session() {
        let (mut holder, _service) = holder_with(&["a", "b"]).await;
        holder.open_session("a").await.unwrap();

        assert!(!holder.invalidate_session_for("b").await);
        assert!(holder.has_session());
        assert!(holder.invalidate_session_for("a").await);
        assert!(!holder.has_session());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (mut holder, service) = holder_with(&["shop"]).await;
        holder.open_session("shop").await.unwrap();

        holder.shutdown().await;
        assert!(service.is_closed());
        assert!(service.live_sessions().is_empty());
        assert_eq!(holder.state(), HolderState::Disconnected);

        holder.shutdown().await;
        assert_eq!(holder.state(), HolderState::Disconnected);
    }

    /// Service whose sessions fail to close, recording what happened
    struct FailingCloseService {
        events: Arc<StdMutex<Vec<String>>>,
    }

    struct FailingCloseSession;

    #[async_trait]
    impl CatalogSession for FailingCloseSession {
        fn id(&self) -> SessionId {
            SessionId(1)
        }

        fn catalog_name(&self) -> &str {
            "shop"
        }

        async fn entity_types(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }

        async fn entity_collection_size(&self, _entity_type: &str) -> Result<u64> {
            Ok(0)
        }

        async fn define_entity_schema(&self, _schema: &EntitySchema) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Err(ShellError::Remote {
                status: 500,
                message: "close failed".to_string(),
            })
        }
    }

    #[async_trait]
    impl CatalogService for FailingCloseService {
        async fn catalog_names(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::from(["shop".to_string()]))
        }

        async fn define_catalog(&self, name: &str) -> Result<CatalogDescriptor> {
            Ok(CatalogDescriptor {
                name: name.to_string(),
                version: 1,
            })
        }

        async fn delete_catalog_if_exists(&self, _name: &str) -> Result<bool> {
            Ok(false)
        }

        async fn open_read_write_session(&self, _catalog: &str) -> Result<Box<dyn CatalogSession>> {
            Ok(Box::new(FailingCloseSession))
        }

        async fn close(&self) -> Result<()> {
            self.events.lock().unwrap().push("client closed".to_string());
            Ok(())
        }

        fn endpoint(&self) -> &str {
            "test://failing"
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_client_when_session_close_fails() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let mut holder = SessionHolder::with_client(Box::new(FailingCloseService {
            events: Arc::clone(&events),
        }));
        holder.open_session("shop").await.unwrap();

        holder.shutdown().await;

        assert_eq!(*events.lock().unwrap(), vec!["client closed".to_string()]);
        assert_eq!(holder.state(), HolderState::Disconnected);
    }

    #[tokio::test]
    async fn test_shared_holder() {
        let (holder, _service) = holder_with(&["shop"]).await;
        let shared = create_shared_holder(holder);
        shared.lock().await.open_session("shop").await.unwrap();
        assert!(shared.lock().await.has_session());
    }
}
