//! Connection bootstrap
//!
//! Establishes the client connection at startup. The client is built once and
//! then probed with a catalog listing in a bounded retry loop, which absorbs a
//! service that is still starting up.

use crate::config::ShellConfig;
use crate::database::connection::create_client;
use crate::database::contract::CatalogService;
use crate::error::{Result, ShellError};
use crate::session::holder::SessionHolder;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default number of probe attempts
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 20;

/// Default fixed delay between probe attempts in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 300;

/// Bounded, fixed-delay retry policy for the startup probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Delay between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl From<&ShellConfig> for RetryPolicy {
    fn from(config: &ShellConfig) -> Self {
        Self {
            attempts: config.connect_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Connected client and the catalogs it reported on the successful probe
pub struct Bootstrap {
    pub client: Box<dyn CatalogService>,
    pub catalogs: BTreeSet<String>,
}

impl Bootstrap {
    /// Hand the client over to a new session holder
    pub fn into_holder(self) -> (SessionHolder, BTreeSet<String>) {
        (SessionHolder::with_client(self.client), self.catalogs)
    }
}

/// Build the client for the configured endpoint and wait until it answers
///
/// A `Connectivity` error means the service stayed unreachable for the whole
/// retry window and startup should be abandoned.
pub async fn connect(config: &ShellConfig) -> Result<Bootstrap> {
    let endpoint = config.endpoint();

    let client = create_client(&endpoint, config.request_timeout_secs).map_err(|e| {
        log_failure(&endpoint, &e);
        e
    })?;

    let catalogs = probe(client.as_ref(), &RetryPolicy::from(config))
        .await
        .map_err(|e| {
            log_failure(&endpoint, &e);
            e
        })?;

    info!(endpoint = %endpoint, catalogs = catalogs.len(), "connected to catalog service");
    Ok(Bootstrap { client, catalogs })
}

/// List catalogs, retrying connectivity failures per `policy`
///
/// Any other failure aborts right away. After the last attempt the last
/// connectivity error is returned.
pub async fn probe(client: &dyn CatalogService, policy: &RetryPolicy) -> Result<BTreeSet<String>> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match client.catalog_names().await {
            Ok(catalogs) => {
                if attempt > 1 {
                    info!(attempt, "catalog service became reachable");
                }
                return Ok(catalogs);
            }
            Err(e) if e.is_connectivity() && attempt < attempts => {
                debug!(attempt, attempts, error = %e, "catalog service not reachable yet");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn log_failure(endpoint: &str, error: &ShellError) {
    if error.is_connectivity() {
        error!(endpoint, "client failed connecting to catalog service");
    } else {
        error!(endpoint, error = %error, "client failed to start");
    }
}

/// Catalog listing shown under the startup banner
pub fn catalog_banner(catalogs: &BTreeSet<String>) -> String {
    let mut status = String::from("  ... server connected\n\n");
    if !catalogs.is_empty() {
        status.push_str("Catalogs already available:\n\n");
        for catalog in catalogs {
            status.push_str("   - ");
            status.push_str(catalog);
            status.push('\n');
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contract::{CatalogDescriptor, CatalogSession};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Service failing the first `failures` listings with `error`
    struct FlakyService {
        failures: u32,
        calls: AtomicU32,
        connectivity: bool,
    }

    impl FlakyService {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                connectivity: true,
            }
        }

        fn broken() -> Self {
            Self {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
                connectivity: false,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogService for FlakyService {
        async fn catalog_names(&self) -> Result<BTreeSet<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                if self.connectivity {
                    return Err(ShellError::connectivity("test://flaky", format!("attempt {}", call)));
                }
                return Err(ShellError::Remote {
                    status: 500,
                    message: "internal".to_string(),
                });
            }
            Ok(BTreeSet::from([format!("after-{}", call)]))
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

        async fn open_read_write_session(&self, catalog: &str) -> Result<Box<dyn CatalogSession>> {
            Err(ShellError::NotFound(catalog.to_string()))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn endpoint(&self) -> &str {
            "test://flaky"
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_probe_succeeds_on_last_attempt() {
        let service = FlakyService::new(19);
        let catalogs = probe(&service, &instant_policy()).await.unwrap();
        assert_eq!(service.calls(), 20);
        assert_eq!(catalogs, BTreeSet::from(["after-20".to_string()]));
    }

    #[tokio::test]
    async fn test_probe_gives_up_after_bound() {
        let service = FlakyService::new(20);
        let err = probe(&service, &instant_policy()).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("attempt 20"));
        assert_eq!(service.calls(), 20);
    }

    #[tokio::test]
    async fn test_probe_does_not_retry_other_failures() {
        let service = FlakyService::broken();
        let err = probe(&service, &instant_policy()).await.unwrap_err();
        assert!(!err.is_connectivity());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_probe_waits_between_attempts() {
        let service = FlakyService::new(2);
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(20),
        };
        let started = std::time::Instant::now();
        probe(&service, &policy).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_policy_from_config() {
        let config = ShellConfig {
            connect_attempts: 0,
            retry_delay_ms: 50,
            ..ShellConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_millis(50));
        assert_eq!(RetryPolicy::default().attempts, 20);
    }

    #[tokio::test]
    async fn test_connect_memory_endpoint() {
        let config = ShellConfig {
            scheme: "memory".to_string(),
            ..ShellConfig::default()
        };
        let bootstrap = connect(&config).await.unwrap();
        assert!(bootstrap.catalogs.is_empty());
        let (holder, _) = bootstrap.into_holder();
        assert!(holder.is_connected());
    }

    #[tokio::test]
    async fn test_connect_unknown_scheme_is_initialization_failure() {
        let config = ShellConfig {
            scheme: "grpc".to_string(),
            ..ShellConfig::default()
        };
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, ShellError::Initialization(_)));
    }

    #[test]
    fn test_catalog_banner() {
        let catalogs = BTreeSet::from(["b".to_string(), "a".to_string()]);
        let banner = catalog_banner(&catalogs);
        assert!(banner.contains("   - a\n   - b\n"));
        assert!(!catalog_banner(&BTreeSet::new()).contains("Catalogs"));
    }
}
