//! Shell lifecycle
//!
//! Runs the interactive shell until it finishes or a termination signal
//! arrives, then tears the holder down exactly once.

use crate::error::Result;
use crate::session::holder::SharedHolder;
use std::future::Future;
use tracing::{error, info};

/// How the shell stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellExit {
    /// The shell left its loop (`exit`, `quit`, end of input)
    Finished,
    /// The shell returned an error
    Failed,
    /// The shell task panicked
    Panicked,
    /// A termination signal arrived first
    Signalled(&'static str),
}

impl ShellExit {
    /// Process exit code
    pub fn code(&self) -> i32 {
        match self {
            ShellExit::Finished => 0,
            ShellExit::Failed => 1,
            ShellExit::Panicked => 101,
            ShellExit::Signalled(_) => 130,
        }
    }
}

/// Run `shell` on its own task until it completes or `signal` resolves
///
/// On a signal the shell task is aborted and awaited, which releases any lock
/// it held on the holder. The holder is shut down afterwards on every path.
pub async fn run_until_shutdown<F, S>(holder: SharedHolder, shell: F, signal: S) -> ShellExit
where
    F: Future<Output = Result<()>> + Send + 'static,
    S: Future<Output = &'static str>,
{
    let mut task = tokio::spawn(shell);

    let exit = tokio::select! {
        joined = &mut task => match joined {
            Ok(Ok(())) => ShellExit::Finished,
            Ok(Err(e)) => {
                error!(error = %e, "shell stopped with an error");
                ShellExit::Failed
            }
            Err(e) => {
                error!(error = %e, "shell task failed");
                ShellExit::Panicked
            }
        },
        signal = signal => {
            info!(signal, "received signal, shutting down");
            task.abort();
            let _ = task.await;
            ShellExit::Signalled(signal)
        }
    };

    holder.lock().await.shutdown().await;
    info!(code = exit.code(), "shell stopped");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contract::CatalogService;
    use crate::database::memory::InMemoryCatalogService;
    use crate::error::ShellError;
    use crate::session::holder::{create_shared_holder, HolderState, SessionHolder};
    use std::time::Duration;

    async fn holder_with_open_session() -> (SharedHolder, InMemoryCatalogService) {
        let service = InMemoryCatalogService::new();
        service.define_catalog("shop").await.unwrap();
        let mut holder = SessionHolder::with_client(Box::new(service.clone()));
        holder.open_session("shop").await.unwrap();
        assert_eq!(service.live_sessions().len(), 1);
        (create_shared_holder(holder), service)
    }

    fn no_signal() -> std::future::Pending<&'static str> {
        std::future::pending()
    }

    async fn assert_torn_down(holder: &SharedHolder, service: &InMemoryCatalogService) {
        assert_eq!(holder.lock().await.state(), HolderState::Disconnected);
        assert!(service.live_sessions().is_empty());
        assert!(service.is_closed());
    }

    #[tokio::test]
    async fn test_finished_shell_tears_down() {
        let (holder, service) = holder_with_open_session().await;

        let shell = async { Ok::<(), ShellError>(()) };
        let exit = run_until_shutdown(holder.clone(), shell, no_signal()).await;

        assert_eq!(exit, ShellExit::Finished);
        assert_eq!(exit.code(), 0);
        assert_torn_down(&holder, &service).await;
    }

    #[tokio::test]
    async fn test_failed_shell_tears_down() {
        let (holder, service) = holder_with_open_session().await;

        let shell = async { Err::<(), _>(ShellError::Config("broken".to_string())) };
        let exit = run_until_shutdown(holder.clone(), shell, no_signal()).await;

        assert_eq!(exit.code(), 1);
        assert_torn_down(&holder, &service).await;
    }

    #[tokio::test]
    async fn test_panicked_shell_tears_down() {
        let (holder, service) = holder_with_open_session().await;

        let shell = async {
            Err::<(), _>(ShellError::NotConnected).expect("shell crashed");
            Ok::<(), ShellError>(())
        };
        let exit = run_until_shutdown(holder.clone(), shell, no_signal()).await;

        assert_eq!(exit, ShellExit::Panicked);
        assert_eq!(exit.code(), 101);
        assert_torn_down(&holder, &service).await;
    }

    #[tokio::test]
    async fn test_signal_interrupts_shell_holding_the_lock() {
        let (holder, service) = holder_with_open_session().await;

        let shared = holder.clone();
        let shell = async move {
            let _guard = shared.lock().await;
            std::future::pending::<()>().await;
            Ok::<(), ShellError>(())
        };
        let signal = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "SIGTERM"
        };
        let exit = run_until_shutdown(holder.clone(), shell, signal).await;

        assert_eq!(exit, ShellExit::Signalled("SIGTERM"));
        assert_eq!(exit.code(), 130);
        assert_torn_down(&holder, &service).await;
    }
}
