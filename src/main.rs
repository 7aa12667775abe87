// evita-shell: interactive shell for catalogs and entity collections
//
// This is the main entry point for the evita-shell application.

use anyhow::Context;
use evita_shell::cli::commands::format_error;
use evita_shell::cli::{Repl, TerminalMode};
use evita_shell::config::{self, ShellConfig};
use evita_shell::session::{self, create_shared_holder, SharedHolder, ShellExit};
use std::collections::BTreeSet;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit code when the catalog service stayed unreachable during startup
const EXIT_UNREACHABLE: i32 = 2;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e));
            std::process::exit(1);
        }
    };

    let bootstrap = match session::connect(&config).await {
        Ok(bootstrap) => bootstrap,
        // Unreachable service: the bootstrap already logged one diagnostic line
        Err(e) if e.is_connectivity() => std::process::exit(EXIT_UNREACHABLE),
        Err(_) => std::process::exit(1),
    };

    let (holder, catalogs) = bootstrap.into_holder();
    let holder = create_shared_holder(holder);
    let terminal = TerminalMode::capture();

    let code = match run_shell(holder.clone(), &config, &catalogs).await {
        Ok(exit) => exit.code(),
        Err(e) => {
            error!("{:#}", e);
            holder.lock().await.shutdown().await;
            1
        }
    };

    // A signal may leave the line editor parked in raw mode on the blocking
    // pool, which also keeps the runtime from shutting down; restore the
    // terminal and exit explicitly.
    terminal.restore();
    std::process::exit(code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the REPL until it stops or a signal arrives; the holder is torn down either way
async fn run_shell(
    holder: SharedHolder,
    config: &ShellConfig,
    catalogs: &BTreeSet<String>,
) -> anyhow::Result<ShellExit> {
    let mut repl = Repl::new(holder.clone(), config).context("failed to start the shell")?;
    repl.print_welcome(catalogs);

    Ok(session::run_until_shutdown(holder, async move { repl.run().await }, shutdown_signal()).await)
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}
