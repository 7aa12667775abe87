//! Configuration module
//!
//! This module loads the shell configuration from the config file and applies
//! environment overrides (a `.env` file is honoured by `main`).

pub mod storage;

pub use storage::ShellConfig;

use crate::error::{Result, ShellError};
use std::str::FromStr;

/// Environment variable overriding the service host
pub const ENV_HOST: &str = "EVITA_SHELL_HOST";
/// Environment variable overriding the service port
pub const ENV_PORT: &str = "EVITA_SHELL_PORT";
/// Environment variable overriding the endpoint scheme
pub const ENV_SCHEME: &str = "EVITA_SHELL_SCHEME";
/// Environment variable overriding the number of bootstrap attempts
pub const ENV_CONNECT_ATTEMPTS: &str = "EVITA_SHELL_CONNECT_ATTEMPTS";
/// Environment variable overriding the delay between bootstrap attempts
pub const ENV_RETRY_DELAY_MS: &str = "EVITA_SHELL_RETRY_DELAY_MS";

/// Load the configuration file and apply overrides from the process environment
pub fn load() -> Result<ShellConfig> {
    let mut config = ShellConfig::load()?;
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply overrides looked up through `lookup`
pub fn apply_overrides<F>(config: &mut ShellConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_HOST) {
        config.host = host;
    }
    if let Some(port) = lookup(ENV_PORT) {
        config.port = parse_var(ENV_PORT, &port)?;
    }
    if let Some(scheme) = lookup(ENV_SCHEME) {
        // Reject schemes no backend understands
        crate::database::ServiceBackend::from_str(&scheme)?;
        config.scheme = scheme.to_lowercase();
    }
    if let Some(attempts) = lookup(ENV_CONNECT_ATTEMPTS) {
        config.connect_attempts = parse_var(ENV_CONNECT_ATTEMPTS, &attempts)?;
    }
    if let Some(delay) = lookup(ENV_RETRY_DELAY_MS) {
        config.retry_delay_ms = parse_var(ENV_RETRY_DELAY_MS, &delay)?;
    }
    Ok(())
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ShellError::Config(format!("{} has invalid value {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = ShellConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                (ENV_HOST, "evita.local"),
                (ENV_PORT, "5555"),
                (ENV_SCHEME, "HTTPS"),
                (ENV_CONNECT_ATTEMPTS, "3"),
            ]),
        )
        .unwrap();

        assert_eq!(config.endpoint(), "https://evita.local:5555");
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.retry_delay_ms, 300);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = ShellConfig::default();
        let err = apply_overrides(&mut config, lookup_from(&[(ENV_PORT, "70000")])).unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));

        let err = apply_overrides(&mut config, lookup_from(&[(ENV_SCHEME, "grpc")])).unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
    }
}
