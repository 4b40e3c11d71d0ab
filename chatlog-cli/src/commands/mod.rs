//! Command implementations for chatlog CLI

pub mod export;
pub mod replay;

// Re-export main dispatcher functions for flat access from main.rs
pub use export::run_export;
pub use replay::run_replay;

use anyhow::{Context, Result};
use clap::Args;

use crate::client::{AssistantClient, Auth, ClientOptions};
use crate::config::ServiceConfig;

// === Shared Arg Structs ===

#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// API key for the assistant service
    #[arg(long, env = "CHATLOG_APIKEY", hide_env_values = true)]
    pub apikey: Option<String>,

    /// Username and password as username:password
    #[arg(long, env = "CHATLOG_USERPASS", hide_env_values = true)]
    pub userpass: Option<String>,
}

impl AuthArgs {
    pub fn resolve(&self) -> Result<Auth> {
        Ok(Auth::resolve(self.apikey.clone(), self.userpass.clone())?)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Service base URL [default: from config, else the public gateway]
    #[arg(long, env = "CHATLOG_URL")]
    pub url: Option<String>,

    /// API version date [default: 2020-04-01]
    #[arg(long)]
    pub version: Option<String>,

    /// Request timeout in seconds [default: 60]
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ServiceArgs {
    /// Merge flags over the config file's `[service]` section.
    pub fn client_options(&self, service: &ServiceConfig) -> ClientOptions {
        ClientOptions {
            base_url: self.url.clone().unwrap_or_else(|| service.url.clone()),
            version: self.version.clone().unwrap_or_else(|| service.version.clone()),
            timeout: self
                .timeout
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| service.timeout()),
        }
    }
}

/// Build a client from merged service options and credentials.
pub fn connect(service: &ServiceArgs, auth: &AuthArgs, defaults: &ServiceConfig) -> Result<AssistantClient> {
    let auth = auth.resolve()?;
    let options = service.client_options(defaults);
    AssistantClient::new(&options, auth)
        .with_context(|| format!("Failed to create client for {}", options.base_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flags_override_service_config() {
        let args = ServiceArgs {
            url: Some("http://localhost:9000".to_string()),
            version: None,
            timeout: Some(5),
        };
        let options = args.client_options(&ServiceConfig::default());

        assert_eq!(options.base_url, "http://localhost:9000");
        assert_eq!(options.version, "2020-04-01");
        assert_eq!(options.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let args = AuthArgs {
            apikey: None,
            userpass: None,
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("--userpass or --apikey"));
    }
}
