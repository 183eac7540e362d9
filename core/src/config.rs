//! Environment-driven client configuration.

use std::env;

use tracing::{info, warn};

use crate::client::ApiClient;
use crate::cookies::CookieReader;

/// Variable holding the backend base URL.
pub const API_BASE_VAR: &str = "GOSELL_API_BASE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every request path. Empty means paths are sent as-is,
    /// which is the setup behind a same-origin proxy.
    pub api_base: String,
}

impl ClientConfig {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `load` uses the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = match lookup(API_BASE_VAR) {
            Some(value) => {
                let value = value.trim().to_string();
                if !value.is_empty() && !value.starts_with("http://") && !value.starts_with("https://") {
                    warn!("{API_BASE_VAR} has no http(s) scheme: {value}");
                }
                value
            }
            None => {
                info!("{API_BASE_VAR} not set, using relative paths");
                String::new()
            }
        };
        Self { api_base }
    }

    pub fn client<C: CookieReader>(&self, cookies: C) -> ApiClient<C> {
        ApiClient::new(&self.api_base, cookies)
    }
}
