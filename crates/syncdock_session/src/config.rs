//! Session configuration.

use crate::endpoint::{BasicCredentials, ProxySettings};
use std::time::Duration;

/// Configuration for one [`crate::SyncSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the local store.
    pub store_name: String,
    /// Remote endpoint hostname.
    pub hostname: String,
    /// Host platform proxy settings; port zero disables the proxy.
    pub proxy: ProxySettings,
    /// Endpoint credentials.
    pub credentials: BasicCredentials,
    /// Deadline for the blocking start wait.
    pub start_wait_timeout: Duration,
    /// Deadline for the blocking stop wait.
    pub stop_wait_timeout: Duration,
}

impl SessionConfig {
    /// Creates a configuration for `hostname` with the default store name
    /// and wait deadlines.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            store_name: "db".into(),
            hostname: hostname.into(),
            proxy: ProxySettings::default(),
            credentials: BasicCredentials::new("", ""),
            start_wait_timeout: Duration::from_secs(30),
            stop_wait_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the local store name.
    #[must_use]
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Sets the proxy settings.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }

    /// Sets the endpoint credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the start wait deadline.
    #[must_use]
    pub fn with_start_wait_timeout(mut self, timeout: Duration) -> Self {
        self.start_wait_timeout = timeout;
        self
    }

    /// Sets the stop wait deadline.
    #[must_use]
    pub fn with_stop_wait_timeout(mut self, timeout: Duration) -> Self {
        self.stop_wait_timeout = timeout;
        self
    }
}
