//! Replication endpoint configuration.
//!
//! The endpoint is derived from a hostname and a fixed policy: WebSocket
//! over TLS on port 443, store path `/db`, pull-only, non-continuous. A
//! configuration is an immutable snapshot; reconfiguration always builds a
//! fresh value so no proxy or trust state leaks across sessions.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};

/// URL scheme for the replication endpoint.
pub const ENDPOINT_SCHEME: &str = "wss";
/// Port the replication endpoint listens on.
pub const ENDPOINT_PORT: u16 = 443;
/// Remote store path component of the endpoint URL.
pub const ENDPOINT_DB_PATH: &str = "db";

/// Root certificates trusted for the public replication endpoint.
pub const TRUSTED_ROOT_CERTIFICATES: &str = "\
-----BEGIN CERTIFICATE-----
MIIDdzCCAl+gAwIBAgIEAgAAuTANBgkqhkiG9w0BAQUFADBaMQswCQYDVQQGEwJJ
RTESMBAGA1UEChMJQmFsdGltb3JlMRMwEQYDVQQLEwpDeWJlclRydXN0MSIwIAYD
VQQDExlCYWx0aW1vcmUgQ3liZXJUcnVzdCBSb290MB4XDTAwMDUxMjE4NDYwMFoX
DTI1MDUxMjIzNTkwMFowWjELMAkGA1UEBhMCSUUxEjAQBgNVBAoTCUJhbHRpbW9y
ZTETMBEGA1UECxMKQ3liZXJUcnVzdDEiMCAGA1UEAxMZQmFsdGltb3JlIEN5YmVy
VHJ1c3QgUm9vdDCCASIwDQYJKoZIhvcNAQEBBQADggEPADCCAQoCggEBAKMEuyKr
mD1X6CZymrV51Cni4eiVgLGw41uOKymaZN+hXe2wCQVt2yguzmKiYv60iNoS6zjr
IZ3AQSsBUnuId9Mcj8e6uYi1agnnc+gRQKfRzMpijS3ljwumUNKoUMMo6vWrJYeK
mpYcqWe4PwzV9/lSEy/CG9VwcPCPwBLKBsua4dnKM3p31vjsufFoREJIE9LAwqSu
XmD+tqYF/LTdB1kC1FkYmGP1pWPgkAx9XbIGevOF6uvUA65ehD5f/xXtabz5OTZy
dc93Uk3zyZAsuT3lySNTPx8kmCFcB5kpvcY67Oduhjprl3RjM71oGDHweI12v/ye
jl0qhqdNkNwnGjkCAwEAAaNFMEMwHQYDVR0OBBYEFOWdWTCCR1jMrPoIVDaGezq1
BE3wMBIGA1UdEwEB/wQIMAYBAf8CAQMwDgYDVR0PAQH/BAQDAgEGMA0GCSqGSIb3
DQEBBQUAA4IBAQCFDF2O5G9RaEIFoN27TyclhAO992T9Ldcw46QQF+vaKSm2eT92
9hkTI7gQCvlYpNRhcL0EYWoSihfVCr3FvDB81ukMJY2GQE/szKN+OMY3EU/t3Wgx
jkzSswF07r51XgdIGn9w/xZchMB5hbgF/X++ZRGjD8ACtPhSNzkE1akxehi/oCr0
Epn3o0WC4zxe9Z2etciefC7IpJ5OCBRLbf1wbWsaY71k5h+3zvDyny67G7fyUIhz
ksLi4xaNmjICq44Y3ekQEe5+NauQrz4wlHrQMz2nZQ/1/I6eYs9HRCwBXbsdtTLS
R9I4LtD+gdwyah617jzV/OeBHRnDJELqYzmp
-----END CERTIFICATE-----
";

/// Proxy tunnel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyKind {
    /// Plain HTTP CONNECT proxy.
    Http,
    /// HTTPS CONNECT proxy.
    Https,
}

/// Proxy configuration supplied by the host platform.
///
/// A port of zero means no proxy is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Tunnel type.
    pub kind: ProxyKind,
    /// Proxy hostname.
    pub hostname: String,
    /// Proxy port; zero disables the proxy.
    pub port: u16,
    /// Proxy username, empty if unauthenticated.
    pub username: String,
    /// Proxy password, empty if unauthenticated.
    pub password: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            kind: ProxyKind::Http,
            hostname: String::new(),
            port: 0,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Basic-auth credentials presented to the replication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl BasicCredentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Replication direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationMode {
    /// Remote changes are pulled into the local store.
    Pull,
    /// Local changes are pushed to the remote endpoint.
    Push,
    /// Both directions.
    PushAndPull,
}

/// An immutable replication target snapshot.
///
/// Built by [`EndpointConfigurator::build`]; rebuilt wholesale whenever
/// the store handle or hostname changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Full endpoint URL.
    pub url: String,
    /// Proxy to tunnel through, when one is configured.
    pub proxy: Option<ProxySettings>,
    /// PEM bundle of trusted root certificates.
    pub trusted_roots: &'static str,
    /// Endpoint credentials.
    pub auth: BasicCredentials,
    /// Replication direction; fixed to pull.
    pub mode: ReplicationMode,
    /// Whether the replication keeps running after convergence.
    pub continuous: bool,
    /// Extra headers sent with the replication handshake.
    pub headers: Vec<(String, String)>,
}

/// Derives [`EndpointConfig`] snapshots from a hostname and the fixed
/// endpoint policy.
#[derive(Debug, Clone)]
pub struct EndpointConfigurator {
    proxy: ProxySettings,
    credentials: BasicCredentials,
}

impl EndpointConfigurator {
    /// Creates a configurator over the host-supplied proxy settings and
    /// endpoint credentials.
    pub fn new(proxy: ProxySettings, credentials: BasicCredentials) -> Self {
        Self { proxy, credentials }
    }

    /// Builds a fresh configuration snapshot for `hostname`.
    ///
    /// The proxy is included only when its port is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfiguration`] if the hostname is
    /// empty.
    pub fn build(&self, hostname: &str) -> SessionResult<EndpointConfig> {
        if hostname.is_empty() {
            return Err(SessionError::invalid_configuration(
                "replication hostname is empty",
            ));
        }

        let url = format!("{ENDPOINT_SCHEME}://{hostname}:{ENDPOINT_PORT}/{ENDPOINT_DB_PATH}");
        let proxy = (self.proxy.port > 0).then(|| self.proxy.clone());

        Ok(EndpointConfig {
            url,
            proxy,
            trusted_roots: TRUSTED_ROOT_CERTIFICATES,
            auth: self.credentials.clone(),
            mode: ReplicationMode::Pull,
            continuous: false,
            headers: Vec::new(),
        })
    }
}
