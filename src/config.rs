//! Configuration types for the WS-Management client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::{DEFAULT_OPERATION_TIMEOUT, DEFAULT_PATH};

/// Default AMT port without TLS.
pub const HTTP_PORT: u16 = 16992;
/// Default AMT port with TLS.
pub const HTTPS_PORT: u16 = 16993;

/// Main client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint and TLS settings
    pub connection: ConnectionConfig,

    /// Credentials and scheme
    pub auth: AuthConfig,

    /// Pull paging hints
    pub enumeration: EnumerationConfig,

    /// Diagnostic logging
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Full URL of the management endpoint.
    pub fn endpoint_url(&self) -> String {
        let conn = &self.connection;
        let scheme = if conn.use_tls { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, conn.target, conn.port(), conn.path)
    }
}

/// Endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Hostname or IP of the managed device
    pub target: String,

    /// Port override; defaults follow `use_tls`
    pub port: Option<u16>,

    /// HTTP path of the endpoint
    pub path: String,

    /// Use HTTPS
    pub use_tls: bool,

    /// Accept self-signed server certificates
    pub self_signed_allowed: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// WS-Management OperationTimeout header, as an xs:duration
    pub operation_timeout: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            target: "localhost".to_string(),
            port: None,
            path: DEFAULT_PATH.to_string(),
            use_tls: false,
            self_signed_allowed: false,
            timeout_secs: 10,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.use_tls { HTTPS_PORT } else { HTTP_PORT })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub mode: AuthMode,
}

/// HTTP authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// RFC 2617 digest, primed at connect time
    #[default]
    Digest,
    /// Basic credentials on every request
    Basic,
}

/// Pull request hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationConfig {
    /// MaxElements per Pull
    pub max_elements: u32,

    /// MaxCharacters per Pull
    pub max_characters: u32,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_elements: 999,
            max_characters: 99999,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log request and response envelopes at debug level
    pub log_messages: bool,
}
