//! Client configuration.

use std::time::Duration;

use crate::error::NetError;

/// Default TCP/TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default time allowed for the response head and for the body.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of requests that may block on I/O at the same time.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Settings shared by every request a client issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_path: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Sent with every request; command headers with the same name win.
    pub default_headers: Vec<(String, String)>,
    /// Size of the worker pool a `NetworkManager` starts for itself.
    pub max_concurrent_requests: usize,
}

impl ClientConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            default_headers: vec![("Accept".to_string(), "application/json".to_string())],
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Timeouts and pool size must be non-zero. The base path is checked
    /// separately by `HttpClient::new`.
    pub fn validate(&self) -> Result<(), NetError> {
        if self.connect_timeout.is_zero() {
            return Err(NetError::InvalidConfig("connect timeout must be non-zero".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(NetError::InvalidConfig("read timeout must be non-zero".to_string()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(NetError::InvalidConfig(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
