//! Error types for the networking layer.
//!
//! # Design
//! Two layers. `ConnectionError` describes transport failures raised by a
//! `Connection` or `ConnectionFactory`. `NetError` is what callers see: it is
//! returned directly for construction-time misuse (`MalformedRequest`,
//! `InvalidConfig`) and carried as the `exception` of a `NetResult::Error`
//! for failures that happen while a request runs.
//!
//! A non-2xx status is not an error value here. It is reported through
//! `NetResult::Error` with the status code and body and no exception.

use std::error::Error as StdError;

/// Boxed transport cause, kept as the `source()` of a `ConnectionError`.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Transport-level failure before or while reading an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The URL handed to the factory is not something it can connect to.
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// DNS, TCP, TLS or timeout failure; no response code was received.
    #[error("cannot connect to {url}: {source}")]
    CannotConnect {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),

    /// The connection was used after `close()`.
    #[error("connection to {url} is closed")]
    Closed { url: String },
}

/// Errors surfaced by the networking layer.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Bad base path, path, query key or header. Raised before any I/O.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Client configuration that cannot be honoured (e.g. a zero timeout).
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request worker pool could not be started.
    #[error("failed to start request workers: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A 2xx body that does not deserialize into the expected type.
    #[error("failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// A 2xx body that is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The connection layer panicked while serving a request.
    #[error("request worker panicked: {0}")]
    WorkerPanicked(String),
}

impl NetError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        NetError::MalformedRequest(message.into())
    }

    /// True for the failures that happen before any response code is known.
    pub fn is_connection(&self) -> bool {
        matches!(self, NetError::Connection(_) | NetError::WorkerPanicked(_))
    }

    /// True when a 2xx body could not be turned into the response type.
    pub fn is_parse(&self) -> bool {
        matches!(self, NetError::Parse(_) | NetError::InvalidUtf8(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_keeps_its_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConnectionError::CannotConnect {
            url: "http://localhost:1/todos".to_string(),
            source: Box::new(io),
        };
        assert_eq!(
            err.to_string(),
            "cannot connect to http://localhost:1/todos: refused"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn net_error_classifies_causes() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(NetError::from(parse).is_parse());

        let conn = ConnectionError::Closed {
            url: "http://localhost".to_string(),
        };
        let err = NetError::from(conn);
        assert!(err.is_connection());
        assert!(!err.is_parse());

        assert!(!NetError::malformed("empty path").is_connection());
    }
}
