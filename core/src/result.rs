//! Outcome of a single request.
//!
//! # Design
//! `NetResult` is a plain enum so call sites match on it exhaustively. The
//! `Error` variant keeps the raw pieces a UI needs to explain a failure: the
//! HTTP status (or [`NO_RESPONSE`]), the body text, and the captured cause.
//! Which of the three failure classes produced it is recovered with
//! [`NetResult::kind`].

use crate::error::NetError;

/// Response code reported when no HTTP response was received at all.
pub const NO_RESPONSE: u16 = 0;

/// Result of one request: the parsed body, or everything known about the
/// failure.
#[derive(Debug)]
pub enum NetResult<T> {
    Success {
        data: T,
    },
    Error {
        response_code: u16,
        error_body: String,
        exception: Option<NetError>,
    },
}

/// The failure class behind a `NetResult::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No HTTP response (DNS, connect, TLS, timeout, broken body stream).
    Connection,
    /// A non-2xx status.
    Http,
    /// A 2xx body that did not parse.
    Parse,
}

impl<T> NetResult<T> {
    pub fn success(data: T) -> Self {
        NetResult::Success { data }
    }

    pub fn http_error(response_code: u16, error_body: impl Into<String>) -> Self {
        NetResult::Error {
            response_code,
            error_body: error_body.into(),
            exception: None,
        }
    }

    pub fn parse_error(response_code: u16, raw_body: impl Into<String>, cause: NetError) -> Self {
        NetResult::Error {
            response_code,
            error_body: raw_body.into(),
            exception: Some(cause),
        }
    }

    /// A failure with no response code.
    pub fn connection_error(cause: impl Into<NetError>) -> Self {
        NetResult::Error {
            response_code: NO_RESPONSE,
            error_body: String::new(),
            exception: Some(cause.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NetResult::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NetResult::Error { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            NetResult::Success { data } => Some(data),
            NetResult::Error { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            NetResult::Success { data } => Some(data),
            NetResult::Error { .. } => None,
        }
    }

    pub fn response_code(&self) -> Option<u16> {
        match self {
            NetResult::Error { response_code, .. } => Some(*response_code),
            NetResult::Success { .. } => None,
        }
    }

    pub fn error_body(&self) -> Option<&str> {
        match self {
            NetResult::Error { error_body, .. } => Some(error_body),
            NetResult::Success { .. } => None,
        }
    }

    pub fn exception(&self) -> Option<&NetError> {
        match self {
            NetResult::Error { exception, .. } => exception.as_ref(),
            NetResult::Success { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            NetResult::Success { .. } => None,
            NetResult::Error {
                exception: None, ..
            } => Some(ErrorKind::Http),
            NetResult::Error {
                exception: Some(cause),
                ..
            } if cause.is_parse() => Some(ErrorKind::Parse),
            NetResult::Error { .. } => Some(ErrorKind::Connection),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::Http) && self.response_code() == Some(404)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NetResult<U> {
        match self {
            NetResult::Success { data } => NetResult::Success { data: f(data) },
            NetResult::Error {
                response_code,
                error_body,
                exception,
            } => NetResult::Error {
                response_code,
                error_body,
                exception,
            },
        }
    }
}
