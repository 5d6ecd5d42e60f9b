//! Transport abstraction.
//!
//! # Design
//! `ConnectionFactory` turns a URL into a `Connection`; a `Connection` is
//! the handle for exactly one request. The surface is small:
//! method, headers, status, the success and error body streams, and
//! `close()`. Two factories ship with the crate: [`http::HttpConnectionFactory`]
//! over real sockets and [`fake::FakeConnectionFactory`] for tests.
//!
//! Callers hold connections through [`ConnectionGuard`], which calls
//! `close()` when dropped so no exit path can leak one.

pub mod fake;
pub mod http;

use std::fmt;
use std::io::Read;
use std::ops::{Deref, DerefMut};

use crate::error::ConnectionError;

/// HTTP method of a request. Only GET is issued by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request's transport handle.
pub trait Connection: Send {
    fn url(&self) -> &str;

    fn set_method(&mut self, method: HttpMethod);

    fn set_header(&mut self, name: &str, value: &str);

    /// Send the request if it has not been sent yet and return the status.
    /// Later calls return the same code without touching the network.
    fn response_code(&mut self) -> Result<u16, ConnectionError>;

    /// Body of a successful response.
    fn input_stream(&mut self) -> Result<Box<dyn Read + '_>, ConnectionError>;

    /// Body of a non-2xx response, if the server sent one.
    fn error_stream(&mut self) -> Option<Box<dyn Read + '_>>;

    /// Release the underlying transport. Calling it twice is harmless.
    fn close(&mut self);
}

/// Creates connections for URLs.
pub trait ConnectionFactory: Send + Sync {
    fn create_connection(&self, url: &str) -> Result<Box<dyn Connection>, ConnectionError>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&str) -> Result<Box<dyn Connection>, ConnectionError> + Send + Sync,
{
    fn create_connection(&self, url: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        self(url)
    }
}

/// Owns a connection and closes it on drop.
pub struct ConnectionGuard {
    inner: Box<dyn Connection>,
}

impl ConnectionGuard {
    pub fn new(inner: Box<dyn Connection>) -> Self {
        Self { inner }
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// 2xx check used to pick the success or error stream.
pub fn is_success_status(code: u16) -> bool {
    (200..300).contains(&code)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingConnection {
        closes: Arc<AtomicUsize>,
    }

    impl Connection for CountingConnection {
        fn url(&self) -> &str {
            "http://localhost/"
        }
        fn set_method(&mut self, _method: HttpMethod) {}
        fn set_header(&mut self, _name: &str, _value: &str) {}
        fn response_code(&mut self) -> Result<u16, ConnectionError> {
            Ok(204)
        }
        fn input_stream(&mut self) -> Result<Box<dyn Read + '_>, ConnectionError> {
            Ok(Box::new(std::io::empty()))
        }
        fn error_stream(&mut self) -> Option<Box<dyn Read + '_>> {
            None
        }
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = ConnectionGuard::new(Box::new(CountingConnection {
                closes: closes.clone(),
            }));
            assert_eq!(guard.response_code().unwrap(), 204);
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closures_are_factories() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = closes.clone();
        let factory = move |_url: &str| -> Result<Box<dyn Connection>, ConnectionError> {
            Ok(Box::new(CountingConnection {
                closes: counter.clone(),
            }))
        };
        let conn = factory.create_connection("http://localhost/").unwrap();
        drop(ConnectionGuard::new(conn));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn success_status_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(299));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
        assert!(!is_success_status(404));
    }
}
