//! URL and connection plumbing shared by concrete clients.
//!
//! # Design
//! `HttpClient` holds exactly one base path and one `ConnectionFactory`,
//! both fixed at construction. It knows how to turn a `Command` into a URL
//! and a URL into a `Connection`, and nothing else: executing requests and
//! parsing bodies belong to the clients built on top of it
//! (`NetworkManager`). A client can only exist with a validated base path.

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::http::HttpConnectionFactory;
use crate::connection::{Connection, ConnectionFactory};
use crate::error::{ConnectionError, NetError};
use crate::url_builder;

/// Base path plus connection factory.
#[derive(Clone)]
pub struct HttpClient {
    base_path: Arc<str>,
    factory: Arc<dyn ConnectionFactory>,
}

impl HttpClient {
    /// Fails with `MalformedRequest` if `base_path` is not an absolute
    /// http(s) URL prefix. Trailing slashes are dropped.
    pub fn new(
        base_path: impl AsRef<str>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self, NetError> {
        let base_path = url_builder::validate_base_path(base_path.as_ref())?;
        Ok(Self {
            base_path: Arc::from(base_path),
            factory,
        })
    }

    /// Client over real sockets using the timeouts in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, NetError> {
        config.validate()?;
        Self::new(&config.base_path, Arc::new(HttpConnectionFactory::new(config)))
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn build_url_string<T>(&self, command: &Command<T>) -> Result<String, NetError> {
        url_builder::build(&self.base_path, command)
    }

    pub fn create_connection(&self, url: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        self.factory.create_connection(url)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::{FakeConnectionFactory, FakeOutcome};
    use crate::types::Todo;

    fn client() -> HttpClient {
        HttpClient::new(
            "http://localhost:3000",
            Arc::new(FakeConnectionFactory::always(FakeOutcome::ok("[]"))),
        )
        .unwrap()
    }

    #[test]
    fn build_url_string_joins_base_and_command() {
        let command: Command<Vec<Todo>> = Command::builder("/todos").query("userId", "1").build();
        assert_eq!(
            client().build_url_string(&command).unwrap(),
            "http://localhost:3000/todos?userId=1"
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = HttpClient::new(
            "http://localhost:3000/",
            Arc::new(FakeConnectionFactory::new()),
        )
        .unwrap();
        assert_eq!(client.base_path(), "http://localhost:3000");
        let command: Command<Vec<Todo>> = Command::get("/todos");
        assert_eq!(
            client.build_url_string(&command).unwrap(),
            "http://localhost:3000/todos"
        );
    }

    #[test]
    fn invalid_base_path_fails_fast() {
        let err = HttpClient::new("", Arc::new(FakeConnectionFactory::new())).unwrap_err();
        assert!(matches!(err, NetError::MalformedRequest(_)));
    }

    #[test]
    fn from_config_checks_timeouts() {
        let config = ClientConfig::new("http://localhost:3000")
            .with_read_timeout(std::time::Duration::ZERO);
        assert!(matches!(
            HttpClient::from_config(&config),
            Err(NetError::InvalidConfig(_))
        ));
        assert!(HttpClient::from_config(&ClientConfig::new("http://localhost:3000")).is_ok());
    }

    #[test]
    fn create_connection_uses_the_factory() {
        let factory = Arc::new(FakeConnectionFactory::always(FakeOutcome::ok("[]")));
        let client = HttpClient::new("http://localhost:3000", factory.clone()).unwrap();
        let mut conn = client.create_connection("http://localhost:3000/todos").unwrap();
        assert_eq!(conn.url(), "http://localhost:3000/todos");
        assert_eq!(conn.response_code().unwrap(), 200);
        assert_eq!(factory.opened(), 1);
    }
}
