//! Request execution and asynchronous delivery.
//!
//! # Design
//! `NetworkManager` wraps an [`HttpClient`] with an execution strategy:
//!
//! - URL composition and header validation run synchronously on the
//!   caller's thread, so misuse fails before anything is spawned.
//! - The blocking I/O (connect, send, read) runs on a tokio blocking pool.
//! - The finished [`NetResult`] is handed to the configured [`Dispatcher`],
//!   which runs the callback on the delivery context (never the I/O thread).
//!
//! Every failure while a request runs, including a panic in the connection
//! layer, is converted into a `NetResult::Error`, so each accepted `get()`
//! produces exactly one callback.

use std::any::Any;
use std::fmt;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

use crate::client::HttpClient;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::http::HttpConnectionFactory;
use crate::connection::{is_success_status, ConnectionFactory, ConnectionGuard, HttpMethod};
use crate::dispatch::Dispatcher;
use crate::error::{ConnectionError, NetError};
use crate::result::NetResult;

/// Receives the outcome of one request. Consumed by the call, so it can
/// run at most once.
pub trait Callback<T>: Send + 'static {
    fn on_result(self, result: NetResult<T>);
}

impl<T, F> Callback<T> for F
where
    F: FnOnce(NetResult<T>) + Send + 'static,
{
    fn on_result(self, result: NetResult<T>) {
        self(result)
    }
}

/// GET client with background execution and dispatched callbacks.
#[derive(Clone)]
pub struct NetworkManager {
    client: HttpClient,
    default_headers: Arc<[(String, String)]>,
    dispatcher: Arc<dyn Dispatcher>,
    pool: WorkerPool,
}

impl NetworkManager {
    pub fn builder(config: ClientConfig, dispatcher: impl Dispatcher + 'static) -> NetworkManagerBuilder {
        NetworkManagerBuilder {
            config,
            dispatcher: Arc::new(dispatcher),
            factory: None,
            runtime: None,
        }
    }

    /// Manager over real sockets with default timeouts and its own worker
    /// pool.
    pub fn create(
        base_path: impl Into<String>,
        dispatcher: impl Dispatcher + 'static,
    ) -> Result<Self, NetError> {
        Self::builder(ClientConfig::new(base_path), dispatcher).build()
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn base_path(&self) -> &str {
        self.client.base_path()
    }

    /// Issue a GET and deliver its result to `callback` through the
    /// dispatcher. Returns as soon as the work is queued.
    ///
    /// Fails with `MalformedRequest` before any I/O if the URL or headers
    /// are invalid; in that case the callback is dropped without running.
    pub fn get<T, C>(&self, command: Command<T>, callback: C) -> Result<(), NetError>
    where
        T: DeserializeOwned + Send + 'static,
        C: Callback<T>,
    {
        let request = self.prepare(&command)?;
        debug!(url = %request.url, response_type = request.response_type, "request queued");

        let client = self.client.clone();
        let dispatcher = self.dispatcher.clone();
        self.pool.handle.spawn_blocking(move || {
            let result = perform_guarded::<T>(&client, &request);
            dispatcher.dispatch(Box::new(move || callback.on_result(result)));
        });
        Ok(())
    }

    /// Issue a GET and resolve to its result. The outer error is the same
    /// construction-time failure `get` returns.
    pub async fn fetch<T>(&self, command: Command<T>) -> Result<NetResult<T>, NetError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = self.prepare(&command)?;
        debug!(url = %request.url, response_type = request.response_type, "request started");

        let client = self.client.clone();
        let joined = self
            .pool
            .handle
            .spawn_blocking(move || perform_guarded::<T>(&client, &request))
            .await;
        Ok(joined.unwrap_or_else(|e| {
            NetResult::connection_error(NetError::WorkerPanicked(e.to_string()))
        }))
    }

    /// Run a GET to completion on the calling thread.
    pub fn execute<T>(&self, command: &Command<T>) -> Result<NetResult<T>, NetError>
    where
        T: DeserializeOwned,
    {
        let request = self.prepare(command)?;
        Ok(perform(&self.client, &request))
    }

    fn prepare<T>(&self, command: &Command<T>) -> Result<PreparedRequest, NetError> {
        command.validate_headers()?;
        let url = self.client.build_url_string(command)?;

        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .filter(|(name, _)| command.header(name).is_none())
            .cloned()
            .collect();
        headers.extend(command.headers().iter().cloned());

        Ok(PreparedRequest {
            url,
            headers,
            response_type: command.response_type_name(),
        })
    }
}

impl fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkManager")
            .field("client", &self.client)
            .field("default_headers", &self.default_headers)
            .field("owns_runtime", &self.pool.owned.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`NetworkManager`].
pub struct NetworkManagerBuilder {
    config: ClientConfig,
    dispatcher: Arc<dyn Dispatcher>,
    factory: Option<Arc<dyn ConnectionFactory>>,
    runtime: Option<Handle>,
}

impl NetworkManagerBuilder {
    /// Replace the socket-backed factory, e.g. with a fake in tests.
    pub fn connection_factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Run request I/O on an existing runtime's blocking pool instead of
    /// starting a private one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<NetworkManager, NetError> {
        self.config.validate()?;

        let factory: Arc<dyn ConnectionFactory> = match self.factory {
            Some(factory) => factory,
            None => Arc::new(HttpConnectionFactory::new(&self.config)),
        };
        let client = HttpClient::new(&self.config.base_path, factory)?;

        let pool = match self.runtime {
            Some(handle) => WorkerPool {
                handle,
                owned: None,
            },
            None => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(1)
                    .max_blocking_threads(self.config.max_concurrent_requests)
                    .thread_name("netlayer-worker")
                    .build()
                    .map_err(NetError::Runtime)?;
                WorkerPool {
                    handle: runtime.handle().clone(),
                    owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
                }
            }
        };

        Ok(NetworkManager {
            client,
            default_headers: self.config.default_headers.into(),
            dispatcher: self.dispatcher,
            pool,
        })
    }
}

#[derive(Clone)]
struct WorkerPool {
    handle: Handle,
    owned: Option<Arc<OwnedRuntime>>,
}

/// A private runtime, shut down without blocking so the last manager clone
/// may be dropped from async code.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

struct PreparedRequest {
    url: String,
    headers: Vec<(String, String)>,
    response_type: &'static str,
}

fn perform_guarded<T: DeserializeOwned>(client: &HttpClient, request: &PreparedRequest) -> NetResult<T> {
    panic::catch_unwind(AssertUnwindSafe(|| perform(client, request))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(url = %request.url, %message, "request worker panicked");
        NetResult::connection_error(NetError::WorkerPanicked(message))
    })
}

fn perform<T: DeserializeOwned>(client: &HttpClient, request: &PreparedRequest) -> NetResult<T> {
    let connection = match client.create_connection(&request.url) {
        Ok(connection) => connection,
        Err(e) => {
            warn!(url = %request.url, error = %e, "could not open connection");
            return NetResult::connection_error(e);
        }
    };
    let mut connection = ConnectionGuard::new(connection);
    connection.set_method(HttpMethod::Get);
    for (name, value) in &request.headers {
        connection.set_header(name, value);
    }

    let code = match connection.response_code() {
        Ok(code) => code,
        Err(e) => {
            warn!(url = %request.url, error = %e, "no response");
            return NetResult::connection_error(e);
        }
    };
    debug!(url = %request.url, status = code, "response received");

    if !is_success_status(code) {
        let body = connection.error_stream().map(read_lossy).unwrap_or_default();
        return NetResult::http_error(code, body);
    }

    match connection.input_stream().and_then(read_bytes) {
        Ok(bytes) => parse_body(code, bytes, request.response_type),
        Err(e) => {
            warn!(url = %request.url, status = code, error = %e, "response body read failed");
            NetResult::Error {
                response_code: code,
                error_body: String::new(),
                exception: Some(e.into()),
            }
        }
    }
}

/// Decode a 2xx body. Blank bodies are parsed as JSON `null`, which only
/// `Option<_>` and `()` response types accept.
fn parse_body<T: DeserializeOwned>(code: u16, bytes: Vec<u8>, response_type: &str) -> NetResult<T> {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
            return NetResult::parse_error(code, lossy, e.into());
        }
    };
    let source = if text.trim().is_empty() { "null" } else { text.as_str() };
    match serde_json::from_str::<T>(source) {
        Ok(data) => NetResult::success(data),
        Err(e) => {
            warn!(status = code, response_type, error = %e, "response body did not parse");
            NetResult::parse_error(code, text, e.into())
        }
    }
}

fn read_bytes(mut stream: Box<dyn Read + '_>) -> Result<Vec<u8>, ConnectionError> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Error bodies are diagnostic text: keep whatever arrived, replacing
/// invalid UTF-8.
fn read_lossy(mut stream: Box<dyn Read + '_>) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf) {
        debug!(error = %e, "error body truncated");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::{FakeConnectionFactory, FakeOutcome};
    use crate::dispatch::DeliveryQueue;
    use crate::result::{ErrorKind, NO_RESPONSE};
    use crate::types::Todo;

    const BASE: &str = "http://api.test";
    const TODO_JSON: &str = r#"{"userId":1,"id":1,"title":"delectus aut autem","completed":false}"#;

    fn manager(factory: FakeConnectionFactory) -> NetworkManager {
        NetworkManager::builder(ClientConfig::new(BASE), DeliveryQueue::new().dispatcher())
            .connection_factory(Arc::new(factory))
            .build()
            .unwrap()
    }

    #[test]
    fn execute_parses_success() {
        let mgr = manager(FakeConnectionFactory::new().route(
            format!("{BASE}/todos/1"),
            FakeOutcome::ok(TODO_JSON),
        ));
        let result = mgr.execute(&Command::<Todo>::get("/todos/1")).unwrap();
        let todo = result.into_data().unwrap();
        assert_eq!(todo.title, "delectus aut autem");
    }

    #[test]
    fn blank_body_is_null() {
        let factory = FakeConnectionFactory::always(FakeOutcome::status(204, ""));
        let mgr = manager(factory);

        let optional = mgr.execute(&Command::<Option<Todo>>::get("/todos/1")).unwrap();
        assert!(matches!(optional, NetResult::Success { data: None }));

        let required = mgr.execute(&Command::<Todo>::get("/todos/1")).unwrap();
        assert_eq!(required.kind(), Some(ErrorKind::Parse));
        assert_eq!(required.response_code(), Some(204));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let result = parse_body::<Todo>(200, vec![0x7b, 0xff, 0x7d], "Todo");
        assert_eq!(result.kind(), Some(ErrorKind::Parse));
        assert_eq!(result.error_body(), Some("{\u{fffd}}"));
        assert!(matches!(result.exception(), Some(NetError::InvalidUtf8(_))));
    }

    #[test]
    fn command_headers_override_defaults() {
        let factory = FakeConnectionFactory::always(FakeOutcome::ok("[]"));
        let mgr = manager(factory.clone());
        let command: Command<Vec<Todo>> = Command::builder("/todos")
            .header("accept", "application/vnd.todos+json")
            .header("X-Trace", "1")
            .build();
        mgr.execute(&command).unwrap();

        let request = &factory.requests()[0];
        assert_eq!(request.header("Accept"), Some("application/vnd.todos+json"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.headers.len(), 2);
    }

    #[test]
    fn read_failure_after_status_keeps_the_code() {
        let factory = FakeConnectionFactory::always(FakeOutcome::FailRead {
            status: 200,
            message: "reset".into(),
        });
        let mgr = manager(factory.clone());
        let result = mgr.execute(&Command::<Todo>::get("/todos/1")).unwrap();
        assert_eq!(result.response_code(), Some(200));
        assert_eq!(result.error_body(), Some(""));
        assert_eq!(result.kind(), Some(ErrorKind::Connection));
        assert_eq!(factory.closed(), factory.opened());
    }

    #[test]
    fn send_failure_has_no_response_code() {
        let factory = FakeConnectionFactory::always(FakeOutcome::FailSend("timed out".into()));
        let mgr = manager(factory.clone());
        let result = mgr.execute(&Command::<Todo>::get("/todos/1")).unwrap();
        assert_eq!(result.response_code(), Some(NO_RESPONSE));
        assert_eq!(factory.closed(), 1);
    }

    #[test]
    fn panics_become_errors() {
        let client = HttpClient::new(
            BASE,
            Arc::new(|_url: &str| -> Result<Box<dyn crate::connection::Connection>, ConnectionError> {
                panic!("factory exploded")
            }),
        )
        .unwrap();
        let request = PreparedRequest {
            url: format!("{BASE}/todos"),
            headers: Vec::new(),
            response_type: "Vec<Todo>",
        };
        let result = perform_guarded::<Vec<Todo>>(&client, &request);
        match result.exception() {
            Some(NetError::WorkerPanicked(message)) => assert_eq!(message, "factory exploded"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(result.response_code(), Some(NO_RESPONSE));
    }

    #[test]
    fn malformed_header_fails_before_io() {
        let factory = FakeConnectionFactory::always(FakeOutcome::ok("[]"));
        let mgr = manager(factory.clone());
        let command: Command<Vec<Todo>> = Command::builder("/todos").header("bad header", "x").build();
        assert!(matches!(mgr.execute(&command), Err(NetError::MalformedRequest(_))));
        assert_eq!(factory.opened(), 0);
    }
}
