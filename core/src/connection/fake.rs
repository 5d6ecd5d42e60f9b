//! In-memory connections with preprogrammed outcomes.
//!
//! `FakeConnectionFactory` maps URLs to a [`FakeOutcome`] and never touches
//! the network. It records every request it serves and counts how many
//! connections were opened and closed, so tests can check both the wire
//! shape of a request and that the caller released its connection.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{is_success_status, Connection, ConnectionFactory, HttpMethod};
use crate::error::ConnectionError;

/// What a fake connection does for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOutcome {
    /// Answer with this status and body.
    Respond { status: u16, body: String },
    /// `create_connection` itself fails, as with DNS or connect errors.
    FailOpen(String),
    /// The connection opens but no response code ever arrives.
    FailSend(String),
    /// The status arrives but reading the body fails.
    FailRead { status: u16, message: String },
}

impl FakeOutcome {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        FakeOutcome::Respond {
            status,
            body: body.into(),
        }
    }
}

/// A request as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Vec<RecordedRequest>,
    opened: usize,
    closed: usize,
}

/// Connection factory returning canned responses.
#[derive(Debug, Clone)]
pub struct FakeConnectionFactory {
    routes: Vec<(String, FakeOutcome)>,
    fallback: FakeOutcome,
    latency: Option<Duration>,
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnectionFactory {
    /// A factory that answers `404 Not Found` for every URL.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: FakeOutcome::status(404, "Not Found"),
            latency: None,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// A factory that gives every URL the same outcome.
    pub fn always(outcome: FakeOutcome) -> Self {
        Self::new().fallback(outcome)
    }

    /// Serve `outcome` for `url`. An exact match wins; otherwise a route
    /// without a query string matches any query on that path.
    pub fn route(mut self, url: impl Into<String>, outcome: FakeOutcome) -> Self {
        self.routes.push((url.into(), outcome));
        self
    }

    pub fn fallback(mut self, outcome: FakeOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Sleep this long before producing a response code.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    fn outcome_for(&self, url: &str) -> &FakeOutcome {
        let without_query = url.split_once('?').map_or(url, |(path, _)| path);
        self.routes
            .iter()
            .find(|(route, _)| route == url)
            .or_else(|| self.routes.iter().find(|(route, _)| route == without_query))
            .map_or(&self.fallback, |(_, outcome)| outcome)
    }
}

impl ConnectionFactory for FakeConnectionFactory {
    fn create_connection(&self, url: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        let outcome = self.outcome_for(url).clone();
        if let FakeOutcome::FailOpen(message) = &outcome {
            return Err(ConnectionError::CannotConnect {
                url: url.to_string(),
                source: Box::new(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    message.clone(),
                )),
            });
        }
        self.state.lock().opened += 1;
        Ok(Box::new(FakeConnection {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            outcome,
            latency: self.latency,
            sent: false,
            closed: false,
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    url: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    outcome: FakeOutcome,
    latency: Option<Duration>,
    sent: bool,
    closed: bool,
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnection {
    fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed {
                url: self.url.clone(),
            });
        }
        Ok(())
    }

    fn body_reader(&self) -> Box<dyn Read + '_> {
        match &self.outcome {
            FakeOutcome::Respond { body, .. } => Box::new(body.as_bytes()),
            FakeOutcome::FailRead { message, .. } => Box::new(FailingReader(message)),
            FakeOutcome::FailOpen(_) | FakeOutcome::FailSend(_) => Box::new(io::empty()),
        }
    }
}

impl Connection for FakeConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn set_method(&mut self, method: HttpMethod) {
        self.method = method;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn response_code(&mut self) -> Result<u16, ConnectionError> {
        self.ensure_open()?;
        if !self.sent {
            self.sent = true;
            self.state.lock().requests.push(RecordedRequest {
                url: self.url.clone(),
                method: self.method,
                headers: self.headers.clone(),
            });
            if let Some(latency) = self.latency {
                std::thread::sleep(latency);
            }
        }
        match &self.outcome {
            FakeOutcome::Respond { status, .. } | FakeOutcome::FailRead { status, .. } => {
                Ok(*status)
            }
            FakeOutcome::FailSend(message) | FakeOutcome::FailOpen(message) => {
                Err(ConnectionError::CannotConnect {
                    url: self.url.clone(),
                    source: Box::new(io::Error::new(io::ErrorKind::TimedOut, message.clone())),
                })
            }
        }
    }

    fn input_stream(&mut self) -> Result<Box<dyn Read + '_>, ConnectionError> {
        self.response_code()?;
        Ok(self.body_reader())
    }

    fn error_stream(&mut self) -> Option<Box<dyn Read + '_>> {
        let status = self.response_code().ok()?;
        if is_success_status(status) {
            return None;
        }
        Some(self.body_reader())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().closed += 1;
        }
    }
}

struct FailingReader<'a>(&'a str);

impl Read for FailingReader<'_> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, self.0.to_string()))
    }
}
