//! Socket-backed connections built on `ureq`.
//!
//! # Design
//! One shared `ureq::Agent` per factory carries the timeouts; each
//! `HttpConnection` borrows a clone of it and sends its request lazily on
//! the first `response_code()` call. Status codes are never turned into
//! transport errors: a 404 is a response, not a failure to connect.

use std::fmt;
use std::io::Read;

use tracing::{debug, warn};
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

use super::{is_success_status, Connection, ConnectionFactory, HttpMethod};
use crate::config::ClientConfig;
use crate::error::ConnectionError;

/// Factory for real HTTP/1.1 connections over TCP or TLS.
#[derive(Clone)]
pub struct HttpConnectionFactory {
    agent: Agent,
}

impl fmt::Debug for HttpConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnectionFactory").finish_non_exhaustive()
    }
}

impl HttpConnectionFactory {
    /// Build a factory using the timeouts in `config`.
    pub fn new(config: &ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl ConnectionFactory for HttpConnectionFactory {
    fn create_connection(&self, url: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        let parsed = Url::parse(url).map_err(|e| ConnectionError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConnectionError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(Box::new(HttpConnection {
            agent: self.agent.clone(),
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            response: None,
            closed: false,
        }))
    }
}

/// A single GET over a real socket.
pub struct HttpConnection {
    agent: Agent,
    url: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    response: Option<Response<Body>>,
    closed: bool,
}

impl HttpConnection {
    fn send(&mut self) -> Result<&mut Response<Body>, ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed {
                url: self.url.clone(),
            });
        }
        if self.response.is_none() {
            debug!(method = %self.method, url = %self.url, "sending request");
            let mut request = match self.method {
                HttpMethod::Get => self.agent.get(self.url.as_str()),
            };
            for (name, value) in &self.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request.call().map_err(|e| {
                warn!(url = %self.url, error = %e, "transport failure");
                ConnectionError::CannotConnect {
                    url: self.url.clone(),
                    source: Box::new(e),
                }
            })?;
            self.response = Some(response);
        }
        self.response.as_mut().ok_or_else(|| ConnectionError::Closed {
            url: self.url.clone(),
        })
    }
}

impl Connection for HttpConnection {
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
        Ok(self.send()?.status().as_u16())
    }

    fn input_stream(&mut self) -> Result<Box<dyn Read + '_>, ConnectionError> {
        let response = self.send()?;
        Ok(Box::new(response.body_mut().as_reader()))
    }

    fn error_stream(&mut self) -> Option<Box<dyn Read + '_>> {
        let response = self.response.as_mut()?;
        if is_success_status(response.status().as_u16()) {
            return None;
        }
        Some(Box::new(response.body_mut().as_reader()))
    }

    fn close(&mut self) {
        // Dropping the response hands the socket back to the agent or shuts it.
        self.response = None;
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> HttpConnectionFactory {
        HttpConnectionFactory::new(&ClientConfig::new("http://localhost"))
    }

    #[test]
    fn rejects_non_http_urls() {
        for url in ["not a url", "ftp://example.com/file"] {
            let err = factory().create_connection(url).err().unwrap();
            assert!(matches!(err, ConnectionError::InvalidUrl { .. }), "{url}");
        }
    }

    #[test]
    fn closed_connection_refuses_to_send() {
        let mut conn = factory().create_connection("http://127.0.0.1:9/").unwrap();
        conn.close();
        assert!(matches!(
            conn.response_code(),
            Err(ConnectionError::Closed { .. })
        ));
        assert!(conn.error_stream().is_none());
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut conn = HttpConnection {
            agent: factory().agent,
            url: "http://localhost/".to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            response: None,
            closed: false,
        };
        conn.set_header("Accept", "text/plain");
        conn.set_header("accept", "application/json");
        assert_eq!(
            conn.headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }
}
