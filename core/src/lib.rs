//! Client-side networking layer for JSON REST endpoints.
//!
//! # Overview
//! Issues GET requests built from a base path plus a [`Command`], parses the
//! 2xx body into the command's response type, and reports a [`NetResult`]
//! to a callback on a caller-chosen delivery context.
//!
//! # Design
//! - [`HttpClient`] owns the base path and a [`ConnectionFactory`]; it only
//!   builds URLs and opens connections.
//! - [`NetworkManager`] executes requests on a worker pool and hands
//!   results to a [`Dispatcher`]; it also offers `fetch` (a future) and
//!   `execute` (blocking).
//! - The transport is swappable: [`HttpConnectionFactory`] talks to real
//!   servers, [`FakeConnectionFactory`] answers from memory for tests.
//! - [`TodoApi`] shows the façade pattern for typed endpoints.
//!
//! ```no_run
//! use netlayer_core::{DeliveryQueue, NetResult, NetworkManager, Todo, TodoApi, JSON_PLACEHOLDER_URL};
//! use std::time::Duration;
//!
//! let ui = DeliveryQueue::new();
//! let manager = NetworkManager::create(JSON_PLACEHOLDER_URL, ui.dispatcher())?;
//! let api = TodoApi::new(manager);
//! api.get_todos(|result: NetResult<Vec<Todo>>| match result.data() {
//!     Some(todos) => println!("{} todos", todos.len()),
//!     None => eprintln!("failed: {:?}", result.response_code()),
//! })?;
//! ui.run_until(1, Duration::from_secs(30));
//! # Ok::<(), netlayer_core::NetError>(())
//! ```

pub mod api;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod result;
pub mod types;
pub mod url_builder;

pub use api::{TodoApi, JSON_PLACEHOLDER_URL};
pub use client::HttpClient;
pub use command::{Command, CommandBuilder};
pub use config::ClientConfig;
pub use connection::fake::{FakeConnectionFactory, FakeOutcome, RecordedRequest};
pub use connection::http::HttpConnectionFactory;
pub use connection::{Connection, ConnectionFactory, HttpMethod};
pub use dispatch::{DeliveryQueue, Dispatcher, QueueDispatcher, Task};
pub use error::{ConnectionError, NetError};
pub use manager::{Callback, NetworkManager, NetworkManagerBuilder};
pub use result::{ErrorKind, NetResult, NO_RESPONSE};
pub use types::Todo;
