//! Request descriptions.
//!
//! # Design
//! A `Command<T>` fully describes one GET: the resource path, query
//! parameters, headers, and (as a type parameter) the shape the response
//! body is deserialized into. It is immutable once built; `CommandBuilder`
//! is the only way to add parameters. Parameters are kept in insertion
//! order as `(String, String)` pairs, with repeated keys replacing earlier
//! values so that keys stay unique.

use std::fmt;
use std::marker::PhantomData;

use crate::error::NetError;

/// One outbound GET request whose 2xx body deserializes into `T`.
pub struct Command<T> {
    path: String,
    query_params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    response_type: PhantomData<fn() -> T>,
}

impl<T> Command<T> {
    /// A command with no query parameters or headers.
    pub fn get(path: impl Into<String>) -> Self {
        Self::builder(path).build()
    }

    pub fn builder(path: impl Into<String>) -> CommandBuilder<T> {
        CommandBuilder {
            path: path.into(),
            query_params: Vec::new(),
            headers: Vec::new(),
            response_type: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Header lookup; names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Name of the type the response body is parsed into, for logging.
    pub fn response_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// Reject header names that are not HTTP tokens and values carrying
    /// line breaks.
    pub fn validate_headers(&self) -> Result<(), NetError> {
        for (name, value) in &self.headers {
            if name.is_empty() || !name.bytes().all(is_token_byte) {
                return Err(NetError::malformed(format!("invalid header name {name:?}")));
            }
            if value.contains(['\r', '\n']) {
                return Err(NetError::malformed(format!(
                    "header {name} contains a line break"
                )));
            }
        }
        Ok(())
    }
}

// Manual impls: a derive would demand `T: Clone` / `T: Debug` for the marker.
impl<T> Clone for Command<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            query_params: self.query_params.clone(),
            headers: self.headers.clone(),
            response_type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path)
            .field("query_params", &self.query_params)
            .field("headers", &self.headers)
            .field("response_type", &self.response_type_name())
            .finish()
    }
}

/// Builder for [`Command`].
pub struct CommandBuilder<T> {
    path: String,
    query_params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    response_type: PhantomData<fn() -> T>,
}

impl<T> CommandBuilder<T> {
    /// Add a query parameter. A repeated key replaces the earlier value in
    /// place.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query_params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query_params.push((key, value)),
        }
        self
    }

    /// Add a header. A repeated name (any case) replaces the earlier value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn build(self) -> Command<T> {
        Command {
            path: self.path,
            query_params: self.query_params,
            headers: self.headers,
            response_type: PhantomData,
        }
    }
}

/// RFC 9110 `tchar`.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Todo;

    #[test]
    fn get_has_no_params() {
        let cmd: Command<Vec<Todo>> = Command::get("/todos");
        assert_eq!(cmd.path(), "/todos");
        assert!(cmd.query_params().is_empty());
        assert!(cmd.headers().is_empty());
    }

    #[test]
    fn query_keeps_insertion_order_and_unique_keys() {
        let cmd: Command<()> = Command::builder("/api/Lookup")
            .query("pageNumber", "1")
            .query("pageSize", "10")
            .query("pageNumber", "2")
            .build();
        assert_eq!(
            cmd.query_params(),
            &[
                ("pageNumber".to_string(), "2".to_string()),
                ("pageSize".to_string(), "10".to_string()),
            ]
        );
        assert_eq!(cmd.query_param("pageSize"), Some("10"));
        assert_eq!(cmd.query_param("missing"), None);
    }

    #[test]
    fn header_replacement_ignores_case() {
        let cmd: Command<()> = Command::builder("/todos")
            .header("Accept", "text/plain")
            .header("accept", "application/json")
            .build();
        assert_eq!(cmd.headers().len(), 1);
        assert_eq!(cmd.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn validate_headers_rejects_bad_names_and_values() {
        let ok: Command<()> = Command::builder("/").header("X-Trace-Id", "abc").build();
        assert!(ok.validate_headers().is_ok());

        let bad_name: Command<()> = Command::builder("/").header("Bad Name", "x").build();
        assert!(matches!(
            bad_name.validate_headers(),
            Err(NetError::MalformedRequest(_))
        ));

        let empty_name: Command<()> = Command::builder("/").header("", "x").build();
        assert!(empty_name.validate_headers().is_err());

        let injected: Command<()> = Command::builder("/")
            .header("X-Note", "a\r\nHost: evil")
            .build();
        assert!(injected.validate_headers().is_err());
    }

    #[test]
    fn clone_and_debug_do_not_need_t_bounds() {
        struct Opaque;
        let cmd: Command<Opaque> = Command::builder("/x").query("a", "1").build();
        let copy = cmd.clone();
        assert_eq!(copy.query_param("a"), Some("1"));
        let debug = format!("{copy:?}");
        assert!(debug.contains("Opaque"));
    }
}
