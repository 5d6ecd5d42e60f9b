//! Domain models returned by the todo endpoints.
//!
//! Field names follow the JSONPlaceholder schema (`userId` is camelCase on
//! the wire). The mock-server crate defines its own copy; integration tests
//! catch any drift between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single todo item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub completed: bool,
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Todo{{userId={}, id={}, title='{}', completed={}}}",
            self.user_id, self.id, self.title, self.completed
        )
    }
}
