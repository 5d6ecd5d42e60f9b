//! Typed façade over `NetworkManager` for the todo endpoints.
//!
//! Each method builds one fixed `Command` and delegates. New endpoints
//! follow the same shape: a public `*_command` constructor plus a thin
//! method that passes it to `get`.

use crate::command::Command;
use crate::error::NetError;
use crate::manager::{Callback, NetworkManager};
use crate::result::NetResult;
use crate::types::Todo;

/// Public JSONPlaceholder endpoint serving the todo schema.
pub const JSON_PLACEHOLDER_URL: &str = "https://jsonplaceholder.typicode.com";

pub const TODOS_PATH: &str = "/todos";

#[derive(Debug, Clone)]
pub struct TodoApi {
    manager: NetworkManager,
}

impl TodoApi {
    pub fn new(manager: NetworkManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &NetworkManager {
        &self.manager
    }

    pub fn todos_command() -> Command<Vec<Todo>> {
        Command::get(TODOS_PATH)
    }

    pub fn todo_command(id: u64) -> Command<Todo> {
        Command::get(format!("{TODOS_PATH}/{id}"))
    }

    pub fn user_todos_command(user_id: u64) -> Command<Vec<Todo>> {
        Command::builder(TODOS_PATH)
            .query("userId", user_id.to_string())
            .build()
    }

    /// GET `/todos`.
    pub fn get_todos(&self, callback: impl Callback<Vec<Todo>>) -> Result<(), NetError> {
        self.manager.get(Self::todos_command(), callback)
    }

    /// GET `/todos/{id}`.
    pub fn get_todo(&self, id: u64, callback: impl Callback<Todo>) -> Result<(), NetError> {
        self.manager.get(Self::todo_command(id), callback)
    }

    /// GET `/todos?userId={user_id}`.
    pub fn get_todos_for_user(
        &self,
        user_id: u64,
        callback: impl Callback<Vec<Todo>>,
    ) -> Result<(), NetError> {
        self.manager.get(Self::user_todos_command(user_id), callback)
    }

    pub async fn fetch_todos(&self) -> Result<NetResult<Vec<Todo>>, NetError> {
        self.manager.fetch(Self::todos_command()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_have_fixed_shapes() {
        assert_eq!(TodoApi::todos_command().path(), "/todos");
        assert!(TodoApi::todos_command().query_params().is_empty());

        assert_eq!(TodoApi::todo_command(7).path(), "/todos/7");

        let by_user = TodoApi::user_todos_command(2);
        assert_eq!(by_user.path(), "/todos");
        assert_eq!(by_user.query_param("userId"), Some("2"));
    }
}
