use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub completed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilter {
    pub user_id: Option<u64>,
    pub completed: Option<bool>,
}

/// What `/echo` saw on the wire.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct Delay {
    #[serde(default)]
    pub ms: u64,
}

pub type Db = Arc<Vec<Todo>>;

/// The first entries of JSONPlaceholder's `/todos`.
pub fn seed() -> Vec<Todo> {
    let rows = [
        (1, 1, "delectus aut autem", false),
        (1, 2, "quis ut nam facilis et officia qui", false),
        (1, 3, "fugiat veniam minus", false),
        (1, 4, "et porro tempora", true),
        (1, 5, "laboriosam mollitia et enim quasi adipisci quia provident illum", false),
        (2, 21, "suscipit repellat esse quibusdam voluptatem incidunt", false),
        (2, 22, "distinctio vitae autem nihil ut molestias quo", true),
    ];
    rows.into_iter()
        .map(|(user_id, id, title, completed)| Todo {
            user_id,
            id,
            title: title.to_string(),
            completed,
        })
        .collect()
}

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(todos: Vec<Todo>) -> Router {
    let db: Db = Arc::new(todos);
    Router::new()
        .route("/todos", get(list_todos))
        .route("/todos/{id}", get(get_todo))
        .route("/echo", get(echo))
        .route("/status/{code}", get(status))
        .route("/malformed", get(malformed))
        .route("/empty", get(empty))
        .route("/slow", get(slow))
        .layer(middleware::from_fn(log_request))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    debug!(%method, %uri, status = response.status().as_u16(), "handled");
    response
}

async fn list_todos(State(db): State<Db>, Query(filter): Query<TodoFilter>) -> Json<Vec<Todo>> {
    let todos: Vec<Todo> = db
        .iter()
        .filter(|t| filter.user_id.is_none_or(|u| t.user_id == u))
        .filter(|t| filter.completed.is_none_or(|c| t.completed == c))
        .cloned()
        .collect();
    debug!(count = todos.len(), "listing todos");
    Json(todos)
}

async fn get_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Todo>, (StatusCode, &'static str)> {
    db.iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Not Found"))
}

async fn echo(Query(query): Query<BTreeMap<String, String>>, headers: HeaderMap) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo { query, headers })
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

async fn malformed() -> &'static str {
    "not json"
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn slow(Query(delay): Query<Delay>) -> Json<Vec<Todo>> {
    tokio::time::sleep(Duration::from_millis(delay.ms)).await;
    Json(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_uses_camel_case_on_the_wire() {
        let todos = seed();
        let json = serde_json::to_value(&todos[0]).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "delectus aut autem");
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn seed_ids_are_unique() {
        let todos = seed();
        let mut ids: Vec<u64> = todos.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), todos.len());
    }

    #[test]
    fn filter_fields_are_optional() {
        let filter: TodoFilter = serde_json::from_str(r#"{}"#).unwrap();
        assert!(filter.user_id.is_none());
        assert!(filter.completed.is_none());

        let filter: TodoFilter = serde_json::from_str(r#"{"userId":2}"#).unwrap();
        assert_eq!(filter.user_id, Some(2));
    }
}
