use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

const SORT_FIELDS: [&str; 3] = ["title", "content", "id"];
const DIRECTIONS: [&str; 2] = ["asc", "desc"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub q: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct SearchParams {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Error response carrying `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, message.into())
}

fn not_found() -> ApiError {
    ApiError(StatusCode::NOT_FOUND, "Post not found".to_string())
}

pub type Db = Arc<RwLock<Vec<Post>>>;

/// The posts a fresh server starts with.
pub fn default_posts() -> Vec<Post> {
    vec![
        Post {
            id: 1,
            title: "First post".to_string(),
            content: "This is the first post.".to_string(),
        },
        Post {
            id: 2,
            title: "Second post".to_string(),
            content: "This is the second post.".to_string(),
        },
    ]
}

pub fn app() -> Router {
    app_with(Vec::new())
}

/// Router serving `posts` under `/api`.
pub fn app_with(posts: Vec<Post>) -> Router {
    let db: Db = Arc::new(RwLock::new(posts));
    let api = Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/search", get(search_posts))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener, posts: Vec<Post>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(posts)).await
}

async fn list_posts(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let direction = params.direction.as_deref().unwrap_or("asc");
    if !DIRECTIONS.contains(&direction) {
        return Err(bad_request(format!(
            "Invalid direction: '{direction}'. Allowed values: {}",
            DIRECTIONS.join(", ")
        )));
    }
    let sort = params.sort.as_deref().filter(|s| !s.is_empty());
    if let Some(field) = sort {
        if !SORT_FIELDS.contains(&field) {
            return Err(bad_request(format!(
                "Invalid sort field: '{field}'. Allowed values: {}",
                SORT_FIELDS.join(", ")
            )));
        }
    }

    let mut posts = db.read().await.clone();

    let query = params.q.as_deref().unwrap_or("").trim().to_lowercase();
    if !query.is_empty() {
        posts.retain(|p| contains_ci(&p.title, &query) || contains_ci(&p.content, &query));
    }

    if let Some(field) = sort {
        let descending = direction == "desc";
        posts.sort_by(|a, b| {
            let order = match field {
                "id" => a.id.cmp(&b.id),
                "title" => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
                _ => a.content.to_lowercase().cmp(&b.content.to_lowercase()),
            };
            if descending {
                order.reverse()
            } else {
                order
            }
        });
    }

    Ok(Json(posts))
}

async fn search_posts(State(db): State<Db>, Query(params): Query<SearchParams>) -> Json<Vec<Post>> {
    let title = lowered(params.title.as_deref());
    let content = lowered(params.content.as_deref());
    let posts = db.read().await;

    let is_match = |p: &Post| {
        let title_match = !title.is_empty() && contains_ci(&p.title, &title);
        let content_match = !content.is_empty() && contains_ci(&p.content, &content);
        match (title.is_empty(), content.is_empty()) {
            (true, true) => true,
            _ => title_match || content_match,
        }
    };

    Json(posts.iter().filter(|p| is_match(p)).cloned().collect())
}

async fn create_post(
    State(db): State<Db>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let data = json_object(payload)?;
    let title = required_field(&data, "title")?;
    let content = required_field(&data, "content")?;

    let mut posts = db.write().await;
    let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let post = Post { id, title, content };
    posts.push(post.clone());
    tracing::info!(id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let mut posts = db.write().await;
    let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;
    let data = json_object(payload)?;

    let title = optional_field(&data, "title", "Title cannot be empty")?;
    let content = optional_field(&data, "content", "Content cannot be empty")?;
    if let Some(title) = title {
        post.title = title;
    }
    if let Some(content) = content {
        post.content = content;
    }
    tracing::info!(id, "post updated");
    Ok(Json(post.clone()))
}

async fn delete_post(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Value>, ApiError> {
    let mut posts = db.write().await;
    let index = posts.iter().position(|p| p.id == id).ok_or_else(not_found)?;
    let deleted = posts.remove(index);
    tracing::info!(id, "post deleted");
    Ok(Json(json!({
        "message": "Post deleted successfully",
        "deleted": deleted,
    })))
}

/// Unwrap a JSON body that must be a non-empty object.
fn json_object(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<serde_json::Map<String, Value>, ApiError> {
    match payload {
        Ok(Json(Value::Object(map))) if !map.is_empty() => Ok(map),
        Ok(_) => Err(bad_request("Request body must be valid JSON")),
        Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json".to_string(),
        )),
        Err(_) => Err(bad_request("Request body must be valid JSON")),
    }
}

fn required_field(data: &serde_json::Map<String, Value>, name: &str) -> Result<String, ApiError> {
    data.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| bad_request(format!("Missing required field: {name}")))
}

fn optional_field(
    data: &serde_json::Map<String, Value>,
    name: &str,
    empty_message: &str,
) -> Result<Option<String>, ApiError> {
    match data.get(name) {
        None => Ok(None),
        Some(value) => match value.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Ok(Some(s.to_string())),
            _ => Err(bad_request(empty_message)),
        },
    }
}

fn lowered(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_lowercase()
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
