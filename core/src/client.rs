//! Stateless HTTP request builder and response parser for the posts API.
//!
//! # Design
//! `PostsClient` holds only a validated `base_url`. Each operation is split
//! into a `build_*` method that produces an `HttpRequest` and a `parse_*`
//! method that consumes an `HttpResponse`. Input validation happens in
//! `build_*`, so a rejected input never reaches the network.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ListQuery, NewPost, Post, UpdatePost};

pub const MISSING_FIELDS: &str = "Title and content are required.";
pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const DELETE_FAILED: &str = "Delete failed";

/// Synchronous, stateless client for the posts API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsClient {
    base_url: String,
}

impl PostsClient {
    /// Trims whitespace and a trailing `/`. Fails with `ApiError::Config`
    /// when nothing is left.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Config("API base URL is missing.".to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a list or search request.
    ///
    /// A search term targets `/posts/search` with the term in both `title`
    /// and `content`; otherwise `/posts` gets `sort`/`direction` only when
    /// they are set.
    pub fn build_list_posts(&self, query: &ListQuery) -> HttpRequest {
        let url = match query.search_term() {
            Some(term) => {
                let qs = form_urlencoded::Serializer::new(String::new())
                    .append_pair("title", term)
                    .append_pair("content", term)
                    .finish();
                format!("{}/posts/search?{qs}", self.base_url)
            }
            None => {
                let mut params = form_urlencoded::Serializer::new(String::new());
                if let Some(field) = query.sort_field() {
                    params.append_pair("sort", field);
                }
                if let Some(direction) = query.sort_direction() {
                    params.append_pair("direction", direction);
                }
                let qs = params.finish();
                if qs.is_empty() {
                    format!("{}/posts", self.base_url)
                } else {
                    format!("{}/posts?{qs}", self.base_url)
                }
            }
        };
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    /// Build a create request from trimmed `title` and `content`.
    pub fn build_create_post(&self, input: &NewPost) -> Result<HttpRequest, ApiError> {
        let title = input.title.trim();
        let content = input.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ApiError::Validation(MISSING_FIELDS.to_string()));
        }
        let payload = NewPost {
            title: title.to_string(),
            content: content.to_string(),
        };
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/posts", self.base_url),
            headers: json_headers(),
            body: Some(to_json(&payload)?),
        })
    }

    /// Build a partial update. At least one field must be set and every set
    /// field must be non-blank.
    pub fn build_update_post(&self, id: u64, input: &UpdatePost) -> Result<HttpRequest, ApiError> {
        if input.title.is_none() && input.content.is_none() {
            return Err(ApiError::Validation("Nothing to update.".to_string()));
        }
        let title = trimmed_field(input.title.as_deref(), "Title cannot be empty")?;
        let content = trimmed_field(input.content.as_deref(), "Content cannot be empty")?;
        let payload = UpdatePost { title, content };
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}/posts/{id}", self.base_url),
            headers: json_headers(),
            body: Some(to_json(&payload)?),
        })
    }

    pub fn build_delete_post(&self, id: u64) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/posts/{id}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Parse a list or search response. A JSON payload that is not an array
    /// yields an empty list.
    pub fn parse_list_posts(&self, response: HttpResponse) -> Result<Vec<Post>, ApiError> {
        if !response.is_success() {
            let message = if response.status_text.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                response.status_text
            };
            return Err(ApiError::Http {
                status: response.status,
                message,
            });
        }
        match parse_json::<Value>(&response.body)? {
            value @ Value::Array(_) => {
                serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Any 2xx with a JSON body means the post was created. The post itself
    /// is returned only when the body has the full `Post` shape.
    pub fn parse_create_post(&self, response: HttpResponse) -> Result<Option<Post>, ApiError> {
        check_server_error(&response)?;
        let value = parse_json::<Value>(&response.body)?;
        Ok(serde_json::from_value(value).ok())
    }

    pub fn parse_update_post(&self, response: HttpResponse) -> Result<Post, ApiError> {
        check_server_error(&response)?;
        parse_json(&response.body)
    }

    /// The delete response body is ignored on both paths.
    pub fn parse_delete_post(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.is_success() {
            return Ok(());
        }
        Err(ApiError::Http {
            status: response.status,
            message: DELETE_FAILED.to_string(),
        })
    }
}

/// Map a non-2xx response to `ApiError::Http`, preferring the `error` field
/// of a JSON object body.
fn check_server_error(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    Err(ApiError::Http {
        status: response.status,
        message,
    })
}

fn trimmed_field(value: Option<&str>, empty_message: &str) -> Result<Option<String>, ApiError> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Err(ApiError::Validation(empty_message.to_string())),
        Some(v) => Ok(Some(v.to_string())),
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
