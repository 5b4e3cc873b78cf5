//! Domain DTOs for the posts API.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently so
//! the core has no dependency on Axum. Integration tests catch schema drift.

use serde::{Deserialize, Serialize};

/// A single blog post as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
}

/// Request payload for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

/// Request payload for updating a post. Omitted fields stay unchanged on the
/// server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdatePost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Parameters for listing posts.
///
/// A non-blank `search` selects the search endpoint and `sort`/`direction`
/// are ignored. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub fn sorted(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            search: None,
            sort: Some(field.into()),
            direction: Some(direction.into()),
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    pub fn sort_field(&self) -> Option<&str> {
        non_blank(self.sort.as_deref())
    }

    pub fn sort_direction(&self) -> Option<&str> {
        non_blank(self.direction.as_deref())
    }
}

/// The create form's input fields. Cleared after a successful create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
    }

    pub fn to_new_post(&self) -> NewPost {
        NewPost {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
