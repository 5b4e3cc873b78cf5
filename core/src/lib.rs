//! Synchronous client core for the blog posts API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). `Dispatcher` strings the
//! pieces together for one user action: validate input, build the request,
//! run it through a host-supplied `Transport`, and render the outcome into a
//! host-supplied `Container`.
//!
//! # Design
//! - `PostsClient` is stateless; it holds only the validated `base_url`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and the list/search URL rules are unit-testable.
//! - Everything a browser page would reach through globals (the output
//!   element, `localStorage`, `confirm()`) is an injected trait.
//! - Rendered HTML escapes every post field.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod render;
pub mod types;

pub use client::PostsClient;
pub use dispatch::{Confirm, Container, Dispatcher, KeyValueStore, Transport, API_BASE_URL_KEY};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use render::{Format, View};
pub use types::{ListQuery, NewPost, Post, PostForm, UpdatePost};
