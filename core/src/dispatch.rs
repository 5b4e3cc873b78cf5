//! User actions: build a request, hand it to the host, render the outcome.
//!
//! # Design
//! `Dispatcher` owns the three collaborators every action touches: the
//! `Transport` that executes requests, the `Container` that displays
//! results, and the `KeyValueStore` that remembers the base URL. The delete
//! confirmation and the create form are passed per call since only one
//! action uses each.
//!
//! Every action renders exactly one final view into the container,
//! replacing what was there. Errors are rendered as a message and also
//! returned so a host can pick an exit status.
//!
//! Each call is one synchronous round trip (plus a refetch after a write).
//! A host that runs actions concurrently gets last-completed-wins rendering:
//! nothing here sequences responses.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::PostsClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::render::{render_text, Format, View};
use crate::types::{ListQuery, Post, PostForm, UpdatePost};

/// Storage key for the cached base URL.
pub const API_BASE_URL_KEY: &str = "apiBaseUrl";

pub const DELETE_PROMPT: &str = "Delete this post?";

const INVALID_BASE_URL: &str = "Please enter a valid API base URL.";
const MISSING_BASE_URL: &str = "API URL is missing.";

/// Executes an `HttpRequest`. Non-2xx statuses are returned as data; only a
/// failure to get any response is an error (`ApiError::Network`).
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Output sink. Each call replaces the previous content.
pub trait Container {
    fn replace(&mut self, content: String);
}

/// Synchronous yes/no gate.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

impl Container for String {
    fn replace(&mut self, content: String) {
        *self = content;
    }
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

impl KeyValueStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

pub struct Dispatcher<T, C, K> {
    transport: T,
    container: C,
    store: K,
    format: Format,
}

impl<T: Transport, C: Container, K: KeyValueStore> Dispatcher<T, C, K> {
    pub fn new(transport: T, container: C, store: K) -> Self {
        Self {
            transport,
            container,
            store,
            format: Format::default(),
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    /// The base URL saved by the last successful `load_posts`.
    pub fn saved_base_url(&self) -> Option<String> {
        self.store
            .get(API_BASE_URL_KEY)
            .filter(|url| !url.trim().is_empty())
    }

    /// List or search posts and render them.
    ///
    /// A valid base URL is saved before the request goes out, whatever the
    /// outcome of the request.
    pub fn load_posts(&mut self, base_url: &str, query: &ListQuery) -> Result<Vec<Post>, ApiError> {
        let client = self.client_or_render(base_url, INVALID_BASE_URL)?;
        self.store.set(API_BASE_URL_KEY, client.base_url());

        let request = client.build_list_posts(query);
        self.show(View::Loading);

        match self.send(&request).and_then(|r| client.parse_list_posts(r)) {
            Ok(posts) => {
                debug!(count = posts.len(), "loaded posts");
                self.show(View::Posts(posts.clone()));
                Ok(posts)
            }
            Err(e) => Err(self.fail("Failed to load posts", e)),
        }
    }

    /// Create a post from `form`. On success the form is cleared and the
    /// list is refetched with `query`. The created post is returned when the
    /// server echoes it back in full.
    pub fn add_post(
        &mut self,
        base_url: &str,
        form: &mut PostForm,
        query: &ListQuery,
    ) -> Result<Option<Post>, ApiError> {
        let client = self.client_or_render(base_url, MISSING_BASE_URL)?;
        let request = match client.build_create_post(&form.to_new_post()) {
            Ok(request) => request,
            Err(e @ ApiError::Validation(_)) => {
                self.show(View::Error(e.to_string()));
                return Err(e);
            }
            Err(e) => return Err(self.fail("Add failed", e)),
        };

        match self.send(&request).and_then(|r| client.parse_create_post(r)) {
            Ok(post) => {
                debug!(id = ?post.as_ref().map(|p| p.id), "post added");
                form.clear();
                self.refetch(client.base_url(), query);
                Ok(post)
            }
            Err(e) => Err(self.fail("Add failed", e)),
        }
    }

    /// Delete a post after `confirm` agrees. Returns `Ok(false)` when the
    /// user declined; nothing is sent or rendered in that case.
    pub fn delete_post(
        &mut self,
        base_url: &str,
        id: u64,
        query: &ListQuery,
        confirm: &mut impl Confirm,
    ) -> Result<bool, ApiError> {
        let client = self.client_or_render(base_url, MISSING_BASE_URL)?;
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(id, "delete declined");
            return Ok(false);
        }

        let request = client.build_delete_post(id);
        match self.send(&request).and_then(|r| client.parse_delete_post(r)) {
            Ok(()) => {
                debug!(id, "post deleted");
                self.refetch(client.base_url(), query);
                Ok(true)
            }
            Err(e) => Err(self.fail("Delete failed", e)),
        }
    }

    /// Apply a partial update, then refetch the list.
    pub fn update_post(
        &mut self,
        base_url: &str,
        id: u64,
        input: &UpdatePost,
        query: &ListQuery,
    ) -> Result<Post, ApiError> {
        let client = self.client_or_render(base_url, MISSING_BASE_URL)?;
        let request = match client.build_update_post(id, input) {
            Ok(request) => request,
            Err(e @ ApiError::Validation(_)) => {
                self.show(View::Error(e.to_string()));
                return Err(e);
            }
            Err(e) => return Err(self.fail("Update failed", e)),
        };

        match self.send(&request).and_then(|r| client.parse_update_post(r)) {
            Ok(post) => {
                debug!(id = post.id, "post updated");
                self.refetch(client.base_url(), query);
                Ok(post)
            }
            Err(e) => Err(self.fail("Update failed", e)),
        }
    }

    /// Render an error message in place of the current content.
    pub fn show_error(&mut self, message: &str) {
        self.show(View::Error(message.to_string()));
    }

    // A failed refetch has already rendered its own error; the write itself
    // succeeded, so the caller still gets `Ok`.
    fn refetch(&mut self, base_url: &str, query: &ListQuery) {
        let _ = self.load_posts(base_url, query);
    }

    fn client_or_render(&mut self, base_url: &str, message: &str) -> Result<PostsClient, ApiError> {
        PostsClient::new(base_url).inspect_err(|_| self.show_error(message))
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "dispatching request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "response received");
        Ok(response)
    }

    fn fail(&mut self, action: &str, error: ApiError) -> ApiError {
        warn!(%error, "{action}");
        self.show(View::Error(format!("{action}: {error}")));
        error
    }

    fn show(&mut self, view: View) {
        let content = self.format.render(&view).unwrap_or_else(|e| {
            warn!(error = %e, "render failed");
            render_text(&View::Error(e.to_string()))
        });
        self.container.replace(content);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::http::HttpMethod;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct FakeTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, ApiError>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn respond(self, status: u16, status_text: &str, body: &str) -> Self {
            self.responses.borrow_mut().push_back(Ok(HttpResponse {
                status,
                status_text: status_text.to_string(),
                headers: Vec::new(),
                body: body.to_string(),
            }));
            self
        }

        fn fail(self, error: ApiError) -> Self {
            self.responses.borrow_mut().push_back(Err(error));
            self
        }
    }

    impl Transport for &FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .expect("unexpected request")
        }
    }

    /// Keeps every replaced value so tests can check render order.
    #[derive(Default)]
    struct History(Vec<String>);

    impl Container for History {
        fn replace(&mut self, content: String) {
            self.0.push(content);
        }
    }

    fn dispatcher(
        transport: &FakeTransport,
    ) -> Dispatcher<&FakeTransport, History, HashMap<String, String>> {
        Dispatcher::new(transport, History::default(), HashMap::new())
    }

    fn last<'a>(d: &'a Dispatcher<&'a FakeTransport, History, HashMap<String, String>>) -> &'a str {
        d.container().0.last().map(String::as_str).unwrap_or("")
    }

    const TWO_POSTS: &str =
        r#"[{"id":1,"title":"First post","content":"a"},{"id":2,"title":"Second post","content":"b"}]"#;

    #[test]
    fn load_renders_loading_then_posts_and_saves_url() {
        let transport = FakeTransport::default().respond(200, "OK", TWO_POSTS);
        let mut d = dispatcher(&transport);

        let posts = d.load_posts("http://x/api/", &ListQuery::default()).unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(d.container().0.len(), 2);
        assert_eq!(d.container().0[0], "<p>Loading posts...</p>");
        assert!(last(&d).contains("<h2>First post</h2>"));
        assert_eq!(d.saved_base_url().as_deref(), Some("http://x/api"));
        assert_eq!(transport.requests.borrow()[0].url, "http://x/api/posts");
    }

    #[test]
    fn load_without_base_url_sends_nothing() {
        let transport = FakeTransport::default();
        let mut d = dispatcher(&transport);

        let err = d.load_posts("  ", &ListQuery::default()).unwrap_err();

        assert!(matches!(err, ApiError::Config(_)));
        assert!(transport.requests.borrow().is_empty());
        assert!(last(&d).contains("Please enter a valid API base URL."));
        assert_eq!(d.saved_base_url(), None);
    }

    #[test]
    fn load_empty_payload_renders_no_posts() {
        let transport = FakeTransport::default().respond(200, "OK", "[]");
        let mut d = dispatcher(&transport);
        d.load_posts("http://x", &ListQuery::default()).unwrap();
        assert_eq!(last(&d), "<p>No posts found.</p>");
    }

    #[test]
    fn load_http_error_replaces_content_with_status() {
        let transport = FakeTransport::default()
            .respond(200, "OK", TWO_POSTS)
            .respond(500, "Internal Server Error", "");
        let mut d = dispatcher(&transport);

        d.load_posts("http://x", &ListQuery::default()).unwrap();
        let err = d.load_posts("http://x", &ListQuery::default()).unwrap_err();

        assert_eq!(err.status(), Some(500));
        let shown = last(&d);
        assert!(shown.contains("Failed to load posts: HTTP 500: Internal Server Error"));
        assert!(!shown.contains("First post"));
    }

    #[test]
    fn network_failure_is_rendered() {
        let transport =
            FakeTransport::default().fail(ApiError::Network("connection refused".to_string()));
        let mut d = dispatcher(&transport);

        let err = d.load_posts("http://x", &ListQuery::default()).unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert!(last(&d).contains("Failed to load posts: network error: connection refused"));
    }

    #[test]
    fn add_with_blank_fields_never_hits_the_network() {
        let transport = FakeTransport::default();
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("Title", "   ");

        let err = d.add_post("http://x", &mut form, &ListQuery::default()).unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert!(transport.requests.borrow().is_empty());
        assert_eq!(last(&d), "<p class=\"error\">Title and content are required.</p>");
        assert_eq!(form.title, "Title");
    }

    #[test]
    fn add_without_base_url() {
        let transport = FakeTransport::default();
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("a", "b");
        d.add_post("", &mut form, &ListQuery::default()).unwrap_err();
        assert!(last(&d).contains("API URL is missing."));
    }

    #[test]
    fn add_clears_form_and_refetches_with_escaped_output() {
        let transport = FakeTransport::default()
            .respond(201, "Created", r#"{"id":3,"title":"Hi","content":"<b>bold</b>"}"#)
            .respond(200, "OK", r#"[{"id":3,"title":"Hi","content":"<b>bold</b>"}]"#);
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("Hi", "<b>bold</b>");

        let post = d
            .add_post("http://x", &mut form, &ListQuery::default())
            .unwrap()
            .unwrap();

        assert_eq!(post.id, 3);
        assert_eq!(form, PostForm::default());

        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, "http://x/posts");
        assert_eq!(
            requests[0].body.as_deref(),
            Some(r#"{"title":"Hi","content":"<b>bold</b>"}"#)
        );
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert_eq!(requests[1].url, "http://x/posts");

        let shown = last(&d);
        assert!(shown.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!shown.contains("<b>"));
    }

    #[test]
    fn add_refetch_keeps_current_query() {
        let transport = FakeTransport::default()
            .respond(201, "Created", r#"{"id":1,"title":"a","content":"b"}"#)
            .respond(200, "OK", "[]");
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("a", "b");

        d.add_post("http://x", &mut form, &ListQuery::sorted("id", "desc"))
            .unwrap();

        assert_eq!(
            transport.requests.borrow()[1].url,
            "http://x/posts?sort=id&direction=desc"
        );
    }

    #[test]
    fn add_with_partial_created_body_still_clears_and_refetches() {
        let transport = FakeTransport::default()
            .respond(201, "Created", r#"{"id":3,"title":"Hi"}"#)
            .respond(200, "OK", r#"[{"id":3,"title":"Hi","content":"body"}]"#);
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("Hi", "body");

        let created = d
            .add_post("http://x", &mut form, &ListQuery::default())
            .unwrap();

        assert_eq!(created, None);
        assert_eq!(form, PostForm::default());
        assert_eq!(transport.requests.borrow().len(), 2);
        assert!(last(&d).contains("<h2>Hi</h2>"));
        assert!(!last(&d).contains("Add failed"));
    }

    #[test]
    fn add_with_non_json_created_body_fails() {
        let transport = FakeTransport::default().respond(201, "Created", "created");
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("Hi", "body");

        d.add_post("http://x", &mut form, &ListQuery::default())
            .unwrap_err();

        assert!(last(&d).starts_with("<p class=\"error\">Add failed: deserialization failed"));
        assert_eq!(form, PostForm::new("Hi", "body"));
    }

    #[test]
    fn add_failure_shows_server_message() {
        let transport = FakeTransport::default().respond(
            400,
            "Bad Request",
            r#"{"error":"Missing required field: title"}"#,
        );
        let mut d = dispatcher(&transport);
        let mut form = PostForm::new("a", "b");

        d.add_post("http://x", &mut form, &ListQuery::default())
            .unwrap_err();

        assert!(last(&d).contains("Add failed: HTTP 400: Missing required field: title"));
        assert_eq!(form.title, "a");
    }

    #[test]
    fn declined_delete_sends_nothing() {
        let transport = FakeTransport::default();
        let mut d = dispatcher(&transport);
        let mut asked = Vec::new();
        let mut confirm = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };

        let deleted = d
            .delete_post("http://x", 1, &ListQuery::default(), &mut confirm)
            .unwrap();

        assert!(!deleted);
        assert_eq!(asked, vec![DELETE_PROMPT.to_string()]);
        assert!(transport.requests.borrow().is_empty());
        assert!(d.container().0.is_empty());
    }

    #[test]
    fn confirmed_delete_refetches() {
        let transport = FakeTransport::default()
            .respond(200, "OK", r#"{"message":"Post deleted successfully"}"#)
            .respond(200, "OK", "[]");
        let mut d = dispatcher(&transport);

        let deleted = d
            .delete_post("http://x", 2, &ListQuery::default(), &mut |_: &str| true)
            .unwrap();

        assert!(deleted);
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].method, HttpMethod::Delete);
        assert_eq!(requests[0].url, "http://x/posts/2");
        assert_eq!(requests[1].url, "http://x/posts");
        assert_eq!(last(&d), "<p>No posts found.</p>");
    }

    #[test]
    fn failed_delete_is_generic() {
        let transport =
            FakeTransport::default().respond(404, "Not Found", r#"{"error":"Post not found"}"#);
        let mut d = dispatcher(&transport);

        let err = d
            .delete_post("http://x", 9, &ListQuery::default(), &mut |_: &str| true)
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(last(&d).contains("Delete failed: HTTP 404: Delete failed"));
    }

    #[test]
    fn update_refetches_after_success() {
        let transport = FakeTransport::default()
            .respond(200, "OK", r#"{"id":1,"title":"New","content":"a"}"#)
            .respond(200, "OK", r#"[{"id":1,"title":"New","content":"a"}]"#);
        let mut d = dispatcher(&transport);
        let input = UpdatePost {
            title: Some("New".to_string()),
            content: None,
        };

        let post = d
            .update_post("http://x", 1, &input, &ListQuery::default())
            .unwrap();

        assert_eq!(post.title, "New");
        assert_eq!(transport.requests.borrow()[0].method, HttpMethod::Put);
        assert!(last(&d).contains("<h2>New</h2>"));
    }

    #[test]
    fn text_format_renders_plain_lines() {
        let transport = FakeTransport::default().respond(200, "OK", TWO_POSTS);
        let mut d = dispatcher(&transport).with_format(Format::Text);
        d.load_posts("http://x", &ListQuery::default()).unwrap();
        assert_eq!(last(&d), "#1 First post\n    a\n#2 Second post\n    b");
    }

    #[test]
    fn text_format_neutralizes_terminal_escapes() {
        let transport = FakeTransport::default().respond(
            200,
            "OK",
            r#"[{"id":1,"title":"\u001b[2J\u001b]0;pwned\u0007","content":"x"}]"#,
        );
        let mut d = dispatcher(&transport).with_format(Format::Text);
        d.load_posts("http://x", &ListQuery::default()).unwrap();

        let shown = last(&d);
        assert!(!shown.contains('\u{1b}'));
        assert!(!shown.contains('\u{7}'));
        assert!(shown.starts_with("#1 \\u{1b}[2J"));
    }

    #[test]
    fn string_container_keeps_only_latest_render() {
        let transport = FakeTransport::default().respond(200, "OK", "[]");
        let mut d = Dispatcher::new(&transport, String::new(), HashMap::<String, String>::new());
        d.load_posts("http://x", &ListQuery::default()).unwrap();
        assert_eq!(d.container(), "<p>No posts found.</p>");
    }
}
