//! Turning a `View` into the text a container displays.
//!
//! HTML output goes through askama templates, which escape every
//! interpolated value. Post titles and contents are stored user input, so
//! they must never reach the markup unescaped.

use askama::Template;

use crate::error::ApiError;
use crate::types::Post;

pub const LOADING: &str = "Loading posts...";
pub const NO_POSTS: &str = "No posts found.";

/// What the post container should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Loading,
    /// An empty list renders as the "no posts" state.
    Posts(Vec<Post>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Html,
    Text,
}

#[derive(Template)]
#[template(path = "posts.html")]
struct PostsTemplate<'a> {
    posts: &'a [Post],
}

#[derive(Template)]
#[template(path = "message.html")]
struct MessageTemplate<'a> {
    class: &'a str,
    message: &'a str,
}

impl Format {
    pub fn render(self, view: &View) -> Result<String, ApiError> {
        match self {
            Format::Html => render_html(view),
            Format::Text => Ok(render_text(view)),
        }
    }
}

pub fn render_html(view: &View) -> Result<String, ApiError> {
    let html = match view {
        View::Loading => message("", LOADING).render()?,
        View::Posts(posts) if posts.is_empty() => message("", NO_POSTS).render()?,
        View::Posts(posts) => PostsTemplate { posts }.render()?,
        View::Error(msg) => message("error", msg).render()?,
    };
    Ok(html)
}

/// Plain-text rendering for terminals. Stored text is passed through
/// `printable` so it cannot carry escape sequences to the terminal.
pub fn render_text(view: &View) -> String {
    match view {
        View::Loading => LOADING.to_string(),
        View::Posts(posts) if posts.is_empty() => NO_POSTS.to_string(),
        View::Posts(posts) => posts
            .iter()
            .map(|p| format!("#{} {}\n    {}", p.id, printable(&p.title), printable(&p.content)))
            .collect::<Vec<_>>()
            .join("\n"),
        View::Error(msg) => format!("error: {}", printable(msg)),
    }
}

/// Control characters other than newline and tab become their Rust escape
/// (`\u{1b}`), everything else is kept.
fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

fn message<'a>(class: &'a str, message: &'a str) -> MessageTemplate<'a> {
    MessageTemplate { class, message }
}
