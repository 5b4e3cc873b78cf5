use std::time::Duration;

use posts_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, Transport};
use ureq::RequestBuilder;

/// Blocking ureq transport. 4xx/5xx come back as responses, not errors, so
/// the core decides what a status means.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` of `None` leaves ureq's defaults in place.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = req.url.as_str();
        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), req).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), req).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), req).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), req).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), req).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), req).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, req: &HttpRequest) -> RequestBuilder<B> {
    builder = builder.header(
        "user-agent",
        format!("posts-cli/{}", env!("CARGO_PKG_VERSION")),
    );
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
