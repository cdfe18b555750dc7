//! HTTP Transport
//!
//! Wire-neutral request/response shapes and the transport seam between the
//! job client and the network. Adapters build [`HttpRequest`]s as pure
//! values; only the transport touches the wire, so tests run against a
//! scripted fake with no network at all.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{JobError, JobResult};

/// Request timeout for the production transport
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// =============================================================================
// Request / Response Shapes
// =============================================================================

/// HTTP method subset used by the bundled providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// One outbound request, as built by a provider adapter
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST request with a JSON body
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Adds a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a bearer Authorization header
    pub fn with_bearer_auth(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }
}

/// One provider response. Non-success statuses are responses, not errors;
/// the client decides how to surface them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Success response with a JSON body (convenience for tests)
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON
    pub fn json(&self) -> JobResult<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            JobError::MalformedResponse(format!("Response body is not valid JSON: {}", e))
        })
    }
}

// =============================================================================
// Transport Seam
// =============================================================================

/// Trait for executing HTTP requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes one request. Network failures map to
    /// [`JobError::Transport`]; provider rejections come back as
    /// non-success [`HttpResponse`]s.
    async fn execute(&self, request: &HttpRequest) -> JobResult<HttpResponse>;
}

// =============================================================================
// Production Transport (reqwest)
// =============================================================================

/// Production transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a bounded request timeout
    pub fn new() -> JobResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| JobError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> JobResult<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| JobError::Transport(format!("Network error: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| JobError::Transport(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

// =============================================================================
// Scripted Transport for Testing
// =============================================================================

/// Scripted transport for tests: replays a queue of canned responses and
/// records every request it sees.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<JobResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates an empty scripted transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and JSON body
    pub fn push_response(&self, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .expect("scripted transport lock poisoned")
            .push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
    }

    /// Queues an error (e.g. a simulated network failure)
    pub fn push_error(&self, error: JobError) {
        self.responses
            .lock()
            .expect("scripted transport lock poisoned")
            .push_back(Err(error));
    }

    /// All requests executed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("scripted transport lock poisoned")
            .clone()
    }

    /// Number of requests executed so far
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .expect("scripted transport lock poisoned")
            .len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> JobResult<HttpResponse> {
        self.requests
            .lock()
            .expect("scripted transport lock poisoned")
            .push(request.clone());

        self.responses
            .lock()
            .expect("scripted transport lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(JobError::Transport(
                    "Scripted transport has no more responses".to_string(),
                ))
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
