//! Job Data Model
//!
//! Requests, handles, and outcomes for long-running generation jobs.
//! A request is created per call and never persisted; a handle lives for
//! one submit→poll→resolve cycle and is discarded after resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Media Kinds & Normalized Output
// =============================================================================

/// Kind of generated media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// JSON key used in the collaborator-facing response shape
    pub fn url_key(&self) -> &'static str {
        match self {
            MediaKind::Image => "image_url",
            MediaKind::Video => "video_url",
            MediaKind::Audio => "audio_url",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Normalized media reference extracted from a provider payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaOutput {
    /// Kind of media the URLs point at
    pub kind: MediaKind,
    /// Output URLs in provider order; the first is the primary artifact
    pub urls: Vec<String>,
}

impl MediaOutput {
    /// Creates an output with a single URL
    pub fn single(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            urls: vec![url.into()],
        }
    }

    /// Creates an output with multiple URLs
    pub fn new(kind: MediaKind, urls: Vec<String>) -> Self {
        Self { kind, urls }
    }

    /// First (primary) output URL
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    /// Collaborator-facing `{ image_url | video_url | audio_url }` body.
    /// Multi-output results expose the extra URLs under `urls`.
    pub fn response_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(url) = self.primary_url() {
            body.insert(self.kind.url_key().to_string(), url.into());
        }
        if self.urls.len() > 1 {
            body.insert("urls".to_string(), serde_json::json!(self.urls));
        }
        serde_json::Value::Object(body)
    }
}

// =============================================================================
// Job Request
// =============================================================================

/// Provider-agnostic generation request. Provider-specific tunables travel
/// in `options` and are interpreted by the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Text prompt (may be empty for prompt-less pipelines such as
    /// background removal or upscaling)
    pub prompt: String,
    /// Input media URLs (reference image, garment image, source video...)
    pub input_urls: Vec<String>,
    /// Free-form provider tunables forwarded by the adapter
    pub options: HashMap<String, serde_json::Value>,
}

impl JobRequest {
    /// Creates a new request from a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            input_urls: Vec::new(),
            options: HashMap::new(),
        }
    }

    /// Adds an input media URL
    pub fn with_input_url(mut self, url: impl Into<String>) -> Self {
        self.input_urls.push(url.into());
        self
    }

    /// Sets a provider tunable
    pub fn with_option<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.options.insert(key.into(), v);
        }
        self
    }

    /// Gets a tunable value
    pub fn option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Validates fields common to every provider. Adapters run this before
    /// building the submit request and add their own checks on top.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() && self.input_urls.is_empty() {
            return Err("Request has neither a prompt nor input media".to_string());
        }
        if self.prompt.len() > 4096 {
            return Err("Prompt too long (max 4096 characters)".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Job Handle
// =============================================================================

/// Handle for a submitted asynchronous job.
///
/// Provider-scoped: a handle must only be passed back to the adapter that
/// produced it. Handles are not interchangeable across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    /// Adapter name that produced this handle (e.g. "gemini")
    pub provider: String,
    /// Provider-assigned job/operation/request id
    pub job_id: String,
    /// Explicit status URL, when the provider returns one
    pub poll_url: Option<String>,
    /// Unix timestamp when submitted
    pub submitted_at: i64,
}

impl JobHandle {
    /// Creates a new handle stamped with the current time
    pub fn new(provider: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            job_id: job_id.into(),
            poll_url: None,
            submitted_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Sets the provider-supplied status URL
    pub fn with_poll_url(mut self, url: impl Into<String>) -> Self {
        self.poll_url = Some(url.into());
        self
    }
}

// =============================================================================
// Submission & Poll Outcomes
// =============================================================================

/// Result of the initial submit call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    /// The provider completed synchronously; no polling phase
    Immediate { output: MediaOutput },
    /// The provider accepted the job; completion is discovered by polling
    Pending { handle: JobHandle },
}

/// Outcome of a single status-check call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Job not finished yet
    Pending,
    /// Job finished with output
    Succeeded { output: MediaOutput },
    /// Provider reported a failure
    Failed { reason: String },
}

impl PollOutcome {
    /// Whether this outcome ends the poll loop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}

// =============================================================================
// Terminal Job Outcome
// =============================================================================

/// Terminal result of a full submit→poll cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Generation finished with output
    Succeeded { output: MediaOutput },
    /// Provider reported a failure
    Failed { reason: String },
    /// Poll budget exhausted before the provider finished
    TimedOut { attempts: u32 },
    /// The caller cancelled the job
    Cancelled,
}

impl JobOutcome {
    /// Whether generation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    /// The output, when successful
    pub fn output(&self) -> Option<&MediaOutput> {
        match self {
            JobOutcome::Succeeded { output } => Some(output),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Succeeded { output } => {
                write!(f, "succeeded: {}", output.primary_url().unwrap_or("<no url>"))
            }
            JobOutcome::Failed { reason } => write!(f, "failed: {}", reason),
            JobOutcome::TimedOut { attempts } => {
                write!(f, "timed out after {} poll attempts", attempts)
            }
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
