//! Together AI Image Generation Adapter
//!
//! Together's image endpoint completes synchronously: the submit response
//! already carries the artifact, so this adapter always reports
//! [`Submission::Immediate`] and owns no poll protocol at all.

use serde_json::{json, Value};

use crate::adapter::ProviderAdapter;
use crate::config::ProviderConfig;
use crate::error::{JobError, JobResult};
use crate::http::HttpRequest;
use crate::job::{JobHandle, JobRequest, MediaKind, MediaOutput, PollOutcome, Submission};

/// Default base URL for the Together API
const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";

/// Default image model ID
const DEFAULT_MODEL_ID: &str = "black-forest-labs/FLUX.1-schnell";

/// Together AI image generation adapter
#[derive(Clone)]
pub struct TogetherImageAdapter {
    api_key: String,
    base_url: String,
    model_id: String,
}

impl std::fmt::Debug for TogetherImageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TogetherImageAdapter")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl TogetherImageAdapter {
    /// Creates an adapter from injected configuration
    pub fn new(config: ProviderConfig) -> JobResult<Self> {
        let api_key = config.require_api_key("together")?;
        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_id: config
                .model_id
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
        })
    }

    fn submit_url(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }

    /// Normalizes one generation entry to a URL. Hosted results carry
    /// `url`; inline results carry `b64_json` and become data URLs.
    fn entry_url(entry: &Value) -> Option<String> {
        if let Some(url) = entry.get("url").and_then(Value::as_str) {
            return Some(url.to_string());
        }
        entry
            .get("b64_json")
            .and_then(Value::as_str)
            .map(|b64| format!("data:image/png;base64,{}", b64))
    }
}

impl ProviderAdapter for TogetherImageAdapter {
    fn name(&self) -> &str {
        "together"
    }

    fn media_kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn build_submit_request(&self, request: &JobRequest) -> JobResult<HttpRequest> {
        request.validate().map_err(JobError::Configuration)?;
        if request.prompt.trim().is_empty() {
            return Err(JobError::Configuration(
                "Together image generation requires a prompt".to_string(),
            ));
        }

        let mut body = json!({
            "model": self.model_id,
            "prompt": request.prompt,
        });
        for (key, value) in &request.options {
            body[key] = value.clone();
        }

        Ok(HttpRequest::post(self.submit_url(), body).with_bearer_auth(&self.api_key))
    }

    fn parse_submit_response(&self, body: &Value) -> JobResult<Submission> {
        let entries = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                JobError::MalformedResponse("Expected array at `data`".to_string())
            })?;

        let urls: Vec<String> = entries.iter().filter_map(Self::entry_url).collect();
        if urls.is_empty() {
            return Err(JobError::MalformedResponse(
                "No `url` or `b64_json` in any `data` entry".to_string(),
            ));
        }

        Ok(Submission::Immediate {
            output: MediaOutput::new(MediaKind::Image, urls),
        })
    }

    fn build_poll_request(&self, handle: &JobHandle) -> JobResult<HttpRequest> {
        Err(JobError::Configuration(format!(
            "Together completes synchronously; no status endpoint for job '{}'",
            handle.job_id
        )))
    }

    fn parse_poll_response(&self, _body: &Value) -> JobResult<PollOutcome> {
        Err(JobError::Configuration(
            "Together completes synchronously; nothing to poll".to_string(),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
