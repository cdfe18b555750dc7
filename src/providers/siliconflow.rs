//! SiliconFlow Video Generation Adapter
//!
//! SiliconFlow splits video generation into a submit endpoint returning a
//! request id and a status endpoint that is POSTed the id until the job
//! reaches `Succeed` or `Failed`. Results land at
//! `results.videos[0].url`.

use serde_json::{json, Value};
use tracing::warn;

use crate::adapter::{string_at, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::error::{JobError, JobResult};
use crate::http::HttpRequest;
use crate::job::{JobHandle, JobRequest, MediaKind, MediaOutput, PollOutcome, Submission};

/// Default base URL for the SiliconFlow API
const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Default video model ID
const DEFAULT_MODEL_ID: &str = "Wan-AI/Wan2.2-T2V-A14B";

/// SiliconFlow video generation adapter
#[derive(Clone)]
pub struct SiliconFlowVideoAdapter {
    api_key: String,
    base_url: String,
    model_id: String,
}

impl std::fmt::Debug for SiliconFlowVideoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiliconFlowVideoAdapter")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl SiliconFlowVideoAdapter {
    /// Creates an adapter from injected configuration
    pub fn new(config: ProviderConfig) -> JobResult<Self> {
        let api_key = config.require_api_key("siliconflow")?;
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
        format!("{}/video/submit", self.base_url)
    }

    fn status_url(&self) -> String {
        format!("{}/video/status", self.base_url)
    }
}

impl ProviderAdapter for SiliconFlowVideoAdapter {
    fn name(&self) -> &str {
        "siliconflow"
    }

    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn build_submit_request(&self, request: &JobRequest) -> JobResult<HttpRequest> {
        request.validate().map_err(JobError::Configuration)?;
        if request.prompt.trim().is_empty() {
            return Err(JobError::Configuration(
                "SiliconFlow video generation requires a prompt".to_string(),
            ));
        }

        let mut body = json!({
            "model": self.model_id,
            "prompt": request.prompt,
        });
        if let Some(image_url) = request.input_urls.first() {
            body["image"] = json!(image_url);
        }
        for (key, value) in &request.options {
            body[key] = value.clone();
        }

        Ok(HttpRequest::post(self.submit_url(), body).with_bearer_auth(&self.api_key))
    }

    fn parse_submit_response(&self, body: &Value) -> JobResult<Submission> {
        let request_id = string_at(body, "requestId")?;
        Ok(Submission::Pending {
            handle: JobHandle::new(self.name(), request_id),
        })
    }

    /// The status check is itself a POST carrying the request id.
    fn build_poll_request(&self, handle: &JobHandle) -> JobResult<HttpRequest> {
        let body = json!({"requestId": handle.job_id});
        Ok(HttpRequest::post(self.status_url(), body).with_bearer_auth(&self.api_key))
    }

    fn parse_poll_response(&self, body: &Value) -> JobResult<PollOutcome> {
        let status = string_at(body, "status")?;
        match status {
            "Succeed" => {
                let url = string_at(body, "results.videos.0.url")?;
                Ok(PollOutcome::Succeeded {
                    output: MediaOutput::single(MediaKind::Video, url),
                })
            }
            "InQueue" | "InProgress" | "Pending" => Ok(PollOutcome::Pending),
            "Failed" => {
                let reason = body
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "Generation failed".to_string());
                Ok(PollOutcome::Failed { reason })
            }
            other => {
                warn!("Unknown SiliconFlow job status: {}", other);
                Ok(PollOutcome::Pending)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
