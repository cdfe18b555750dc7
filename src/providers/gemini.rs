//! Google Gemini/Veo Video Generation Adapter
//!
//! Veo jobs are long-running operations: submitting returns an operation
//! name, and the operation resource is fetched until `done` flips true.
//! Completed operations carry the artifact at
//! `response.generateVideoResponse.generatedSamples[0].video.uri`.

use serde_json::{json, Value};
use tracing::warn;

use crate::adapter::{string_at, value_at, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::error::{JobError, JobResult};
use crate::http::HttpRequest;
use crate::job::{JobHandle, JobRequest, MediaKind, MediaOutput, PollOutcome, Submission};

/// Default base URL for the Gemini API
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Veo model ID
const DEFAULT_MODEL_ID: &str = "veo-3.0-generate-001";

/// JSON path to the artifact in a completed operation
const RESULT_URI_PATH: &str = "response.generateVideoResponse.generatedSamples.0.video.uri";

/// Gemini/Veo video generation adapter
#[derive(Clone)]
pub struct GeminiVideoAdapter {
    api_key: String,
    base_url: String,
    model_id: String,
}

impl std::fmt::Debug for GeminiVideoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiVideoAdapter")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl GeminiVideoAdapter {
    /// Creates an adapter from injected configuration
    pub fn new(config: ProviderConfig) -> JobResult<Self> {
        let api_key = config.require_api_key("gemini")?;
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
        format!(
            "{}/models/{}:predictLongRunning",
            self.base_url, self.model_id
        )
    }

    /// Operation names are path fragments (`operations/abc123`) appended
    /// to the API root.
    fn operation_url(&self, operation_name: &str) -> String {
        format!("{}/{}", self.base_url, operation_name)
    }

    fn auth(&self, request: HttpRequest) -> HttpRequest {
        request.with_header("x-goog-api-key", &self.api_key)
    }

    /// Provider failure message from an operation-level error value
    fn failure_reason(error: &Value) -> String {
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string())
    }

    /// Extracts the artifact from a completed operation payload
    fn parse_completed(&self, body: &Value) -> JobResult<PollOutcome> {
        let uri = string_at(body, RESULT_URI_PATH)?;
        Ok(PollOutcome::Succeeded {
            output: MediaOutput::single(MediaKind::Video, uri),
        })
    }
}

impl ProviderAdapter for GeminiVideoAdapter {
    fn name(&self) -> &str {
        "gemini"
    }

    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn build_submit_request(&self, request: &JobRequest) -> JobResult<HttpRequest> {
        request.validate().map_err(JobError::Configuration)?;
        if request.prompt.trim().is_empty() {
            return Err(JobError::Configuration(
                "Veo generation requires a prompt".to_string(),
            ));
        }

        let mut instance = json!({"prompt": request.prompt});
        if let Some(image_url) = request.input_urls.first() {
            instance["image"] = json!({"gcsUri": image_url});
        }

        let mut body = json!({"instances": [instance]});
        if !request.options.is_empty() {
            body["parameters"] = json!(request.options);
        }

        Ok(self.auth(HttpRequest::post(self.submit_url(), body)))
    }

    fn parse_submit_response(&self, body: &Value) -> JobResult<Submission> {
        // An operation that completed before the submit response returned
        // carries its result inline; inspect rather than assume. A
        // synchronous rejection also arrives `done: true` but with an
        // operation-level error instead of a result — hand back the
        // handle so the first poll reports Failed with the provider's
        // message.
        if body.get("error").is_none()
            && value_at(body, "done").and_then(Value::as_bool) == Some(true)
        {
            if let PollOutcome::Succeeded { output } = self.parse_completed(body)? {
                return Ok(Submission::Immediate { output });
            }
        }

        match string_at(body, "name") {
            Ok(operation_name) => Ok(Submission::Pending {
                handle: JobHandle::new(self.name(), operation_name),
            }),
            Err(_) if body.get("error").is_some() => Err(JobError::MalformedResponse(format!(
                "Operation rejected at submit with no name to poll: {}",
                Self::failure_reason(&body["error"])
            ))),
            Err(e) => Err(e),
        }
    }

    fn build_poll_request(&self, handle: &JobHandle) -> JobResult<HttpRequest> {
        Ok(self.auth(HttpRequest::get(self.operation_url(&handle.job_id))))
    }

    fn parse_poll_response(&self, body: &Value) -> JobResult<PollOutcome> {
        if let Some(error) = body.get("error") {
            return Ok(PollOutcome::Failed {
                reason: Self::failure_reason(error),
            });
        }

        match value_at(body, "done").and_then(Value::as_bool) {
            Some(true) => self.parse_completed(body),
            Some(false) | None => {
                if body.get("name").is_none() {
                    warn!("Gemini operation poll body has neither name nor done flag");
                }
                Ok(PollOutcome::Pending)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> GeminiVideoAdapter {
        GeminiVideoAdapter::new(ProviderConfig::with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = GeminiVideoAdapter::new(ProviderConfig::default());
        assert!(matches!(result, Err(JobError::Configuration(_))));
    }

    #[test]
    fn test_submit_request_shape() {
        let request = JobRequest::new("A whale breaching at dawn")
            .with_input_url("gs://bucket/ref.jpg")
            .with_option("aspectRatio", "16:9");
        let http = adapter().build_submit_request(&request).unwrap();

        assert_eq!(
            http.url,
            "https://generativelanguage.googleapis.com/v1beta/models/veo-3.0-generate-001:predictLongRunning"
        );
        assert!(http
            .headers
            .iter()
            .any(|(name, value)| name == "x-goog-api-key" && value == "test-key"));

        let body = http.body.unwrap();
        assert_eq!(body["instances"][0]["prompt"], "A whale breaching at dawn");
        assert_eq!(body["instances"][0]["image"]["gcsUri"], "gs://bucket/ref.jpg");
        assert_eq!(body["parameters"]["aspectRatio"], "16:9");
    }

    #[test]
    fn test_submit_requires_prompt() {
        let request = JobRequest::new("").with_input_url("gs://bucket/ref.jpg");
        assert!(matches!(
            adapter().build_submit_request(&request),
            Err(JobError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_submit_response_operation_name() {
        let body = json!({"name": "operations/abc123"});
        match adapter().parse_submit_response(&body).unwrap() {
            Submission::Pending { handle } => {
                assert_eq!(handle.provider, "gemini");
                assert_eq!(handle.job_id, "operations/abc123");
            }
            other => panic!("Expected Pending, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_submit_response_already_done() {
        let body = json!({
            "name": "operations/abc123",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://storage.example.com/v.mp4"}}
            ]}}
        });
        match adapter().parse_submit_response(&body).unwrap() {
            Submission::Immediate { output } => {
                assert_eq!(output.primary_url(), Some("https://storage.example.com/v.mp4"));
            }
            other => panic!("Expected Immediate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_submit_synchronous_rejection_keeps_handle() {
        // `done: true` plus an operation-level error is a rejection, not
        // a completed result: the handle comes back so the first poll
        // surfaces the provider's message.
        let body = json!({
            "name": "operations/abc123",
            "done": true,
            "error": {"code": 3, "message": "prompt violates safety policy"}
        });
        match adapter().parse_submit_response(&body).unwrap() {
            Submission::Pending { handle } => assert_eq!(handle.job_id, "operations/abc123"),
            other => panic!("Expected Pending, got {:?}", other),
        }
        match adapter().parse_poll_response(&body).unwrap() {
            PollOutcome::Failed { reason } => {
                assert_eq!(reason, "prompt violates safety policy");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_submit_rejection_without_name_preserves_reason() {
        let body = json!({"done": true, "error": {"message": "quota exceeded"}});
        match adapter().parse_submit_response(&body) {
            Err(JobError::MalformedResponse(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_request_targets_operation() {
        let handle = JobHandle::new("gemini", "operations/abc123");
        let http = adapter().build_poll_request(&handle).unwrap();
        assert_eq!(
            http.url,
            "https://generativelanguage.googleapis.com/v1beta/operations/abc123"
        );
    }

    #[test]
    fn test_parse_poll_pending() {
        let running = json!({"name": "operations/abc123"});
        assert!(!adapter().parse_poll_response(&running).unwrap().is_terminal());

        let explicit = json!({"name": "operations/abc123", "done": false});
        assert!(!adapter().parse_poll_response(&explicit).unwrap().is_terminal());
    }

    #[test]
    fn test_parse_poll_succeeded_round_trip() {
        let body = json!({
            "name": "operations/abc123",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://storage.example.com/out.mp4"}}
            ]}}
        });
        match adapter().parse_poll_response(&body).unwrap() {
            PollOutcome::Succeeded { output } => {
                assert_eq!(output.primary_url(), Some("https://storage.example.com/out.mp4"));
                assert_eq!(output.kind, MediaKind::Video);
            }
            other => panic!("Expected Succeeded, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_poll_operation_error() {
        let body = json!({
            "name": "operations/abc123",
            "done": true,
            "error": {"code": 3, "message": "prompt violates safety policy"}
        });
        match adapter().parse_poll_response(&body).unwrap() {
            PollOutcome::Failed { reason } => {
                assert_eq!(reason, "prompt violates safety policy");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_poll_done_without_result_is_malformed() {
        let body = json!({"name": "operations/abc123", "done": true, "response": {}});
        assert!(matches!(
            adapter().parse_poll_response(&body),
            Err(JobError::MalformedResponse(_))
        ));
    }
}
