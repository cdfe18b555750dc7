//! FAL.run Queue Adapter
//!
//! One adapter covers every FAL queue pipeline (inpainting, upscaling,
//! virtual try-on, background removal, sound effects): the queue protocol
//! is identical, only the app path and the shape of the completed payload
//! differ. Submitting enqueues the job and returns a request id plus a
//! response URL; polling the response URL yields a status body while the
//! job is in flight and the result payload once it completes.

use serde_json::{Map, Value};
use tracing::warn;

use crate::adapter::{value_at, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::error::{JobError, JobResult};
use crate::http::HttpRequest;
use crate::job::{JobHandle, JobRequest, MediaKind, MediaOutput, PollOutcome, Submission};

/// Default base URL for the FAL queue
const DEFAULT_BASE_URL: &str = "https://queue.fal.run";

/// Result-payload paths probed per media kind, in order. FAL pipelines are
/// not uniform here, so each kind documents its known locations.
const IMAGE_PATHS: &[&str] = &["images.0.url", "image.url"];
const VIDEO_PATHS: &[&str] = &["video.url"];
const AUDIO_PATHS: &[&str] = &["audio.url", "audio_file.url"];

/// FAL queue pipeline adapter
#[derive(Clone)]
pub struct FalQueueAdapter {
    api_key: String,
    base_url: String,
    app: String,
    media_kind: MediaKind,
}

impl std::fmt::Debug for FalQueueAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalQueueAdapter")
            .field("base_url", &self.base_url)
            .field("app", &self.app)
            .field("media_kind", &self.media_kind)
            .finish_non_exhaustive()
    }
}

impl FalQueueAdapter {
    /// Creates an adapter for an arbitrary FAL app path
    pub fn new(
        config: ProviderConfig,
        app: impl Into<String>,
        media_kind: MediaKind,
    ) -> JobResult<Self> {
        let api_key = config.require_api_key("fal")?;
        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            app: app.into(),
            media_kind,
        })
    }

    /// Image inpainting pipeline
    pub fn inpaint(config: ProviderConfig) -> JobResult<Self> {
        Self::new(config, "fal-ai/flux-general/inpainting", MediaKind::Image)
    }

    /// Image upscaling pipeline
    pub fn upscale(config: ProviderConfig) -> JobResult<Self> {
        Self::new(config, "fal-ai/clarity-upscaler", MediaKind::Image)
    }

    /// Virtual try-on pipeline
    pub fn try_on(config: ProviderConfig) -> JobResult<Self> {
        Self::new(config, "fal-ai/idm-vton", MediaKind::Image)
    }

    /// Background removal pipeline
    pub fn background_removal(config: ProviderConfig) -> JobResult<Self> {
        Self::new(config, "fal-ai/birefnet", MediaKind::Image)
    }

    /// Sound-effect generation pipeline
    pub fn sound_effects(config: ProviderConfig) -> JobResult<Self> {
        Self::new(config, "fal-ai/mmaudio-v2", MediaKind::Audio)
    }

    fn submit_url(&self) -> String {
        format!("{}/{}", self.base_url, self.app)
    }

    fn result_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base_url, self.app, request_id)
    }

    fn auth(&self, request: HttpRequest) -> HttpRequest {
        request.with_header("Authorization", format!("Key {}", self.api_key))
    }

    /// Result-payload paths for this pipeline's media kind
    fn result_paths(&self) -> &'static [&'static str] {
        match self.media_kind {
            MediaKind::Image => IMAGE_PATHS,
            MediaKind::Video => VIDEO_PATHS,
            MediaKind::Audio => AUDIO_PATHS,
        }
    }

    /// Extracts the media output from a completed payload
    fn parse_result_payload(&self, body: &Value) -> JobResult<MediaOutput> {
        // Multi-image results list every URL; other kinds carry one.
        if self.media_kind == MediaKind::Image {
            if let Some(items) = value_at(body, "images").and_then(Value::as_array) {
                let urls: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("url").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                if !urls.is_empty() {
                    return Ok(MediaOutput::new(self.media_kind, urls));
                }
            }
        }

        for path in self.result_paths() {
            if let Some(url) = value_at(body, path).and_then(Value::as_str) {
                return Ok(MediaOutput::single(self.media_kind, url));
            }
        }

        Err(JobError::MalformedResponse(format!(
            "FAL {} payload has no {} URL at any of: {}",
            self.app,
            self.media_kind,
            self.result_paths().join(", ")
        )))
    }

    fn parse_failure_reason(body: &Value) -> String {
        body.get("error")
            .and_then(Value::as_str)
            .or_else(|| body.get("detail").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| "Generation failed".to_string())
    }
}

impl ProviderAdapter for FalQueueAdapter {
    fn name(&self) -> &str {
        "fal"
    }

    fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    fn build_submit_request(&self, request: &JobRequest) -> JobResult<HttpRequest> {
        request.validate().map_err(JobError::Configuration)?;

        // Tunables go through verbatim; the generic fields fill the
        // conventional keys unless the caller already set them.
        let mut body = Map::new();
        for (key, value) in &request.options {
            body.insert(key.clone(), value.clone());
        }
        if !request.prompt.trim().is_empty() && !body.contains_key("prompt") {
            body.insert("prompt".to_string(), request.prompt.clone().into());
        }
        if let Some(url) = request.input_urls.first() {
            if !body.contains_key("image_url") {
                body.insert("image_url".to_string(), url.clone().into());
            }
        }

        Ok(self.auth(HttpRequest::post(self.submit_url(), Value::Object(body))))
    }

    fn parse_submit_response(&self, body: &Value) -> JobResult<Submission> {
        // Queue ticket or inline result; a runtime fact, not a static
        // property of the pipeline.
        if let Some(request_id) = body.get("request_id").and_then(Value::as_str) {
            let mut handle = JobHandle::new(self.name(), request_id);
            if let Some(response_url) = body.get("response_url").and_then(Value::as_str) {
                handle = handle.with_poll_url(response_url);
            }
            return Ok(Submission::Pending { handle });
        }

        let output = self.parse_result_payload(body)?;
        Ok(Submission::Immediate { output })
    }

    fn build_poll_request(&self, handle: &JobHandle) -> JobResult<HttpRequest> {
        let url = handle
            .poll_url
            .clone()
            .unwrap_or_else(|| self.result_url(&handle.job_id));
        Ok(self.auth(HttpRequest::get(url)))
    }

    fn parse_poll_response(&self, body: &Value) -> JobResult<PollOutcome> {
        match body.get("status").and_then(Value::as_str) {
            Some("IN_QUEUE") | Some("IN_PROGRESS") => Ok(PollOutcome::Pending),
            Some("ERROR") | Some("FAILED") => Ok(PollOutcome::Failed {
                reason: Self::parse_failure_reason(body),
            }),
            Some(other) if other != "COMPLETED" && other != "OK" => {
                warn!("Unknown FAL queue status: {}", other);
                Ok(PollOutcome::Pending)
            }
            // No in-flight status: this is the result payload itself.
            _ => {
                if body.get("error").is_some() || body.get("detail").is_some() {
                    return Ok(PollOutcome::Failed {
                        reason: Self::parse_failure_reason(body),
                    });
                }
                let output = self.parse_result_payload(body)?;
                Ok(PollOutcome::Succeeded { output })
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
    use serde_json::json;

    fn upscaler() -> FalQueueAdapter {
        FalQueueAdapter::upscale(ProviderConfig::with_api_key("fal-key")).unwrap()
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(matches!(
            FalQueueAdapter::inpaint(ProviderConfig::default()),
            Err(JobError::Configuration(_))
        ));
    }

    #[test]
    fn test_pipeline_constructors() {
        let config = || ProviderConfig::with_api_key("k");
        assert_eq!(
            FalQueueAdapter::try_on(config()).unwrap().app,
            "fal-ai/idm-vton"
        );
        assert_eq!(
            FalQueueAdapter::sound_effects(config()).unwrap().media_kind(),
            MediaKind::Audio
        );
        assert_eq!(
            FalQueueAdapter::background_removal(config()).unwrap().media_kind(),
            MediaKind::Image
        );
    }

    #[test]
    fn test_submit_request_shape() {
        let request = JobRequest::new("restore fine detail")
            .with_input_url("https://x/source.png")
            .with_option("upscale_factor", 2);
        let http = upscaler().build_submit_request(&request).unwrap();

        assert_eq!(http.url, "https://queue.fal.run/fal-ai/clarity-upscaler");
        assert!(http
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Key fal-key"));

        let body = http.body.unwrap();
        assert_eq!(body["prompt"], "restore fine detail");
        assert_eq!(body["image_url"], "https://x/source.png");
        assert_eq!(body["upscale_factor"], 2);
    }

    #[test]
    fn test_submit_options_take_precedence_over_generic_fields() {
        let request = JobRequest::new("")
            .with_input_url("https://x/person.png")
            .with_option("image_url", "https://x/override.png")
            .with_option("garment_image_url", "https://x/garment.png");
        let http = FalQueueAdapter::try_on(ProviderConfig::with_api_key("k"))
            .unwrap()
            .build_submit_request(&request)
            .unwrap();

        let body = http.body.unwrap();
        assert_eq!(body["image_url"], "https://x/override.png");
        assert_eq!(body["garment_image_url"], "https://x/garment.png");
        assert!(body.get("prompt").is_none());
    }

    #[test]
    fn test_parse_submit_queue_ticket() {
        let body = json!({
            "request_id": "req-42",
            "response_url": "https://queue.fal.run/fal-ai/clarity-upscaler/requests/req-42",
            "status_url": "https://queue.fal.run/fal-ai/clarity-upscaler/requests/req-42/status"
        });
        match upscaler().parse_submit_response(&body).unwrap() {
            Submission::Pending { handle } => {
                assert_eq!(handle.provider, "fal");
                assert_eq!(handle.job_id, "req-42");
                assert!(handle.poll_url.unwrap().ends_with("/requests/req-42"));
            }
            other => panic!("Expected Pending, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_submit_inline_result() {
        let body = json!({"image": {"url": "https://fal.media/out.png"}});
        match upscaler().parse_submit_response(&body).unwrap() {
            Submission::Immediate { output } => {
                assert_eq!(output.primary_url(), Some("https://fal.media/out.png"));
            }
            other => panic!("Expected Immediate, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_request_prefers_provider_url() {
        let with_url = JobHandle::new("fal", "req-42").with_poll_url("https://q/custom");
        let http = upscaler().build_poll_request(&with_url).unwrap();
        assert_eq!(http.url, "https://q/custom");

        let without = JobHandle::new("fal", "req-42");
        let http = upscaler().build_poll_request(&without).unwrap();
        assert_eq!(
            http.url,
            "https://queue.fal.run/fal-ai/clarity-upscaler/requests/req-42"
        );
    }

    #[test]
    fn test_parse_poll_in_flight_statuses() {
        for status in ["IN_QUEUE", "IN_PROGRESS"] {
            let outcome = upscaler()
                .parse_poll_response(&json!({"status": status}))
                .unwrap();
            assert!(!outcome.is_terminal(), "{} should be pending", status);
        }
    }

    #[test]
    fn test_parse_poll_unknown_status_stays_pending() {
        let outcome = upscaler()
            .parse_poll_response(&json!({"status": "WARMING_UP"}))
            .unwrap();
        assert!(!outcome.is_terminal());
    }

    #[test]
    fn test_parse_poll_error_status() {
        let body = json!({"status": "ERROR", "error": "NSFW content detected"});
        match upscaler().parse_poll_response(&body).unwrap() {
            PollOutcome::Failed { reason } => assert_eq!(reason, "NSFW content detected"),
            other => panic!("Expected Failed, got {:?}", other),
        }

        let detail_only = json!({"detail": "Request validation failed"});
        match upscaler().parse_poll_response(&detail_only).unwrap() {
            PollOutcome::Failed { reason } => assert_eq!(reason, "Request validation failed"),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_poll_image_result_round_trip() {
        let body = json!({"images": [
            {"url": "https://fal.media/a.png"},
            {"url": "https://fal.media/b.png"}
        ]});
        match upscaler().parse_poll_response(&body).unwrap() {
            PollOutcome::Succeeded { output } => {
                assert_eq!(output.primary_url(), Some("https://fal.media/a.png"));
                assert_eq!(output.urls.len(), 2);
            }
            other => panic!("Expected Succeeded, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_poll_audio_result_paths() {
        let adapter = FalQueueAdapter::sound_effects(ProviderConfig::with_api_key("k")).unwrap();

        let primary = json!({"audio": {"url": "https://fal.media/s.mp3"}});
        assert!(adapter.parse_poll_response(&primary).unwrap().is_terminal());

        let fallback = json!({"audio_file": {"url": "https://fal.media/s.flac"}});
        match adapter.parse_poll_response(&fallback).unwrap() {
            PollOutcome::Succeeded { output } => {
                assert_eq!(output.primary_url(), Some("https://fal.media/s.flac"));
                assert_eq!(output.kind, MediaKind::Audio);
            }
            other => panic!("Expected Succeeded, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_poll_payload_without_media_is_malformed() {
        let body = json!({"seed": 1234, "timings": {"inference": 2.1}});
        match upscaler().parse_poll_response(&body) {
            Err(JobError::MalformedResponse(msg)) => {
                assert!(msg.contains("images.0.url"));
            }
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }
}
