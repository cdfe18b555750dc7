//! Provider Adapter Seam
//!
//! The translation layer between the generic job client and one external
//! API's request/response schema. Adapters are pure: they build request
//! values and interpret response payloads, but never touch the network.

use serde_json::Value;

use crate::error::{JobError, JobResult};
use crate::http::HttpRequest;
use crate::job::{JobHandle, JobRequest, MediaKind, PollOutcome, Submission};

/// Trait for provider adapters
///
/// Each provider family implements these four pure functions; the client
/// never special-cases a provider name directly.
pub trait ProviderAdapter: Send + Sync {
    /// Adapter name (also stamped on the handles it produces)
    fn name(&self) -> &str;

    /// Kind of media this adapter produces
    fn media_kind(&self) -> MediaKind;

    /// Builds the initial submit request. The adapter validates that the
    /// job request carries every field the provider schema requires.
    fn build_submit_request(&self, request: &JobRequest) -> JobResult<HttpRequest>;

    /// Interprets the submit response: either the final artifact
    /// (synchronous providers) or a handle to poll.
    fn parse_submit_response(&self, body: &Value) -> JobResult<Submission>;

    /// Builds one status-check request for a handle this adapter produced.
    fn build_poll_request(&self, handle: &JobHandle) -> JobResult<HttpRequest>;

    /// Interprets a status-check response into a tagged outcome. Payloads
    /// matching neither the pending, failed, nor succeeded shape at the
    /// provider's documented paths are a [`JobError::MalformedResponse`].
    fn parse_poll_response(&self, body: &Value) -> JobResult<PollOutcome>;
}

// =============================================================================
// JSON Path Helpers
// =============================================================================

/// Looks up a dotted path (`"results.videos.0.url"`) in a JSON value.
/// Numeric segments index arrays.
pub(crate) fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Extracts a string at a dotted path, failing loudly when absent.
pub(crate) fn string_at<'a>(value: &'a Value, path: &str) -> JobResult<&'a str> {
    value_at(value, path)
        .and_then(Value::as_str)
        .ok_or_else(|| JobError::MalformedResponse(format!("Expected string at `{}`", path)))
}

// =============================================================================
// Tests
// =============================================================================
