//! GenJob
//!
//! Async submit/poll client for long-running generative-media jobs.
//!
//! Every generative provider follows the same shape: submit a job, get
//! back either the artifact or a handle, poll until the job finishes,
//! then pull a URL out of a provider-specific payload. This crate owns
//! that loop once — [`JobClient`] drives any [`ProviderAdapter`] to a
//! terminal [`JobOutcome`] under a [`PollPolicy`], with cancellation and
//! parametrized backoff.
//!
//! ```no_run
//! use genjob::{JobClient, JobRequest, PollPolicy, ProviderConfig};
//! use genjob::providers::GeminiVideoAdapter;
//!
//! # async fn demo(api_key: String) -> genjob::JobResult<()> {
//! let client = JobClient::new()?;
//! let adapter = GeminiVideoAdapter::new(ProviderConfig::with_api_key(api_key))?;
//! let request = JobRequest::new("A whale breaching at dawn");
//!
//! let outcome = client
//!     .run_to_completion(&request, &adapter, &PollPolicy::default())
//!     .await?;
//! if let Some(output) = outcome.output() {
//!     println!("video at {:?}", output.primary_url());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Credentials are injected via [`ProviderConfig`]; the crate never reads
//! the process environment.

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod job;
pub mod policy;
pub mod providers;

// Re-export main types
pub use adapter::ProviderAdapter;
pub use client::{CancelHandle, CancelToken, JobClient};
pub use config::ProviderConfig;
pub use error::{JobError, JobResult};
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, ScriptedTransport};
pub use job::{
    JobHandle, JobOutcome, JobRequest, MediaKind, MediaOutput, PollOutcome, Submission,
};
pub use policy::{Backoff, PollPolicy};
