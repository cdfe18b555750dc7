//! Long-Running Job Client
//!
//! The one submit→poll→resolve loop shared by every provider. Callers hand
//! the client a request, an adapter, and a policy; the client drives the
//! job to a terminal [`JobOutcome`] without ever special-casing a provider.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapter::ProviderAdapter;
use crate::error::{JobError, JobResult};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::job::{JobHandle, JobOutcome, JobRequest, PollOutcome, Submission};
use crate::policy::PollPolicy;

// =============================================================================
// Cancellation
// =============================================================================

/// Clonable token observed by the poll loop. Cancellation aborts the loop
/// promptly, including mid-sleep, so an abandoned caller never leaks an
/// unbounded polling task.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Fire-once handle that cancels every token cloned from its pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelToken {
    /// Creates a handle/token pair
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        // Handle dropped without cancelling: this job can no longer be
        // cancelled, so the future must stay pending.
        std::future::pending::<()>().await;
    }
}

impl CancelHandle {
    /// Requests cancellation. Returns false if every token is gone.
    pub fn cancel(self) -> bool {
        self.tx.send(true).is_ok()
    }
}

// =============================================================================
// Job Client
// =============================================================================

/// Generic long-running-operation client
///
/// Stateless apart from its transport: concurrent `run_to_completion`
/// invocations share nothing, so multiple jobs may run without
/// coordination. That statelessness is the concurrency strategy.
#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient").finish_non_exhaustive()
    }
}

impl JobClient {
    /// Creates a client backed by the production transport
    pub fn new() -> JobResult<Self> {
        Ok(Self {
            transport: Arc::new(ReqwestTransport::new()?),
        })
    }

    /// Creates a client with an injected transport (tests, middleware)
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Submits a job: one outbound call, no retry at this layer.
    ///
    /// A non-success status fails immediately with
    /// [`JobError::Provider`]; a 2xx body the adapter cannot interpret is
    /// a [`JobError::MalformedResponse`].
    pub async fn submit(
        &self,
        request: &JobRequest,
        adapter: &dyn ProviderAdapter,
    ) -> JobResult<Submission> {
        let http_request = adapter.build_submit_request(request)?;
        let response = self.transport.execute(&http_request).await?;

        if !response.is_success() {
            return Err(JobError::provider(response.status, &response.body));
        }

        let submission = adapter.parse_submit_response(&response.json()?)?;
        match &submission {
            Submission::Immediate { .. } => {
                info!("{} job completed synchronously at submit", adapter.name());
            }
            Submission::Pending { handle } => {
                info!("{} job submitted: job_id={}", adapter.name(), handle.job_id);
            }
        }
        Ok(submission)
    }

    /// Issues one status-check call. Idempotent and side-effect-free
    /// beyond the single HTTP request.
    pub async fn poll(
        &self,
        handle: &JobHandle,
        adapter: &dyn ProviderAdapter,
    ) -> JobResult<PollOutcome> {
        if handle.provider != adapter.name() {
            return Err(JobError::Configuration(format!(
                "Handle for provider '{}' passed to adapter '{}'",
                handle.provider,
                adapter.name()
            )));
        }

        let http_request = adapter.build_poll_request(handle)?;
        let response = self.transport.execute(&http_request).await?;

        if !response.is_success() {
            return Err(JobError::provider(response.status, &response.body));
        }

        let outcome = adapter.parse_poll_response(&response.json()?)?;
        debug!(
            "{} poll for job {}: terminal={}",
            adapter.name(),
            handle.job_id,
            outcome.is_terminal()
        );
        Ok(outcome)
    }

    /// Drives a request to a terminal outcome: submit, then poll under the
    /// policy's schedule until the job succeeds, fails, or the attempt
    /// budget is exhausted ([`JobOutcome::TimedOut`]).
    pub async fn run_to_completion(
        &self,
        request: &JobRequest,
        adapter: &dyn ProviderAdapter,
        policy: &PollPolicy,
    ) -> JobResult<JobOutcome> {
        // A dropped handle leaves the token permanently un-cancellable.
        let (_handle, token) = CancelToken::pair();
        self.run_until_cancelled(request, adapter, policy, token)
            .await
    }

    /// Same loop as [`run_to_completion`](Self::run_to_completion), but
    /// aborts promptly with [`JobOutcome::Cancelled`] when the token
    /// fires, including during the inter-poll sleep.
    pub async fn run_until_cancelled(
        &self,
        request: &JobRequest,
        adapter: &dyn ProviderAdapter,
        policy: &PollPolicy,
        cancel: CancelToken,
    ) -> JobResult<JobOutcome> {
        let handle = match self.submit(request, adapter).await? {
            Submission::Immediate { output } => return Ok(JobOutcome::Succeeded { output }),
            Submission::Pending { handle } => handle,
        };

        for attempt in 0..policy.max_attempts {
            let delay = policy.backoff.delay_for(attempt);
            tokio::select! {
                // Checked first so a pre-cancelled token never polls.
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        "{} job {} cancelled after {} poll attempts",
                        adapter.name(), handle.job_id, attempt
                    );
                    return Ok(JobOutcome::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.poll(&handle, adapter).await {
                Ok(PollOutcome::Pending) => continue,
                Ok(PollOutcome::Succeeded { output }) => {
                    info!(
                        "{} job {} succeeded after {} poll attempts",
                        adapter.name(),
                        handle.job_id,
                        attempt + 1
                    );
                    return Ok(JobOutcome::Succeeded { output });
                }
                Ok(PollOutcome::Failed { reason }) => {
                    info!("{} job {} failed: {}", adapter.name(), handle.job_id, reason);
                    return Ok(JobOutcome::Failed { reason });
                }
                Err(e) if e.is_transient() && policy.tolerate_transient_errors => {
                    warn!(
                        "{} poll attempt {} for job {} hit transient error, treating as pending: {}",
                        adapter.name(),
                        attempt + 1,
                        handle.job_id,
                        e
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "{} job {} timed out after {} poll attempts",
            adapter.name(),
            handle.job_id,
            policy.max_attempts
        );
        Ok(JobOutcome::TimedOut {
            attempts: policy.max_attempts,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
