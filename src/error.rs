#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

/// Reasons evidence could not be gathered for a submission at all.
///
/// These are the only failures surfaced to callers of the evidence collector.
#[derive(thiserror::Error, Debug)]
pub enum EvidenceError {
    /// The submitted reference is not a URL/path of the expected shape.
    #[error("`{0}` is not a valid submission reference")]
    InvalidReference(String),
    /// The repository or resource is absent or private.
    #[error("{0} could not be found, or it is private")]
    NotFound(String),
    /// The hosting API refused the request (quota exhausted or forbidden).
    #[error("The hosting API refused the request for {0} (rate limited or forbidden)")]
    RateLimited(String),
    /// The hosting API answered with an unexpected status.
    #[error("The hosting API answered {status} for {resource}")]
    Upstream {
        /// Resource being fetched.
        resource: String,
        /// HTTP status returned.
        status:   u16,
    },
    /// The request to the hosting API never completed.
    #[error("Could not reach the hosting API")]
    Transport(#[from] reqwest::Error),
}

/// Failures of a single reasoning-backend invocation.
///
/// The orchestrator converts every one of these into a fallback verdict.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// The call did not finish within the configured deadline.
    #[error("Reasoning backend timed out after {0:?}")]
    Timeout(Duration),
    /// The call failed at the transport or API level.
    #[error("Reasoning backend request failed: {0}")]
    Request(String),
    /// The call succeeded but returned no content.
    #[error("Reasoning backend returned no content")]
    EmptyResponse,
    /// No backend credentials or model is configured for the tier.
    #[error("Reasoning backend is not configured: {0}")]
    NotConfigured(String),
}

/// Failures of the top-level assessment facade.
#[derive(thiserror::Error, Debug)]
pub enum AssessError {
    /// The injected rate limiter refused the submitter.
    #[error("Too many assessments requested by `{0}`; try again later")]
    Throttled(String),
    /// Evidence could not be gathered.
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

/// Failures of the rubric/verdict store adapters.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// No rubric exists under the requested key.
    #[error("No rubric found for `{0}`")]
    MissingRubric(String),
    /// The store answered with something that is not a rubric.
    #[error("Could not decode the stored rubric: {0}")]
    Decode(#[from] serde_json::Error),
    /// The store could not be reached or rejected the request.
    #[error("Store request failed: {0}")]
    Request(String),
}
