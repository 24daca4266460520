#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Turning evidence plus a rubric into a verdict.
//!
//! Per request the orchestrator moves through
//! `Received → EvidenceGathering → PromptBuilt → BackendInvoked →
//! {Validated | FallbackApplied} → Done`. It never retries and never fails:
//! a backend error or an unusable reply becomes the fallback verdict.

/// Reasoning backend access.
pub mod backend;
/// Prompt assembly.
pub mod prompt;
/// Tier selection.
pub mod tier;
/// Reply validation.
pub mod verdict;

use std::{fmt::Display, sync::Arc, time::Instant};

pub use self::{
    backend::{CompletionRequest, OpenAiBackend, ReasoningBackend, UnconfiguredBackend},
    prompt::AssessmentPrompts,
    tier::{TierPolicy, select_backend},
    verdict::{FALLBACK_BACKEND, extract_json, fallback_verdict, parse_and_validate},
};
use crate::types::{EvidenceBundle, Rubric, Verdict};

/// Stages of one assessment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentStage {
    /// The request was accepted.
    Received,
    /// Evidence is being collected.
    EvidenceGathering,
    /// The prompt is assembled.
    PromptBuilt,
    /// The backend call is in flight.
    BackendInvoked,
    /// The reply passed validation.
    Validated,
    /// The fallback verdict replaced the reply.
    FallbackApplied,
    /// A verdict exists.
    Done,
}

impl AssessmentStage {
    /// Returns the stage's name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStage::Received => "received",
            AssessmentStage::EvidenceGathering => "evidence_gathering",
            AssessmentStage::PromptBuilt => "prompt_built",
            AssessmentStage::BackendInvoked => "backend_invoked",
            AssessmentStage::Validated => "validated",
            AssessmentStage::FallbackApplied => "fallback_applied",
            AssessmentStage::Done => "done",
        }
    }
}

impl Display for AssessmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since `started`, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Routes evidence to a backend tier and validates the reply.
///
/// Holds no mutable state; one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    /// Reasoning backend.
    backend:     Arc<dyn ReasoningBackend>,
    /// Embedded prompt assets.
    prompts:     AssessmentPrompts,
    /// Tier thresholds.
    tier_policy: TierPolicy,
}

impl Orchestrator {
    /// Creates an orchestrator with the default tier thresholds.
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            backend,
            prompts: AssessmentPrompts::load(),
            tier_policy: TierPolicy::default(),
        }
    }

    /// Replaces the tier thresholds.
    pub fn with_tier_policy(mut self, tier_policy: TierPolicy) -> Self {
        self.tier_policy = tier_policy;
        self
    }

    /// Returns the prompt assets.
    pub fn prompts(&self) -> &AssessmentPrompts {
        &self.prompts
    }

    /// Produces exactly one verdict for `evidence` judged against `rubric`.
    pub async fn assess(&self, evidence: &EvidenceBundle, rubric: &Rubric) -> Verdict {
        let started = Instant::now();

        let tier = select_backend(
            evidence.source_type,
            evidence.evidence_length(),
            rubric.has_reference_example(),
            &self.tier_policy,
        );
        let prompt = self.prompts.build_prompt(evidence, rubric);
        tracing::debug!(
            stage = %AssessmentStage::PromptBuilt,
            tier = %tier,
            prompt_chars = prompt.chars().count(),
            "Prompt assembled"
        );

        let model = self.backend.model_for(tier);
        tracing::info!(stage = %AssessmentStage::BackendInvoked, tier = %tier, model = %model, "Invoking reasoning backend");
        let reply = self
            .backend
            .complete(CompletionRequest::new(
                self.prompts.system_message(),
                prompt,
                tier,
            ))
            .await;

        let verdict = match reply {
            Ok(raw) => parse_and_validate(&raw, &model, elapsed_ms(started)),
            Err(err) => {
                tracing::warn!(tier = %tier, model = %model, error = %err, "Reasoning backend failed");
                fallback_verdict(elapsed_ms(started))
            }
        };

        let stage = if verdict.is_fallback() {
            AssessmentStage::FallbackApplied
        } else {
            AssessmentStage::Validated
        };
        tracing::info!(
            stage = %stage,
            remark = %verdict.remark,
            confidence = verdict.confidence,
            backend = %verdict.backend_used,
            latency_ms = verdict.latency_ms,
            "Verdict ready"
        );
        tracing::debug!(stage = %AssessmentStage::Done, "Assessment finished");

        verdict
    }
}
