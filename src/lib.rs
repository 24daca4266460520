//! # assessor
//!
//! Evidence gathering and rubric-based assessment of student submissions.
//!
//! A submission (text, a document, a repository link, a website link or an
//! image) is turned into a size-bounded evidence summary, which a reasoning
//! backend then judges against an instructor's rubric. The result is always a
//! [`types::Verdict`]: once evidence exists, every failure degrades to a
//! low-confidence fallback verdict instead of an error.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Rubric assessment: tier routing, prompting, backend calls, validation
pub mod assessment;
/// Capabilities injected by the embedding application (cache, rate limiter)
pub mod capabilities;
/// Environment-driven configuration
pub mod config;
/// Named policy constants
pub mod constants;
/// Error types
pub mod error;
/// Dispatch from submission references to evidence sources
pub mod evidence;
/// Repository analysis
pub mod repository;
/// Rubric and verdict persistence adapters
pub mod store;
/// Shared data model
pub mod types;
/// Utility functions for convenience
pub mod util;
/// Website probing
pub mod website;

use std::sync::Arc;

use anyhow::Result;

use crate::{
    assessment::{AssessmentStage, OpenAiBackend, Orchestrator, ReasoningBackend, UnconfiguredBackend},
    capabilities::{Cache, RateLimiter},
    config::AssessorConfig,
    constants::REPOSITORY_CACHE_TTL_SECS,
    error::{AssessError, EvidenceError},
    evidence::EvidenceCollector,
    repository::{GithubHost, RepositoryAnalyzer},
    store::{VerdictRecord, VerdictSink},
    types::{EvidenceBundle, Rubric, SubmissionReference, Verdict},
    website::WebsiteProber,
};

/// The whole pipeline: admission, evidence, assessment, recording.
///
/// Holds no mutable state of its own; share it freely between tasks.
#[derive(Clone)]
pub struct Assessor {
    /// Evidence sources.
    collector:    EvidenceCollector,
    /// Verdict production.
    orchestrator: Orchestrator,
    /// Optional per-submitter admission control.
    limiter:      Option<Arc<dyn RateLimiter>>,
    /// Optional verdict recording.
    sink:         Option<Arc<dyn VerdictSink>>,
}

impl Assessor {
    /// Assembles an assessor from its parts.
    pub fn new(collector: EvidenceCollector, orchestrator: Orchestrator) -> Self {
        Self {
            collector,
            orchestrator,
            limiter: None,
            sink: None,
        }
    }

    /// Builds the default pipeline from configuration: the hosting API for
    /// repositories, a plain HTTP prober for websites, and the configured
    /// reasoning backend (or one that always falls back when none is set).
    pub fn from_config(config: &AssessorConfig, cache: Option<Arc<dyn Cache>>) -> Result<Self> {
        let client = config.http_client()?;

        let mut repository =
            RepositoryAnalyzer::new(Arc::new(GithubHost::new(client.clone(), config.github().clone())));
        if let Some(cache) = cache {
            repository = repository.with_cache(
                cache,
                std::time::Duration::from_secs(REPOSITORY_CACHE_TTL_SECS),
            );
        }
        let collector = EvidenceCollector::new(repository, WebsiteProber::new(client));

        let backend: Arc<dyn ReasoningBackend> = match config.openai() {
            Some(openai) => Arc::new(OpenAiBackend::new(openai, config.backend_timeout())),
            None => {
                tracing::warn!("No reasoning backend configured; every verdict will be a fallback");
                Arc::new(UnconfiguredBackend)
            }
        };
        let orchestrator = Orchestrator::new(backend).with_tier_policy(config.tier_policy());

        Ok(Self::new(collector, orchestrator))
    }

    /// Refuses submitters the limiter does not admit.
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Records every verdict produced by [`Assessor::assess_submission`].
    pub fn with_verdict_sink(mut self, sink: Arc<dyn VerdictSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the evidence collector.
    pub fn collector(&self) -> &EvidenceCollector {
        &self.collector
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Gathers evidence for a submission.
    pub async fn collect(
        &self,
        reference: &SubmissionReference,
        rubric: &Rubric,
    ) -> Result<EvidenceBundle, EvidenceError> {
        self.collector.collect(reference, rubric).await
    }

    /// Judges already-gathered evidence. Never fails.
    pub async fn assess(&self, evidence: &EvidenceBundle, rubric: &Rubric) -> Verdict {
        self.orchestrator.assess(evidence, rubric).await
    }

    /// Runs one submission end to end.
    ///
    /// Fails only when the submitter is throttled or no evidence could be
    /// gathered. A failing verdict sink is logged, not returned.
    pub async fn assess_submission(
        &self,
        submitter: &str,
        reference: &SubmissionReference,
        rubric: &Rubric,
    ) -> Result<Verdict, AssessError> {
        tracing::info!(
            stage = %AssessmentStage::Received,
            submitter,
            source_type = %reference.source_type(),
            "Submission received"
        );

        if let Some(limiter) = &self.limiter
            && !limiter.try_acquire(submitter).await
        {
            tracing::warn!(submitter, "Submitter throttled");
            return Err(AssessError::Throttled(submitter.to_string()));
        }

        tracing::info!(stage = %AssessmentStage::EvidenceGathering, submitter, "Gathering evidence");
        let evidence = self.collect(reference, rubric).await?;
        let verdict = self.assess(&evidence, rubric).await;

        if let Some(sink) = &self.sink {
            let record = VerdictRecord::new(submitter, evidence.source_type, &verdict);
            if let Err(err) = sink.record(&record).await {
                tracing::warn!(submitter, error = %err, "Could not record verdict");
            }
        }

        Ok(verdict)
    }
}
