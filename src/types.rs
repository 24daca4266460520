#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Pre-extracted metadata of an image submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// Original file name of the upload.
    pub file_name:   String,
    /// Image format, eg. `png`.
    #[serde(default)]
    pub format:      Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width:       Option<u32>,
    /// Height in pixels.
    #[serde(default)]
    pub height:      Option<u32>,
    /// Size of the upload in bytes.
    #[serde(default)]
    pub size_bytes:  Option<u64>,
    /// Alt text or description supplied with the upload.
    #[serde(default)]
    pub description: Option<String>,
}

/// What a student submitted. Each variant carries only what is relevant to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubmissionReference {
    /// Plain text typed into the submission form.
    Text {
        /// The submitted text.
        content: String,
    },
    /// A document whose text was extracted upstream.
    #[serde(rename_all = "camelCase")]
    Document {
        /// Original file name of the document.
        file_name:      String,
        /// Text extracted from the document.
        extracted_text: String,
    },
    /// A link to a source repository.
    GithubRepo {
        /// The repository URL as submitted.
        url: String,
    },
    /// A link to a deployed website.
    Website {
        /// The website URL as submitted.
        url: String,
    },
    /// An image whose metadata was extracted upstream.
    Screenshot {
        /// Metadata describing the image.
        image: ImageMetadata,
    },
}

impl SubmissionReference {
    /// Returns the source type tag for this reference.
    pub fn source_type(&self) -> SourceType {
        match self {
            SubmissionReference::Text { .. } => SourceType::Text,
            SubmissionReference::Document { .. } => SourceType::Document,
            SubmissionReference::GithubRepo { .. } => SourceType::GithubRepo,
            SubmissionReference::Website { .. } => SourceType::Website,
            SubmissionReference::Screenshot { .. } => SourceType::Screenshot,
        }
    }
}

/// Kind of evidence a bundle was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    /// Plain text.
    Text,
    /// Extracted document text.
    Document,
    /// Source repository.
    GithubRepo,
    /// Deployed website.
    Website,
    /// Image.
    Screenshot,
}

impl SourceType {
    /// Returns the wire name of the source type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "text",
            SourceType::Document => "document",
            SourceType::GithubRepo => "githubRepo",
            SourceType::Website => "website",
            SourceType::Screenshot => "screenshot",
        }
    }

    /// Returns true for evidence gathered by probing something remote.
    pub fn is_remote(&self) -> bool {
        matches!(self, SourceType::GithubRepo | SourceType::Website)
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, length-bounded representation of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceBundle {
    /// Kind of submission the evidence describes.
    pub source_type:  SourceType,
    /// Text handed to the reasoning backend.
    pub summary_text: String,
    /// Structured facts gathered along the way.
    pub metadata:     serde_json::Value,
}

impl EvidenceBundle {
    /// Creates a new bundle.
    pub fn new(source_type: SourceType, summary_text: String, metadata: serde_json::Value) -> Self {
        Self {
            source_type,
            summary_text,
            metadata,
        }
    }

    /// Length of the summary in characters.
    pub fn evidence_length(&self) -> usize {
        self.summary_text.chars().count()
    }
}

/// A question's grading policy. Immutable for the duration of an assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct Rubric {
    /// Question title.
    #[serde(default)]
    #[builder(default)]
    pub title:               String,
    /// Question description shown to students.
    #[serde(default)]
    #[builder(default)]
    pub description:         String,
    /// Requirements the submission must meet.
    #[serde(default)]
    #[builder(default)]
    pub criteria:            Vec<String>,
    /// Automatic-deduction triggers.
    #[serde(default)]
    #[builder(default)]
    pub red_flags:           Vec<String>,
    /// Bonus conditions.
    #[serde(default)]
    #[builder(default)]
    pub conditional_checks:  Vec<String>,
    /// Free-form instructions from the instructor.
    #[serde(default)]
    pub custom_instructions: Option<String>,
    /// A model answer to compare against.
    #[serde(default)]
    pub reference_example:   Option<String>,
}

impl Rubric {
    /// Lower-cased keywords drawn from the title, description and criteria,
    /// in first-seen order.
    pub fn keywords(&self) -> Vec<String> {
        std::iter::once(self.title.as_str())
            .chain(std::iter::once(self.description.as_str()))
            .chain(self.criteria.iter().map(String::as_str))
            .flat_map(|text| text.split(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.chars().count() >= 3)
            .map(str::to_lowercase)
            .unique()
            .collect()
    }

    /// Returns true when a non-blank reference example is present.
    pub fn has_reference_example(&self) -> bool {
        self.reference_example
            .as_deref()
            .is_some_and(|example| !example.trim().is_empty())
    }
}

/// Overall judgement category of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Remark {
    /// Exceeds the criteria.
    Excellent,
    /// Meets the criteria.
    Good,
    /// Partially meets the criteria.
    #[serde(rename = "Can Improve")]
    CanImprove,
    /// Misses the criteria.
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Remark {
    /// Every allowed remark, best first.
    pub const ALL: [Remark; 4] = [
        Remark::Excellent,
        Remark::Good,
        Remark::CanImprove,
        Remark::NeedsImprovement,
    ];

    /// Returns the display label of the remark.
    pub fn as_str(&self) -> &'static str {
        match self {
            Remark::Excellent => "Excellent",
            Remark::Good => "Good",
            Remark::CanImprove => "Can Improve",
            Remark::NeedsImprovement => "Needs Improvement",
        }
    }

    /// Matches a label case-insensitively, ignoring surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Remark> {
        let label = label.trim();
        Remark::ALL
            .into_iter()
            .find(|remark| remark.as_str().eq_ignore_ascii_case(label))
    }
}

impl Display for Remark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-size variant of the reasoning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendTier {
    /// Smallest, lowest-latency model.
    Fast,
    /// Default model.
    Balanced,
    /// Largest model.
    Capable,
}

impl BackendTier {
    /// Returns the tier's name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendTier::Fast => "fast",
            BackendTier::Balanced => "balanced",
            BackendTier::Capable => "capable",
        }
    }
}

impl Display for BackendTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured outcome of one assessment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Judgement category.
    pub remark:                Remark,
    /// Feedback addressed to the student.
    pub feedback:              String,
    /// Criteria the submission satisfies.
    pub criteria_met:          Vec<String>,
    /// Suggested improvements.
    pub areas_for_improvement: Vec<String>,
    /// Confidence in `[0.5, 1.0]`.
    pub confidence:            f64,
    /// Model that produced the verdict, or `fallback`.
    pub backend_used:          String,
    /// Wall-clock time spent producing the verdict.
    pub latency_ms:            u64,
}

impl Verdict {
    /// Returns true if the verdict was produced by the fallback path.
    pub fn is_fallback(&self) -> bool {
        self.backend_used == crate::assessment::verdict::FALLBACK_BACKEND
    }
}
