#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Turns any submission reference into an [`EvidenceBundle`].

use std::fmt::Write as _;

use serde_json::json;

use crate::{
    constants::{METADATA_TEXT_CHARS, PASSTHROUGH_TEXT_CHARS},
    error::EvidenceError,
    repository::RepositoryAnalyzer,
    types::{EvidenceBundle, ImageMetadata, Rubric, SourceType, SubmissionReference},
    util::{human_bytes, truncate_chars},
    website::WebsiteProber,
};

/// Dispatches a submission to the matching evidence source.
#[derive(Clone)]
pub struct EvidenceCollector {
    /// Source for repository links.
    repository: RepositoryAnalyzer,
    /// Source for website links.
    website:    WebsiteProber,
}

impl EvidenceCollector {
    /// Creates a collector from its two remote evidence sources.
    pub fn new(repository: RepositoryAnalyzer, website: WebsiteProber) -> Self {
        Self {
            repository,
            website,
        }
    }

    /// Gathers evidence for `reference`, using `rubric` to steer what is
    /// looked at.
    ///
    /// Fails only when no evidence can be gathered at all.
    pub async fn collect(
        &self,
        reference: &SubmissionReference,
        rubric: &Rubric,
    ) -> Result<EvidenceBundle, EvidenceError> {
        tracing::info!(source_type = %reference.source_type(), "Gathering evidence");
        let bundle = match reference {
            SubmissionReference::Text { content } => text_evidence(content),
            SubmissionReference::Document {
                file_name,
                extracted_text,
            } => document_evidence(file_name, extracted_text),
            SubmissionReference::GithubRepo { url } => {
                self.repository.analyze(url, &rubric.keywords()).await?
            }
            SubmissionReference::Website { url } => {
                self.website.analyze(url, &rubric.criteria).await?
            }
            SubmissionReference::Screenshot { image } => screenshot_evidence(image),
        };
        tracing::debug!(
            source_type = %bundle.source_type,
            evidence_length = bundle.evidence_length(),
            "Evidence gathered"
        );
        Ok(bundle)
    }
}

/// Passes plain text through, capped.
pub fn text_evidence(content: &str) -> EvidenceBundle {
    let length = content.chars().count();
    EvidenceBundle::new(
        SourceType::Text,
        truncate_chars(content.trim(), PASSTHROUGH_TEXT_CHARS),
        json!({
            "originalLength": length,
            "truncated": length > PASSTHROUGH_TEXT_CHARS,
        }),
    )
}

/// Passes extracted document text through, capped, under a file-name header.
pub fn document_evidence(file_name: &str, extracted_text: &str) -> EvidenceBundle {
    let length = extracted_text.chars().count();
    let file_name = truncate_chars(file_name, METADATA_TEXT_CHARS);
    let summary = format!(
        "# Document: {file_name}\n\n{}",
        truncate_chars(extracted_text.trim(), PASSTHROUGH_TEXT_CHARS)
    );
    EvidenceBundle::new(
        SourceType::Document,
        summary,
        json!({
            "fileName": file_name,
            "originalLength": length,
            "truncated": length > PASSTHROUGH_TEXT_CHARS,
        }),
    )
}

/// Renders pre-extracted image metadata as a few bounded lines.
pub fn screenshot_evidence(image: &ImageMetadata) -> EvidenceBundle {
    let mut summary = String::new();
    let _ = writeln!(
        summary,
        "# Screenshot: {}",
        truncate_chars(&image.file_name, METADATA_TEXT_CHARS)
    );
    if let Some(format) = &image.format {
        let _ = writeln!(summary, "Format: {}", truncate_chars(format, 20));
    }
    if let (Some(width), Some(height)) = (image.width, image.height) {
        let _ = writeln!(summary, "Dimensions: {width}x{height} px");
    }
    if let Some(size) = image.size_bytes {
        let _ = writeln!(summary, "Size: {}", human_bytes(size));
    }
    match image.description.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(description) => {
            let _ = writeln!(
                summary,
                "Description: {}",
                truncate_chars(description.trim(), METADATA_TEXT_CHARS)
            );
        }
        None => {
            let _ = writeln!(summary, "Description: (none provided)");
        }
    }

    let metadata = serde_json::to_value(image).unwrap_or_else(|_| json!({}));
    EvidenceBundle::new(SourceType::Screenshot, summary, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::TRUNCATION_MARKER;

    #[test]
    fn long_text_is_capped() {
        let content = "a".repeat(PASSTHROUGH_TEXT_CHARS + 500);
        let bundle = text_evidence(&content);
        assert_eq!(bundle.source_type, SourceType::Text);
        assert!(bundle.summary_text.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            bundle.evidence_length(),
            PASSTHROUGH_TEXT_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(bundle.metadata["truncated"], true);
    }

    #[test]
    fn document_has_header() {
        let bundle = document_evidence("essay.pdf", "  Body text. ");
        assert_eq!(bundle.summary_text, "# Document: essay.pdf\n\nBody text.");
        assert_eq!(bundle.metadata["fileName"], "essay.pdf");
    }

    #[test]
    fn screenshot_lists_metadata() {
        let image = ImageMetadata {
            file_name:   "home.png".into(),
            format:      Some("png".into()),
            width:       Some(1280),
            height:      Some(720),
            size_bytes:  Some(2048),
            description: None,
        };
        let bundle = screenshot_evidence(&image);
        assert!(bundle.summary_text.contains("Dimensions: 1280x720 px"));
        assert!(bundle.summary_text.contains("Size: 2.0 KB"));
        assert!(bundle.summary_text.contains("Description: (none provided)"));
        assert_eq!(bundle.metadata["fileName"], "home.png");
    }
}
