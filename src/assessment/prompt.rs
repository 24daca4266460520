#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Write as _;

use itertools::Itertools;

use crate::types::{EvidenceBundle, Remark, Rubric, SourceType};

/// Prompt assets embedded in the binary.
#[derive(Clone, Debug)]
pub struct AssessmentPrompts {
    /// System instruction sent with every request.
    system_message:      String,
    /// Output schema block closing every prompt.
    output_schema:       String,
    /// Evaluation guidance for plain text.
    text_guidance:       String,
    /// Evaluation guidance for documents.
    document_guidance:   String,
    /// Evaluation guidance for repositories.
    repository_guidance: String,
    /// Evaluation guidance for websites.
    website_guidance:    String,
    /// Evaluation guidance for screenshots.
    screenshot_guidance: String,
}

impl Default for AssessmentPrompts {
    fn default() -> Self {
        Self::load()
    }
}

impl AssessmentPrompts {
    /// Load prompt templates embedded in the binary.
    pub fn load() -> Self {
        let remarks = Remark::ALL.iter().map(|remark| format!("\"{remark}\"")).join(", ");
        Self {
            system_message:      include_str!("prompts/system.md").trim().to_string(),
            output_schema:       format!(include_str!("prompts/output_schema.md"), REMARKS = remarks)
                .trim()
                .to_string(),
            text_guidance:       include_str!("prompts/guidance_text.md").trim().to_string(),
            document_guidance:   include_str!("prompts/guidance_document.md").trim().to_string(),
            repository_guidance: include_str!("prompts/guidance_repository.md").trim().to_string(),
            website_guidance:    include_str!("prompts/guidance_website.md").trim().to_string(),
            screenshot_guidance: include_str!("prompts/guidance_screenshot.md").trim().to_string(),
        }
    }

    /// Returns the system instruction.
    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Returns the output schema block.
    pub fn output_schema(&self) -> &str {
        &self.output_schema
    }

    /// Returns the evaluation guidance for a kind of submission.
    pub fn guidance(&self, source_type: SourceType) -> &str {
        match source_type {
            SourceType::Text => &self.text_guidance,
            SourceType::Document => &self.document_guidance,
            SourceType::GithubRepo => &self.repository_guidance,
            SourceType::Website => &self.website_guidance,
            SourceType::Screenshot => &self.screenshot_guidance,
        }
    }

    /// Assembles the user prompt for one assessment.
    ///
    /// Sections, in order: context, evidence, reference example (if any),
    /// criteria, red flags, bonus conditions, instructor instructions (if
    /// any), evaluation guidance, output schema.
    pub fn build_prompt(&self, evidence: &EvidenceBundle, rubric: &Rubric) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# Assessment context");
        if !rubric.title.trim().is_empty() {
            let _ = writeln!(out, "Question: {}", rubric.title.trim());
        }
        if !rubric.description.trim().is_empty() {
            let _ = writeln!(out, "Description: {}", rubric.description.trim());
        }
        let _ = writeln!(out, "Submission type: {}", evidence.source_type);

        let _ = writeln!(out, "\n## Evidence\n{}", evidence.summary_text.trim_end());

        if rubric.has_reference_example()
            && let Some(example) = rubric.reference_example.as_deref()
        {
            let _ = writeln!(out, "\n## Reference example");
            let _ = writeln!(
                out,
                "Compare the submission against this reference example. It shows what a strong \
                 answer looks like; the submission does not need to match it word for word."
            );
            let _ = writeln!(out, "{}", example.trim());
        }

        write_list(&mut out, "Criteria", &rubric.criteria, true);
        write_list(&mut out, "Red flags (automatic deductions)", &rubric.red_flags, false);
        write_list(&mut out, "Bonus conditions", &rubric.conditional_checks, false);

        if let Some(instructions) = rubric
            .custom_instructions
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
        {
            let _ = writeln!(out, "\n## Instructor instructions\n{instructions}");
        }

        let _ = writeln!(
            out,
            "\n## Evaluation guidance\n{}",
            self.guidance(evidence.source_type)
        );
        let _ = writeln!(out, "\n{}", self.output_schema);

        out
    }
}

/// Writes a headed list, or `(none)` when it is empty.
fn write_list(out: &mut String, heading: &str, items: &[String], numbered: bool) {
    let _ = writeln!(out, "\n## {heading}");
    let items: Vec<&str> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        let _ = writeln!(out, "(none)");
        return;
    }
    for (index, item) in items.iter().enumerate() {
        if numbered {
            let _ = writeln!(out, "{}. {item}", index + 1);
        } else {
            let _ = writeln!(out, "- {item}");
        }
    }
}
