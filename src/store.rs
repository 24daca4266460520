#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Optional glue to where rubrics come from and where verdicts go.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bon::Builder;
use postgrest::Postgrest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::StoreError,
    types::{Remark, Rubric, SourceType, Verdict},
};

/// Reads a rubric from a JSON file.
pub fn load_rubric_file(path: impl AsRef<Path>) -> Result<Rubric> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read rubric file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid rubric", path.display()))
}

/// Somewhere rubrics can be looked up by question.
#[async_trait]
pub trait RubricStore: Send + Sync {
    /// Fetches the rubric of `question_id`.
    async fn rubric(&self, question_id: &str) -> Result<Rubric, StoreError>;
}

/// Row of the `rubrics` table.
#[derive(Debug, Clone, Default, Deserialize)]
struct RubricRow {
    /// Question title.
    #[serde(default)]
    title:               Option<String>,
    /// Question description.
    #[serde(default)]
    description:         Option<String>,
    /// Required criteria.
    #[serde(default)]
    criteria:            Option<Vec<String>>,
    /// Deduction triggers.
    #[serde(default)]
    red_flags:           Option<Vec<String>>,
    /// Bonus conditions.
    #[serde(default)]
    conditional_checks:  Option<Vec<String>>,
    /// Instructor instructions.
    #[serde(default)]
    custom_instructions: Option<String>,
    /// Model answer.
    #[serde(default)]
    reference_example:   Option<String>,
}

impl From<RubricRow> for Rubric {
    fn from(row: RubricRow) -> Self {
        Rubric {
            title:               row.title.unwrap_or_default(),
            description:         row.description.unwrap_or_default(),
            criteria:            row.criteria.unwrap_or_default(),
            red_flags:           row.red_flags.unwrap_or_default(),
            conditional_checks:  row.conditional_checks.unwrap_or_default(),
            custom_instructions: row.custom_instructions,
            reference_example:   row.reference_example,
        }
    }
}

/// Rubrics kept in the Supabase `rubrics` table, keyed by `question_id`.
#[derive(Clone)]
pub struct SupabaseRubricStore {
    /// PostgREST client.
    client: Postgrest,
}

impl SupabaseRubricStore {
    /// Creates a store over an authenticated client.
    pub fn new(client: Postgrest) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RubricStore for SupabaseRubricStore {
    async fn rubric(&self, question_id: &str) -> Result<Rubric, StoreError> {
        let response = self
            .client
            .from("rubrics")
            .select("*")
            .eq("question_id", question_id)
            .single()
            .execute()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;

        // A single-row request answers 406 when no row matches.
        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            404 | 406 => {
                return Err(StoreError::MissingRubric(question_id.to_string()));
            }
            _ => {
                return Err(StoreError::Request(format!(
                    "rubrics lookup answered {status}"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;
        let row: RubricRow = serde_json::from_str(&body)?;
        Ok(row.into())
    }
}

/// A verdict as stored, with the submission it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[builder(on(String, into))]
pub struct VerdictRecord {
    /// UUID of the row.
    #[builder(default = Uuid::new_v4().to_string())]
    pub id:                    String,
    /// Who submitted.
    pub submitter:             String,
    /// Kind of submission.
    pub source_type:           SourceType,
    /// Judgement category.
    pub remark:                Remark,
    /// Feedback text.
    pub feedback:              String,
    /// Criteria met.
    pub criteria_met:          Vec<String>,
    /// Suggested improvements.
    pub areas_for_improvement: Vec<String>,
    /// Confidence in `[0.5, 1.0]`.
    pub confidence:            f64,
    /// Model that answered, or `fallback`.
    pub backend_used:          String,
    /// Wall-clock time of the assessment.
    pub latency_ms:            u64,
}

impl VerdictRecord {
    /// Pairs a verdict with its submission under a fresh id.
    pub fn new(submitter: &str, source_type: SourceType, verdict: &Verdict) -> Self {
        VerdictRecord::builder()
            .submitter(submitter)
            .source_type(source_type)
            .remark(verdict.remark)
            .feedback(verdict.feedback.clone())
            .criteria_met(verdict.criteria_met.clone())
            .areas_for_improvement(verdict.areas_for_improvement.clone())
            .confidence(verdict.confidence)
            .backend_used(verdict.backend_used.clone())
            .latency_ms(verdict.latency_ms)
            .build()
    }
}

/// Somewhere verdicts are recorded.
#[async_trait]
pub trait VerdictSink: Send + Sync {
    /// Stores one verdict.
    async fn record(&self, record: &VerdictRecord) -> Result<(), StoreError>;
}

/// Verdicts recorded in the Supabase `verdicts` table.
#[derive(Clone)]
pub struct SupabaseVerdictSink {
    /// PostgREST client.
    client: Postgrest,
}

impl SupabaseVerdictSink {
    /// Creates a sink over an authenticated client.
    pub fn new(client: Postgrest) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VerdictSink for SupabaseVerdictSink {
    async fn record(&self, record: &VerdictRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;
        let response = self
            .client
            .from("verdicts")
            .insert(body)
            .execute()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "verdict insert answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("assessor-rubric-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rubric.json");
        std::fs::write(
            &path,
            r#"{"title":"Lab 1","criteria":["Has tests"],"redFlags":["No README"]}"#,
        )
        .unwrap();

        let rubric = load_rubric_file(&path).unwrap();
        assert_eq!(rubric.title, "Lab 1");
        assert_eq!(rubric.red_flags, vec!["No README".to_string()]);
        assert!(rubric.conditional_checks.is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_rubric_file_has_context() {
        let err = load_rubric_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Could not read rubric file"));
    }

    #[test]
    fn rubric_rows_fill_gaps() {
        let row: RubricRow =
            serde_json::from_str(r#"{"question_id":"q1","criteria":null,"title":"T"}"#).unwrap();
        let rubric = Rubric::from(row);
        assert_eq!(rubric.title, "T");
        assert!(rubric.criteria.is_empty());
    }

    #[test]
    fn verdict_record_serializes_snake_case() {
        let verdict = crate::assessment::fallback_verdict(5);
        let record = VerdictRecord::new("student-1", SourceType::Text, &verdict);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["submitter"], "student-1");
        assert_eq!(json["remark"], "Can Improve");
        assert_eq!(json["source_type"], "text");
        assert_eq!(json["backend_used"], "fallback");
        assert_eq!(json["id"].as_str().unwrap().len(), 36);
    }
}
