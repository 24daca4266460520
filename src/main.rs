#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # assessor
//!
//! Command line front end: gather evidence for a submission, probe a website,
//! or run a full rubric assessment.
//!
//! Configuration comes from the environment (or a `.env` file). See
//! `AssessorConfig::from_env` for the variables read.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use assessor::{
    Assessor,
    config::AssessorConfig,
    store::{RubricStore, SupabaseRubricStore, SupabaseVerdictSink, load_rubric_file},
    types::{ImageMetadata, Remark, Rubric, SubmissionReference, Verdict},
    website::{self, WebsiteProber},
};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// A submission given on the command line.
#[derive(Debug, Clone)]
struct Submission {
    /// One of `text`, `document`, `repo`, `website`, `screenshot`.
    kind:  String,
    /// Text, URL, or path, depending on the kind.
    value: String,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Print the evidence bundle for a submission
    Collect(Option<String>, Submission),
    /// Probe a website and print the report
    Probe(String),
    /// Assess a submission against a rubric
    Assess {
        /// Path to a rubric JSON file
        rubric:    String,
        /// Submitter key used for rate limiting and recording
        submitter: String,
        /// Record the verdict in Supabase
        record:    bool,
        /// What was submitted
        submission: Submission,
    },
    /// Print a rubric stored in Supabase
    Rubric(String),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses a submission kind and value
    fn submission() -> impl Parser<Submission> {
        let kind = positional::<String>("KIND")
            .help("One of: text, document, repo, website, screenshot")
            .guard(
                |k: &String| {
                    matches!(k.as_str(), "text" | "document" | "repo" | "website" | "screenshot")
                },
                "KIND must be one of: text, document, repo, website, screenshot",
            );
        let value = positional::<String>("VALUE").help(
            "Text for `text`, URL for `repo`/`website`, path to a text file for `document`, path \
             to image-metadata JSON for `screenshot`",
        );
        construct!(Submission { kind, value })
    }

    /// parses the path to a rubric file
    fn rubric_path() -> impl Parser<String> {
        short('r')
            .long("rubric")
            .help("Path to a rubric JSON file")
            .argument::<String>("FILE")
    }

    let collect_rubric = rubric_path().optional();
    let collect_submission = submission();
    let collect = construct!(Cmd::Collect(collect_rubric, collect_submission))
        .to_options()
        .command("collect")
        .help("Gather and print the evidence for a submission");

    let url = positional::<String>("URL").help("Website to probe");
    let probe = construct!(Cmd::Probe(url))
        .to_options()
        .command("probe")
        .help("Probe a website and print the report");

    let rubric = rubric_path();
    let submitter = long("submitter")
        .help("Submitter key")
        .argument::<String>("NAME")
        .fallback("cli".to_string());
    let record = long("record")
        .help("Record the verdict in the Supabase `verdicts` table")
        .switch();
    let submission = submission();
    let assess = construct!(Cmd::Assess {
        rubric,
        submitter,
        record,
        submission
    })
    .to_options()
    .command("assess")
    .help("Assess a submission against a rubric");

    let question_id = positional::<String>("QUESTION_ID").help("Question id");
    let stored_rubric = construct!(Cmd::Rubric(question_id))
        .to_options()
        .command("rubric")
        .help("Print a rubric stored in Supabase");

    let cmd = construct!([collect, probe, assess, stored_rubric]);

    cmd.to_options()
        .descr("Evidence gathering and rubric assessment for student submissions")
        .run()
}

/// Turns a command-line submission into a reference.
fn reference(submission: &Submission) -> Result<SubmissionReference> {
    let value = submission.value.clone();
    Ok(match submission.kind.as_str() {
        "text" => SubmissionReference::Text { content: value },
        "document" => {
            let extracted_text = std::fs::read_to_string(&value)
                .with_context(|| format!("Could not read document text from {value}"))?;
            let file_name = std::path::Path::new(&value)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(value);
            SubmissionReference::Document {
                file_name,
                extracted_text,
            }
        }
        "repo" => SubmissionReference::GithubRepo { url: value },
        "website" => SubmissionReference::Website { url: value },
        "screenshot" => {
            let raw = std::fs::read_to_string(&value)
                .with_context(|| format!("Could not read image metadata from {value}"))?;
            let image: ImageMetadata = serde_json::from_str(&raw)
                .with_context(|| format!("{value} is not valid image metadata"))?;
            SubmissionReference::Screenshot { image }
        }
        other => bail!("Unknown submission kind `{other}`"),
    })
}

/// One row of a printed report.
#[derive(Tabled)]
struct ReportRow {
    /// Row label.
    #[tabled(rename = "Field")]
    field: String,
    /// Row value.
    #[tabled(rename = "Value")]
    value: String,
}

impl ReportRow {
    /// Creates a row.
    fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Renders rows as a titled table.
fn report(title: &str, rows: &[ReportRow]) -> String {
    Table::new(rows)
        .with(Panel::header(title))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(72).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Renders a list one item per line.
fn lines(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.iter().map(|item| format!("• {item}")).collect::<Vec<_>>().join("\n")
    }
}

/// Colours a remark by how good it is.
fn paint(remark: Remark) -> String {
    match remark {
        Remark::Excellent => remark.as_str().green().bold().to_string(),
        Remark::Good => remark.as_str().cyan().bold().to_string(),
        Remark::CanImprove => remark.as_str().yellow().bold().to_string(),
        Remark::NeedsImprovement => remark.as_str().red().bold().to_string(),
    }
}

/// Prints a verdict.
fn print_verdict(verdict: &Verdict) {
    let backend = if verdict.is_fallback() {
        verdict.backend_used.as_str().dimmed().to_string()
    } else {
        verdict.backend_used.clone()
    };
    let rows = [
        ReportRow::new("Remark", paint(verdict.remark)),
        ReportRow::new("Confidence", format!("{:.2}", verdict.confidence)),
        ReportRow::new("Feedback", verdict.feedback.clone()),
        ReportRow::new("Criteria met", lines(&verdict.criteria_met)),
        ReportRow::new("To improve", lines(&verdict.areas_for_improvement)),
        ReportRow::new("Backend", backend),
        ReportRow::new("Latency", format!("{} ms", verdict.latency_ms)),
    ];
    println!("{}", report("Verdict", &rows));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cmd = options();
    let config = AssessorConfig::from_env();

    match cmd {
        Cmd::Collect(rubric, submission) => {
            let rubric = match rubric {
                Some(path) => load_rubric_file(path)?,
                None => Rubric::default(),
            };
            let assessor = Assessor::from_config(&config, None)?;
            let bundle = assessor.collect(&reference(&submission)?, &rubric).await?;
            println!("{}", bundle.summary_text);
            eprintln!("{}", serde_json::to_string_pretty(&bundle.metadata)?);
        }
        Cmd::Probe(url) => {
            let canonical = website::normalize(&url)?;
            let prober = WebsiteProber::new(config.http_client()?);
            let result = prober.probe(&canonical).await;
            let assessment = website::assess(&result, &[], prober.policy());

            let status = result
                .status_code
                .map_or_else(|| "none".to_string(), |code| code.to_string());
            let reachable = if result.reachable {
                "yes".green().to_string()
            } else {
                "no".red().to_string()
            };
            let rows = [
                ReportRow::new("URL", result.url.clone()),
                ReportRow::new("Reachable", reachable),
                ReportRow::new("Status", status),
                ReportRow::new("Response time", format!("{} ms", result.response_time_ms)),
                ReportRow::new("Title", result.title.clone().unwrap_or_default()),
                ReportRow::new("Strengths", lines(&assessment.strengths)),
                ReportRow::new("Issues", lines(&assessment.issues)),
                ReportRow::new("Recommendations", lines(&assessment.recommendations)),
            ];
            println!("{}", report("Website report", &rows));
        }
        Cmd::Assess {
            rubric,
            submitter,
            record,
            submission,
        } => {
            let rubric = load_rubric_file(&rubric)?;
            let mut assessor = Assessor::from_config(&config, None)?;
            if record {
                let supabase = config.supabase().context(
                    "SUPABASE_URL and SUPABASE_ANON_KEY must be set to record verdicts",
                )?;
                assessor =
                    assessor.with_verdict_sink(Arc::new(SupabaseVerdictSink::new(supabase.postgrest())));
            }
            let verdict = assessor
                .assess_submission(&submitter, &reference(&submission)?, &rubric)
                .await?;
            print_verdict(&verdict);
        }
        Cmd::Rubric(question_id) => {
            let supabase = config
                .supabase()
                .context("SUPABASE_URL and SUPABASE_ANON_KEY must be set to fetch rubrics")?;
            let rubric = SupabaseRubricStore::new(supabase.postgrest())
                .rubric(&question_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&rubric)?);
        }
    };

    Ok(())
}
