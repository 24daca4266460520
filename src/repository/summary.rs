#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rendering of the bounded repository summary.
//!
//! Every section is capped on its own, so the summary's length does not grow
//! with the size of the repository.

use std::{collections::BTreeMap, fmt::Write as _};

use itertools::Itertools;
use serde::Serialize;

use super::{
    classify::ProjectType,
    host::{RepositoryMetadata, RepositoryTree, TreeEntry},
    reference::RepoRef,
    select::{ScoredFile, is_excluded, is_nested_doc, is_test_file},
};
use crate::{
    constants::{
        CODE_EXCERPT_CHARS, METADATA_TEXT_CHARS, README_EXCERPT_CHARS,
        REMAINING_FILES_LISTED, TOP_LANGUAGES, TREE_EXCERPT_LINES, TREE_LINE_CHARS,
    },
    util::{human_bytes, squash_whitespace, truncate_chars, yes_no},
};

/// Headline facts about a repository's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityOverview {
    /// Number of files in the listing.
    pub file_count: usize,
    /// Whether a root-level readme exists.
    pub has_readme: bool,
    /// Whether any test files exist.
    pub has_tests:  bool,
    /// Whether documentation beyond the readme exists.
    pub has_docs:   bool,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
}

impl QualityOverview {
    /// Computes the overview from a listing.
    pub fn from_tree(tree: &RepositoryTree) -> Self {
        let files: Vec<&TreeEntry> = tree.files().collect();
        Self {
            file_count: files.len(),
            has_readme: files.iter().any(|entry| is_root_readme(entry)),
            has_tests:  files.iter().any(|entry| is_test_file(entry)),
            has_docs:   files.iter().any(|entry| is_nested_doc(entry)),
            total_size: files.iter().map(|entry| entry.size).sum(),
        }
    }
}

/// Share of bytes written in one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    /// Language name.
    pub language: String,
    /// Percentage of recognised source bytes, `0.0..=100.0`.
    pub percent:  f64,
}

/// Everything the summary is rendered from.
pub struct SummaryInput<'a> {
    /// Repository being summarised.
    pub repo:          &'a RepoRef,
    /// Host metadata.
    pub metadata:      &'a RepositoryMetadata,
    /// Classification result.
    pub project_type:  ProjectType,
    /// Full listing.
    pub tree:          &'a RepositoryTree,
    /// Selected files, best first.
    pub selected:      &'a [ScoredFile],
    /// Fetched contents keyed by path.
    pub contents:      &'a BTreeMap<String, String>,
    /// Size cutoff selection applied; larger files are not listed.
    pub max_file_size: u64,
}

/// True for a readme at the repository root.
fn is_root_readme(entry: &TreeEntry) -> bool {
    entry.depth() == 0 && entry.file_name().to_ascii_lowercase().starts_with("readme")
}

/// Maps a lower-cased extension to a language name.
fn language_for(extension: &str) -> Option<&'static str> {
    Some(match extension {
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "py" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "html" | "htm" => "HTML",
        "css" | "scss" | "sass" | "less" => "CSS",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "dart" => "Dart",
        "php" => "PHP",
        "rb" => "Ruby",
        "c" | "h" => "C",
        "cpp" | "cc" | "hpp" => "C++",
        "cs" => "C#",
        "swift" => "Swift",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        _ => return None,
    })
}

/// Top languages by byte share, largest first, ties broken by name.
pub fn language_breakdown(tree: &RepositoryTree, top: usize) -> Vec<LanguageShare> {
    let mut bytes: BTreeMap<&'static str, u64> = BTreeMap::new();
    for entry in tree.files().filter(|entry| !is_excluded(entry, u64::MAX)) {
        if let Some(language) = entry.extension().as_deref().and_then(language_for) {
            *bytes.entry(language).or_default() += entry.size;
        }
    }

    let total: u64 = bytes.values().sum();
    if total == 0 {
        return Vec::new();
    }

    bytes
        .into_iter()
        .sorted_by(|(a_name, a_bytes), (b_name, b_bytes)| {
            b_bytes.cmp(a_bytes).then(a_name.cmp(b_name))
        })
        .take(top)
        .map(|(language, size)| LanguageShare {
            language: language.to_string(),
            percent:  size as f64 * 100.0 / total as f64,
        })
        .collect()
}

/// Renders the summary. Sections, in order: header, project type, quality
/// overview, languages, readme excerpt, tree excerpt, key file excerpts,
/// remaining file names.
pub fn build_summary(input: &SummaryInput<'_>) -> String {
    let mut out = String::new();
    let overview = QualityOverview::from_tree(input.tree);

    // Header
    let _ = writeln!(out, "# Repository: {}", input.repo);
    if let Some(description) = input
        .metadata
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        let _ = writeln!(
            out,
            "Description: {}",
            truncate_chars(&squash_whitespace(description), METADATA_TEXT_CHARS)
        );
    }
    let _ = writeln!(
        out,
        "Default branch: {} | Stars: {}",
        truncate_chars(&input.metadata.default_branch, 60),
        input.metadata.stars
    );

    // Project type
    let _ = writeln!(
        out,
        "\nProject type: {} ({})",
        input.project_type.display_name(),
        input.project_type.as_str()
    );

    // Quality overview
    let _ = writeln!(out, "\n## Overview");
    let _ = writeln!(
        out,
        "Files: {} | README: {} | Tests: {} | Docs: {} | Total size: {}",
        overview.file_count,
        yes_no(overview.has_readme),
        yes_no(overview.has_tests),
        yes_no(overview.has_docs),
        human_bytes(overview.total_size)
    );

    // Languages
    let languages = language_breakdown(input.tree, TOP_LANGUAGES);
    if !languages.is_empty() {
        let _ = writeln!(out, "\n## Languages");
        for share in &languages {
            let _ = writeln!(out, "- {}: {:.1}%", share.language, share.percent);
        }
    }

    // Readme excerpt
    let readme = input
        .tree
        .files()
        .find(|entry| is_root_readme(entry))
        .and_then(|entry| input.contents.get(&entry.path));
    if let Some(readme) = readme {
        let _ = writeln!(out, "\n## README (excerpt)");
        let _ = writeln!(out, "{}", truncate_chars(readme.trim(), README_EXCERPT_CHARS));
    }

    // Tree excerpt
    let listed: Vec<&TreeEntry> = input
        .tree
        .files()
        .filter(|entry| !is_excluded(entry, u64::MAX))
        .collect();
    let _ = writeln!(out, "\n## File tree (excerpt)");
    for entry in listed.iter().take(TREE_EXCERPT_LINES) {
        let _ = writeln!(out, "{}", truncate_chars(&entry.path, TREE_LINE_CHARS));
    }
    if listed.len() > TREE_EXCERPT_LINES {
        let _ = writeln!(out, "... and {} more files", listed.len() - TREE_EXCERPT_LINES);
    }

    // Key files
    let code_files: Vec<&ScoredFile> = input
        .selected
        .iter()
        .filter(|scored| !is_root_readme(&scored.file))
        .collect();
    if !code_files.is_empty() {
        let _ = writeln!(out, "\n## Key files");
        for scored in code_files {
            let path = truncate_chars(&scored.file.path, TREE_LINE_CHARS);
            let _ = writeln!(out, "\n### {} (score {})", path, scored.score);
            match input.contents.get(&scored.file.path) {
                Some(content) => {
                    let _ = writeln!(
                        out,
                        "```{}\n{}\n```",
                        scored.file.extension().unwrap_or_default(),
                        truncate_chars(content.trim(), CODE_EXCERPT_CHARS)
                    );
                }
                None => {
                    let _ = writeln!(out, "(content unavailable)");
                }
            }
        }
    }

    // Remaining files
    let remaining: Vec<&TreeEntry> = listed
        .into_iter()
        .filter(|entry| {
            entry.size <= input.max_file_size
                && !input
                    .selected
                    .iter()
                    .any(|scored| scored.file.path == entry.path)
        })
        .collect();
    if !remaining.is_empty() {
        let _ = writeln!(out, "\n## Other files");
        let names = remaining
            .iter()
            .take(REMAINING_FILES_LISTED)
            .map(|entry| truncate_chars(&entry.path, TREE_LINE_CHARS))
            .join(", ");
        let _ = writeln!(out, "{names}");
        if remaining.len() > REMAINING_FILES_LISTED {
            let _ = writeln!(out, "... and {} more", remaining.len() - REMAINING_FILES_LISTED);
        }
    }

    out
}
