#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Named policy constants.
//!
//! The scoring weights and thresholds below were chosen empirically and have
//! not been tuned against outcomes. Every one of them is surfaced through a
//! policy struct (`SelectionPolicy`, `TierPolicy`, `ProbePolicy`) so callers
//! can override them without touching control flow.

/// Score for files every submission should show (readme, dependency manifest).
pub const SCORE_ALWAYS_IMPORTANT: u32 = 100;

/// Score for paths matching a project-type priority pattern.
pub const SCORE_PRIORITY_PATTERN: u32 = 100;

/// Score for paths matching a project-type secondary/directory pattern.
pub const SCORE_SECONDARY_PATTERN: u32 = 50;

/// Score for configuration files.
pub const SCORE_CONFIG_FILE: u32 = 30;

/// Score for test files.
pub const SCORE_TEST_FILE: u32 = 20;

/// Score for test files when the assignment explicitly asks about testing.
pub const SCORE_TEST_FILE_EMPHASIZED: u32 = 60;

/// Score for documentation files below the repository root.
pub const SCORE_NESTED_DOCS: u32 = 15;

/// Maximum number of files kept by selection.
pub const MAX_SELECTED_FILES: usize = 10;

/// Files larger than this are never selected (bytes).
pub const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024;

/// Number of content fetches issued concurrently per batch.
pub const FETCH_BATCH_SIZE: usize = 10;

/// Characters of the readme quoted in the repository summary.
pub const README_EXCERPT_CHARS: usize = 800;

/// Lines of the file tree quoted in the repository summary.
pub const TREE_EXCERPT_LINES: usize = 30;

/// Characters of a single tree line before it is cut.
pub const TREE_LINE_CHARS: usize = 120;

/// Characters quoted from each selected file.
pub const CODE_EXCERPT_CHARS: usize = 400;

/// Number of unselected file names listed in the repository summary.
pub const REMAINING_FILES_LISTED: usize = 15;

/// Number of languages shown in the language breakdown.
pub const TOP_LANGUAGES: usize = 5;

/// Characters of free-form metadata (descriptions, titles) quoted anywhere.
pub const METADATA_TEXT_CHARS: usize = 300;

/// Characters kept from text and document submissions.
pub const PASSTHROUGH_TEXT_CHARS: usize = 15_000;

/// Evidence shorter than this, for plain text, goes to the fastest tier.
pub const FAST_TIER_MAX_CHARS: usize = 500;

/// Evidence longer than this goes to the most capable tier.
pub const CAPABLE_TIER_MIN_CHARS: usize = 5_000;

/// Responses faster than this count as fast (milliseconds).
pub const FAST_RESPONSE_MS: u64 = 1_000;

/// Responses slower than this count as slow (milliseconds).
pub const SLOW_RESPONSE_MS: u64 = 3_000;

/// Characters of a fetched page scanned for metadata.
pub const PAGE_SCAN_CHARS: usize = 2_000;

/// Sampling temperature sent to the reasoning backend.
pub const BACKEND_TEMPERATURE: f32 = 0.3;

/// Upper bound on tokens the reasoning backend may produce.
pub const BACKEND_MAX_OUTPUT_TOKENS: u32 = 1_000;

/// Confidence assigned when the backend omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Lowest confidence a verdict may carry.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Highest confidence a verdict may carry.
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Default lifetime of a cached repository snapshot (seconds).
pub const REPOSITORY_CACHE_TTL_SECS: u64 = 60 * 60;
