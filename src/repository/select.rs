#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scoring and selection of a representative file subset.

use glob::{MatchOptions, Pattern};

use super::{
    classify::{MANIFEST_FILES, ProjectType},
    host::{RepositoryTree, TreeEntry},
};
use crate::constants::{
    MAX_FILE_SIZE_BYTES, MAX_SELECTED_FILES, SCORE_ALWAYS_IMPORTANT, SCORE_CONFIG_FILE,
    SCORE_NESTED_DOCS, SCORE_PRIORITY_PATTERN, SCORE_SECONDARY_PATTERN, SCORE_TEST_FILE,
    SCORE_TEST_FILE_EMPHASIZED,
};

/// Weights and limits used by [`select_files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Score for readmes and dependency manifests.
    pub always_important:     u32,
    /// Score for project-type priority patterns.
    pub priority_pattern:     u32,
    /// Score for project-type secondary patterns.
    pub secondary_pattern:    u32,
    /// Score for configuration files.
    pub config_file:          u32,
    /// Score for test files.
    pub test_file:            u32,
    /// Score for test files when the assignment is about testing.
    pub test_file_emphasized: u32,
    /// Score for documentation below the root.
    pub nested_docs:          u32,
    /// Number of files returned.
    pub max_files:            usize,
    /// Files above this size are never considered (bytes).
    pub max_file_size:        u64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            always_important:     SCORE_ALWAYS_IMPORTANT,
            priority_pattern:     SCORE_PRIORITY_PATTERN,
            secondary_pattern:    SCORE_SECONDARY_PATTERN,
            config_file:          SCORE_CONFIG_FILE,
            test_file:            SCORE_TEST_FILE,
            test_file_emphasized: SCORE_TEST_FILE_EMPHASIZED,
            nested_docs:          SCORE_NESTED_DOCS,
            max_files:            MAX_SELECTED_FILES,
            max_file_size:        MAX_FILE_SIZE_BYTES,
        }
    }
}

/// A candidate file and its score. Only lives through selection and summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredFile {
    /// The tree entry.
    pub file:  TreeEntry,
    /// Accumulated score.
    pub score: u32,
}

/// Glob patterns that mark a project type's most telling files.
struct Profile {
    /// Entry points and framework files.
    priority:  &'static [&'static str],
    /// Directories where the bulk of the work lives.
    secondary: &'static [&'static str],
}

/// Returns the file patterns for a project type.
fn profile(project_type: ProjectType) -> Profile {
    match project_type {
        ProjectType::NextJs => Profile {
            priority:  &[
                "app/**/page.tsx",
                "app/**/page.jsx",
                "app/**/page.js",
                "app/**/layout.tsx",
                "app/**/layout.js",
                "src/app/**/page.tsx",
                "src/app/**/layout.tsx",
                "pages/**/*.tsx",
                "pages/**/*.jsx",
                "pages/**/*.js",
                "next.config.*",
            ],
            secondary: &["components/**", "src/components/**", "lib/**", "src/lib/**", "app/**", "hooks/**"],
        },
        ProjectType::React => Profile {
            priority:  &[
                "src/App.jsx",
                "src/App.tsx",
                "src/App.js",
                "src/main.jsx",
                "src/main.tsx",
                "src/index.js",
                "src/index.tsx",
            ],
            secondary: &["src/components/**", "src/pages/**", "src/hooks/**", "src/**"],
        },
        ProjectType::Vue => Profile {
            priority:  &["src/App.vue", "src/main.js", "src/main.ts", "nuxt.config.*", "pages/**/*.vue"],
            secondary: &["src/components/**", "components/**", "src/views/**", "src/**"],
        },
        ProjectType::Angular => Profile {
            priority:  &[
                "src/app/app.component.ts",
                "src/app/app.module.ts",
                "src/app/app.routes.ts",
                "src/main.ts",
            ],
            secondary: &["src/app/**"],
        },
        ProjectType::Svelte => Profile {
            priority:  &["src/routes/**/+page.svelte", "src/App.svelte", "svelte.config.*"],
            secondary: &["src/lib/**", "src/**"],
        },
        ProjectType::Express | ProjectType::Node => Profile {
            priority:  &[
                "index.js",
                "server.js",
                "app.js",
                "src/index.js",
                "src/index.ts",
                "src/server.js",
                "src/app.js",
            ],
            secondary: &["routes/**", "src/routes/**", "controllers/**", "models/**", "lib/**", "src/**"],
        },
        ProjectType::Django => Profile {
            priority:  &["manage.py", "*/settings.py", "*/urls.py", "*/views.py", "*/models.py"],
            secondary: &["*/forms.py", "*/admin.py", "templates/**", "*/templates/**"],
        },
        ProjectType::Flask | ProjectType::FastApi => Profile {
            priority:  &["app.py", "main.py", "wsgi.py", "app/__init__.py", "app/main.py", "src/main.py"],
            secondary: &["app/**", "routes/**", "api/**", "templates/**"],
        },
        ProjectType::Python => Profile {
            priority:  &["main.py", "app.py", "__main__.py", "src/**/main.py"],
            secondary: &["src/**", "*.py"],
        },
        ProjectType::Rust => Profile {
            priority:  &["src/main.rs", "src/lib.rs"],
            secondary: &["src/**", "crates/**"],
        },
        ProjectType::Go => Profile {
            priority:  &["main.go", "cmd/**/main.go"],
            secondary: &["internal/**", "pkg/**", "cmd/**"],
        },
        ProjectType::Java => Profile {
            priority:  &["src/main/java/**/*Application.java", "src/main/java/**/Main.java", "Main.java"],
            secondary: &["src/main/java/**", "src/main/resources/**"],
        },
        ProjectType::Flutter => Profile {
            priority:  &["lib/main.dart"],
            secondary: &["lib/**"],
        },
        ProjectType::StaticSite => Profile {
            priority:  &["index.html", "*.html"],
            secondary: &["css/**", "js/**", "*.css", "*.js"],
        },
        ProjectType::Unknown => Profile {
            priority:  &[],
            secondary: &[],
        },
    }
}

/// File-name patterns of configuration files.
const CONFIG_PATTERNS: &[&str] = &[
    "*.config.js",
    "*.config.ts",
    "*.config.mjs",
    "*.config.cjs",
    "tsconfig*.json",
    ".eslintrc*",
    ".prettierrc*",
    "dockerfile",
    "docker-compose.y*ml",
    ".env.example",
    "vercel.json",
    "*.toml",
    "*.ini",
    "*.cfg",
    "*.yml",
    "*.yaml",
];

/// Directories whose contents are generated, vendored, or tool state.
const NOISE_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".next",
    "vendor",
    "target",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "coverage",
];

/// Lockfiles; large and uninformative.
const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "cargo.lock",
    "poetry.lock",
    "pipfile.lock",
    "composer.lock",
    "gemfile.lock",
    "go.sum",
];

/// Extensions of binary assets.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "webp", "bmp", "svg", "woff", "woff2", "ttf", "eot", "otf",
    "pdf", "zip", "gz", "tar", "jar", "exe", "dll", "so", "dylib", "mp3", "mp4", "mov", "wav",
];

/// Keywords that mark an assignment as being about testing.
const TESTING_KEYWORDS: &[&str] = &[
    "test", "tests", "testing", "tested", "unittest", "tdd", "jest", "pytest", "junit", "coverage",
    "vitest", "e2e",
];

/// Glob options: case-insensitive, `*` stays within one path component.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive:              false,
    require_literal_separator:   true,
    require_literal_leading_dot: false,
};

/// Compiles literal glob patterns, skipping any that fail to parse.
fn compile(patterns: &[&str]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| Pattern::new(pattern).ok())
        .collect()
}

/// True if any pattern matches `text`.
fn any_match(patterns: &[Pattern], text: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(text, MATCH_OPTIONS))
}

/// True for readmes and dependency manifests at the repository root.
///
/// Nested ones compete on score like any other file.
pub fn is_always_important(entry: &TreeEntry) -> bool {
    if entry.depth() != 0 {
        return false;
    }
    let name = entry.file_name();
    name.to_ascii_lowercase().starts_with("readme")
        || MANIFEST_FILES
            .iter()
            .any(|manifest| manifest.eq_ignore_ascii_case(name))
}

/// True for paths that look like tests.
pub fn is_test_file(entry: &TreeEntry) -> bool {
    let path = entry.path.to_ascii_lowercase();
    let name = entry.file_name().to_ascii_lowercase();
    let in_test_dir = path
        .split('/')
        .rev()
        .skip(1)
        .any(|dir| matches!(dir, "test" | "tests" | "__tests__" | "spec" | "specs"));

    in_test_dir
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || name.ends_with("_test.go")
        || name.ends_with("_test.py")
        || name.ends_with("test.java")
}

/// True for documentation below the repository root.
pub fn is_nested_doc(entry: &TreeEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let in_docs = entry
        .path
        .split('/')
        .next()
        .is_some_and(|top| top.eq_ignore_ascii_case("docs"));
    in_docs
        || entry
            .extension()
            .is_some_and(|ext| matches!(ext.as_str(), "md" | "mdx" | "rst" | "adoc"))
}

/// True for files that never reach scoring: directories, oversized files,
/// lockfiles, binaries, and anything under generated or vendored directories.
pub fn is_excluded(entry: &TreeEntry, max_file_size: u64) -> bool {
    if !entry.is_file() || entry.size > max_file_size {
        return true;
    }
    let name = entry.file_name().to_ascii_lowercase();
    if LOCKFILES.contains(&name.as_str()) {
        return true;
    }
    if entry
        .extension()
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
    {
        return true;
    }
    entry
        .path
        .split('/')
        .rev()
        .skip(1)
        .any(|dir| NOISE_DIRS.iter().any(|noise| noise.eq_ignore_ascii_case(dir)))
}

/// True if the assignment keywords ask about testing. Only whole words
/// count, so "latest" or "testimonials" do not.
pub fn mentions_testing(keywords: &[String]) -> bool {
    keywords
        .iter()
        .flat_map(|keyword| keyword.split(|c: char| !c.is_alphanumeric()))
        .any(|word| {
            let word = word.to_lowercase();
            TESTING_KEYWORDS.contains(&word.as_str())
        })
}

/// Scores every eligible file and keeps the best `policy.max_files`.
///
/// Root readmes and manifests are ranked ahead of everything else so they
/// are always kept when present; the rest are ordered by score, then by depth
/// and path so the result is deterministic.
pub fn select_files(
    tree: &RepositoryTree,
    project_type: ProjectType,
    keywords: &[String],
    policy: &SelectionPolicy,
) -> Vec<ScoredFile> {
    let profile = profile(project_type);
    let priority = compile(profile.priority);
    let secondary = compile(profile.secondary);
    let config = compile(CONFIG_PATTERNS);
    let test_score = if mentions_testing(keywords) {
        policy.test_file_emphasized
    } else {
        policy.test_file
    };

    let mut scored: Vec<(bool, ScoredFile)> = tree
        .files()
        .filter(|entry| !is_excluded(entry, policy.max_file_size))
        .map(|entry| {
            let always = is_always_important(entry);
            let mut score = 0;
            if always {
                score += policy.always_important;
            }
            if any_match(&priority, &entry.path) {
                score += policy.priority_pattern;
            }
            if any_match(&secondary, &entry.path) {
                score += policy.secondary_pattern;
            }
            if any_match(&config, entry.file_name()) {
                score += policy.config_file;
            }
            if is_test_file(entry) {
                score += test_score;
            }
            if is_nested_doc(entry) {
                score += policy.nested_docs;
            }
            (always, ScoredFile {
                file: entry.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|(a_always, a), (b_always, b)| {
        b_always
            .cmp(a_always)
            .then(b.score.cmp(&a.score))
            .then(a.file.depth().cmp(&b.file.depth()))
            .then_with(|| a.file.path.cmp(&b.file.path))
    });

    scored
        .into_iter()
        .take(policy.max_files)
        .map(|(_, file)| file)
        .collect()
}
