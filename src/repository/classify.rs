#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Project-type classification as an ordered rule table.
//!
//! Rules are evaluated top to bottom and the first match wins, so more
//! specific frameworks sit above the generic runtimes they build on.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use super::host::RepositoryTree;

/// Dependency manifests recognised at the repository root.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "setup.py",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "pubspec.yaml",
    "composer.json",
    "Gemfile",
];

/// Manifests whose content names Python dependencies.
const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile", "setup.py"];

/// Technology stack a repository is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Next.js application.
    NextJs,
    /// Angular application.
    Angular,
    /// Svelte or SvelteKit application.
    Svelte,
    /// Vue or Nuxt application.
    Vue,
    /// React application.
    React,
    /// Express server.
    Express,
    /// Django project.
    Django,
    /// FastAPI service.
    FastApi,
    /// Flask application.
    Flask,
    /// Rust crate.
    Rust,
    /// Go module.
    Go,
    /// Maven or Gradle project.
    Java,
    /// Flutter application.
    Flutter,
    /// Other Node.js project.
    Node,
    /// Other Python project.
    Python,
    /// Plain HTML/CSS site.
    #[serde(rename = "static")]
    StaticSite,
    /// Nothing matched.
    Unknown,
}

impl ProjectType {
    /// Machine label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::NextJs => "nextjs",
            ProjectType::Angular => "angular",
            ProjectType::Svelte => "svelte",
            ProjectType::Vue => "vue",
            ProjectType::React => "react",
            ProjectType::Express => "express",
            ProjectType::Django => "django",
            ProjectType::FastApi => "fastapi",
            ProjectType::Flask => "flask",
            ProjectType::Rust => "rust",
            ProjectType::Go => "go",
            ProjectType::Java => "java",
            ProjectType::Flutter => "flutter",
            ProjectType::Node => "node",
            ProjectType::Python => "python",
            ProjectType::StaticSite => "static",
            ProjectType::Unknown => "unknown",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::NextJs => "Next.js",
            ProjectType::Angular => "Angular",
            ProjectType::Svelte => "Svelte",
            ProjectType::Vue => "Vue",
            ProjectType::React => "React",
            ProjectType::Express => "Express",
            ProjectType::Django => "Django",
            ProjectType::FastApi => "FastAPI",
            ProjectType::Flask => "Flask",
            ProjectType::Rust => "Rust",
            ProjectType::Go => "Go",
            ProjectType::Java => "Java",
            ProjectType::Flutter => "Flutter",
            ProjectType::Node => "Node.js",
            ProjectType::Python => "Python",
            ProjectType::StaticSite => "Static website",
            ProjectType::Unknown => "Unknown",
        }
    }
}

impl Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a rule may look at.
pub struct ClassifyInput<'a> {
    /// Repository listing.
    tree:    &'a RepositoryTree,
    /// Contents of sampled files keyed by path.
    samples: &'a BTreeMap<String, String>,
}

impl<'a> ClassifyInput<'a> {
    /// Bundles a tree with its sampled file contents.
    pub fn new(tree: &'a RepositoryTree, samples: &'a BTreeMap<String, String>) -> Self {
        Self { tree, samples }
    }

    /// True if a root-level file has exactly this name (case-insensitive).
    pub fn has_root_file(&self, name: &str) -> bool {
        self.tree
            .files()
            .any(|entry| entry.depth() == 0 && entry.path.eq_ignore_ascii_case(name))
    }

    /// True if a root-level file name starts with `prefix` (case-insensitive).
    pub fn has_root_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.to_ascii_lowercase();
        self.tree
            .files()
            .any(|entry| entry.depth() == 0 && entry.path.to_ascii_lowercase().starts_with(&prefix))
    }

    /// Lower-cased sampled content of a root-level file.
    fn sample(&self, name: &str) -> Option<String> {
        self.samples
            .iter()
            .find(|(path, _)| path.eq_ignore_ascii_case(name))
            .map(|(_, content)| content.to_lowercase())
    }

    /// True if `package.json` declares `dependency` as a quoted key.
    pub fn node_dependency(&self, dependency: &str) -> bool {
        let needle = format!("\"{}\"", dependency.to_lowercase());
        self.sample("package.json")
            .is_some_and(|content| content.contains(&needle))
    }

    /// True if any Python manifest mentions `keyword`.
    pub fn python_mentions(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        PYTHON_MANIFESTS.iter().any(|name| {
            self.sample(name)
                .is_some_and(|content| content.contains(&keyword))
        })
    }

    /// Most common source extension among files, ties broken alphabetically.
    pub fn majority_extension(&self) -> Option<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for ext in self.tree.files().filter_map(|entry| entry.extension()) {
            if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
                *counts.entry(ext).or_default() += 1;
            }
        }

        // `max_by_key` keeps the last maximum; iterate in reverse so the
        // alphabetically first extension wins ties.
        counts
            .into_iter()
            .rev()
            .max_by_key(|(_, count)| *count)
            .map(|(ext, _)| ext)
    }

    /// True if the majority extension is one of `extensions`.
    fn majority_in(&self, extensions: &[&str]) -> bool {
        self.majority_extension()
            .is_some_and(|ext| extensions.contains(&ext.as_str()))
    }
}

/// Extensions counted by the majority-extension rules.
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "mjs", "java", "kt", "go", "rs", "html", "css", "dart", "php",
    "rb", "c", "cpp", "cs", "swift",
];

/// One row of the classification table.
pub struct ClassificationRule {
    /// Short name used in logs and tests.
    pub name:    &'static str,
    /// Label assigned when the rule fires.
    pub label:   ProjectType,
    /// Predicate over the repository.
    pub matches: fn(&ClassifyInput<'_>) -> bool,
}

/// Ordered classification rules. First match wins.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name:    "next-config-or-dependency",
        label:   ProjectType::NextJs,
        matches: |input| input.has_root_prefix("next.config.") || input.node_dependency("next"),
    },
    ClassificationRule {
        name:    "angular-workspace",
        label:   ProjectType::Angular,
        matches: |input| {
            input.has_root_file("angular.json") || input.node_dependency("@angular/core")
        },
    },
    ClassificationRule {
        name:    "svelte-config-or-dependency",
        label:   ProjectType::Svelte,
        matches: |input| input.has_root_prefix("svelte.config.") || input.node_dependency("svelte"),
    },
    ClassificationRule {
        name:    "vue-or-nuxt",
        label:   ProjectType::Vue,
        matches: |input| {
            input.has_root_prefix("nuxt.config.")
                || input.has_root_prefix("vue.config.")
                || input.node_dependency("vue")
                || input.node_dependency("nuxt")
        },
    },
    ClassificationRule {
        name:    "react-dependency",
        label:   ProjectType::React,
        matches: |input| input.node_dependency("react"),
    },
    ClassificationRule {
        name:    "express-dependency",
        label:   ProjectType::Express,
        matches: |input| input.node_dependency("express"),
    },
    ClassificationRule {
        name:    "django-manage-or-dependency",
        label:   ProjectType::Django,
        matches: |input| input.has_root_file("manage.py") || input.python_mentions("django"),
    },
    ClassificationRule {
        name:    "fastapi-dependency",
        label:   ProjectType::FastApi,
        matches: |input| input.python_mentions("fastapi"),
    },
    ClassificationRule {
        name:    "flask-dependency",
        label:   ProjectType::Flask,
        matches: |input| input.python_mentions("flask"),
    },
    ClassificationRule {
        name:    "cargo-manifest",
        label:   ProjectType::Rust,
        matches: |input| input.has_root_file("Cargo.toml"),
    },
    ClassificationRule {
        name:    "go-module",
        label:   ProjectType::Go,
        matches: |input| input.has_root_file("go.mod"),
    },
    ClassificationRule {
        name:    "maven-or-gradle",
        label:   ProjectType::Java,
        matches: |input| {
            input.has_root_file("pom.xml")
                || input.has_root_file("build.gradle")
                || input.has_root_file("build.gradle.kts")
        },
    },
    ClassificationRule {
        name:    "flutter-pubspec",
        label:   ProjectType::Flutter,
        matches: |input| input.has_root_file("pubspec.yaml"),
    },
    ClassificationRule {
        name:    "node-manifest",
        label:   ProjectType::Node,
        matches: |input| input.has_root_file("package.json"),
    },
    ClassificationRule {
        name:    "python-manifest",
        label:   ProjectType::Python,
        matches: |input| {
            PYTHON_MANIFESTS
                .iter()
                .any(|name| input.has_root_file(name))
        },
    },
    ClassificationRule {
        name:    "majority-python",
        label:   ProjectType::Python,
        matches: |input| input.majority_in(&["py"]),
    },
    ClassificationRule {
        name:    "majority-javascript",
        label:   ProjectType::Node,
        matches: |input| input.majority_in(&["js", "jsx", "ts", "tsx", "mjs"]),
    },
    ClassificationRule {
        name:    "majority-jvm",
        label:   ProjectType::Java,
        matches: |input| input.majority_in(&["java", "kt"]),
    },
    ClassificationRule {
        name:    "majority-go",
        label:   ProjectType::Go,
        matches: |input| input.majority_in(&["go"]),
    },
    ClassificationRule {
        name:    "majority-rust",
        label:   ProjectType::Rust,
        matches: |input| input.majority_in(&["rs"]),
    },
    ClassificationRule {
        name:    "majority-markup-or-index",
        label:   ProjectType::StaticSite,
        matches: |input| input.majority_in(&["html", "css"]) || input.has_root_file("index.html"),
    },
];

/// Classifies a repository. Pure: identical inputs give identical labels.
pub fn classify_project_type(
    tree: &RepositoryTree,
    samples: &BTreeMap<String, String>,
) -> ProjectType {
    classify_with(RULES, tree, samples)
}

/// Classifies against a caller-supplied rule table.
pub fn classify_with(
    rules: &[ClassificationRule],
    tree: &RepositoryTree,
    samples: &BTreeMap<String, String>,
) -> ProjectType {
    let input = ClassifyInput::new(tree, samples);
    rules
        .iter()
        .find(|rule| (rule.matches)(&input))
        .map(|rule| {
            tracing::debug!(rule = rule.name, label = %rule.label, "Classification rule fired");
            rule.label
        })
        .unwrap_or(ProjectType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::host::TreeEntry;

    fn tree(paths: &[&str]) -> RepositoryTree {
        RepositoryTree::new(paths.iter().map(|p| TreeEntry::blob(*p, 10)).collect())
    }

    fn samples(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn next_marker_in_manifest_wins_over_react() {
        let tree = tree(&["README.md", "package.json", "app/page.tsx"]);
        let samples = samples(&[(
            "package.json",
            r#"{"dependencies":{"next":"14.0.0","react":"18.2.0"}}"#,
        )]);
        assert_eq!(classify_project_type(&tree, &samples), ProjectType::NextJs);
    }

    #[test]
    fn config_file_alone_is_enough() {
        let tree = tree(&["next.config.mjs", "app/page.tsx"]);
        assert_eq!(classify_project_type(&tree, &BTreeMap::new()), ProjectType::NextJs);
    }

    #[test]
    fn plain_react_and_express() {
        let react = samples(&[("package.json", r#"{"dependencies":{"react":"18"}}"#)]);
        let express = samples(&[("package.json", r#"{"dependencies":{"express":"4"}}"#)]);
        let tree = tree(&["package.json", "src/index.js"]);
        assert_eq!(classify_project_type(&tree, &react), ProjectType::React);
        assert_eq!(classify_project_type(&tree, &express), ProjectType::Express);
    }

    #[test]
    fn python_frameworks_follow_requirements() {
        let tree = tree(&["requirements.txt", "app.py"]);
        let flask = samples(&[("requirements.txt", "Flask==3.0\n")]);
        let fastapi = samples(&[("requirements.txt", "fastapi\nuvicorn\n")]);
        assert_eq!(classify_project_type(&tree, &flask), ProjectType::Flask);
        assert_eq!(classify_project_type(&tree, &fastapi), ProjectType::FastApi);
        assert_eq!(classify_project_type(&tree, &BTreeMap::new()), ProjectType::Python);
    }

    #[test]
    fn majority_extension_breaks_out_loose_files() {
        let loose = tree(&["a.py", "b.py", "c.js", "index.html"]);
        assert_eq!(classify_project_type(&loose, &BTreeMap::new()), ProjectType::Python);

        let site = tree(&["index.html", "style.css", "about.html"]);
        assert_eq!(classify_project_type(&site, &BTreeMap::new()), ProjectType::StaticSite);
    }

    #[test]
    fn nothing_recognisable_is_unknown() {
        let tree = tree(&["notes.txt", "LICENSE"]);
        assert_eq!(classify_project_type(&tree, &BTreeMap::new()), ProjectType::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let tree = tree(&["a.go", "b.rs", "c.go", "d.rs"]);
        let first = classify_project_type(&tree, &BTreeMap::new());
        for _ in 0..10 {
            assert_eq!(classify_project_type(&tree, &BTreeMap::new()), first);
        }
        // "go" sorts before "rs", so the tie resolves to Go.
        assert_eq!(first, ProjectType::Go);
    }

    #[test]
    fn reordering_rules_changes_the_winner() {
        let tree = tree(&["package.json", "Cargo.toml"]);
        let node_first: Vec<_> = RULES
            .iter()
            .filter(|rule| rule.name == "node-manifest" || rule.name == "cargo-manifest")
            .rev()
            .map(|rule| ClassificationRule {
                name:    rule.name,
                label:   rule.label,
                matches: rule.matches,
            })
            .collect();
        assert_eq!(classify_project_type(&tree, &BTreeMap::new()), ProjectType::Rust);
        assert_eq!(classify_with(&node_first, &tree, &BTreeMap::new()), ProjectType::Node);
    }
}
