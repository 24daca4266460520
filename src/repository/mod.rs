#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Evidence gathering for source-repository submissions.
//!
//! The analyzer never clones anything: it lists the tree in one call, samples
//! the manifests, classifies the project, picks a handful of representative
//! files and renders a bounded textual summary of them.

/// Project-type classification rules.
pub mod classify;
/// Hosting API access.
pub mod host;
/// Repository URL parsing.
pub mod reference;
/// File scoring and selection.
pub mod select;
/// Summary rendering.
pub mod summary;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use self::{
    classify::{ProjectType, classify_project_type},
    host::{EntryKind, GithubHost, RepositoryMetadata, RepositoryTree, TreeEntry, VcsHost},
    reference::{RepoRef, parse_reference},
    select::{ScoredFile, SelectionPolicy, select_files},
    summary::{QualityOverview, SummaryInput, build_summary, language_breakdown},
};
use crate::{
    capabilities::Cache,
    constants::{FETCH_BATCH_SIZE, REPOSITORY_CACHE_TTL_SECS, TOP_LANGUAGES},
    error::EvidenceError,
    types::{EvidenceBundle, SourceType},
};

/// Everything fetched from the host for one repository. This is what the
/// cache stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Host metadata.
    pub metadata: RepositoryMetadata,
    /// Recursive listing at the default branch.
    pub tree:     RepositoryTree,
    /// File contents fetched so far, keyed by path.
    pub contents: BTreeMap<String, String>,
}

/// Fetches `paths` in sequential batches of `batch_size` concurrent calls.
///
/// Each batch is awaited fully before the next starts. Files that fail to
/// fetch are logged and left out.
pub async fn fetch_contents(
    host: &dyn VcsHost,
    repo: &RepoRef,
    paths: &[String],
    batch_size: usize,
) -> BTreeMap<String, String> {
    let mut contents = BTreeMap::new();
    for batch in paths.chunks(batch_size.max(1)) {
        let results = join_all(batch.iter().map(|path| async move {
            (path, host.file_content(repo, path).await)
        }))
        .await;

        for (path, result) in results {
            match result {
                Ok(bytes) => {
                    contents.insert(path.clone(), String::from_utf8_lossy(&bytes).into_owned());
                }
                Err(err) => {
                    tracing::warn!(%repo, path = %path, error = %err, "Skipping file that could not be fetched");
                }
            }
        }
    }
    contents
}

/// Gathers bounded evidence from a hosted repository.
#[derive(Clone)]
pub struct RepositoryAnalyzer {
    /// Hosting API.
    host:       Arc<dyn VcsHost>,
    /// Optional cache of snapshots keyed by `(owner, repo)`.
    cache:      Option<Arc<dyn Cache>>,
    /// Lifetime of cached snapshots.
    cache_ttl:  Duration,
    /// Scoring weights and limits.
    policy:     SelectionPolicy,
    /// Number of concurrent content fetches per batch.
    batch_size: usize,
}

impl RepositoryAnalyzer {
    /// Creates an analyzer without a cache and with the default policy.
    pub fn new(host: Arc<dyn VcsHost>) -> Self {
        Self {
            host,
            cache: None,
            cache_ttl: Duration::from_secs(REPOSITORY_CACHE_TTL_SECS),
            policy: SelectionPolicy::default(),
            batch_size: FETCH_BATCH_SIZE,
        }
    }

    /// Reuses snapshots through `cache`, keeping them for `ttl`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Replaces the selection policy.
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches metadata and the recursive listing at the default branch.
    pub async fn fetch_tree(
        &self,
        repo: &RepoRef,
    ) -> Result<(RepositoryMetadata, RepositoryTree), EvidenceError> {
        let metadata = self.host.repository_metadata(repo).await?;
        let git_ref = if metadata.default_branch.is_empty() {
            "HEAD"
        } else {
            metadata.default_branch.as_str()
        };
        let tree = self.host.tree(repo, git_ref).await?;
        tracing::debug!(%repo, entries = tree.entries.len(), "Fetched repository tree");
        Ok((metadata, tree))
    }

    /// Returns a cached snapshot, if the cache has a readable one.
    async fn cached_snapshot(&self, repo: &RepoRef) -> Option<RepositorySnapshot> {
        let raw = self.cache.as_ref()?.get(&repo.cache_key()).await?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%repo, error = %err, "Ignoring unreadable cached snapshot");
                None
            }
        }
    }

    /// Stores a snapshot, if a cache is configured.
    async fn store_snapshot(&self, repo: &RepoRef, snapshot: &RepositorySnapshot) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match serde_json::to_string(snapshot) {
            Ok(raw) => cache.set(&repo.cache_key(), raw, self.cache_ttl).await,
            Err(err) => tracing::warn!(%repo, error = %err, "Could not serialize snapshot"),
        }
    }

    /// Fetches whichever of `paths` are not yet in the snapshot. Returns
    /// true if anything new was fetched.
    async fn fill_contents(
        &self,
        repo: &RepoRef,
        snapshot: &mut RepositorySnapshot,
        paths: impl IntoIterator<Item = String>,
    ) -> bool {
        let missing: Vec<String> = paths
            .into_iter()
            .filter(|path| !snapshot.contents.contains_key(path))
            .collect();
        if missing.is_empty() {
            return false;
        }
        let fetched = fetch_contents(self.host.as_ref(), repo, &missing, self.batch_size).await;
        let any = !fetched.is_empty();
        snapshot.contents.extend(fetched);
        any
    }

    /// Builds the evidence bundle for a repository URL.
    ///
    /// Only reference-resolution failures (`InvalidReference`, `NotFound`,
    /// `RateLimited`, or an unreachable host) are returned as errors.
    pub async fn analyze(
        &self,
        url: &str,
        keywords: &[String],
    ) -> Result<EvidenceBundle, EvidenceError> {
        let repo = parse_reference(url)?;

        let (mut snapshot, cache_hit) = match self.cached_snapshot(&repo).await {
            Some(snapshot) => {
                tracing::info!(%repo, "Using cached repository snapshot");
                (snapshot, true)
            }
            None => {
                let (metadata, tree) = self.fetch_tree(&repo).await?;
                (
                    RepositorySnapshot {
                        metadata,
                        tree,
                        contents: BTreeMap::new(),
                    },
                    false,
                )
            }
        };

        let manifests: Vec<String> = snapshot
            .tree
            .files()
            .filter(|entry| entry.depth() == 0 && select::is_always_important(entry))
            .filter(|entry| entry.size <= self.policy.max_file_size)
            .map(|entry| entry.path.clone())
            .collect();
        let mut fetched_any = self.fill_contents(&repo, &mut snapshot, manifests).await;

        let project_type = classify_project_type(&snapshot.tree, &snapshot.contents);
        let selected = select_files(&snapshot.tree, project_type, keywords, &self.policy);
        fetched_any |= self
            .fill_contents(
                &repo,
                &mut snapshot,
                selected.iter().map(|scored| scored.file.path.clone()),
            )
            .await;

        let summary_text = build_summary(&SummaryInput {
            repo:          &repo,
            metadata:      &snapshot.metadata,
            project_type,
            tree:          &snapshot.tree,
            selected:      &selected,
            contents:      &snapshot.contents,
            max_file_size: self.policy.max_file_size,
        });

        let metadata = json!({
            "owner": repo.owner,
            "repo": repo.repo,
            "url": url.trim(),
            "defaultBranch": snapshot.metadata.default_branch,
            "stars": snapshot.metadata.stars,
            "primaryLanguage": snapshot.metadata.language,
            "projectType": project_type.as_str(),
            "overview": QualityOverview::from_tree(&snapshot.tree),
            "languages": language_breakdown(&snapshot.tree, TOP_LANGUAGES),
            "selectedFiles": selected
                .iter()
                .map(|scored| json!({ "path": scored.file.path, "score": scored.score }))
                .collect::<Vec<_>>(),
            "listingTruncated": snapshot.tree.truncated,
            "cached": cache_hit,
        });

        if !cache_hit || fetched_any {
            self.store_snapshot(&repo, &snapshot).await;
        }

        tracing::info!(
            %repo,
            project_type = %project_type,
            selected = selected.len(),
            summary_chars = summary_text.chars().count(),
            "Repository evidence gathered"
        );

        Ok(EvidenceBundle::new(SourceType::GithubRepo, summary_text, metadata))
    }
}
