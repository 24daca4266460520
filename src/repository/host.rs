#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use super::reference::RepoRef;
use crate::{config::GithubEnv, error::EvidenceError};

/// Kind of an entry in a repository listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A directory.
    Tree,
    /// A submodule or anything else.
    #[serde(other)]
    Other,
}

/// One entry of a recursive repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Size in bytes; zero for directories.
    #[serde(default)]
    pub size: u64,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Creates a file entry.
    pub fn blob(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            kind: EntryKind::Blob,
        }
    }

    /// Returns true for files.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::Blob
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lower-cased extension of the final path component, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Number of directories above this entry.
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }
}

/// Flat, ordered listing of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTree {
    /// Entries in listing order.
    #[serde(rename = "tree")]
    pub entries:   Vec<TreeEntry>,
    /// Whether the host cut the listing short.
    #[serde(default)]
    pub truncated: bool,
}

impl RepositoryTree {
    /// Creates a tree from entries.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self {
            entries,
            truncated: false,
        }
    }

    /// Iterates over file entries only.
    pub fn files(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|entry| entry.is_file())
    }
}

/// Descriptive facts about a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// Branch the tree is read from.
    pub default_branch: String,
    /// Owner-supplied description.
    #[serde(default)]
    pub description:    Option<String>,
    /// Star count.
    #[serde(default, rename = "stargazers_count")]
    pub stars:          u64,
    /// Primary language as reported by the host.
    #[serde(default)]
    pub language:       Option<String>,
}

/// Read-only access to a VCS hosting API.
#[async_trait]
pub trait VcsHost: Send + Sync {
    /// Fetches repository metadata.
    async fn repository_metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata, EvidenceError>;

    /// Fetches the full recursive listing at `git_ref` in one call.
    async fn tree(&self, repo: &RepoRef, git_ref: &str) -> Result<RepositoryTree, EvidenceError>;

    /// Fetches one file's raw bytes.
    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>, EvidenceError>;
}

/// Response body of the contents endpoint.
#[derive(Deserialize)]
struct ContentResponse {
    /// Encoded file body.
    #[serde(default)]
    content:  String,
    /// Encoding of `content`; only `base64` is understood.
    #[serde(default)]
    encoding: String,
}

/// `VcsHost` backed by the GitHub REST API.
#[derive(Clone, Debug)]
pub struct GithubHost {
    /// HTTP client carrying the user agent and timeout.
    client:   Client,
    /// API base URL and token.
    settings: GithubEnv,
}

impl GithubHost {
    /// Creates a host client.
    pub fn new(client: Client, settings: GithubEnv) -> Self {
        Self { client, settings }
    }

    /// Appends percent-encoded `segments` to the API base.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, EvidenceError> {
        let mut url = Url::parse(self.settings.api_base())
            .map_err(|_| EvidenceError::InvalidReference(self.settings.api_base().to_string()))?;
        url.path_segments_mut()
            .map_err(|_| EvidenceError::InvalidReference(self.settings.api_base().to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues an authenticated GET against the API and maps failure statuses
    /// onto the evidence error taxonomy.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        resource: &str,
    ) -> Result<T, EvidenceError> {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = self.settings.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::NOT_FOUND => Err(EvidenceError::NotFound(resource.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                Err(EvidenceError::RateLimited(resource.to_string()))
            }
            status => Err(EvidenceError::Upstream {
                resource: resource.to_string(),
                status:   status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl VcsHost for GithubHost {
    async fn repository_metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata, EvidenceError> {
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str()])?;
        self.get_json(url, &repo.to_string()).await
    }

    async fn tree(&self, repo: &RepoRef, git_ref: &str) -> Result<RepositoryTree, EvidenceError> {
        let mut url =
            self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str(), "git", "trees", git_ref])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        self.get_json(url, &repo.to_string()).await.map(|tree: RepositoryTree| {
            if tree.truncated {
                tracing::warn!(%repo, "Repository listing was truncated by the host");
            }
            tree
        })
    }

    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>, EvidenceError> {
        let resource = format!("{repo}:{path}");
        let url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        )?;
        let body: ContentResponse = self.get_json(url, &resource).await?;

        if !body.encoding.eq_ignore_ascii_case("base64") {
            return Err(EvidenceError::Upstream {
                resource,
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
            });
        }

        // The API wraps base64 at 60 columns.
        let compact: String = body.content.split_whitespace().collect();
        STANDARD
            .decode(compact)
            .map_err(|_| EvidenceError::Upstream {
                resource,
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_entries_deserialize_from_api_shape() {
        let tree: RepositoryTree = serde_json::from_str(
            r#"{"sha":"x","tree":[
                {"path":"src","type":"tree"},
                {"path":"src/main.rs","type":"blob","size":12},
                {"path":"vendor/lib","type":"commit"}
            ],"truncated":false}"#,
        )
        .expect("tree");
        assert_eq!(tree.entries.len(), 3);
        assert_eq!(tree.entries[1], TreeEntry::blob("src/main.rs", 12));
        assert_eq!(tree.entries[2].kind, EntryKind::Other);
        assert_eq!(tree.files().count(), 1);
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(TreeEntry::blob(".gitignore", 1).extension(), None);
        assert_eq!(TreeEntry::blob("a/b/Page.TSX", 1).extension().as_deref(), Some("tsx"));
        assert_eq!(TreeEntry::blob("a/b/c.rs", 1).depth(), 2);
    }
}
