use std::{fmt::Display, sync::LazyLock};

use regex::Regex;

use crate::error::EvidenceError;

/// `[scheme://][www.]github.com/<owner>/<repo>[.git][/anything]`
static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)/([A-Za-z0-9._-]+?)(?:\.git)?(?:[/?#].*)?$",
    )
    .expect("repository URL pattern is valid")
});

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    /// Account or organisation owning the repository.
    pub owner: String,
    /// Repository name.
    pub repo:  String,
}

impl RepoRef {
    /// Key under which a fetched snapshot of this repository is cached.
    pub fn cache_key(&self) -> String {
        format!("repo:{}/{}", self.owner.to_lowercase(), self.repo.to_lowercase())
    }
}

impl Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Extracts `{owner, repo}` from a repository URL.
///
/// Only the `github.com/<owner>/<repo>` shape is accepted; trailing paths such
/// as `/tree/main/src` are ignored.
pub fn parse_reference(url: &str) -> Result<RepoRef, EvidenceError> {
    let trimmed = url.trim();
    let captures = REPO_URL
        .captures(trimmed)
        .ok_or_else(|| EvidenceError::InvalidReference(trimmed.to_string()))?;

    let repo = captures[2].to_string();
    if repo == "." || repo == ".." {
        return Err(EvidenceError::InvalidReference(trimmed.to_string()));
    }

    Ok(RepoRef {
        owner: captures[1].to_string(),
        repo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(url: &str) -> (String, String) {
        let reference = parse_reference(url).expect("valid reference");
        (reference.owner, reference.repo)
    }

    #[test]
    fn accepts_common_shapes() {
        let expected = ("octo".to_string(), "hello-world".to_string());
        assert_eq!(parsed("https://github.com/octo/hello-world"), expected);
        assert_eq!(parsed("http://www.github.com/octo/hello-world/"), expected);
        assert_eq!(parsed("github.com/octo/hello-world.git"), expected);
        assert_eq!(parsed("  https://github.com/octo/hello-world/tree/main/src  "), expected);
    }

    #[test]
    fn keeps_dots_inside_repo_names() {
        assert_eq!(parsed("https://github.com/octo/site.io").1, "site.io");
    }

    #[test]
    fn rejects_other_shapes() {
        for url in [
            "https://gitlab.com/octo/repo",
            "https://github.com/octo",
            "https://github.com/",
            "not a url",
            "https://github.com/-octo/repo",
            "https://notgithub.com/octo/repo",
        ] {
            assert!(
                matches!(parse_reference(url), Err(EvidenceError::InvalidReference(_))),
                "{url} should be rejected"
            );
        }
    }
}
