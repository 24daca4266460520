use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use assessor::{
    capabilities::Cache,
    config::GithubEnv,
    error::EvidenceError,
    repository::{
        GithubHost, RepoRef, RepositoryAnalyzer, RepositoryMetadata, RepositoryTree, TreeEntry,
        VcsHost, fetch_contents,
    },
    types::SourceType,
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Cache backed by a map; ignores expiry.
#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: String, _ttl: Duration) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }
}

fn analyzer(server: &MockServer) -> RepositoryAnalyzer {
    let host = GithubHost::new(reqwest::Client::new(), GithubEnv::new(server.uri(), None));
    RepositoryAnalyzer::new(Arc::new(host))
}

fn encoded(content: &str) -> serde_json::Value {
    // Mimic the API's line-wrapped base64.
    let encoded = STANDARD.encode(content);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    json!({ "content": wrapped, "encoding": "base64" })
}

async fn mount_nextjs_repo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "default_branch": "main",
            "description": "A small storefront",
            "stargazers_count": 7,
            "language": "TypeScript"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/git/trees/main"))
        .and(query_param("recursive", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "abc",
            "truncated": false,
            "tree": [
                { "path": "README.md", "type": "blob", "size": 120 },
                { "path": "package.json", "type": "blob", "size": 300 },
                { "path": "app", "type": "tree" },
                { "path": "app/page.tsx", "type": "blob", "size": 500 },
                { "path": "node_modules/next/index.js", "type": "blob", "size": 900 }
            ]
        })))
        .mount(server)
        .await;

    for (file, content) in [
        ("README.md", "# Shop\nA storefront built for the web lab."),
        (
            "package.json",
            r#"{"name":"shop","dependencies":{"next":"14.2.0","react":"18.2.0"}}"#,
        ),
        ("app/page.tsx", "export default function Page() { return <main>Shop</main>; }"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/shop/contents/{file}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(encoded(content)))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn nextjs_repository_is_classified_and_summarised() {
    let server = MockServer::start().await;
    mount_nextjs_repo(&server).await;

    let bundle = analyzer(&server)
        .analyze("https://github.com/acme/shop", &[])
        .await
        .unwrap();

    assert_eq!(bundle.source_type, SourceType::GithubRepo);
    assert!(bundle.summary_text.contains("# Repository: acme/shop"));
    assert!(bundle.summary_text.contains("Project type: Next.js (nextjs)"));
    assert!(bundle.summary_text.contains("A storefront built for the web lab."));
    assert!(bundle.summary_text.contains("### app/page.tsx"));
    assert!(!bundle.summary_text.contains("node_modules"));

    assert_eq!(bundle.metadata["projectType"], "nextjs");
    assert_eq!(bundle.metadata["defaultBranch"], "main");
    assert_eq!(bundle.metadata["stars"], 7);
    let selected: Vec<&str> = bundle.metadata["selectedFiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|file| file["path"].as_str().unwrap())
        .collect();
    assert!(selected.contains(&"package.json"));
    assert!(selected.contains(&"README.md"));
}

#[tokio::test]
async fn missing_repository_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = analyzer(&server)
        .analyze("github.com/acme/ghost", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EvidenceError::NotFound(_)));
}

#[tokio::test]
async fn exhausted_quota_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = analyzer(&server)
        .analyze("https://github.com/acme/shop", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EvidenceError::RateLimited(_)));
}

#[tokio::test]
async fn malformed_url_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let err = analyzer(&server)
        .analyze("https://gitlab.com/acme/shop", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EvidenceError::InvalidReference(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_file_fetch_is_skipped() {
    let server = MockServer::start().await;
    mount_nextjs_repo(&server).await;
    // Outranks the successful mock for the same path.
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/contents/app/page.tsx"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;

    let bundle = analyzer(&server)
        .analyze("https://github.com/acme/shop", &[])
        .await
        .unwrap();
    assert!(bundle.summary_text.contains("### app/page.tsx"));
    assert!(bundle.summary_text.contains("(content unavailable)"));
}

#[tokio::test]
async fn cached_snapshot_short_circuits_the_host() {
    let server = MockServer::start().await;
    mount_nextjs_repo(&server).await;

    let cache = Arc::new(MemoryCache::default());
    let analyzer = analyzer(&server).with_cache(cache.clone(), Duration::from_secs(60));

    let first = analyzer
        .analyze("https://github.com/acme/shop", &[])
        .await
        .unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert!(cache.get("repo:acme/shop").await.is_some());

    let second = analyzer
        .analyze("https://github.com/acme/shop.git", &[])
        .await
        .unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), requests_after_first);
    assert_eq!(first.summary_text, second.summary_text);
    assert_eq!(second.metadata["cached"], true);
}

/// Host that serves a synthetic repository and records fetch concurrency.
struct WideHost {
    files:       usize,
    in_flight:   AtomicUsize,
    max_flight:  AtomicUsize,
    fetch_count: AtomicUsize,
}

impl WideHost {
    fn new(files: usize) -> Self {
        Self {
            files,
            in_flight: AtomicUsize::new(0),
            max_flight: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VcsHost for WideHost {
    async fn repository_metadata(
        &self,
        _repo: &RepoRef,
    ) -> Result<RepositoryMetadata, EvidenceError> {
        Ok(RepositoryMetadata {
            default_branch: "main".into(),
            ..RepositoryMetadata::default()
        })
    }

    async fn tree(&self, _repo: &RepoRef, _git_ref: &str) -> Result<RepositoryTree, EvidenceError> {
        let mut entries = vec![
            TreeEntry::blob("README.md", 2_000),
            TreeEntry::blob("package.json", 400),
        ];
        entries.extend(
            (0..self.files).map(|i| TreeEntry::blob(format!("src/components/module_{i:05}.tsx"), 1_500)),
        );
        Ok(RepositoryTree::new(entries))
    }

    async fn file_content(&self, _repo: &RepoRef, path: &str) -> Result<Vec<u8>, EvidenceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_flight.fetch_max(now, Ordering::SeqCst);
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("// {path}\n{}", "const x = 1;\n".repeat(200)).into_bytes())
    }
}

#[tokio::test]
async fn content_fetches_run_in_bounded_batches() {
    let host = WideHost::new(0);
    let repo = RepoRef {
        owner: "a".into(),
        repo:  "b".into(),
    };
    let paths: Vec<String> = (0..25).map(|i| format!("f{i}.rs")).collect();

    let contents = fetch_contents(&host, &repo, &paths, 10).await;
    assert_eq!(contents.len(), 25);
    assert_eq!(host.fetch_count.load(Ordering::SeqCst), 25);
    assert!(host.max_flight.load(Ordering::SeqCst) <= 10);
}

#[tokio::test]
async fn summary_length_does_not_grow_with_repository_size() {
    let small = Arc::new(WideHost::new(40));
    let large = Arc::new(WideHost::new(4_000));

    let small_bundle = RepositoryAnalyzer::new(small.clone())
        .analyze("https://github.com/acme/app", &[])
        .await
        .unwrap();
    let large_bundle = RepositoryAnalyzer::new(large.clone())
        .analyze("https://github.com/acme/app", &[])
        .await
        .unwrap();

    let small_len = small_bundle.evidence_length();
    let large_len = large_bundle.evidence_length();
    assert!(large_len < small_len * 2, "{small_len} vs {large_len}");

    // Selection caps the fetches too: manifests plus at most ten files.
    assert!(large.fetch_count.load(Ordering::SeqCst) <= 12);
    assert!(large.max_flight.load(Ordering::SeqCst) <= 10);
}
