use std::time::Duration;

use assessor::{
    error::EvidenceError,
    types::SourceType,
    website::{WebsiteProber, normalize},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="description" content="Student portfolio">
  <title>Jordan's Portfolio</title>
  <link rel="icon" href="/favicon.ico">
</head>
<body><h1>Hello</h1></body>
</html>"#;

fn prober() -> WebsiteProber {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    WebsiteProber::new(client)
}

#[tokio::test]
async fn reachable_page_yields_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("server", "mock"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(PAGE),
        )
        .mount(&server)
        .await;

    let url = normalize(&server.uri()).unwrap();
    let result = prober().probe(&url).await;

    assert!(result.reachable);
    assert_eq!(result.status_code, Some(200));
    assert!(!result.https);
    assert_eq!(result.title.as_deref(), Some("Jordan's Portfolio"));
    assert_eq!(result.description.as_deref(), Some("Student portfolio"));
    assert!(result.has_viewport);
    assert!(result.has_favicon);
    assert_eq!(result.headers.get("server").map(String::as_str), Some("mock"));
}

#[tokio::test]
async fn head_not_allowed_uses_get_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Ok</title>"))
        .mount(&server)
        .await;

    let url = normalize(&server.uri()).unwrap();
    let result = prober().probe(&url).await;
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.title.as_deref(), Some("Ok"));
}

#[tokio::test]
async fn unreachable_host_is_a_normal_result() {
    // Nothing listens on the discard port.
    let url = normalize("http://127.0.0.1:9/").unwrap();
    let result = prober().probe(&url).await;

    assert!(!result.reachable);
    assert_eq!(result.status_code, None);
    assert!(result.title.is_none());
}

#[tokio::test]
async fn unreachable_site_still_produces_evidence() {
    let bundle = prober()
        .analyze("http://127.0.0.1:9/", &["Site is responsive".to_string()])
        .await
        .unwrap();

    assert_eq!(bundle.source_type, SourceType::Website);
    assert_eq!(bundle.metadata["reachable"], false);
    assert!(bundle.summary_text.contains("Reachable: no"));
    assert!(bundle.summary_text.contains("Website is not accessible"));
}

#[tokio::test]
async fn error_status_is_reported_as_issue() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let bundle = prober().analyze(&server.uri(), &[]).await.unwrap();
    assert_eq!(bundle.metadata["statusCode"], 404);
    assert_eq!(bundle.metadata["statusOk"], false);
    let issues = bundle.metadata["issues"].as_array().unwrap();
    assert!(issues.iter().any(|issue| issue == "Responds with HTTP 404"));
    assert!(issues.iter().any(|issue| issue == "Not served over HTTPS"));
}

#[tokio::test]
async fn invalid_url_is_the_only_error() {
    let err = prober().analyze("   ", &[]).await.unwrap_err();
    assert!(matches!(err, EvidenceError::InvalidReference(_)));
}

#[test]
fn bare_domain_is_normalized() {
    assert_eq!(normalize("example.com").unwrap().as_str(), "https://example.com/");
}
