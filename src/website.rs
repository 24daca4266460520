#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Evidence gathering for deployed-website submissions.
//!
//! A probe is one timed existence check followed by one bounded fetch of the
//! page. The start of the body is scanned with a few patterns for the title,
//! description, viewport and favicon; nothing is parsed as a document.
//! Network failures are a normal outcome (`reachable == false`), never an
//! error.

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    sync::LazyLock,
    time::{Duration, Instant},
};

use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::{
    constants::{FAST_RESPONSE_MS, METADATA_TEXT_CHARS, PAGE_SCAN_CHARS, SLOW_RESPONSE_MS},
    error::EvidenceError,
    types::{EvidenceBundle, SourceType},
    util::{clip_chars, squash_whitespace, truncate_chars, yes_no},
};

/// Matches the page title.
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("pattern is valid"));

/// Matches any `<meta ...>` tag.
static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("pattern is valid"));

/// Matches a `name` attribute; the value is in group 1 (double quotes) or
/// group 2 (single quotes).
static NAME_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bname\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("pattern is valid")
});

/// Matches a `content` attribute, grouped like [`NAME_ATTR`].
static CONTENT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("pattern is valid")
});

/// Matches a `<link rel="...icon...">` tag.
static FAVICON_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\s[^>]*\brel\s*=\s*(?:"[^"]*\bicon\b[^"]*"|'[^']*\bicon\b[^']*')"#)
        .expect("pattern is valid")
});

/// Response headers worth recording.
const RECORDED_HEADERS: [&str; 2] = ["server", "content-type"];

/// Thresholds used by the website rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Responses faster than this are a strength (milliseconds).
    pub fast_response_ms: u64,
    /// Responses slower than this are an issue (milliseconds).
    pub slow_response_ms: u64,
    /// Characters of the page scanned for metadata.
    pub scan_chars:       usize,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            fast_response_ms: FAST_RESPONSE_MS,
            slow_response_ms: SLOW_RESPONSE_MS,
            scan_chars:       PAGE_SCAN_CHARS,
        }
    }
}

/// What one probe observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Canonical URL that was probed.
    pub url:              String,
    /// Whether any HTTP response came back.
    pub reachable:        bool,
    /// Status of the existence check, or of the full fetch when the server
    /// does not support the check.
    pub status_code:      Option<u16>,
    /// Time until the existence check answered or failed.
    pub response_time_ms: u64,
    /// Selected response headers, lower-case names.
    pub headers:          BTreeMap<String, String>,
    /// Whether the final URL (after redirects) is served over HTTPS.
    pub https:            bool,
    /// Page title, if found.
    pub title:            Option<String>,
    /// Meta description, if found.
    pub description:      Option<String>,
    /// Whether a viewport meta tag is present.
    pub has_viewport:     bool,
    /// Whether a favicon link is present.
    pub has_favicon:      bool,
}

impl ProbeResult {
    /// Returns true when the recorded status is 2xx.
    pub fn status_ok(&self) -> bool {
        self.status_code.is_some_and(|code| (200..300).contains(&code))
    }
}

/// Outcome of the website rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebsiteAssessment {
    /// Things the site does well.
    pub strengths:       Vec<String>,
    /// Things the site gets wrong.
    pub issues:          Vec<String>,
    /// Suggested fixes.
    pub recommendations: Vec<String>,
}

/// Canonicalizes a submitted website URL, adding `https://` when no scheme
/// is given.
pub fn normalize(url: &str) -> Result<Url, EvidenceError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(EvidenceError::InvalidReference(url.to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed =
        Url::parse(&candidate).map_err(|_| EvidenceError::InvalidReference(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(EvidenceError::InvalidReference(url.to_string()));
    }
    Ok(parsed)
}

/// True if any criterion mentions one of `words`.
fn criteria_mention(criteria: &[String], words: &[&str]) -> bool {
    criteria.iter().any(|criterion| {
        let criterion = criterion.to_lowercase();
        words.iter().any(|word| criterion.contains(word))
    })
}

/// Applies the fixed website rule set to a probe result.
///
/// When the criteria mention mobile or responsive design, a missing viewport
/// is an issue; when they mention SEO, so is a missing description.
pub fn assess(result: &ProbeResult, criteria: &[String], policy: &ProbePolicy) -> WebsiteAssessment {
    let mut out = WebsiteAssessment::default();

    if !result.reachable {
        out.issues.push("Website is not accessible".into());
        out.recommendations
            .push("Check that the site is deployed and the URL is publicly reachable".into());
        return out;
    }

    if result.https {
        out.strengths.push("Served over HTTPS".into());
    } else {
        out.issues.push("Not served over HTTPS".into());
        out.recommendations.push("Serve the site over HTTPS".into());
    }

    match result.status_code {
        Some(code) if result.status_ok() => {
            out.strengths.push(format!("Responds successfully (HTTP {code})"));
        }
        Some(code) => {
            out.issues.push(format!("Responds with HTTP {code}"));
            out.recommendations
                .push("Make sure the submitted URL serves the page without errors".into());
        }
        None => out.issues.push("No HTTP status was returned".into()),
    }

    if result.response_time_ms < policy.fast_response_ms {
        out.strengths
            .push(format!("Fast response ({} ms)", result.response_time_ms));
    } else if result.response_time_ms > policy.slow_response_ms {
        out.issues
            .push(format!("Slow response ({} ms)", result.response_time_ms));
        out.recommendations
            .push("Reduce server response time (caching, lighter pages, a CDN)".into());
    }

    if result.title.is_some() {
        out.strengths.push("Has a page title".into());
    } else {
        out.issues.push("Missing page title".into());
        out.recommendations.push("Add a descriptive <title>".into());
    }

    if result.description.is_some() {
        out.strengths.push("Has a meta description".into());
    } else {
        if criteria_mention(criteria, &["seo", "search engine"]) {
            out.issues.push("Missing meta description".into());
        }
        out.recommendations
            .push("Add a meta description for search engines".into());
    }

    if result.has_viewport {
        out.strengths.push("Declares a viewport for mobile devices".into());
    } else {
        if criteria_mention(criteria, &["mobile", "responsive"]) {
            out.issues.push("Missing viewport meta tag".into());
        }
        out.recommendations
            .push("Add a viewport meta tag for mobile devices".into());
    }

    if result.has_favicon {
        out.strengths.push("Has a favicon".into());
    } else {
        out.recommendations.push("Add a favicon".into());
    }

    out
}

/// Value of the first quoted attribute `pattern` finds in `tag`.
fn attribute<'t>(pattern: &Regex, tag: &'t str) -> Option<&'t str> {
    let caps = pattern.captures(tag)?;
    caps.get(1).or_else(|| caps.get(2)).map(|value| value.as_str())
}

/// Pulls title, description, viewport and favicon out of the start of a page.
/// The first non-empty description wins.
fn scan_page(result: &mut ProbeResult, page: &str) {
    result.title = TITLE
        .captures(page)
        .map(|caps| squash_whitespace(&caps[1]))
        .filter(|title| !title.is_empty());

    for tag in META_TAG.find_iter(page) {
        let tag = tag.as_str();
        let Some(name) = attribute(&NAME_ATTR, tag) else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "viewport" => result.has_viewport = true,
            "description" if result.description.is_none() => {
                result.description = attribute(&CONTENT_ATTR, tag)
                    .map(squash_whitespace)
                    .filter(|description| !description.is_empty());
            }
            _ => {}
        }
    }

    result.has_favicon = FAVICON_LINK.is_match(page);
}

/// Reads at most `max_chars` characters' worth of the body.
async fn read_prefix(mut response: Response, max_chars: usize) -> String {
    // A UTF-8 character is at most four bytes.
    let max_bytes = max_chars.saturating_mul(4);
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                body.extend_from_slice(&chunk);
                if body.len() >= max_bytes {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "Stopped reading page body early");
                break;
            }
        }
    }
    clip_chars(&String::from_utf8_lossy(&body), max_chars).to_string()
}

/// Renders the bounded website summary.
pub fn build_summary(result: &ProbeResult, assessment: &WebsiteAssessment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Website: {}", truncate_chars(&result.url, METADATA_TEXT_CHARS));
    let status = result
        .status_code
        .map_or_else(|| "none".to_string(), |code| code.to_string());
    let _ = writeln!(
        out,
        "Reachable: {} | Status: {} | Response time: {} ms | HTTPS: {}",
        yes_no(result.reachable),
        status,
        result.response_time_ms,
        yes_no(result.https)
    );

    if result.reachable {
        let _ = writeln!(
            out,
            "Title: {}",
            result
                .title
                .as_deref()
                .map_or_else(|| "(none)".to_string(), |t| truncate_chars(t, METADATA_TEXT_CHARS))
        );
        let _ = writeln!(
            out,
            "Description: {}",
            result
                .description
                .as_deref()
                .map_or_else(|| "(none)".to_string(), |d| truncate_chars(d, METADATA_TEXT_CHARS))
        );
        let _ = writeln!(
            out,
            "Viewport: {} | Favicon: {}",
            yes_no(result.has_viewport),
            yes_no(result.has_favicon)
        );
        for (name, value) in &result.headers {
            let _ = writeln!(out, "{name}: {}", truncate_chars(value, METADATA_TEXT_CHARS));
        }
    }

    for (heading, items) in [
        ("Strengths", &assessment.strengths),
        ("Issues", &assessment.issues),
        ("Recommendations", &assessment.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n## {heading}");
        for item in items {
            let _ = writeln!(out, "- {item}");
        }
    }

    out
}

/// Probes websites and turns what it sees into evidence.
#[derive(Clone, Debug)]
pub struct WebsiteProber {
    /// Client carrying the identifying user agent and deadline.
    client: Client,
    /// Rule thresholds.
    policy: ProbePolicy,
}

impl WebsiteProber {
    /// Creates a prober with the default policy.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: ProbePolicy::default(),
        }
    }

    /// Replaces the rule thresholds.
    pub fn with_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the rule thresholds.
    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    /// Probes `url`. Never fails: anything that goes wrong on the network
    /// yields `reachable == false`.
    pub async fn probe(&self, url: &Url) -> ProbeResult {
        let mut result = ProbeResult {
            url: url.to_string(),
            https: url.scheme() == "https",
            ..ProbeResult::default()
        };

        let started = Instant::now();
        let head = self.client.head(url.clone()).send().await;
        result.response_time_ms = elapsed_ms(started.elapsed());

        let head = match head {
            Ok(head) => head,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "Website is not reachable");
                return result;
            }
        };

        result.reachable = true;
        result.https = head.url().scheme() == "https";
        let head_status = head.status();
        result.status_code = Some(head_status.as_u16());
        record_headers(&mut result, &head);

        match self.client.get(url.clone()).send().await {
            Ok(page) => {
                if matches!(
                    head_status,
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) {
                    result.status_code = Some(page.status().as_u16());
                    record_headers(&mut result, &page);
                }
                result.https = page.url().scheme() == "https";
                let body = read_prefix(page, self.policy.scan_chars).await;
                scan_page(&mut result, &body);
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "Website answered the check but not the fetch");
            }
        }

        tracing::debug!(
            url = %url,
            status = ?result.status_code,
            response_time_ms = result.response_time_ms,
            "Probed website"
        );
        result
    }

    /// Builds the evidence bundle for a website URL. Only an unparsable URL
    /// is an error.
    pub async fn analyze(
        &self,
        url: &str,
        criteria: &[String],
    ) -> Result<EvidenceBundle, EvidenceError> {
        let canonical = normalize(url)?;
        let result = self.probe(&canonical).await;
        let assessment = assess(&result, criteria, &self.policy);
        let summary_text = build_summary(&result, &assessment);

        let metadata = json!({
            "url": result.url,
            "reachable": result.reachable,
            "statusCode": result.status_code,
            "statusOk": result.status_ok(),
            "responseTimeMs": result.response_time_ms,
            "https": result.https,
            "title": result.title.as_deref().map(|t| truncate_chars(t, METADATA_TEXT_CHARS)),
            "description": result
                .description
                .as_deref()
                .map(|d| truncate_chars(d, METADATA_TEXT_CHARS)),
            "hasViewport": result.has_viewport,
            "hasFavicon": result.has_favicon,
            "headers": result.headers,
            "strengths": assessment.strengths,
            "issues": assessment.issues,
            "recommendations": assessment.recommendations,
        });

        Ok(EvidenceBundle::new(SourceType::Website, summary_text, metadata))
    }
}

/// Copies the recorded headers out of a response.
fn record_headers(result: &mut ProbeResult, response: &Response) {
    for name in RECORDED_HEADERS {
        if let Some(value) = response.headers().get(name).and_then(|v| v.to_str().ok()) {
            result.headers.insert(name.to_string(), value.to_string());
        }
    }
}

/// Milliseconds in a duration, saturating.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
