use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use assessor::{
    Assessor,
    assessment::{CompletionRequest, OpenAiBackend, Orchestrator, ReasoningBackend},
    capabilities::RateLimiter,
    config::{GithubEnv, OpenAiEnv, TierModels},
    error::{AssessError, BackendError, StoreError},
    evidence::EvidenceCollector,
    repository::{GithubHost, RepositoryAnalyzer},
    store::{VerdictRecord, VerdictSink},
    types::{BackendTier, EvidenceBundle, Remark, Rubric, SourceType, SubmissionReference},
    website::WebsiteProber,
};
use async_trait::async_trait;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Backend that answers with a fixed reply and remembers every request.
struct ScriptedBackend {
    reply:    Result<String, fn() -> BackendError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn replying(reply: &str) -> Self {
        Self {
            reply:    Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: fn() -> BackendError) -> Self {
        Self {
            reply:    Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn tiers(&self) -> Vec<BackendTier> {
        self.requests.lock().unwrap().iter().map(|r| r.tier).collect()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn model_for(&self, tier: BackendTier) -> String {
        format!("model-{tier}")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(error) => Err(error()),
        }
    }
}

/// Backend that echoes a marker found in the prompt after a marker-specific
/// delay, so concurrent calls finish out of order.
struct EchoBackend;

#[async_trait]
impl ReasoningBackend for EchoBackend {
    fn model_for(&self, tier: BackendTier) -> String {
        format!("echo-{tier}")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        let marker = if request.prompt.contains("MARKER-A") { "A" } else { "B" };
        let delay = if marker == "A" { 40 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!({
            "remark": if marker == "A" { "Excellent" } else { "Needs Improvement" },
            "feedback": format!("submission {marker}"),
            "criteriaMet": [format!("criterion {marker}")],
            "confidence": if marker == "A" { 0.9 } else { 0.6 },
        })
        .to_string())
    }
}

fn rubric() -> Rubric {
    Rubric::builder()
        .title("Reflection")
        .criteria(vec!["Explains the approach".into()])
        .build()
}

fn text(content: &str) -> EvidenceBundle {
    EvidenceBundle::new(SourceType::Text, content.to_string(), json!({}))
}

#[tokio::test]
async fn valid_reply_becomes_verdict() {
    let backend = Arc::new(ScriptedBackend::replying(
        r#"{"remark":"Good","feedback":"Clear answer.","criteriaMet":["Explains the approach"],"areasForImprovement":[],"confidence":0.8}"#,
    ));
    let orchestrator = Orchestrator::new(backend.clone());

    let verdict = orchestrator.assess(&text("short answer"), &rubric()).await;

    assert_eq!(verdict.remark, Remark::Good);
    assert_eq!(verdict.feedback, "Clear answer.");
    assert_eq!(verdict.criteria_met, vec!["Explains the approach".to_string()]);
    assert_eq!(verdict.confidence, 0.8);
    assert_eq!(verdict.backend_used, "model-fast");
    assert!(!verdict.is_fallback());

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(requests[0].max_output_tokens, 1000);
    assert!(requests[0].structured_output);
    assert!(requests[0].prompt.contains("short answer"));
    assert!(requests[0].prompt.contains("1. Explains the approach"));
}

#[tokio::test]
async fn backend_failure_falls_back() {
    let backend = Arc::new(ScriptedBackend::failing(|| {
        BackendError::Timeout(Duration::from_secs(60))
    }));
    let verdict = Orchestrator::new(backend)
        .assess(&text("answer"), &rubric())
        .await;

    assert_eq!(verdict.remark, Remark::CanImprove);
    assert_eq!(verdict.confidence, 0.5);
    assert_eq!(verdict.backend_used, "fallback");
}

#[tokio::test]
async fn unstructured_reply_falls_back() {
    let backend = Arc::new(ScriptedBackend::replying("Looks fine to me!"));
    let verdict = Orchestrator::new(backend)
        .assess(&text("answer"), &rubric())
        .await;
    assert!(verdict.is_fallback());
}

#[tokio::test]
async fn tiers_follow_the_evidence() {
    let backend = Arc::new(ScriptedBackend::replying(r#"{"remark":"Good","feedback":"ok"}"#));
    let orchestrator = Orchestrator::new(backend.clone());

    orchestrator.assess(&text("tiny"), &rubric()).await;
    orchestrator.assess(&text(&"x".repeat(6_000)), &rubric()).await;
    orchestrator
        .assess(
            &EvidenceBundle::new(SourceType::GithubRepo, "# Repository: a/b".into(), json!({})),
            &rubric(),
        )
        .await;
    orchestrator
        .assess(
            &EvidenceBundle::new(SourceType::Document, "y".repeat(1_000), json!({})),
            &rubric(),
        )
        .await;

    assert_eq!(
        backend.tiers(),
        vec![
            BackendTier::Fast,
            BackendTier::Capable,
            BackendTier::Capable,
            BackendTier::Balanced
        ]
    );
}

#[tokio::test]
async fn concurrent_assessments_do_not_interfere() {
    let orchestrator = Orchestrator::new(Arc::new(EchoBackend));
    let rubric = rubric();
    let first = text("MARKER-A first submission");
    let second = text("MARKER-B second submission");

    let (a, b) = tokio::join!(
        orchestrator.assess(&first, &rubric),
        orchestrator.assess(&second, &rubric)
    );

    assert_eq!(a.remark, Remark::Excellent);
    assert_eq!(a.feedback, "submission A");
    assert_eq!(a.criteria_met, vec!["criterion A".to_string()]);
    assert_eq!(a.confidence, 0.9);

    assert_eq!(b.remark, Remark::NeedsImprovement);
    assert_eq!(b.feedback, "submission B");
    assert_eq!(b.criteria_met, vec!["criterion B".to_string()]);
    assert_eq!(b.confidence, 0.6);
}

fn openai_backend(server: &MockServer, timeout: Duration) -> OpenAiBackend {
    let env = OpenAiEnv::new(
        server.uri(),
        "test-key",
        TierModels {
            fast:     "small".into(),
            balanced: "medium".into(),
            capable:  "large".into(),
        },
    );
    OpenAiBackend::new(&env, timeout)
}

fn chat_response(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "large",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[tokio::test]
async fn openai_backend_returns_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("  {\"remark\":\"Good\",\"feedback\":\"ok\"}  ")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = openai_backend(&server, Duration::from_secs(5));
    let reply = backend
        .complete(CompletionRequest::new("system", "prompt", BackendTier::Capable))
        .await
        .unwrap();
    assert_eq!(reply, "{\"remark\":\"Good\",\"feedback\":\"ok\"}");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "large");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "prompt");
}

#[tokio::test]
async fn openai_backend_empty_reply_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("   ")))
        .mount(&server)
        .await;

    let result = openai_backend(&server, Duration::from_secs(5))
        .complete(CompletionRequest::new("s", "p", BackendTier::Fast))
        .await;
    assert!(matches!(result, Err(BackendError::EmptyResponse)));
}

#[tokio::test]
async fn openai_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("{}"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = openai_backend(&server, Duration::from_millis(200))
        .complete(CompletionRequest::new("s", "p", BackendTier::Balanced))
        .await;
    assert!(matches!(result, Err(BackendError::Timeout(_))));
}

/// Limiter that admits a fixed set of submitters.
struct AllowList(Vec<&'static str>);

#[async_trait]
impl RateLimiter for AllowList {
    async fn try_acquire(&self, subject_key: &str) -> bool {
        self.0.contains(&subject_key)
    }
}

/// Sink that keeps records in memory.
#[derive(Default)]
struct MemorySink(Mutex<Vec<VerdictRecord>>);

#[async_trait]
impl VerdictSink for MemorySink {
    async fn record(&self, record: &VerdictRecord) -> Result<(), StoreError> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn assessor(backend: Arc<dyn ReasoningBackend>) -> Assessor {
    let client = reqwest::Client::new();
    let host = GithubHost::new(client.clone(), GithubEnv::new("http://127.0.0.1:9", None));
    let collector = EvidenceCollector::new(
        RepositoryAnalyzer::new(Arc::new(host)),
        WebsiteProber::new(client),
    );
    Assessor::new(collector, Orchestrator::new(backend))
}

#[tokio::test]
async fn throttled_submitter_is_refused_before_evidence() {
    let backend = Arc::new(ScriptedBackend::replying(r#"{"remark":"Good","feedback":"ok"}"#));
    let assessor = assessor(backend.clone()).with_rate_limiter(Arc::new(AllowList(vec!["alice"])));

    let err = assessor
        .assess_submission(
            "mallory",
            &SubmissionReference::Text {
                content: "hi".into(),
            },
            &rubric(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssessError::Throttled(who) if who == "mallory"));
    assert!(backend.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submission_runs_end_to_end_and_is_recorded() {
    let backend = Arc::new(ScriptedBackend::replying(
        r#"{"remark":"Excellent","feedback":"Great work.","confidence":0.95}"#,
    ));
    let sink = Arc::new(MemorySink::default());
    let assessor = assessor(backend)
        .with_rate_limiter(Arc::new(AllowList(vec!["alice"])))
        .with_verdict_sink(sink.clone());

    let verdict = assessor
        .assess_submission(
            "alice",
            &SubmissionReference::Text {
                content: "My reflection on the lab.".into(),
            },
            &rubric(),
        )
        .await
        .unwrap();
    assert_eq!(verdict.remark, Remark::Excellent);

    let records = sink.0.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].submitter, "alice");
    assert_eq!(records[0].source_type, SourceType::Text);
    assert_eq!(records[0].feedback, "Great work.");
}

#[tokio::test]
async fn evidence_failure_is_surfaced() {
    let backend = Arc::new(ScriptedBackend::replying(r#"{"remark":"Good","feedback":"ok"}"#));
    let err = assessor(backend.clone())
        .assess_submission(
            "alice",
            &SubmissionReference::GithubRepo {
                url: "not a repository".into(),
            },
            &rubric(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssessError::Evidence(_)));
    assert!(backend.requests.lock().unwrap().is_empty());
}
