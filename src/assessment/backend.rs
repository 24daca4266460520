#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
};
use async_trait::async_trait;

use crate::{
    config::{OpenAiEnv, TierModels},
    constants::{BACKEND_MAX_OUTPUT_TOKENS, BACKEND_TEMPERATURE},
    error::BackendError,
    types::BackendTier,
};

/// One chat-style completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction.
    pub system:            String,
    /// User prompt.
    pub prompt:            String,
    /// Tier the request is routed to.
    pub tier:              BackendTier,
    /// Sampling temperature.
    pub temperature:       f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// Whether a JSON object is requested.
    pub structured_output: bool,
}

impl CompletionRequest {
    /// Creates a structured-output request with the fixed sampling settings.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, tier: BackendTier) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            tier,
            temperature: BACKEND_TEMPERATURE,
            max_output_tokens: BACKEND_MAX_OUTPUT_TOKENS,
            structured_output: true,
        }
    }
}

/// An external reasoning backend.
///
/// Implementations make exactly one call per `complete` and must surface a
/// timeout as [`BackendError::Timeout`]. Retries belong to the caller.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Identifier of the model that answers requests on `tier`.
    fn model_for(&self, tier: BackendTier) -> String;

    /// Runs one completion and returns the raw reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError>;
}

/// Reasoning backend speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiBackend {
    /// API client.
    client:  OpenAIClient<OpenAIConfig>,
    /// Model per tier.
    models:  TierModels,
    /// Deadline for one call.
    timeout: Duration,
}

impl OpenAiBackend {
    /// Creates a backend from endpoint settings and a per-call deadline.
    pub fn new(env: &OpenAiEnv, timeout: Duration) -> Self {
        let client = OpenAIClient::with_config(
            OpenAIConfig::new()
                .with_api_base(env.api_base())
                .with_api_key(env.api_key()),
        );
        Self {
            client,
            models: env.models().clone(),
            timeout,
        }
    }

    /// Builds the chat request for `request`.
    #[allow(deprecated)]
    fn chat_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, BackendError> {
        let to_request_error = |err: async_openai::error::OpenAIError| BackendError::Request(err.to_string());

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(to_request_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(to_request_error)?
                .into(),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model_for(request.tier))
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_output_tokens);
        if request.structured_output {
            args.response_format(ResponseFormat::JsonObject);
        }
        args.build().map_err(to_request_error)
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    fn model_for(&self, tier: BackendTier) -> String {
        self.models.for_tier(tier).to_string()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        let chat = self.chat_request(&request)?;
        tracing::debug!(tier = %request.tier, model = %chat.model, "Calling reasoning backend");

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(chat))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))?
            .map_err(|err| BackendError::Request(err.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

/// Stand-in used when no backend is configured; every call fails, so every
/// assessment falls back.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl ReasoningBackend for UnconfiguredBackend {
    fn model_for(&self, tier: BackendTier) -> String {
        format!("unconfigured-{tier}")
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, BackendError> {
        Err(BackendError::NotConfigured(
            "set OPENAI_ENDPOINT, OPENAI_API_KEY and OPENAI_MODEL".into(),
        ))
    }
}
