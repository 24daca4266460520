#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use anyhow::{Context, Result};
use postgrest::Postgrest;
use reqwest::Client;

use crate::{
    assessment::tier::TierPolicy,
    constants::{CAPABLE_TIER_MIN_CHARS, FAST_TIER_MAX_CHARS},
    types::BackendTier,
};

/// Default endpoint of the VCS hosting API.
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Supabase credentials loaded from the environment, if available.
#[derive(Clone, Debug)]
pub struct SupabaseEnv {
    /// Fully qualified PostgREST endpoint.
    rest_endpoint: String,
    /// API key used for PostgREST requests.
    api_key:       String,
}

impl SupabaseEnv {
    /// Builds a Supabase credential bundle from environment-provided values.
    pub fn new(url: String, key: String) -> Self {
        let rest_endpoint = format!("{}/rest/v1", url.trim_end_matches('/'));
        Self {
            rest_endpoint,
            api_key: key,
        }
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    fn from_env() -> Option<Self> {
        match (non_blank_var("SUPABASE_URL"), non_blank_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => Some(Self::new(url, key)),
            _ => None,
        }
    }

    /// Returns the PostgREST endpoint.
    pub fn rest_endpoint(&self) -> &str {
        &self.rest_endpoint
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Builds a PostgREST client authenticated with the API key.
    pub fn postgrest(&self) -> Postgrest {
        Postgrest::new(self.rest_endpoint.clone()).insert_header("apiKey", self.api_key.clone())
    }
}

/// Model identifiers for each backend tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierModels {
    /// Model used for the fast tier.
    pub fast:     String,
    /// Model used for the balanced tier.
    pub balanced: String,
    /// Model used for the capable tier.
    pub capable:  String,
}

impl TierModels {
    /// Uses the same model for every tier.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            fast:     model.clone(),
            balanced: model.clone(),
            capable:  model,
        }
    }

    /// Returns the model configured for `tier`.
    pub fn for_tier(&self, tier: BackendTier) -> &str {
        match tier {
            BackendTier::Fast => &self.fast,
            BackendTier::Balanced => &self.balanced,
            BackendTier::Capable => &self.capable,
        }
    }
}

/// OpenAI-compatible reasoning backend credentials sourced from the
/// environment.
#[derive(Clone, Debug)]
pub struct OpenAiEnv {
    /// Base URL for the OpenAI-compatible API endpoint.
    api_base: String,
    /// API key used to authenticate requests.
    api_key:  String,
    /// Model per tier.
    models:   TierModels,
}

impl OpenAiEnv {
    /// Creates a backend configuration explicitly.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, models: TierModels) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            models,
        }
    }

    /// Construct an `OpenAiEnv` from environment variables; returns `None` if
    /// the endpoint, key, or every model is missing.
    ///
    /// `ASSESSOR_MODEL_{FAST,BALANCED,CAPABLE}` fall back to `OPENAI_MODEL`.
    fn from_env() -> Option<Self> {
        let api_base = non_blank_var("OPENAI_ENDPOINT")?;
        let api_key = non_blank_var("OPENAI_API_KEY")?;
        let default_model = non_blank_var("OPENAI_MODEL");

        let model = |name: &str| non_blank_var(name).or_else(|| default_model.clone());
        let models = TierModels {
            fast:     model("ASSESSOR_MODEL_FAST")?,
            balanced: model("ASSESSOR_MODEL_BALANCED")?,
            capable:  model("ASSESSOR_MODEL_CAPABLE")?,
        };

        Some(Self::new(api_base, api_key, models))
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the models configured per tier.
    pub fn models(&self) -> &TierModels {
        &self.models
    }
}

/// VCS hosting API settings.
#[derive(Clone, Debug)]
pub struct GithubEnv {
    /// Base URL of the REST API.
    api_base: String,
    /// Optional bearer token; raises the anonymous quota.
    token:    Option<String>,
}

impl GithubEnv {
    /// Creates hosting API settings explicitly.
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Reads `GITHUB_API_BASE` and `GITHUB_TOKEN`.
    fn from_env() -> Self {
        Self::new(
            non_blank_var("GITHUB_API_BASE").unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.into()),
            non_blank_var("GITHUB_TOKEN"),
        )
    }

    /// Returns the REST API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl Default for GithubEnv {
    fn default() -> Self {
        Self::new(DEFAULT_GITHUB_API_BASE, None)
    }
}

/// Everything the crate reads from its environment.
#[derive(Clone, Debug)]
pub struct AssessorConfig {
    /// Hosting API settings.
    github:          GithubEnv,
    /// Reasoning backend settings, if configured.
    openai:          Option<OpenAiEnv>,
    /// Supabase settings, if configured.
    supabase:        Option<SupabaseEnv>,
    /// User agent sent with every outbound HTTP request.
    user_agent:      String,
    /// Deadline for VCS and website requests.
    http_timeout:    Duration,
    /// Deadline for one reasoning-backend call.
    backend_timeout: Duration,
    /// Tier selection thresholds.
    tier_policy:     TierPolicy,
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            github:          GithubEnv::default(),
            openai:          None,
            supabase:        None,
            user_agent:      default_user_agent(),
            http_timeout:    Duration::from_secs(10),
            backend_timeout: Duration::from_secs(60),
            tier_policy:     TierPolicy::default(),
        }
    }
}

impl AssessorConfig {
    /// Reads the configuration from environment variables, applying defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let tier_policy = TierPolicy {
            fast_max_chars:    read_usize("ASSESSOR_FAST_MAX_CHARS", FAST_TIER_MAX_CHARS),
            capable_min_chars: read_usize("ASSESSOR_CAPABLE_MIN_CHARS", CAPABLE_TIER_MIN_CHARS),
        };

        Self {
            github: GithubEnv::from_env(),
            openai: OpenAiEnv::from_env(),
            supabase: SupabaseEnv::from_env(),
            user_agent: non_blank_var("ASSESSOR_USER_AGENT").unwrap_or_else(default_user_agent),
            http_timeout: read_timeout_secs("ASSESSOR_HTTP_TIMEOUT_SECS", 10),
            backend_timeout: read_timeout_secs("ASSESSOR_BACKEND_TIMEOUT_SECS", 60),
            tier_policy,
        }
    }

    /// Replaces the hosting API settings.
    pub fn with_github(mut self, github: GithubEnv) -> Self {
        self.github = github;
        self
    }

    /// Replaces the reasoning backend settings.
    pub fn with_openai(mut self, openai: OpenAiEnv) -> Self {
        self.openai = Some(openai);
        self
    }

    /// Replaces the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Replaces the reasoning backend timeout.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Returns the hosting API settings.
    pub fn github(&self) -> &GithubEnv {
        &self.github
    }

    /// Returns the reasoning backend settings, if configured.
    pub fn openai(&self) -> Option<&OpenAiEnv> {
        self.openai.as_ref()
    }

    /// Returns the Supabase settings, if configured.
    pub fn supabase(&self) -> Option<&SupabaseEnv> {
        self.supabase.as_ref()
    }

    /// Returns the outbound user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the HTTP deadline.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Returns the reasoning backend deadline.
    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }

    /// Returns the tier selection thresholds.
    pub fn tier_policy(&self) -> TierPolicy {
        self.tier_policy
    }

    /// Builds an HTTP client carrying the identifying user agent and deadline.
    /// Cookies are never stored and redirects are followed.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            // Avoid macOS dynamic store lookups that fail in sandboxed environments.
            .no_proxy()
            .user_agent(self.user_agent.clone())
            .timeout(self.http_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to construct HTTP client")
    }
}

/// User agent used when `ASSESSOR_USER_AGENT` is unset.
fn default_user_agent() -> String {
    format!("assessor/{}", env!("CARGO_PKG_VERSION"))
}

/// Reads an environment variable, treating blank values as unset.
fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// Parses an environment variable into a `usize`, falling back to `default`.
fn read_usize(env: &str, default: usize) -> usize {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
