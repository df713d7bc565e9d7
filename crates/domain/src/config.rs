use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub leads: LeadsConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Allowed CORS origins. A single `"*"` allows all origins.
    #[serde(default = "d_origins")]
    pub allowed_origins: Vec<String>,
    /// Upper bound on in-flight requests (backpressure protection).
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3210,
            host: "0.0.0.0".into(),
            allowed_origins: d_origins(),
            max_concurrent_requests: 256,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the OpenAI-compatible chat completions endpoint.
///
/// The key itself is read from the environment variable named by
/// `api_key_env` so it never lands in config.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_llm_url")]
    pub base_url: String,
    #[serde(default = "d_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "d_120")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_llm_url(),
            api_key_env: d_llm_key_env(),
            model: d_llm_model(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lead record store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where completed leads are written (a hosted Postgres REST endpoint).
///
/// Losing a completed lead is the costliest failure mode, so the write
/// gets a small bounded retry; everything else in the turn is
/// fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsConfig {
    /// REST base URL, e.g. `https://xyz.supabase.co/rest/v1`. Empty
    /// disables persistence (useful in local dev).
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "d_leads_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_leads_table")]
    pub table: String,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    #[serde(default = "d_500")]
    pub retry_backoff_ms: u64,
    #[serde(default = "d_10")]
    pub timeout_secs: u64,
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: d_leads_key_env(),
            table: d_leads_table(),
            max_retries: 3,
            retry_backoff_ms: 500,
            timeout_secs: 10,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intake engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Substring in an assistant message that marks the terminal phase and
    /// triggers the one-time lead write. Overridable for staging setups
    /// that use a different booking domain.
    #[serde(default = "d_marker")]
    pub scheduling_marker: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            scheduling_marker: d_marker(),
        }
    }
}

// ── Default value fns ─────────────────────────────────────────────────

fn d_port() -> u16 {
    3210
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_origins() -> Vec<String> {
    vec!["http://localhost:*".into()]
}
fn d_256() -> usize {
    256
}
fn d_llm_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_llm_model() -> String {
    "gpt-4o".into()
}
fn d_120() -> u64 {
    120
}
fn d_leads_key_env() -> String {
    "LEADS_API_KEY".into()
}
fn d_leads_table() -> String {
    "conversations".into()
}
fn d_3() -> u32 {
    3
}
fn d_500() -> u64 {
    500
}
fn d_10() -> u64 {
    10
}
fn d_marker() -> String {
    "calendly.com".into()
}
