//! Platform configuration loaded from the environment.
//!
//! Every knob is overridable via `ASTRA_*` variables so deployments change
//! behavior without code edits. The gateway loads `.env` before calling
//! [`AppConfig::from_env`].

use std::path::PathBuf;

const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";
const DEFAULT_LLM_FALLBACK_MODEL: &str = "mistralai/mistral-7b-instruct";
const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 8;
const DEFAULT_PORT: u16 = 8000;

/// Runtime configuration for the platform.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | ASTRA_JWT_SECRET | dev secret | HS256 signing secret for access tokens. |
/// | ASTRA_TOKEN_TTL_SECS | 86400 | Access-token lifetime in seconds. |
/// | ASTRA_LLM_API_URL | OpenRouter chat completions | OpenAI-compatible completions endpoint. |
/// | ASTRA_LLM_API_KEY | unset | Provider API key; when unset the resolver runs on canned fallbacks only. |
/// | ASTRA_LLM_MODEL | meta-llama/llama-3.3-70b-instruct | Primary completion model. |
/// | ASTRA_LLM_FALLBACK_MODEL | mistralai/mistral-7b-instruct | Secondary completion model. |
/// | ASTRA_LLM_TIMEOUT_SECS | 8 | Per-request provider timeout. |
/// | ASTRA_UPLOAD_DIR | ./uploads | Blob directory; the file index lives beside the blobs. |
/// | ASTRA_MAX_FILE_SIZE | 104857600 | Upload size limit in bytes. |
/// | ASTRA_PORT | 8000 | Gateway listen port. |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_fallback_model: String,
    pub llm_timeout_secs: u64,
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from environment. Unset or invalid => defaults (see field docs).
    pub fn from_env() -> Self {
        Self {
            jwt_secret: env_string("ASTRA_JWT_SECRET", "change-me-in-production"),
            token_ttl_secs: env_i64("ASTRA_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS),
            llm_api_url: env_string("ASTRA_LLM_API_URL", DEFAULT_LLM_API_URL),
            llm_api_key: env_opt_string("ASTRA_LLM_API_KEY"),
            llm_model: env_string("ASTRA_LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_fallback_model: env_string("ASTRA_LLM_FALLBACK_MODEL", DEFAULT_LLM_FALLBACK_MODEL),
            llm_timeout_secs: env_u64("ASTRA_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            upload_dir: PathBuf::from(env_string("ASTRA_UPLOAD_DIR", "./uploads")),
            max_file_size: env_usize("ASTRA_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            port: env_u16("ASTRA_PORT", DEFAULT_PORT),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_fallback_model: DEFAULT_LLM_FALLBACK_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            upload_dir: PathBuf::from("./uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            port: DEFAULT_PORT,
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_i64(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
