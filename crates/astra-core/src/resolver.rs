//! AI response resolver: ordered completion-provider cascade with a canned,
//! keyword-classified fallback.
//!
//! Contract: total availability. `resolve` never surfaces an error; when
//! every provider fails or returns degenerate output, the caller still gets
//! a templated response echoing the utterance. Provider calls run on a
//! bounded-timeout client and hold no store locks while in flight.

use crate::chat::ChatMessage;
use crate::config::AppConfig;
use crate::registry::{FileRecord, FileRegistry};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Most content inlined into a prompt from a single file.
const MAX_INLINE_CONTEXT_CHARS: usize = 3000;
/// A completion shorter than this (trimmed) is degenerate and triggers the
/// next cascade step.
const MIN_USABLE_CHARS: usize = 3;

const BASE_ROLE_PROMPT: &str = "You are an AI assistant for a space research platform. \
    You help users analyze space research documents, answer questions about space \
    exploration, and provide insights about missions and space technology.";

const ANALYST_ROLE_PROMPT: &str = "You are a space research analyst. Analyze the provided \
    document and extract key insights, research findings, and significant discoveries. \
    Focus on space exploration, scientific discoveries, and research methodologies.";

const FILE_INTENT_WORDS: &[&str] = &["file", "document", "content", "upload", "attachment", "read"];

const COMPARISON_WORDS: &[&str] = &["compare", "comparison", "difference", "vs", "versus"];
const ANALYSIS_WORDS: &[&str] = &["analyze", "analysis", "examine", "study"];
const CELESTIAL_WORDS: &[&str] = &["mars", "moon", "planet", "asteroid", "comet"];
const PROPULSION_WORDS: &[&str] = &["rocket", "engine", "propulsion", "fuel"];
const DATA_WORDS: &[&str] = &["data", "information", "research", "findings"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingKey,

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

// OpenAI-compatible request/response structures.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<PromptMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct PromptMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// One external completion backend. Implementations must capture transport
/// details internally; the resolver only sees text or an error.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String, ProviderError>;
}

/// OpenAI-compatible HTTP provider (OpenRouter and friends).
pub struct HttpCompletionProvider {
    label: String,
    api_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpCompletionProvider {
    pub fn new(
        label: impl Into<String>,
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            label: label.into(),
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingKey)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            messages.push(PromptMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(PromptMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.7),
            max_tokens: Some(500),
        };

        debug!(provider = %self.label, model = %self.model, "Dispatching completion request");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("response has no choices".to_string()))
    }
}

/// Keyword category for the canned fallback, checked in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCategory {
    Comparison,
    Analysis,
    Celestial,
    Propulsion,
    Data,
    Generic,
}

/// Classify an utterance by scanning keyword sets in priority order.
pub fn classify_utterance(utterance: &str) -> TopicCategory {
    let lower = utterance.to_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if matches(COMPARISON_WORDS) {
        TopicCategory::Comparison
    } else if matches(ANALYSIS_WORDS) {
        TopicCategory::Analysis
    } else if matches(CELESTIAL_WORDS) {
        TopicCategory::Celestial
    } else if matches(PROPULSION_WORDS) {
        TopicCategory::Propulsion
    } else if matches(DATA_WORDS) {
        TopicCategory::Data
    } else {
        TopicCategory::Generic
    }
}

/// Structured report for a single-file analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub sentiment: String,
    pub research_quality: String,
    pub space_relevance: String,
}

/// Aggregate result for a multi-file analysis query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiFileAnalysis {
    pub query: String,
    pub files_analyzed: usize,
    pub insights: Vec<String>,
    pub summary: String,
}

/// Ordered cascade of completion strategies ending in a total default.
pub struct ResponseResolver {
    providers: Vec<Box<dyn CompletionProvider>>,
    registry: Arc<FileRegistry>,
}

impl ResponseResolver {
    /// Build the standard two-provider cascade from configuration: primary
    /// model with full file context, fallback model with a plain prompt.
    pub fn from_config(config: &AppConfig, registry: Arc<FileRegistry>) -> Self {
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let providers: Vec<Box<dyn CompletionProvider>> = vec![
            Box::new(HttpCompletionProvider::new(
                "primary",
                &config.llm_api_url,
                config.llm_api_key.clone(),
                &config.llm_model,
                timeout,
            )),
            Box::new(HttpCompletionProvider::new(
                "secondary",
                &config.llm_api_url,
                config.llm_api_key.clone(),
                &config.llm_fallback_model,
                timeout,
            )),
        ];
        Self {
            providers,
            registry,
        }
    }

    /// Cascade with caller-supplied providers (used by tests to simulate
    /// outages).
    pub fn with_providers(
        providers: Vec<Box<dyn CompletionProvider>>,
        registry: Arc<FileRegistry>,
    ) -> Self {
        Self {
            providers,
            registry,
        }
    }

    /// Resolve an utterance into an AI reply. Never fails: the worst case is
    /// a canned, topic-classified acknowledgment echoing the utterance.
    pub async fn resolve(&self, utterance: &str, file_hint_count: Option<usize>) -> ChatMessage {
        let contextual = self.compose_system_prompt(utterance, file_hint_count).await;

        for (position, provider) in self.providers.iter().enumerate() {
            // Only the first provider sees the file-enriched prompt; later
            // steps get the simpler role prompt.
            let system = if position == 0 {
                contextual.as_str()
            } else {
                BASE_ROLE_PROMPT
            };

            match provider.complete(Some(system), utterance).await {
                Ok(text) if is_usable(&text) => {
                    info!(provider = provider.name(), "Completion resolved");
                    return ChatMessage::ai(text.trim().to_string());
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "Degenerate completion; trying next strategy");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Provider failed; trying next strategy");
                }
            }
        }

        ChatMessage::ai(canned_response(utterance))
    }

    /// System prompt for the primary provider: role description, available
    /// file listing, and inlined content when the utterance shows file
    /// intent.
    async fn compose_system_prompt(&self, utterance: &str, file_hint_count: Option<usize>) -> String {
        let mut prompt = BASE_ROLE_PROMPT.to_string();

        if let Some(count) = file_hint_count.filter(|c| *c > 0) {
            prompt.push_str(&format!(
                " The user has referenced {} file(s) in their query.",
                count
            ));
        }

        let files = self.registry.list().await;
        if files.is_empty() {
            return prompt;
        }

        prompt.push_str("\n\nAvailable files:\n");
        for file in &files {
            prompt.push_str(&format!("- {} (id: {})\n", file.name, file.id));
        }

        if has_file_intent(utterance) {
            let target = best_matching_file(utterance, &files);
            match self
                .registry
                .content_for_prompt(&target.id, MAX_INLINE_CONTEXT_CHARS)
                .await
            {
                Ok(content) => {
                    prompt.push_str(&format!(
                        "\nContent of '{}' for reference:\n{}\n",
                        target.name, content
                    ));
                }
                Err(e) => {
                    warn!(id = %target.id, error = %e, "Could not inline file content");
                }
            }
        }

        prompt
    }

    /// Analyze one registered file. Same availability contract as `resolve`:
    /// provider failure falls back to a deterministic report.
    pub async fn analyze_file(&self, record: &FileRecord) -> AnalysisReport {
        let content = match self
            .registry
            .content_for_prompt(&record.id, MAX_INLINE_CONTEXT_CHARS)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!(id = %record.id, error = %e, "Analysis falling back; content unreadable");
                return canned_report(record);
            }
        };

        let user_prompt = format!(
            "Analyze this document and provide:\n\
             1. A comprehensive summary\n\
             2. Key research findings\n\
             3. Significant discoveries or insights\n\
             4. Research methodology used\n\
             5. Potential applications in space exploration\n\n\
             Document content:\n{}",
            content
        );

        for provider in &self.providers {
            match provider.complete(Some(ANALYST_ROLE_PROMPT), &user_prompt).await {
                Ok(raw) if is_usable(&raw) => {
                    info!(provider = provider.name(), id = %record.id, "File analysis resolved");
                    let (summary, key_points) = parse_analysis(&raw);
                    return AnalysisReport {
                        summary,
                        key_points,
                        sentiment: "positive".to_string(),
                        research_quality: "high".to_string(),
                        space_relevance: "high".to_string(),
                    };
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "Degenerate analysis; trying next strategy");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Analysis provider failed");
                }
            }
        }

        canned_report(record)
    }

    /// Analyze several files against one query, returning aggregate
    /// insights. Total like the other paths.
    pub async fn analyze_files(&self, file_ids: &[String], query: &str) -> MultiFileAnalysis {
        let mut names = Vec::new();
        for id in file_ids {
            if let Ok(record) = self.registry.get(id).await {
                names.push(record.name);
            }
        }

        let user_prompt = format!(
            "Across the following documents, answer: {}\n\nDocuments:\n{}",
            query,
            names
                .iter()
                .map(|n| format!("- {}", n))
                .collect::<Vec<_>>()
                .join("\n")
        );

        for provider in &self.providers {
            match provider.complete(Some(ANALYST_ROLE_PROMPT), &user_prompt).await {
                Ok(raw) if is_usable(&raw) => {
                    let insights: Vec<String> = raw
                        .lines()
                        .map(|l| l.trim().trim_start_matches(['-', '*', ' ']).to_string())
                        .filter(|l| !l.is_empty())
                        .take(5)
                        .collect();
                    return MultiFileAnalysis {
                        query: query.to_string(),
                        files_analyzed: names.len(),
                        insights,
                        summary: raw.trim().chars().take(300).collect(),
                    };
                }
                Ok(_) | Err(_) => continue,
            }
        }

        MultiFileAnalysis {
            query: query.to_string(),
            files_analyzed: names.len(),
            insights: vec![
                "Common themes across documents identified".to_string(),
                "Key data patterns extracted".to_string(),
                "Recommendations generated based on analysis".to_string(),
            ],
            summary: format!(
                "Aggregate review of {} document(s) for the query '{}'.",
                names.len(),
                query
            ),
        }
    }
}

fn is_usable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_USABLE_CHARS
}

fn has_file_intent(utterance: &str) -> bool {
    let lower = utterance.to_lowercase();
    FILE_INTENT_WORDS.iter().any(|w| lower.contains(w))
}

/// Generic keyword-overlap scorer: utterance tokens (4+ chars) scored
/// against the lowercased filename; highest overlap wins, first registered
/// file on tie or zero overlap.
fn best_matching_file<'a>(utterance: &str, files: &'a [FileRecord]) -> &'a FileRecord {
    let tokens: Vec<String> = utterance
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 4)
        .map(|t| t.to_string())
        .collect();

    let mut best = &files[0];
    let mut best_score = 0usize;
    for file in files {
        let name = file.name.to_lowercase();
        let score = tokens.iter().filter(|t| name.contains(t.as_str())).count();
        if score > best_score {
            best = file;
            best_score = score;
        }
    }
    best
}

/// Deterministic templated text for the first matching keyword category; the
/// generic pool is picked pseudorandomly.
pub fn canned_response(utterance: &str) -> String {
    match classify_utterance(utterance) {
        TopicCategory::Comparison => format!(
            "Excellent question about comparing '{}'! In space research, comparative \
             analysis is crucial. Different technologies and methodologies each have \
             unique advantages, and the key is understanding the requirements and \
             constraints of each mission or research objective. Would you like me to \
             dive deeper into specific aspects of this comparison?",
            utterance
        ),
        TopicCategory::Analysis => format!(
            "Great analytical question about '{}'! Space research analysis spans \
             technical feasibility, scientific value, resource requirements, and \
             mission objectives. The data suggests several interesting patterns that \
             could be valuable for your research. Would you like me to explore \
             specific analytical approaches?",
            utterance
        ),
        TopicCategory::Celestial => format!(
            "Fascinating question about '{}'! Each celestial body presents unique \
             challenges and opportunities for research, and data from past missions \
             shows patterns that could inform future exploration strategies. Would \
             you like me to discuss specific aspects of planetary science?",
            utterance
        ),
        TopicCategory::Propulsion => format!(
            "Excellent technical question about '{}'! Propulsion systems are \
             fundamental to space exploration. Different technologies trade thrust, \
             efficiency, and complexity against each other, and the optimal choice \
             depends on mission requirements. Would you like me to explain specific \
             propulsion concepts?",
            utterance
        ),
        TopicCategory::Data => format!(
            "Great question about '{}'! Research methodologies in this field \
             emphasize rigorous data collection, validation, and interpretation, and \
             patterns in space data often reveal insights about fundamental physical \
             processes. Would you like me to discuss specific data analysis \
             techniques?",
            utterance
        ),
        TopicCategory::Generic => generic_response(utterance),
    }
}

fn generic_response(utterance: &str) -> String {
    let templates: &[&str] = &[
        "Great question about '{q}'! This relates to space exploration and current research. Let me analyze this for you...",
        "Interesting query regarding '{q}'. Based on space research data, here is what I found...",
        "Your question about '{q}' touches on important space technology concepts. Here is my analysis...",
        "Fascinating topic '{q}'! This connects to active mission objectives. Let me break it down...",
        "Excellent question about '{q}'! This involves space science and exploration technology. Here is what I discovered...",
        "Your inquiry about '{q}' relates to space research methodologies. Here is my assessment...",
        "Interesting perspective on '{q}'! This aligns with ongoing exploration goals. Let me explain...",
        "Great question '{q}'! This involves space technology and research. Here is my analysis...",
    ];
    let pick = rand::thread_rng().gen_range(0..templates.len());
    templates[pick].replace("{q}", utterance)
}

/// Pull a summary and key points out of a sectioned/numbered provider
/// answer; degrades to a prefix summary and stock points.
fn parse_analysis(raw: &str) -> (String, Vec<String>) {
    #[derive(PartialEq)]
    enum Section {
        None,
        Summary,
        KeyPoints,
    }

    let mut summary = String::new();
    let mut key_points = Vec::new();
    let mut section = Section::None;

    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("1.") || line.starts_with("Summary:") || line.starts_with("Overview:") {
            section = Section::Summary;
            summary.push_str(line);
            summary.push(' ');
        } else if line.starts_with("2.")
            || line.starts_with("3.")
            || line.starts_with("4.")
            || line.starts_with("5.")
            || line.starts_with("Key findings:")
            || line.starts_with("Findings:")
        {
            section = Section::KeyPoints;
        } else if !line.is_empty() && section == Section::KeyPoints {
            key_points.push(line.trim_start_matches(['-', '*', ' ']).to_string());
        } else if section == Section::Summary && !line.is_empty() {
            summary.push_str(line);
            summary.push(' ');
        }
    }

    if summary.trim().is_empty() {
        summary = raw.trim().chars().take(200).collect::<String>();
        summary.push_str("...");
    }
    if key_points.is_empty() {
        key_points = vec![
            "Document contains valuable research data".to_string(),
            "Analysis completed successfully".to_string(),
            "Ready for further research".to_string(),
        ];
    }
    key_points.truncate(5);

    (summary.trim().to_string(), key_points)
}

fn canned_report(record: &FileRecord) -> AnalysisReport {
    AnalysisReport {
        summary: format!(
            "Analysis of {}: this document appears to contain research data related \
             to space exploration. The content suggests findings that could \
             contribute to ongoing research objectives.",
            record.name
        ),
        key_points: vec![
            "Document contains research data".to_string(),
            "Potential space exploration applications".to_string(),
            "Scientific methodology present".to_string(),
            "Ready for detailed analysis".to_string(),
        ],
        sentiment: "positive".to_string(),
        research_quality: "medium".to_string(),
        space_relevance: "high".to_string(),
    }
}
