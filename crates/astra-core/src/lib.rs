//! astra-core: platform core library (configuration, token service, identity
//! store, file registry, chat memory, AI response resolver).
//!
//! The gateway constructs one of each store at process start and passes them
//! to request handlers through application state; nothing in this crate keeps
//! ambient module-level state.

mod auth;
mod chat;
mod config;
mod registry;
mod resolver;
mod users;

pub use auth::{
    hash_password, issue_token, refresh_token, validate_token, verify_password, AuthError, Claims,
};
pub use chat::{ChatMessage, ChatSessionStore, Sender};
pub use config::AppConfig;
pub use registry::{FileRecord, FileRegistry, RegistryError};
pub use resolver::{
    canned_response, classify_utterance, AnalysisReport, CompletionProvider,
    HttpCompletionProvider, MultiFileAnalysis, ProviderError, ResponseResolver, TopicCategory,
};
pub use users::{UserError, UserRecord, UserStore};
