//! Configuration module for Eto.
//!
//! Handles loading application settings, prompt templates and API credentials.

mod credentials;
mod prompts;
mod settings;

pub use credentials::Credentials;
pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    CompletionSettings, CorpusSettings, CorpusSourceKind, CredentialSettings, EmbeddingSettings,
    GeneralSettings, IndexSettings, PromptSettings, QuerySettings, RetrySettings, ServerSettings,
    Settings,
};
