//! Configuration settings for Eto.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub credentials: CredentialSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub query: QuerySettings,
    pub completion: CompletionSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Name of the dataset directory inside `data_dir`.
    pub dataset_name: String,
    /// Show progress bars during corpus download and embedding.
    pub progress: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            dataset_name: "chatbot.dataset".to_string(),
            progress: true,
        }
    }
}

/// Locations of the OpenAI credential files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// File holding the API key (required).
    pub api_key_path: String,
    /// File holding the organization ID (optional).
    pub org_id_path: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            api_key_path: ".openai_api_key".to_string(),
            org_id_path: ".openai_org_id".to_string(),
        }
    }
}

/// Where the transcript corpus comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorpusSourceKind {
    /// Hugging Face datasets-server `rows` API.
    #[default]
    Huggingface,
    /// Local JSON Lines file, one transcript row per line.
    Jsonl,
}

impl std::str::FromStr for CorpusSourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(CorpusSourceKind::Huggingface),
            "jsonl" => Ok(CorpusSourceKind::Jsonl),
            _ => Err(format!("Unknown corpus source: {}", s)),
        }
    }
}

impl std::fmt::Display for CorpusSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusSourceKind::Huggingface => write!(f, "huggingface"),
            CorpusSourceKind::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Transcript corpus and windowing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub source: CorpusSourceKind,
    /// Hugging Face dataset name.
    pub dataset: String,
    /// Hugging Face dataset config.
    pub config: String,
    /// Dataset split.
    pub split: String,
    /// Rows fetched per datasets-server request (the server caps this at 100).
    pub page_size: usize,
    /// Path to the JSON Lines file (for the jsonl source).
    pub path: Option<String>,
    /// Number of consecutive utterances per context window.
    pub window: usize,
    /// Step between consecutive window starts.
    pub stride: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            source: CorpusSourceKind::Huggingface,
            dataset: "jamescalam/youtube-transcriptions".to_string(),
            config: "default".to_string(),
            split: "train".to_string(),
            page_size: 100,
            path: None,
            window: 20,
            stride: 4,
        }
    }
}

/// Backoff policy for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failure.
    pub backoff: f64,
    pub max_delay_ms: u64,
    /// Upper bound of the random extra delay added to each sleep.
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            backoff: 3.0,
            max_delay_ms: 30_000,
            jitter_ms: 1000,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Requested output dimensions. Models that do not support shortening
    /// (e.g. ada-002) must leave this unset.
    pub dimensions: Option<u32>,
    /// Texts per embedding request during index build.
    pub batch_size: usize,
    /// Rate limit for batch requests during index build.
    pub max_calls_per_second: f64,
    /// HTTP timeout for API requests, in seconds.
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimensions: None,
            batch_size: 1000,
            // API limit at 60/min, stay a little below it
            max_calls_per_second: 0.9,
            timeout_secs: 300,
            retry: RetrySettings::default(),
        }
    }
}

/// IVF_PQ index construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Number of IVF partitions.
    pub num_partitions: u32,
    /// Number of PQ sub-vectors; must divide the vector dimension.
    pub num_sub_vectors: u32,
    /// k-means iterations for IVF and PQ training.
    pub max_iterations: u32,
    /// Training sample size per centroid.
    pub sample_rate: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            num_partitions: 64,
            num_sub_vectors: 96,
            max_iterations: 50,
            sample_rate: 256,
        }
    }
}

/// Retrieval and prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Number of nearest rows to retrieve.
    pub k: usize,
    /// IVF partitions probed per query.
    pub nprobes: usize,
    /// Candidates re-ranked with exact distance, as a multiple of `k`.
    pub refine_factor: Option<u32>,
    /// Maximum length in characters of the joined context in the prompt.
    pub context_limit: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            k: 3,
            nprobes: 20,
            refine_factor: Some(100),
            context_limit: 3750,
        }
    }
}

/// Text completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u16,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 400,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eto")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory holding the persisted dataset and its index.
    pub fn dataset_dir(&self) -> PathBuf {
        self.data_dir().join(&self.general.dataset_name)
    }

    pub fn api_key_path(&self) -> PathBuf {
        Self::expand_path(&self.credentials.api_key_path)
    }

    pub fn org_id_path(&self) -> PathBuf {
        Self::expand_path(&self.credentials.org_id_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.corpus.window, 20);
        assert_eq!(settings.corpus.stride, 4);
        assert_eq!(settings.embedding.batch_size, 1000);
        assert_eq!(settings.index.num_partitions, 64);
        assert_eq!(settings.index.num_sub_vectors, 96);
        assert_eq!(settings.index.max_iterations, 50);
        assert_eq!(settings.query.k, 3);
        assert_eq!(settings.query.nprobes, 20);
        assert_eq!(settings.query.refine_factor, Some(100));
        assert_eq!(settings.query.context_limit, 3750);
        assert_eq!(settings.completion.max_tokens, 400);
        assert_eq!(settings.server.port, 5000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [general]
            data_dir = "/srv/eto"

            [corpus]
            source = "jsonl"
            path = "rows.jsonl"

            [embedding.retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.dataset_dir(), PathBuf::from("/srv/eto/chatbot.dataset"));
        assert_eq!(settings.corpus.source, CorpusSourceKind::Jsonl);
        assert_eq!(settings.corpus.window, 20);
        assert_eq!(settings.embedding.retry.max_attempts, 3);
        assert_eq!(settings.embedding.retry.backoff, 3.0);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.general.dataset_name, "chatbot.dataset");
    }
}
