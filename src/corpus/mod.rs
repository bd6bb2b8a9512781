//! Transcript corpus: source rows, context windows and where rows come from.

mod huggingface;
mod jsonl;
mod window;

pub use huggingface::HuggingFaceSource;
pub use jsonl::JsonlSource;
pub use window::contextualize;

use crate::config::{CorpusSettings, CorpusSourceKind, RetrySettings, Settings};
use crate::embedding::RetryPolicy;
use crate::error::{EtoError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One utterance of a video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRow {
    /// Video title; utterances are grouped into videos by this field.
    pub title: String,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Utterance ID in the source dataset.
    #[serde(default)]
    pub id: Option<String>,
    /// Utterance text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl TranscriptRow {
    pub fn new(title: &str, start: f64, end: f64, text: &str) -> Self {
        Self {
            title: title.to_string(),
            published: None,
            url: None,
            video_id: None,
            channel_id: None,
            id: None,
            text: text.to_string(),
            start,
            end,
        }
    }
}

/// A run of consecutive utterances from one video, retrieved as a unit.
///
/// Descriptive columns and `start` come from the first utterance; `end` is
/// the end time of the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub title: String,
    pub published: Option<String>,
    pub url: Option<String>,
    pub video_id: Option<String>,
    pub channel_id: Option<String>,
    pub id: Option<String>,
    /// Space-joined utterance texts.
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Trait for transcript corpus sources.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Load every transcript row of the corpus.
    async fn load(&self) -> Result<Vec<TranscriptRow>>;

    /// Human readable description for logs.
    fn describe(&self) -> String;
}

/// Create the corpus source selected in the settings.
pub fn create_source(settings: &Settings) -> Result<Arc<dyn CorpusSource>> {
    source_from(&settings.corpus, &settings.embedding.retry, settings.general.progress)
}

fn source_from(
    corpus: &CorpusSettings,
    retry: &RetrySettings,
    progress: bool,
) -> Result<Arc<dyn CorpusSource>> {
    match corpus.source {
        CorpusSourceKind::Huggingface => Ok(Arc::new(
            HuggingFaceSource::new(&corpus.dataset, &corpus.config, &corpus.split)?
                .with_page_size(corpus.page_size)
                .with_retry(RetryPolicy::from_settings(retry))
                .with_progress(progress),
        )),
        CorpusSourceKind::Jsonl => {
            let path = corpus.path.as_deref().ok_or_else(|| {
                EtoError::Config("corpus.path is required for the jsonl source".to_string())
            })?;
            Ok(Arc::new(JsonlSource::new(Settings::expand_path(path))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_deserializes_with_missing_optional_columns() {
        let row: TranscriptRow = serde_json::from_str(
            r#"{"title": "Intro to RL", "text": " hello", "start": 1.5, "end": 3.0}"#,
        )
        .unwrap();
        assert_eq!(row, TranscriptRow::new("Intro to RL", 1.5, 3.0, " hello"));
    }

    #[test]
    fn test_jsonl_source_requires_path() {
        let mut settings = Settings::default();
        settings.corpus.source = CorpusSourceKind::Jsonl;
        assert!(matches!(create_source(&settings), Err(EtoError::Config(_))));

        settings.corpus.path = Some("rows.jsonl".to_string());
        let source = create_source(&settings).unwrap();
        assert!(source.describe().contains("rows.jsonl"));
    }
}
