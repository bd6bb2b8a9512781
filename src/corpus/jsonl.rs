//! Local JSON Lines corpus source.

use super::{CorpusSource, TranscriptRow};
use crate::error::{EtoError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Reads transcript rows from a file with one JSON object per line.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CorpusSource for JsonlSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<TranscriptRow>> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        let rows = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<TranscriptRow>(line).map_err(|e| {
                    EtoError::Corpus(format!("{}:{}: {}", self.path.display(), i + 1, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Loaded {} transcript rows", rows.len());
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
