//! Pipeline orchestrator for Eto.
//!
//! Decides between loading the persisted dataset and building it from the
//! transcript corpus, and wires the query answerer on top of it.

use crate::cli::Output;
use crate::config::{Credentials, Prompts, Settings};
use crate::corpus::{contextualize, create_source, CorpusSource};
use crate::embedding::{BatchEmbedder, Embedder, OpenAIEmbedder, RateLimiter, RetryPolicy};
use crate::error::{EtoError, Result};
use crate::openai::create_client;
use crate::rag::{Completer, OpenAICompleter, PromptBuilder, QueryAnswerer};
use crate::vector_store::{ContextStore, Dataset, IndexParams, SearchParams};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// The main orchestrator for the Eto pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    source: Arc<dyn CorpusSource>,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI and the configured corpus source.
    pub fn new(settings: Settings, credentials: &Credentials) -> Result<Self> {
        let client = create_client(
            credentials,
            Duration::from_secs(settings.embedding.timeout_secs),
        )?;

        let source = create_source(&settings)?;
        let embedder: Arc<dyn Embedder> = Arc::new(
            OpenAIEmbedder::new(client.clone(), &settings.embedding.model)
                .with_dimensions(settings.embedding.dimensions),
        );
        let completer: Arc<dyn Completer> =
            Arc::new(OpenAICompleter::new(client, settings.completion.clone()));

        Self::with_components(settings, source, embedder, completer)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        source: Arc<dyn CorpusSource>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self {
            settings,
            prompts,
            source,
            embedder,
            completer,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load the dataset if it exists, otherwise build it.
    #[instrument(skip(self))]
    pub async fn setup(&self) -> Result<Dataset> {
        let dir = self.settings.dataset_dir();
        if dir.exists() {
            info!("Loading existing dataset from {}", dir.display());
            return Dataset::open(&dir).await;
        }
        self.build(&dir).await
    }

    /// Build the dataset again and replace the existing one.
    ///
    /// The existing dataset is only removed once the new one is fully
    /// written, so a failed rebuild leaves it in place.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<Dataset> {
        self.build(&self.settings.dataset_dir()).await
    }

    /// Query answerer over `store` using this orchestrator's backends.
    pub fn answerer(&self, store: Arc<dyn ContextStore>) -> QueryAnswerer {
        QueryAnswerer::new(
            self.embedder.clone(),
            store,
            self.completer.clone(),
            SearchParams::from(&self.settings.query),
            PromptBuilder::new(self.prompts.clone(), self.settings.query.context_limit),
        )
        .with_retry(RetryPolicy::from_settings(&self.settings.embedding.retry))
    }

    async fn build(&self, dir: &Path) -> Result<Dataset> {
        info!("Building dataset from {}", self.source.describe());

        let rows = self.source.load().await?;
        if rows.is_empty() {
            return Err(EtoError::Corpus("corpus is empty".to_string()));
        }

        let corpus = &self.settings.corpus;
        let windows = contextualize(&rows, corpus.window, corpus.stride)?;
        if windows.is_empty() {
            return Err(EtoError::Corpus(format!(
                "no video has at least {} utterances",
                corpus.window
            )));
        }
        info!("{} transcript rows -> {} context windows", rows.len(), windows.len());

        let embedding = &self.settings.embedding;
        let batch_embedder = BatchEmbedder::new(
            self.embedder.clone(),
            RateLimiter::per_second(embedding.max_calls_per_second)?,
            RetryPolicy::from_settings(&embedding.retry),
            embedding.batch_size,
        );
        let progress = if self.settings.general.progress {
            Output::progress_bar(0, "embedding contexts")
        } else {
            ProgressBar::hidden()
        };
        let texts: Vec<String> = windows.iter().map(|w| w.text.clone()).collect();
        let vectors = batch_embedder.embed_all(&texts, &progress).await?;

        let partial = partial_dir(dir);
        if partial.exists() {
            warn!("Removing interrupted build at {}", partial.display());
            tokio::fs::remove_dir_all(&partial).await?;
        }

        let mut staged = Dataset::create(&partial, &windows, &vectors).await?;
        staged.create_index(&IndexParams::from(&self.settings.index)).await?;
        drop(staged);

        if dir.exists() {
            warn!("Replacing existing dataset at {}", dir.display());
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::rename(&partial, dir).await?;
        info!("Dataset written to {}", dir.display());
        Dataset::open(dir).await
    }
}

/// Sibling directory a dataset is staged in while it is being built.
fn partial_dir(dir: &Path) -> PathBuf {
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dir.with_file_name(name)
}
