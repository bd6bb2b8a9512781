//! Hugging Face datasets-server corpus source.
//!
//! Pages through the public `rows` endpoint, which serves at most 100 rows
//! per request.

use super::{CorpusSource, TranscriptRow};
use crate::cli::Output;
use crate::embedding::RetryPolicy;
use crate::error::{EtoError, Result};
use async_trait::async_trait;
use indicatif::ProgressBar;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://datasets-server.huggingface.co";
const MAX_PAGE_SIZE: usize = 100;

/// Loads transcript rows of a Hugging Face dataset split.
pub struct HuggingFaceSource {
    client: reqwest::Client,
    base_url: Url,
    dataset: String,
    config: String,
    split: String,
    page_size: usize,
    retry: RetryPolicy,
    progress: bool,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: TranscriptRow,
}

impl HuggingFaceSource {
    pub fn new(dataset: &str, config: &str, split: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| EtoError::Config(format!("Invalid base URL: {}", e)))?,
            dataset: dataset.to_string(),
            config: config.to_string(),
            split: split.to_string(),
            page_size: MAX_PAGE_SIZE,
            retry: RetryPolicy::default(),
            progress: false,
        })
    }

    /// Point at another datasets-server deployment.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| EtoError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;
        Ok(self)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn page_url(&self, offset: usize) -> Result<Url> {
        let mut url = self
            .base_url
            .join("rows")
            .map_err(|e| EtoError::Config(format!("Invalid base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("dataset", &self.dataset)
            .append_pair("config", &self.config)
            .append_pair("split", &self.split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &self.page_size.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, offset: usize) -> Result<RowsPage> {
        let url = self.page_url(offset)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(EtoError::Corpus(format!(
                "datasets-server rejected {} (offset {}): {} {}",
                self.dataset, offset, status, body
            )));
        }

        Ok(response.error_for_status()?.json::<RowsPage>().await?)
    }
}

#[async_trait]
impl CorpusSource for HuggingFaceSource {
    #[instrument(skip(self), fields(dataset = %self.dataset, split = %self.split))]
    async fn load(&self) -> Result<Vec<TranscriptRow>> {
        info!("Loading {} from Hugging Face", self.describe());

        let progress = if self.progress {
            Output::progress_bar(0, "downloading transcripts")
        } else {
            ProgressBar::hidden()
        };

        let mut rows = Vec::new();
        let mut total = None;
        let mut offset = 0;

        while total.map_or(true, |t| offset < t) {
            let page = self
                .retry
                .run("dataset page download", || self.fetch_page(offset))
                .await?;

            if total.is_none() {
                progress.set_length(page.num_rows_total as u64);
                total = Some(page.num_rows_total);
            }
            if page.rows.is_empty() {
                debug!("Empty page at offset {}, stopping", offset);
                break;
            }

            offset += page.rows.len();
            progress.set_position(offset as u64);
            rows.extend(page.rows.into_iter().map(|entry| entry.row));
        }
        progress.finish_and_clear();

        info!("Loaded {} transcript rows", rows.len());
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} ({}/{})", self.dataset, self.config, self.split)
    }
}
