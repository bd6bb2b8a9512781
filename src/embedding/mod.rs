//! Embedding generation for the context dataset and for queries.

mod batch;
mod openai;
mod rate_limit;
mod retry;

pub use batch::{to_batches, BatchEmbedder};
pub use openai::OpenAIEmbedder;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in one request, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
