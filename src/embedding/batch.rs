//! Rate-limited, retried batch embedding of a whole corpus.

use super::{Embedder, RateLimiter, RetryPolicy};
use crate::error::{EtoError, Result};
use indicatif::ProgressBar;
use std::slice::Chunks;
use std::sync::Arc;
use tracing::{info, instrument};

/// Split `items` into consecutive batches of `batch_size`; only the last
/// batch may be shorter.
pub fn to_batches<T>(items: &[T], batch_size: usize) -> Result<Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(EtoError::Config("batch size must be at least 1".to_string()));
    }
    Ok(items.chunks(batch_size))
}

/// Embeds many texts with one request per batch.
///
/// Every request waits on the rate limiter and is then retried as a unit
/// under the retry policy.
pub struct BatchEmbedder {
    embedder: Arc<dyn Embedder>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    batch_size: usize,
}

impl BatchEmbedder {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        limiter: RateLimiter,
        retry: RetryPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            limiter,
            retry,
            batch_size,
        }
    }

    /// Embed every text, returning vectors aligned 1:1 with `texts`.
    #[instrument(skip_all, fields(texts = texts.len(), batch_size = self.batch_size))]
    pub async fn embed_all(&self, texts: &[String], progress: &ProgressBar) -> Result<Vec<Vec<f32>>> {
        let batches = to_batches(texts, self.batch_size)?;
        progress.set_length(batches.len() as u64);

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in batches {
            self.limiter.acquire().await;
            let embedded = self
                .retry
                .run("embedding batch", || self.embedder.embed_batch(batch))
                .await?;

            if embedded.len() != batch.len() {
                return Err(EtoError::Embedding(format!(
                    "expected {} embeddings for batch, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }

            vectors.extend(embedded);
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds a numeric text as its value and fails the first call.
    struct FlakyEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(EtoError::OpenAI("429 Too Many Requests".to_string()));
            }
            Ok(texts.iter().map(|t| vec![t.parse::<f32>().unwrap_or(-1.0)]).collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0]; texts.len().saturating_sub(1)])
        }
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_batches_reconstruct_input() {
        let items = numbered(11);
        for batch_size in 1..=12 {
            let batches: Vec<&[String]> = to_batches(&items, batch_size).unwrap().collect();
            assert!(batches[..batches.len() - 1].iter().all(|b| b.len() == batch_size));
            assert!(batches.last().unwrap().len() <= batch_size);
            assert_eq!(batches.concat(), items);
        }
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(to_batches(&numbered(3), 0).is_err());
    }

    #[tokio::test]
    async fn test_embed_all_preserves_order_across_batches() {
        let embedder = Arc::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
        });
        let batcher = BatchEmbedder::new(
            embedder.clone(),
            RateLimiter::per_second(f64::INFINITY).unwrap(),
            RetryPolicy::immediate(3),
            4,
        );

        let texts = numbered(10);
        let vectors = batcher.embed_all(&texts, &ProgressBar::hidden()).await.unwrap();

        let flat: Vec<f32> = vectors.into_iter().flatten().collect();
        let expected: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(flat, expected);
        // 3 batches plus the one failed attempt
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_wait_for_the_rate_limiter() {
        let limiter = RateLimiter::per_second(0.9).unwrap();
        let interval = limiter.min_interval();
        let batcher = BatchEmbedder::new(
            Arc::new(FlakyEmbedder {
                calls: AtomicUsize::new(1),
            }),
            limiter,
            RetryPolicy::immediate(1),
            2,
        );

        let start = tokio::time::Instant::now();
        let vectors = batcher.embed_all(&numbered(6), &ProgressBar::hidden()).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(vectors.len(), 6);
        // 3 batches: the first goes out at once, the other two wait one interval each
        assert!(elapsed >= interval * 2, "finished after {:?}", elapsed);
        assert!(elapsed < interval * 3, "finished after {:?}", elapsed);
        assert!(elapsed.as_secs_f64() >= 2.0 / 0.9 - 1e-6);
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_an_error() {
        let batcher = BatchEmbedder::new(
            Arc::new(ShortEmbedder),
            RateLimiter::per_second(f64::INFINITY).unwrap(),
            RetryPolicy::immediate(1),
            5,
        );

        let result = batcher.embed_all(&numbered(5), &ProgressBar::hidden()).await;
        assert!(matches!(result, Err(EtoError::Embedding(_))));
    }
}
