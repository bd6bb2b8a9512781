//! Question answering over the context store.

use super::{Completer, PromptBuilder};
use crate::embedding::{Embedder, RetryPolicy};
use crate::error::{EtoError, Result};
use crate::vector_store::{ContextMatch, ContextStore, SearchParams};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A completion and the context it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub completion: String,
    /// Retrieved rows, closest first.
    pub context: Vec<ContextMatch>,
}

impl Answer {
    /// The highest-ranked retrieved row.
    pub fn top_match(&self) -> Option<&ContextMatch> {
        self.context.first()
    }
}

/// Embeds a query, retrieves the nearest contexts and asks the completion
/// model to answer from them.
pub struct QueryAnswerer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ContextStore>,
    completer: Arc<dyn Completer>,
    retry: RetryPolicy,
    search: SearchParams,
    prompt: PromptBuilder,
}

impl QueryAnswerer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ContextStore>,
        completer: Arc<dyn Completer>,
        search: SearchParams,
        prompt: PromptBuilder,
    ) -> Self {
        Self {
            embedder,
            store,
            completer,
            retry: RetryPolicy::default(),
            search,
            prompt,
        }
    }

    /// Set the retry policy for the query embedding call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        info!("Answering query");

        let embedding = self
            .retry
            .run("Query embedding", || self.embedder.embed(query))
            .await?;

        let context = self.store.nearest(&embedding, &self.search).await?;
        if context.is_empty() {
            return Err(EtoError::Rag("No context retrieved for query".to_string()));
        }
        debug!("Retrieved {} contexts", context.len());

        let prompt = self
            .prompt
            .build(query, context.iter().map(|m| m.context.text.as_str()));
        let completion = self.completer.complete(&prompt).await?;

        Ok(Answer {
            completion,
            context,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::corpus::ContextWindow;
    use crate::vector_store::MemoryContextStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Maps a text to a point on a line by its first number, so
    /// "context 7" lands next to "7".
    pub(crate) struct LineEmbedder {
        pub calls: AtomicUsize,
    }

    impl LineEmbedder {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn position(text: &str) -> f32 {
        text.split_whitespace()
            .find_map(|w| w.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok())
            .unwrap_or(0.0)
    }

    #[async_trait]
    impl Embedder for LineEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![position(text), 0.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![position(t), 0.0, 0.0, 0.0]).collect())
        }
    }

    /// Echoes a fixed answer and remembers the last prompt.
    pub(crate) struct FixedCompleter {
        pub prompts: Mutex<Vec<String>>,
    }

    impl FixedCompleter {
        pub(crate) fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Completer for FixedCompleter {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("It depends.".to_string())
        }
    }

    pub(crate) fn window(i: usize) -> ContextWindow {
        ContextWindow {
            title: "talk".to_string(),
            published: None,
            url: Some(format!("https://youtu.be/abc?t={}", i)),
            video_id: Some("abc".to_string()),
            channel_id: None,
            id: None,
            text: format!("context {}", i),
            start: i as f64,
            end: i as f64 + 1.0,
        }
    }

    pub(crate) fn answerer(
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        rows: usize,
    ) -> QueryAnswerer {
        let windows: Vec<_> = (0..rows).map(window).collect();
        let vectors = (0..rows).map(|i| vec![i as f32, 0.0, 0.0, 0.0]).collect();
        let store = MemoryContextStore::new(windows, vectors).unwrap();

        QueryAnswerer::new(
            embedder,
            Arc::new(store),
            completer,
            SearchParams {
                k: 3,
                nprobes: 20,
                refine_factor: Some(100),
            },
            PromptBuilder::new(Prompts::default(), 3750),
        )
        .with_retry(RetryPolicy::immediate(3))
    }

    #[tokio::test]
    async fn test_answer_uses_query_and_nearest_contexts() {
        let embedder = Arc::new(LineEmbedder::new());
        let completer = Arc::new(FixedCompleter::new());
        let answerer = answerer(embedder.clone(), completer.clone(), 10);

        let answer = answerer.answer("what about 4?").await.unwrap();

        assert_eq!(answer.completion, "It depends.");
        assert_eq!(answer.context.len(), 3);
        assert_eq!(answer.top_match().unwrap().context.text, "context 4");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        let prompts = completer.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("context 4\n\n---\n\n"));
        assert!(prompts[0].ends_with("Question: what about 4?\nAnswer:"));
    }

    #[tokio::test]
    async fn test_empty_store_is_an_error() {
        let answerer = answerer(
            Arc::new(LineEmbedder::new()),
            Arc::new(FixedCompleter::new()),
            0,
        );

        let err = answerer.answer("anything").await.unwrap_err();
        assert!(matches!(err, EtoError::Rag(_)));
    }

    struct FlakyEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(EtoError::OpenAI("rate limited".to_string()));
            }
            Ok(vec![2.0, 0.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_query_embedding_is_retried() {
        let embedder = Arc::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
        });
        let answerer = answerer(embedder.clone(), Arc::new(FixedCompleter::new()), 5);

        let answer = answerer.answer("q").await.unwrap();
        assert_eq!(answer.top_match().unwrap().context.text, "context 2");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }
}
