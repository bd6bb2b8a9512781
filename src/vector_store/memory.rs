//! Exact in-memory context store used as a test double.

use super::{ContextMatch, ContextStore, SearchParams};
use crate::corpus::ContextWindow;
use crate::error::{EtoError, Result};
use async_trait::async_trait;

/// Context windows and vectors held in memory, searched exhaustively.
pub struct MemoryContextStore {
    rows: Vec<(ContextWindow, Vec<f32>)>,
}

impl MemoryContextStore {
    pub fn new(windows: Vec<ContextWindow>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if windows.len() != vectors.len() {
            return Err(EtoError::Dataset(format!(
                "{} context windows but {} embeddings",
                windows.len(),
                vectors.len()
            )));
        }
        Ok(Self {
            rows: windows.into_iter().zip(vectors).collect(),
        })
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn nearest(&self, query: &[f32], params: &SearchParams) -> Result<Vec<ContextMatch>> {
        let mut matches: Vec<ContextMatch> = self
            .rows
            .iter()
            .map(|(window, vector)| ContextMatch {
                context: window.clone(),
                distance: l2_squared(query, vector),
            })
            .collect();
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(params.k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }
}

/// Squared Euclidean distance, as reported in `_distance`.
fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(text: &str) -> ContextWindow {
        ContextWindow {
            title: "talk".to_string(),
            published: None,
            url: None,
            video_id: None,
            channel_id: None,
            id: None,
            text: text.to_string(),
            start: 0.0,
            end: 1.0,
        }
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance() {
        let store = MemoryContextStore::new(
            vec![window("far"), window("near"), window("middle")],
            vec![vec![10.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]],
        )
        .unwrap();

        let params = SearchParams {
            k: 2,
            nprobes: 1,
            refine_factor: None,
        };
        let matches = store.nearest(&[0.0, 0.0], &params).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].context.text, "near");
        assert_eq!(matches[0].distance, 1.0);
        assert_eq!(matches[1].context.text, "middle");
    }

    #[test]
    fn test_l2_squared() {
        assert_eq!(l2_squared(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(l2_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn test_rejects_misaligned_rows() {
        assert!(MemoryContextStore::new(vec![window("a")], vec![]).is_err());
    }
}
