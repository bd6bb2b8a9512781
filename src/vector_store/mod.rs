//! Context storage and nearest-neighbor retrieval.
//!
//! The persisted [`Dataset`] keeps context windows and their embeddings in
//! a LanceDB table with an IVF_PQ index on the vector column.

mod dataset;
#[cfg(test)]
mod memory;

pub use dataset::{Dataset, IndexParams};
#[cfg(test)]
pub(crate) use memory::MemoryContextStore;

use crate::config::QuerySettings;
use crate::corpus::ContextWindow;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved context window and its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMatch {
    #[serde(flatten)]
    pub context: ContextWindow,
    /// Squared L2 distance (lower is closer).
    #[serde(rename = "_distance")]
    pub distance: f32,
}

/// Parameters of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Number of rows to return.
    pub k: usize,
    /// IVF partitions to probe.
    pub nprobes: usize,
    /// Re-rank `k * refine_factor` index candidates by exact distance.
    pub refine_factor: Option<u32>,
}

impl From<&QuerySettings> for SearchParams {
    fn from(settings: &QuerySettings) -> Self {
        Self {
            k: settings.k,
            nprobes: settings.nprobes,
            refine_factor: settings.refine_factor,
        }
    }
}

/// Trait for stores that answer nearest-neighbor queries over context windows.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Rows closest to `query`, closest first.
    async fn nearest(&self, query: &[f32], params: &SearchParams) -> Result<Vec<ContextMatch>>;

    /// Number of stored context windows.
    async fn count(&self) -> Result<usize>;
}
