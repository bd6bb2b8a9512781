//! Persisted context dataset backed by LanceDB.
//!
//! A dataset is a directory holding a LanceDB database with one `contexts`
//! table (the window columns plus a fixed-size `vector` column) and a small
//! JSON manifest recording how it was built.

use super::{ContextMatch, ContextStore, SearchParams};
use crate::config::IndexSettings;
use crate::corpus::ContextWindow;
use crate::error::{EtoError, Result};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Float64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const TABLE_NAME: &str = "contexts";
const MANIFEST_FILE: &str = "manifest.json";
const VECTOR_COLUMN: &str = "vector";

/// PQ trains 256 codewords per sub-vector, so smaller tables are searched
/// exhaustively instead of indexed.
const MIN_ROWS_FOR_INDEX: usize = 256;

/// IVF_PQ index construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexParams {
    pub num_partitions: u32,
    pub num_sub_vectors: u32,
    pub max_iterations: u32,
    pub sample_rate: u32,
}

impl From<&IndexSettings> for IndexParams {
    fn from(settings: &IndexSettings) -> Self {
        Self {
            num_partitions: settings.num_partitions,
            num_sub_vectors: settings.num_sub_vectors,
            max_iterations: settings.max_iterations,
            sample_rate: settings.sample_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    dimension: usize,
    rows: usize,
    built_at: DateTime<Utc>,
    indexed: bool,
}

/// Context windows with their vectors, stored on disk.
pub struct Dataset {
    dir: PathBuf,
    table: Table,
    manifest: Manifest,
}

impl Dataset {
    /// Write `windows` and their `vectors` as a new dataset in `dir`.
    #[instrument(skip(windows, vectors), fields(rows = windows.len()))]
    pub async fn create(dir: &Path, windows: &[ContextWindow], vectors: &[Vec<f32>]) -> Result<Self> {
        if windows.len() != vectors.len() {
            return Err(EtoError::Dataset(format!(
                "{} context windows but {} embeddings",
                windows.len(),
                vectors.len()
            )));
        }
        let dimension = match vectors.first() {
            Some(v) if !v.is_empty() => v.len(),
            _ => return Err(EtoError::Dataset("no embeddings to store".to_string())),
        };
        if vectors.iter().any(|v| v.len() != dimension) {
            return Err(EtoError::Dataset("embeddings differ in dimension".to_string()));
        }
        if dir.join(MANIFEST_FILE).exists() {
            return Err(EtoError::Dataset(format!(
                "a dataset already exists at {}",
                dir.display()
            )));
        }
        tokio::fs::create_dir_all(dir).await?;

        let schema = context_schema(dimension);
        let batch = to_record_batch(schema.clone(), windows, vectors, dimension)?;

        let db = lancedb::connect(&dir.to_string_lossy()).execute().await?;
        let table = db
            .create_table(
                TABLE_NAME,
                Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema)),
            )
            .execute()
            .await?;

        let manifest = Manifest {
            dimension,
            rows: windows.len(),
            built_at: Utc::now(),
            indexed: false,
        };
        write_manifest(dir, &manifest).await?;

        info!("Wrote {} context rows to {}", windows.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            table,
            manifest,
        })
    }

    /// Open an existing dataset.
    #[instrument]
    pub async fn open(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(EtoError::Dataset(format!(
                "{} does not contain a dataset",
                dir.display()
            )));
        }
        let manifest: Manifest = serde_json::from_str(&tokio::fs::read_to_string(&manifest_path).await?)?;

        let db = lancedb::connect(&dir.to_string_lossy()).execute().await?;
        let table = db.open_table(TABLE_NAME).execute().await?;

        info!(
            "Opened dataset at {} ({} rows, {})",
            dir.display(),
            manifest.rows,
            if manifest.indexed { "indexed" } else { "no index" }
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            table,
            manifest,
        })
    }

    /// Build an IVF_PQ index over the vector column.
    ///
    /// Tables with fewer than 256 rows are left unindexed
    /// and answered by exhaustive search.
    #[instrument(skip(self))]
    pub async fn create_index(&mut self, params: &IndexParams) -> Result<()> {
        if params.num_partitions == 0 || params.num_sub_vectors == 0 {
            return Err(EtoError::Index(
                "num_partitions and num_sub_vectors must be positive".to_string(),
            ));
        }
        if self.manifest.dimension % params.num_sub_vectors as usize != 0 {
            return Err(EtoError::Index(format!(
                "vector dimension {} is not divisible by {} sub-vectors",
                self.manifest.dimension, params.num_sub_vectors
            )));
        }
        if self.manifest.rows < MIN_ROWS_FOR_INDEX {
            warn!(
                "Only {} rows, skipping index and searching exhaustively",
                self.manifest.rows
            );
            return Ok(());
        }

        let num_partitions = params.num_partitions.min(self.manifest.rows as u32);
        info!(
            "Building IVF_PQ index ({} partitions, {} sub-vectors)",
            num_partitions, params.num_sub_vectors
        );
        let index = IvfPqIndexBuilder::default()
            .distance_type(DistanceType::L2)
            .num_partitions(num_partitions)
            .num_sub_vectors(params.num_sub_vectors)
            .max_iterations(params.max_iterations)
            .sample_rate(params.sample_rate);
        self.table
            .create_index(&[VECTOR_COLUMN], Index::IvfPq(index))
            .execute()
            .await?;

        self.manifest.indexed = true;
        write_manifest(&self.dir, &self.manifest).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    pub fn has_index(&self) -> bool {
        self.manifest.indexed
    }

    /// When the dataset was written.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.manifest.built_at
    }
}

#[async_trait]
impl ContextStore for Dataset {
    #[instrument(skip(self, query))]
    async fn nearest(&self, query: &[f32], params: &SearchParams) -> Result<Vec<ContextMatch>> {
        if query.len() != self.manifest.dimension {
            return Err(EtoError::Dataset(format!(
                "query has dimension {}, dataset holds {}",
                query.len(),
                self.manifest.dimension
            )));
        }

        let mut search = self
            .table
            .query()
            .nearest_to(query.to_vec())?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::L2)
            .nprobes(params.nprobes)
            .limit(params.k);
        if let Some(refine_factor) = params.refine_factor {
            search = search.refine_factor(refine_factor);
        }

        let batches: Vec<RecordBatch> = search.execute().await?.try_collect().await?;
        let mut matches = Vec::new();
        for batch in &batches {
            matches.extend(matches_from_batch(batch)?);
        }
        // Results come back per fragment; keep them closest first.
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(params.k);

        debug!("Retrieved {} context rows", matches.len());
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }
}

fn context_schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("title", DataType::Utf8, false),
        Field::new("published", DataType::Utf8, true),
        Field::new("url", DataType::Utf8, true),
        Field::new("video_id", DataType::Utf8, true),
        Field::new("channel_id", DataType::Utf8, true),
        Field::new("id", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, false),
        Field::new("start", DataType::Float64, false),
        Field::new("end", DataType::Float64, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
    ]))
}

fn to_record_batch(
    schema: SchemaRef,
    windows: &[ContextWindow],
    vectors: &[Vec<f32>],
    dimension: usize,
) -> Result<RecordBatch> {
    let optional = |f: fn(&ContextWindow) -> Option<&str>| -> ArrayRef {
        Arc::new(windows.iter().map(f).collect::<StringArray>())
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(windows.iter().map(|w| w.title.as_str()))),
        optional(|w| w.published.as_deref()),
        optional(|w| w.url.as_deref()),
        optional(|w| w.video_id.as_deref()),
        optional(|w| w.channel_id.as_deref()),
        optional(|w| w.id.as_deref()),
        Arc::new(StringArray::from_iter_values(windows.iter().map(|w| w.text.as_str()))),
        Arc::new(Float64Array::from_iter_values(windows.iter().map(|w| w.start))),
        Arc::new(Float64Array::from_iter_values(windows.iter().map(|w| w.end))),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            vectors.iter().map(|v| Some(v.iter().copied().map(Some))),
            dimension as i32,
        )),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| EtoError::Dataset(format!("result is missing column {}", name)))
}

fn matches_from_batch(batch: &RecordBatch) -> Result<Vec<ContextMatch>> {
    let title = column::<StringArray>(batch, "title")?;
    let published = column::<StringArray>(batch, "published")?;
    let url = column::<StringArray>(batch, "url")?;
    let video_id = column::<StringArray>(batch, "video_id")?;
    let channel_id = column::<StringArray>(batch, "channel_id")?;
    let id = column::<StringArray>(batch, "id")?;
    let text = column::<StringArray>(batch, "text")?;
    let start = column::<Float64Array>(batch, "start")?;
    let end = column::<Float64Array>(batch, "end")?;
    let distance = column::<Float32Array>(batch, "_distance")?;

    let optional = |array: &StringArray, row: usize| {
        (!array.is_null(row)).then(|| array.value(row).to_string())
    };

    Ok((0..batch.num_rows())
        .map(|row| ContextMatch {
            context: ContextWindow {
                title: title.value(row).to_string(),
                published: optional(published, row),
                url: optional(url, row),
                video_id: optional(video_id, row),
                channel_id: optional(channel_id, row),
                id: optional(id, row),
                text: text.value(row).to_string(),
                start: start.value(row),
                end: end.value(row),
            },
            distance: distance.value(row),
        })
        .collect())
}

async fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    tokio::fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(manifest)?).await?;
    Ok(())
}
