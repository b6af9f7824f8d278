//! Building, loading and serving the chunk index.

use crate::rag::chunker::Chunk;
use crate::rag::embeddings::Embedder;
use crate::rag::time_box;
use crate::types::{AppError, ExternalError, FailureKind, Result};
use arc_swap::ArcSwap;
use futures::{stream, StreamExt, TryStreamExt};
use quire_vector::{persistence, DistanceMetric, IndexBuilder, Record, VectorIndex};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Knobs for [`build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Chunks sent to the embedder per call.
    pub batch_size: usize,
    /// Embedding calls in flight at once.
    pub concurrency: usize,
    pub metric: DistanceMetric,
    /// Time box for each embedding call.
    pub timeout: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            concurrency: 2,
            metric: DistanceMetric::Cosine,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Embed every chunk and assemble an index in chunk order.
///
/// Zero chunks produce a valid empty index.
#[instrument(skip(chunks, embedder, options), fields(chunks = chunks.len(), model = embedder.model_name()))]
pub async fn build(
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    options: &BuildOptions,
) -> Result<VectorIndex> {
    let dimensions = embedder.dimensions();
    let mut builder = IndexBuilder::new(dimensions, options.metric)?.with_capacity(chunks.len());
    if chunks.is_empty() {
        return Ok(builder.finish());
    }

    let batch_size = options.batch_size.max(1);
    let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks.chunks(batch_size))
        .map(|batch| embed_batch(embedder, batch, options.timeout))
        .buffered(options.concurrency.max(1))
        .try_collect()
        .await?;

    for (chunk, vector) in chunks.iter().zip(batches.into_iter().flatten()) {
        if vector.len() != dimensions {
            return Err(AppError::Embedding(ExternalError::new(
                FailureKind::Malformed,
                format!(
                    "vector for {} has {} dimensions, expected {}",
                    chunk.id,
                    vector.len(),
                    dimensions
                ),
            )));
        }
        if !vector.iter().all(|v| v.is_finite()) {
            return Err(AppError::Embedding(ExternalError::new(
                FailureKind::Malformed,
                format!("vector for {} contains NaN or infinite values", chunk.id),
            )));
        }
        builder.push(Record::new(
            chunk.id.clone(),
            vector,
            chunk.text.clone(),
            chunk.metadata(),
        ))?;
    }

    let index = builder.finish();
    info!(records = index.len(), dimensions, "Index built");
    Ok(index)
}

async fn embed_batch(
    embedder: &dyn Embedder,
    batch: &[Chunk],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
    let vectors = time_box(timeout, "embedding", embedder.embed_batch(&texts))
        .await
        .map_err(AppError::Embedding)?;

    if vectors.len() != batch.len() {
        return Err(AppError::Embedding(ExternalError::new(
            FailureKind::Malformed,
            format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            ),
        )));
    }
    Ok(vectors)
}

/// Load a saved index and check it was built with a compatible embedder.
#[instrument(skip(embedder), fields(path = %path.display()))]
pub async fn load_or_fail(path: &Path, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let snapshot = persistence::load(path)
        .await
        .map_err(|e| AppError::IndexLoad(format!("{}: {}", path.display(), e)))?;
    let manifest = &snapshot.manifest;

    if manifest.dimensions != embedder.dimensions() {
        return Err(AppError::IndexLoad(format!(
            "index at {} holds {}-dimensional vectors but embedder '{}' produces {}",
            path.display(),
            manifest.dimensions,
            embedder.model_name(),
            embedder.dimensions()
        )));
    }
    if manifest.embedder != embedder.model_name() {
        warn!(
            index_model = %manifest.embedder,
            configured_model = embedder.model_name(),
            "Index was built with a different embedding model"
        );
    }

    info!(
        records = manifest.count,
        dimensions = manifest.dimensions,
        created_at = %manifest.created_at,
        "Index loaded"
    );
    Ok(snapshot.index)
}

/// Retrieval state seen by request handlers.
#[derive(Debug, Clone)]
pub enum IndexState {
    Ready(Arc<VectorIndex>),
    Unavailable { reason: String },
}

/// Shared, atomically swappable index state.
///
/// Readers take a snapshot per request and keep using it even if the
/// state is replaced while they run.
#[derive(Debug)]
pub struct IndexHandle {
    state: ArcSwap<IndexState>,
}

impl IndexHandle {
    pub fn ready(index: VectorIndex) -> Self {
        Self {
            state: ArcSwap::from_pointee(IndexState::Ready(Arc::new(index))),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ArcSwap::from_pointee(IndexState::Unavailable {
                reason: reason.into(),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<IndexState> {
        self.state.load_full()
    }

    /// The current index, or `IndexUnavailable` with the recorded reason.
    pub fn current(&self) -> Result<Arc<VectorIndex>> {
        match self.snapshot().as_ref() {
            IndexState::Ready(index) => Ok(Arc::clone(index)),
            IndexState::Unavailable { reason } => Err(AppError::IndexUnavailable(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.snapshot().as_ref(), IndexState::Ready(_))
    }

    pub fn replace(&self, index: VectorIndex) {
        self.state
            .store(Arc::new(IndexState::Ready(Arc::new(index))));
    }

    /// Load the index at `path` and swap it in. On failure the previous
    /// state stays in place.
    pub async fn reload(&self, path: &Path, embedder: &dyn Embedder) -> Result<()> {
        let index = load_or_fail(path, embedder).await?;
        self.replace(index);
        Ok(())
    }
}
