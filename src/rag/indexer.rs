//! Offline build: document to chunks to embeddings to a saved snapshot.

use crate::rag::chunker::TextChunker;
use crate::rag::document::Document;
use crate::rag::embeddings::Embedder;
use crate::rag::index::{build, BuildOptions};
use crate::types::{AppError, Result};
use quire_vector::persistence;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub pages: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub path: PathBuf,
}

pub struct Indexer {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    options: BuildOptions,
}

impl Indexer {
    pub fn new(chunker: TextChunker, embedder: Arc<dyn Embedder>, options: BuildOptions) -> Self {
        Self {
            chunker,
            embedder,
            options,
        }
    }

    /// Build an index from `document_path` and save it to `index_path`.
    ///
    /// Nothing is written until every chunk has been embedded, so a failed
    /// run leaves any existing snapshot at `index_path` as it was.
    #[instrument(skip(self), fields(document = %document_path.display(), index = %index_path.display()))]
    pub async fn run(&self, document_path: &Path, index_path: &Path) -> Result<IndexReport> {
        let document = Document::load(document_path).await?;
        let chunks = self.chunker.split(&document)?;
        info!(
            pages = document.page_count(),
            chunks = chunks.len(),
            "Document chunked"
        );

        let index = build(&chunks, self.embedder.as_ref(), &self.options).await?;

        let manifest = persistence::save(&index, index_path, self.embedder.model_name())
            .await
            .map_err(|e| AppError::Internal(format!("failed to save index: {}", e)))?;

        info!(
            records = manifest.count,
            checksum = %manifest.checksum,
            "Index saved"
        );

        Ok(IndexReport {
            pages: document.page_count(),
            chunks: chunks.len(),
            dimensions: manifest.dimensions,
            path: index_path.to_path_buf(),
        })
    }
}
