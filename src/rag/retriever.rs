//! Embedding + vector index glue for ingestion and top-k retrieval.

use tracing::{debug, info};

use crate::error::Result;
use crate::index::{EmbeddingBackend, SearchHit, StoreStats, VectorIndex};
use crate::metrics;
use crate::rag::chunker::ComplaintChunk;

/// Owns the embedder and the index for the lifetime of the process.
pub struct Retriever {
    embedder: EmbeddingBackend,
    index: VectorIndex,
    k: usize,
}

impl Retriever {
    pub fn new(embedder: EmbeddingBackend, index: VectorIndex, k: usize) -> Self {
        Self {
            embedder,
            index,
            k: k.max(1),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn set_k(&mut self, k: usize) {
        self.k = k.max(1);
    }

    pub fn len(&self) -> u64 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.index.stats().await
    }

    /// Embed and store chunks in batches of `batch_size`. The iterator is
    /// consumed lazily so only one batch is held at a time.
    pub async fn ingest<I>(&mut self, chunks: I, batch_size: usize) -> Result<usize>
    where
        I: IntoIterator<Item = ComplaintChunk>,
    {
        let batch_size = batch_size.max(1);
        let mut chunks = chunks.into_iter();
        let mut total = 0;
        let mut batch_no = 0;

        loop {
            let batch: Vec<ComplaintChunk> = chunks.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_no += 1;

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            let added = self
                .index
                .add_batch(batch.into_iter().zip(vectors).collect())
                .await?;

            total += added;
            metrics::record_chunks_indexed(added);
            info!("Processed batch {}: {} chunks ({} total)", batch_no, added, total);
        }

        Ok(total)
    }

    /// Top-k chunks for `query` using the configured k.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.retrieve_k(query, self.k).await
    }

    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query(&vector, k).await?;
        metrics::record_retrieval();
        debug!("Retrieved {} chunks", hits.len());
        Ok(hits)
    }
}
