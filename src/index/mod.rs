//! Chunk embedding and vector index
//!
//! Provides:
//! - Embedding backends (Hugging Face feature extraction, in-process fastembed, token hashing)
//! - A local on-disk index and a Qdrant-backed index behind one enum
//! - A directory lock that keeps index builds exclusive

pub mod embeddings;
pub mod local_store;
pub mod lock;
pub mod models;
pub mod qdrant;

use std::path::Path;

use tracing::info;

pub use embeddings::{EmbeddingBackend, FastEmbedder, HashingEmbedder, HuggingFaceEmbedder};
pub use local_store::LocalVectorStore;
pub use lock::StoreLock;
pub use models::{cosine_similarity, IndexedPoint, SearchHit, StoreManifest, StoreStats};
pub use qdrant::QdrantStore;

use crate::config::{Config, IndexBackendKind};
use crate::error::{Error, Result};
use crate::rag::chunker::ComplaintChunk;

/// The configured vector index.
pub enum VectorIndex {
    Local(LocalVectorStore),
    Qdrant(QdrantStore),
}

impl VectorIndex {
    /// Open (or create) the index for writing.
    pub async fn open(config: &Config, embedding_model: &str, dimension: usize) -> Result<Self> {
        match config.index.backend {
            IndexBackendKind::Local => Ok(Self::Local(LocalVectorStore::open(
                &config.vector_store_dir,
                &config.index.collection,
                embedding_model,
                dimension,
            )?)),
            IndexBackendKind::Qdrant => Ok(Self::Qdrant(
                QdrantStore::connect(
                    &config.index.qdrant_url,
                    &config.index.collection,
                    embedding_model,
                    dimension,
                )
                .await?,
            )),
        }
    }

    /// Open an index that must already have been built.
    pub async fn open_existing(config: &Config, embedding_model: &str, dimension: usize) -> Result<Self> {
        match config.index.backend {
            IndexBackendKind::Local => {
                let store = LocalVectorStore::open_existing(&config.vector_store_dir)?;
                if store.dimension() != dimension {
                    return Err(Error::DimensionMismatch {
                        expected: store.dimension(),
                        actual: dimension,
                    });
                }
                if store.manifest().embedding_model != embedding_model {
                    return Err(Error::VectorStoreError(format!(
                        "index was built with '{}' but queries use '{}'",
                        store.manifest().embedding_model,
                        embedding_model
                    )));
                }
                Ok(Self::Local(store))
            }
            IndexBackendKind::Qdrant => Ok(Self::Qdrant(
                QdrantStore::connect_existing(
                    &config.index.qdrant_url,
                    &config.index.collection,
                    embedding_model,
                    dimension,
                )
                .await?,
            )),
        }
    }

    /// Remove the stored index so a rebuild starts empty.
    pub async fn reset(config: &Config, embedding_model: &str, dimension: usize) -> Result<()> {
        match config.index.backend {
            IndexBackendKind::Local => LocalVectorStore::reset(&config.vector_store_dir),
            IndexBackendKind::Qdrant => {
                let mut store = QdrantStore::connect(
                    &config.index.qdrant_url,
                    &config.index.collection,
                    embedding_model,
                    dimension,
                )
                .await?;
                store.reset().await
            }
        }
    }

    pub async fn add_batch(&mut self, batch: Vec<(ComplaintChunk, Vec<f32>)>) -> Result<usize> {
        match self {
            VectorIndex::Local(store) => store.add_batch(batch),
            VectorIndex::Qdrant(store) => store.add_batch(batch).await,
        }
    }

    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        match self {
            VectorIndex::Local(store) => store.query(vector, k),
            VectorIndex::Qdrant(store) => store.query(vector, k).await,
        }
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        match self {
            VectorIndex::Local(store) => Ok(store.stats()),
            VectorIndex::Qdrant(store) => store.stats().await,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            VectorIndex::Local(store) => store.len() as u64,
            VectorIndex::Qdrant(store) => store.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Local(store) => store.dimension(),
            VectorIndex::Qdrant(store) => store.dimension(),
        }
    }

    /// Lock the store directory for the duration of a build.
    pub fn lock(config: &Config) -> Result<StoreLock> {
        let lock = StoreLock::acquire(Path::new(&config.vector_store_dir))?;
        info!("Locked {}", config.vector_store_dir.display());
        Ok(lock)
    }
}
