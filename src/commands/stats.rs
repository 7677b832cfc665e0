//! `stats`: describe the built index.

use anyhow::Result;

use crate::config::{Config, EmbeddingBackendKind};
use crate::index::{embeddings::HASHING_MODEL_NAME, StoreStats, VectorIndex};

pub async fn run(config: &Config) -> Result<StoreStats> {
    let model = match config.embedding.backend {
        EmbeddingBackendKind::HuggingFace | EmbeddingBackendKind::FastEmbed => {
            config.embedding.model.as_str()
        }
        EmbeddingBackendKind::Hashing => HASHING_MODEL_NAME,
    };

    let index = VectorIndex::open_existing(config, model, config.embedding.dimension).await?;
    let stats = index.stats().await?;

    println!("Collection: {}", stats.collection);
    println!("Embedding model: {}", stats.embedding_model);
    println!("Dimension: {}", stats.dimension);
    println!("Chunks: {}", stats.points_count);
    for (category, count) in &stats.per_category {
        println!("  {:<16} {}", category.as_str(), count);
    }

    Ok(stats)
}
