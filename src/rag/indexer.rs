//! Index build: sample the processed corpus, chunk it, embed and store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::corpus::{read_processed, stratified_sample, ProductCategory};
use crate::error::Result;
use crate::index::{EmbeddingBackend, VectorIndex};
use crate::rag::chunker::Chunker;
use crate::rag::retriever::Retriever;

/// Overrides for a single build; `None` falls back to the config.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub input: Option<PathBuf>,
    pub sample_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub reset: bool,
}

/// What a build did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub complaints_available: usize,
    pub complaints_sampled: usize,
    pub sample_distribution: BTreeMap<ProductCategory, usize>,
    pub chunks_indexed: usize,
    pub total_points: u64,
}

/// Build (or extend) the chunk index from the processed corpus.
///
/// The store directory is locked for the whole build, so a concurrent build
/// fails with `StoreLocked` instead of interleaving writes.
pub async fn build_index(
    config: &Config,
    embedder: EmbeddingBackend,
    options: BuildOptions,
) -> Result<BuildReport> {
    let input = options
        .input
        .unwrap_or_else(|| config.processed_data_path.clone());
    let sample_size = options.sample_size.unwrap_or(config.sample_size);
    let batch_size = options.batch_size.unwrap_or(config.index.batch_size);
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;

    let complaints = read_processed(&input)?;
    let available = complaints.len();
    info!("Loaded {} processed complaints from {}", available, input.display());

    let sample = stratified_sample(complaints, sample_size, config.sample_seed, |c| {
        c.standardized_product
    });
    let mut distribution = BTreeMap::new();
    for complaint in &sample {
        *distribution.entry(complaint.standardized_product).or_insert(0) += 1;
    }
    info!("Sampled {} complaints: {:?}", sample.len(), distribution);

    let _lock = VectorIndex::lock(config)?;
    let model = embedder.model_name().to_string();
    let dimension = embedder.dimension();

    if options.reset {
        VectorIndex::reset(config, &model, dimension).await?;
    }
    let index = VectorIndex::open(config, &model, dimension).await?;
    let mut retriever = Retriever::new(embedder, index, config.retrieval_k);

    let chunks = sample.iter().flat_map(|c| chunker.chunk_complaint(c));
    let indexed = retriever.ingest(chunks, batch_size).await?;
    info!("Indexed {} chunks ({} in store)", indexed, retriever.len());

    Ok(BuildReport {
        complaints_available: available,
        complaints_sampled: sample.len(),
        sample_distribution: distribution,
        chunks_indexed: indexed,
        total_points: retriever.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingBackendKind;
    use crate::corpus::{write_processed, ProcessedComplaint};
    use crate::error::Error;
    use crate::index::HashingEmbedder;

    fn complaint(id: usize, category: ProductCategory, text: &str) -> ProcessedComplaint {
        ProcessedComplaint {
            date_received: None,
            product: None,
            sub_product: None,
            issue: Some("Fees".into()),
            sub_issue: None,
            narrative: Some(text.into()),
            company: None,
            state: None,
            complaint_id: Some(id.to_string()),
            standardized_product: category,
            cleaned_narrative: text.into(),
        }
    }

    fn setup(dir: &std::path::Path) -> Config {
        let mut config = Config::defaults();
        config.processed_data_path = dir.join("processed.csv");
        config.vector_store_dir = dir.join("store");
        config.embedding.backend = EmbeddingBackendKind::Hashing;
        config.embedding.dimension = 64;

        let complaints: Vec<_> = (0..20)
            .map(|i| {
                complaint(
                    i,
                    ProductCategory::ALL[i % 4],
                    &format!("complaint number {} about a fee. ", i).repeat(30),
                )
            })
            .collect();
        write_processed(&config.processed_data_path, &complaints).unwrap();
        config
    }

    fn local(config: &Config) -> EmbeddingBackend {
        EmbeddingBackend::Hashing(HashingEmbedder::new(config.embedding.dimension))
    }

    #[tokio::test]
    async fn builds_sampled_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let report = build_index(
            &config,
            local(&config),
            BuildOptions {
                sample_size: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(report.complaints_available, 20);
        assert_eq!(report.complaints_sampled, 8);
        assert!(report.sample_distribution.values().all(|&n| n == 2));
        assert!(report.chunks_indexed > 8);
        assert_eq!(report.total_points, report.chunks_indexed as u64);
    }

    #[tokio::test]
    async fn rebuild_with_reset_replaces_points() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let first = build_index(&config, local(&config), BuildOptions::default())
            .await
            .unwrap();
        let appended = build_index(&config, local(&config), BuildOptions::default())
            .await
            .unwrap();
        assert_eq!(appended.total_points, first.total_points * 2);

        let reset = build_index(
            &config,
            local(&config),
            BuildOptions {
                reset: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(reset.total_points, first.total_points);
    }

    #[tokio::test]
    async fn missing_processed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path());
        config.processed_data_path = dir.path().join("nope.csv");

        let err = build_index(&config, local(&config), BuildOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }
}
