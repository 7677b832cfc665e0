//! `build-index`: sample, chunk, embed and store the processed corpus.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::index::EmbeddingBackend;
use crate::rag::{self, BuildOptions, BuildReport};

pub async fn run(config: &Config, token: Option<String>, options: BuildOptions) -> Result<BuildReport> {
    let embedder = EmbeddingBackend::from_config(config, token.as_deref())
        .context("cannot create the embedding backend")?;
    info!(
        "Building index in {} with {}",
        config.vector_store_dir.display(),
        embedder.model_name()
    );

    let report = rag::build_index(config, embedder, options).await?;

    println!(
        "Sampled {} of {} complaints",
        report.complaints_sampled, report.complaints_available
    );
    for (category, count) in &report.sample_distribution {
        println!("  {:<16} {}", category.as_str(), count);
    }
    println!(
        "Indexed {} chunks ({} in store)",
        report.chunks_indexed, report.total_points
    );
    Ok(report)
}
