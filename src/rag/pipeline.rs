//! Question answering over the built index.

use tracing::info;

use super::generator::{Answer, AnswerGenerator};
use super::retriever::Retriever;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{EmbeddingBackend, StoreStats, VectorIndex};

/// Long-lived query resources: created once, then shared by reference.
pub struct RagPipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Open the built index and connect the LLM client. The credential is
    /// checked first, so nothing is opened or requested without it.
    pub async fn from_config(config: &Config, token: Option<&str>) -> Result<Self> {
        let generator = AnswerGenerator::from_config(config, token)?;
        let embedder = EmbeddingBackend::from_config(config, token)?;

        let index =
            VectorIndex::open_existing(config, embedder.model_name(), embedder.dimension()).await?;
        if index.is_empty() {
            return Err(Error::VectorStoreError(
                "the index is empty; run build-index first".into(),
            ));
        }
        info!(
            "Opened index with {} chunks, answering with {}",
            index.len(),
            generator.model()
        );

        Ok(Self::new(
            Retriever::new(embedder, index, config.retrieval_k),
            generator,
        ))
    }

    pub fn k(&self) -> usize {
        self.retriever.k()
    }

    pub fn set_k(&mut self, k: usize) {
        self.retriever.set_k(k);
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.retriever.stats().await
    }

    /// Retrieve the top-k chunks for `question` and generate an answer.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question is empty".into()));
        }

        let hits = self.retriever.retrieve(question).await?;
        self.generator.generate(question, hits).await
    }
}
