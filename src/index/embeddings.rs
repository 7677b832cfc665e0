//! Text embedding backends

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::config::{Config, EmbeddingBackendKind, TOKEN_ENV};
use crate::error::{Error, Result};
use crate::integrations::HuggingFaceClient;

/// Model name recorded in stores built with the hashing embedder.
pub const HASHING_MODEL_NAME: &str = "token-hash";

/// Sentence embeddings from the Hugging Face feature-extraction pipeline.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbedder {
    client: HuggingFaceClient,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl HuggingFaceEmbedder {
    pub fn new(client: HuggingFaceClient, model: &str, dimension: usize, batch_size: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding {} texts with {}", batch.len(), self.model);
            for vector in self.client.feature_extraction(&self.model, batch).await? {
                if vector.len() != self.dimension {
                    return Err(Error::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
                vectors.push(vector);
            }
        }
        Ok(vectors)
    }
}

/// Sentence embeddings computed in-process with an ONNX model.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    name: String,
    dimension: usize,
    batch_size: usize,
}

impl fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedder {
    /// Load `name`, downloading it into the fastembed cache on first use.
    pub fn new(name: &str, dimension: usize, batch_size: usize) -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(fastembed_model(name)?)
                .with_cache_dir(fastembed_cache_dir())
                .with_show_download_progress(false),
        )
        .map_err(|e| Error::EmbeddingError(format!("Failed to load {}: {}", name, e)))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            name: name.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding {} texts locally with {}", texts.len(), self.name);
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::EmbeddingError("embedding model lock poisoned".into()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::EmbeddingError(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| Error::EmbeddingError(format!("Embedding task failed: {}", e)))??;

        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(vectors)
    }
}

/// Map a configured model name to the fastembed model.
pub fn fastembed_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" | "AllMiniLML6V2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "BAAI/bge-small-en-v1.5" | "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" | "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(Error::ConfigError(format!(
            "embedding model '{}' is not available for the fastembed backend",
            other
        ))),
    }
}

/// `FASTEMBED_CACHE_PATH`, else `~/.cache/fastembed`, shared across stores.
fn fastembed_cache_dir() -> PathBuf {
    std::env::var("FASTEMBED_CACHE_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".cache").join("fastembed"))
        })
        .unwrap_or_else(|| PathBuf::from(".fastembed_cache"))
}

/// Deterministic bag-of-tokens hashing embedder. It carries no semantics;
/// tests and offline smoke runs use it where loading a model is not wanted.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in text.split_whitespace() {
            let idx = (fnv1a(token.to_lowercase().as_bytes()) % self.dim as u64) as usize;
            vec[idx] += 1.0;
        }

        normalize(&mut vec);
        vec
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}

/// FNV-1a, stable across Rust releases unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// The embedder used for both indexing and queries.
#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    HuggingFace(HuggingFaceEmbedder),
    FastEmbed(FastEmbedder),
    Hashing(HashingEmbedder),
}

impl EmbeddingBackend {
    /// Build the configured backend. The hosted backend needs `token`.
    pub fn from_config(config: &Config, token: Option<&str>) -> Result<Self> {
        let embedding = &config.embedding;
        match embedding.backend {
            EmbeddingBackendKind::HuggingFace => {
                let token = token
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| Error::MissingCredential(format!("{} is not set", TOKEN_ENV)))?;
                let client = HuggingFaceClient::with_base_url(token, &config.llm.base_url)?;
                info!("Using Hugging Face embeddings ({})", embedding.model);
                Ok(Self::HuggingFace(HuggingFaceEmbedder::new(
                    client,
                    &embedding.model,
                    embedding.dimension,
                    embedding.batch_size,
                )))
            }
            EmbeddingBackendKind::FastEmbed => {
                info!("Loading local embedding model {}", embedding.model);
                Ok(Self::FastEmbed(FastEmbedder::new(
                    &embedding.model,
                    embedding.dimension,
                    embedding.batch_size,
                )?))
            }
            EmbeddingBackendKind::Hashing => {
                info!("Using token hashing embeddings ({} dims)", embedding.dimension);
                Ok(Self::Hashing(HashingEmbedder::new(embedding.dimension)))
            }
        }
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            EmbeddingBackend::HuggingFace(hf) => hf.embed_batch(texts).await,
            EmbeddingBackend::FastEmbed(fe) => fe.embed_batch(texts).await,
            EmbeddingBackend::Hashing(hashing) => {
                Ok(texts.iter().map(|t| hashing.embed(t)).collect())
            }
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingError("No embedding returned".into()))
    }

    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingBackend::HuggingFace(hf) => hf.dimension,
            EmbeddingBackend::FastEmbed(fe) => fe.dimension,
            EmbeddingBackend::Hashing(hashing) => hashing.dimension(),
        }
    }

    /// Name recorded in the store manifest.
    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::HuggingFace(hf) => &hf.model,
            EmbeddingBackend::FastEmbed(fe) => &fe.name,
            EmbeddingBackend::Hashing(_) => HASHING_MODEL_NAME,
        }
    }
}
