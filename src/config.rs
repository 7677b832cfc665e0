//! Configuration for the ingestion and retrieval pipeline
//!
//! Loads configuration from config.yml file; every value is optional and
//! falls back to the constants below.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const RAW_DATA_PATH: &str = "data/raw/complaints.csv";
pub const PROCESSED_DATA_PATH: &str = "data/processed/filtered_complaints.csv";
pub const VECTOR_STORE_DIR: &str = "vector_store/complaints_rag";
pub const COLLECTION_NAME: &str = "complaints_rag";
pub const SAMPLE_SIZE: usize = 10_000;
pub const SAMPLE_SEED: u64 = 42;
pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;
pub const INSERT_BATCH_SIZE: usize = 5_000;
pub const EMBED_BATCH_SIZE: usize = 64;
pub const RETRIEVAL_K: usize = 5;
pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const EMBEDDING_DIMENSION: usize = 384;
pub const LLM_REPO_ID: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference";
pub const QDRANT_URL: &str = "http://localhost:6334";
pub const TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";

/// Which embedding backend turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Hosted sentence-transformers model (needs the API token)
    HuggingFace,
    /// The same model run in-process through fastembed, no token needed
    FastEmbed,
    /// Deterministic token hashing for tests
    Hashing,
}

/// Where chunk vectors are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    /// JSON-lines store in a local directory
    Local,
    /// Qdrant collection
    Qdrant,
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    paths: Option<PathsSection>,
    sampling: Option<SamplingSection>,
    chunking: Option<ChunkingSection>,
    embedding: Option<EmbeddingSection>,
    index: Option<IndexSection>,
    retrieval: Option<RetrievalSection>,
    llm: Option<LlmSection>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsSection {
    raw_data: Option<String>,
    processed_data: Option<String>,
    vector_store: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SamplingSection {
    sample_size: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkingSection {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingSection {
    backend: Option<EmbeddingBackendKind>,
    model: Option<String>,
    dimension: Option<usize>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexSection {
    backend: Option<IndexBackendKind>,
    collection: Option<String>,
    qdrant_url: Option<String>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalSection {
    k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmSection {
    repo_id: Option<String>,
    base_url: Option<String>,
    api_token: Option<String>,
    max_new_tokens: Option<u32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
    typical_p: Option<f32>,
    temperature: Option<f32>,
}

/// Embedding settings
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackendKind,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

/// Vector index settings
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub backend: IndexBackendKind,
    pub collection: String,
    pub qdrant_url: String,
    pub batch_size: usize,
}

/// Hosted LLM settings and decoding parameters
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub repo_id: String,
    pub base_url: String,
    pub max_new_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub typical_p: f32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            repo_id: LLM_REPO_ID.to_string(),
            base_url: HF_INFERENCE_URL.to_string(),
            max_new_tokens: 512,
            top_k: 10,
            top_p: 0.95,
            typical_p: 0.95,
            temperature: 0.1,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub raw_data_path: PathBuf,
    pub processed_data_path: PathBuf,
    pub vector_store_dir: PathBuf,
    pub sample_size: usize,
    pub sample_seed: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval_k: usize,
    pub llm: LlmConfig,
    pub api_token: Option<String>,
}

/// Config files searched by [`Config::new`], in order.
pub const CONFIG_CANDIDATES: [&str; 2] = ["config.yml", "../config.yml"];

impl Config {
    /// Load configuration from config.yml, or use defaults when no file exists.
    ///
    /// A config file that exists but cannot be read, parsed or validated is
    /// an error.
    pub fn new() -> Result<Self> {
        Self::load_first_existing(&CONFIG_CANDIDATES)
    }

    /// Load the first of `candidates` that exists; defaults if none does.
    pub fn load_first_existing<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for path in candidates {
            match fs::read_to_string(path.as_ref()) {
                Ok(content) => {
                    Self::load_dotenv();
                    return Self::from_yaml_str(&content).map_err(|e| match e {
                        Error::ConfigError(msg) => Error::ConfigError(format!(
                            "{}: {}",
                            path.as_ref().display(),
                            msg
                        )),
                        other => other,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::ConfigError(format!(
                        "Failed to read config file {}: {}",
                        path.as_ref().display(),
                        e
                    )))
                }
            }
        }

        Self::load_dotenv();
        Ok(Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                return std::env::var(var_name).ok().filter(|s| !s.trim().is_empty());
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.trim().is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|s| !s.trim().is_empty())
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml_str(&content)
    }

    /// Build configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let paths = yaml.paths.unwrap_or_default();
        let sampling = yaml.sampling.unwrap_or_default();
        let chunking = yaml.chunking.unwrap_or_default();
        let embedding = yaml.embedding.unwrap_or_default();
        let index = yaml.index.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let llm = yaml.llm.unwrap_or_default();
        let llm_defaults = LlmConfig::default();

        let config = Self {
            raw_data_path: PathBuf::from(paths.raw_data.unwrap_or_else(|| RAW_DATA_PATH.into())),
            processed_data_path: PathBuf::from(
                paths
                    .processed_data
                    .unwrap_or_else(|| PROCESSED_DATA_PATH.into()),
            ),
            vector_store_dir: PathBuf::from(
                paths
                    .vector_store
                    .unwrap_or_else(|| VECTOR_STORE_DIR.into()),
            ),
            sample_size: sampling.sample_size.unwrap_or(SAMPLE_SIZE),
            sample_seed: sampling.seed.unwrap_or(SAMPLE_SEED),
            chunk_size: chunking.chunk_size.unwrap_or(CHUNK_SIZE),
            chunk_overlap: chunking.chunk_overlap.unwrap_or(CHUNK_OVERLAP),
            embedding: EmbeddingConfig {
                backend: embedding
                    .backend
                    .unwrap_or(EmbeddingBackendKind::FastEmbed),
                model: embedding
                    .model
                    .unwrap_or_else(|| EMBEDDING_MODEL.to_string()),
                dimension: embedding.dimension.unwrap_or(EMBEDDING_DIMENSION),
                batch_size: embedding.batch_size.unwrap_or(EMBED_BATCH_SIZE),
            },
            index: IndexConfig {
                backend: index.backend.unwrap_or(IndexBackendKind::Local),
                collection: index
                    .collection
                    .unwrap_or_else(|| COLLECTION_NAME.to_string()),
                qdrant_url: Self::resolve_env_string(index.qdrant_url, "QDRANT_URL")
                    .unwrap_or_else(|| QDRANT_URL.to_string()),
                batch_size: index.batch_size.unwrap_or(INSERT_BATCH_SIZE),
            },
            retrieval_k: retrieval.k.unwrap_or(RETRIEVAL_K),
            llm: LlmConfig {
                repo_id: llm.repo_id.unwrap_or(llm_defaults.repo_id),
                base_url: llm.base_url.unwrap_or(llm_defaults.base_url),
                max_new_tokens: llm.max_new_tokens.unwrap_or(llm_defaults.max_new_tokens),
                top_k: llm.top_k.unwrap_or(llm_defaults.top_k),
                top_p: llm.top_p.unwrap_or(llm_defaults.top_p),
                typical_p: llm.typical_p.unwrap_or(llm_defaults.typical_p),
                temperature: llm.temperature.unwrap_or(llm_defaults.temperature),
            },
            api_token: Self::resolve_env_string(llm.api_token, TOKEN_ENV),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create config with built-in defaults (fallback)
    pub fn defaults() -> Self {
        Self {
            raw_data_path: PathBuf::from(RAW_DATA_PATH),
            processed_data_path: PathBuf::from(PROCESSED_DATA_PATH),
            vector_store_dir: PathBuf::from(VECTOR_STORE_DIR),
            sample_size: SAMPLE_SIZE,
            sample_seed: SAMPLE_SEED,
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            embedding: EmbeddingConfig {
                backend: EmbeddingBackendKind::FastEmbed,
                model: EMBEDDING_MODEL.to_string(),
                dimension: EMBEDDING_DIMENSION,
                batch_size: EMBED_BATCH_SIZE,
            },
            index: IndexConfig {
                backend: IndexBackendKind::Local,
                collection: COLLECTION_NAME.to_string(),
                qdrant_url: std::env::var("QDRANT_URL").unwrap_or_else(|_| QDRANT_URL.to_string()),
                batch_size: INSERT_BATCH_SIZE,
            },
            retrieval_k: RETRIEVAL_K,
            llm: LlmConfig::default(),
            api_token: Self::resolve_env_string(None, TOKEN_ENV),
        }
    }

    /// Reject parameter combinations the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::ConfigError("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::ConfigError(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_k == 0 {
            return Err(Error::ConfigError("retrieval k must be positive".into()));
        }
        if self.index.batch_size == 0 || self.embedding.batch_size == 0 {
            return Err(Error::ConfigError("batch sizes must be positive".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::ConfigError("embedding dimension must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn config_defaults_match_pipeline_constants() {
        let config = Config::defaults();

        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.index.batch_size, 5_000);
        assert_eq!(config.retrieval_k, 5);
        assert_eq!(config.llm.max_new_tokens, 512);
        assert_eq!(config.llm.top_k, 10);
        assert!((config.llm.top_p - 0.95).abs() < f32::EPSILON);
        assert!((config.llm.typical_p - 0.95).abs() < f32::EPSILON);
        assert!((config.llm.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.embedding.backend, EmbeddingBackendKind::FastEmbed);
        assert_eq!(config.index.backend, IndexBackendKind::Local);
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.chunk_size, CHUNK_SIZE);
        assert_eq!(config.embedding.model, EMBEDDING_MODEL);
        assert_eq!(config.llm.repo_id, LLM_REPO_ID);
    }

    #[test]
    fn yaml_sections_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
paths:
  raw_data: "in/raw.csv"
  vector_store: "out/store"
sampling:
  sample_size: 250
  seed: 7
chunking:
  chunk_size: 200
  chunk_overlap: 20
embedding:
  backend: hashing
  dimension: 64
index:
  backend: qdrant
  collection: "test_collection"
  batch_size: 100
retrieval:
  k: 3
llm:
  repo_id: "org/model"
  temperature: 0.5
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.raw_data_path, PathBuf::from("in/raw.csv"));
        assert_eq!(config.processed_data_path, PathBuf::from(PROCESSED_DATA_PATH));
        assert_eq!(config.vector_store_dir, PathBuf::from("out/store"));
        assert_eq!(config.sample_size, 250);
        assert_eq!(config.sample_seed, 7);
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.embedding.backend, EmbeddingBackendKind::Hashing);
        assert_eq!(config.embedding.dimension, 64);
        assert_eq!(config.index.backend, IndexBackendKind::Qdrant);
        assert_eq!(config.index.collection, "test_collection");
        assert_eq!(config.index.batch_size, 100);
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.llm.repo_id, "org/model");
        assert!((config.llm.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_new_tokens, 512);
    }

    #[test]
    fn embedding_backend_names_parse() {
        for (name, expected) in [
            ("fastembed", EmbeddingBackendKind::FastEmbed),
            ("huggingface", EmbeddingBackendKind::HuggingFace),
            ("hashing", EmbeddingBackendKind::Hashing),
        ] {
            let yaml = format!("embedding:\n  backend: {}\n", name);
            let config = Config::from_yaml_str(&yaml).unwrap();
            assert_eq!(config.embedding.backend, expected);
        }

        assert!(Config::from_yaml_str("embedding:\n  backend: local\n").is_err());
    }

    #[test]
    fn token_placeholder_is_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("CUSTOM_HF_TOKEN", "hf_from_env");
        let yaml = r#"
llm:
  api_token: "${CUSTOM_HF_TOKEN}"
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.api_token.as_deref(), Some("hf_from_env"));
    }

    #[test]
    fn token_env_var_is_used_without_yaml_value() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set(TOKEN_ENV, "hf_direct");
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.api_token.as_deref(), Some("hf_direct"));
    }

    #[test]
    fn missing_token_leaves_api_token_empty() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::unset(TOKEN_ENV);
        let config = Config::from_yaml_str("").unwrap();

        assert!(config.api_token.is_none());
    }

    #[test]
    fn first_existing_config_wins() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.yml");
        let parent = dir.path().join("parent.yml");
        std::fs::write(&parent, "retrieval:\n  k: 9\n").unwrap();

        let config = Config::load_first_existing(&[&missing, &parent]).unwrap();
        assert_eq!(config.retrieval_k, 9);
    }

    #[test]
    fn no_config_file_falls_back_to_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let candidates = [dir.path().join("config.yml"), dir.path().join("other.yml")];

        let config = Config::load_first_existing(&candidates).unwrap();
        assert_eq!(config.chunk_size, CHUNK_SIZE);
        assert_eq!(config.retrieval_k, RETRIEVAL_K);
    }

    #[test]
    fn invalid_config_file_is_reported_not_skipped() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let invalid = dir.path().join("config.yml");
        let valid = dir.path().join("parent.yml");
        std::fs::write(
            &invalid,
            "chunking:\n  chunk_size: 200\n  chunk_overlap: 300\nretrieval:\n  k: 9\n",
        )
        .unwrap();
        std::fs::write(&valid, "retrieval:\n  k: 4\n").unwrap();

        let err = Config::load_first_existing(&[&invalid, &valid]).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        let message = err.to_string();
        assert!(message.contains("config.yml"));
        assert!(message.contains("chunk_overlap"));
    }

    #[test]
    fn unparseable_config_file_is_reported() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.yml");
        std::fs::write(&broken, "{ invalid yaml [").unwrap();

        assert!(Config::load_first_existing(&[&broken]).is_err());
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set(TOKEN_ENV, "   ");
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let yaml = r#"
chunking:
  chunk_size: 50
  chunk_overlap: 50
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn zero_k_is_rejected() {
        let err = Config::from_yaml_str("retrieval:\n  k: 0\n").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let err = Config::from_yaml_str("embedding:\n  backend: openai\n").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn load_from_file_reads_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "retrieval:\n  k: 8\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.retrieval_k, 8);
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let result = Config::load_from_file("/nonexistent/path/config.yml");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "{ invalid yaml [").unwrap();

        let result = Config::load_from_file(&path);
        assert!(result.is_err());
    }
}
