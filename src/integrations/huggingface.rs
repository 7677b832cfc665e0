//! Hugging Face inference API client (text generation and feature extraction).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LlmConfig, TOKEN_ENV};
use crate::{Error, Result};

/// Decoding parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub typical_p: f32,
    pub temperature: f32,
    pub return_full_text: bool,
}

impl From<&LlmConfig> for GenerationParameters {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            top_k: config.top_k,
            top_p: config.top_p,
            typical_p: config.typical_p,
            temperature: config.temperature,
            return_full_text: false,
        }
    }
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

/// Hugging Face inference client.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    http: Client,
    api_token: String,
    base_url: String,
}

impl HuggingFaceClient {
    /// Create a client against a custom endpoint (self-hosted or mock).
    pub fn with_base_url(api_token: impl Into<String>, base_url: &str) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::MissingCredential(format!("{} is empty", TOKEN_ENV)));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generate a completion for `inputs` with the given model.
    pub async fn text_generation(
        &self,
        model: &str,
        inputs: &str,
        parameters: &GenerationParameters,
    ) -> Result<String> {
        let request = GenerationRequest {
            inputs,
            parameters,
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .http
            .post(format!("{}/models/{}", self.base_url, model))
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LlmError(format!("Request to {} failed: {}", model, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::LlmError(format!(
                "Hugging Face error {}: {}",
                status, text
            )));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmError(format!("Invalid generation response: {}", e)))?;

        let text = match body {
            GenerationResponse::List(items) => items
                .into_iter()
                .next()
                .map(|item| item.generated_text)
                .ok_or_else(|| Error::LlmError("Empty generation response".into()))?,
            GenerationResponse::Single(item) => item.generated_text,
        };

        debug!("Generated {} characters with {}", text.len(), model);
        Ok(text.trim().to_string())
    }

    /// Sentence embeddings for `texts`, one vector per input.
    pub async fn feature_extraction(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = FeatureRequest {
            inputs: texts,
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .http
            .post(format!(
                "{}/models/{}/pipeline/feature-extraction",
                self.base_url, model
            ))
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingError(format!("Request to {} failed: {}", model, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingError(format!(
                "Hugging Face error {}: {}",
                status, text
            )));
        }

        let body: FeatureResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingError(format!("Invalid embedding response: {}", e)))?;

        let vectors = body.into_sentence_vectors();
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
    options: RequestOptions,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    List(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

/// Sentence-level output, or token-level output that still needs pooling.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Sentences(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

impl FeatureResponse {
    fn into_sentence_vectors(self) -> Vec<Vec<f32>> {
        match self {
            FeatureResponse::Sentences(vectors) => vectors,
            FeatureResponse::Tokens(batches) => batches.iter().map(|t| mean_pool(t)).collect(),
        }
    }
}

fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = tokens.first() else {
        return Vec::new();
    };

    let mut pooled = vec![0.0f32; first.len()];
    for token in tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    pooled
}
