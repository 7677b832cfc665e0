//! Grounded answer generation via the hosted LLM.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, TOKEN_ENV};
use crate::error::{Error, Result};
use crate::index::SearchHit;
use crate::integrations::{GenerationParameters, HuggingFaceClient};
use crate::metrics;
use crate::prompts::{self, Prompt};

/// Generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
}

pub struct AnswerGenerator {
    client: HuggingFaceClient,
    model: String,
    parameters: GenerationParameters,
    template: String,
}

impl AnswerGenerator {
    pub fn new(client: HuggingFaceClient, model: &str, parameters: GenerationParameters) -> Self {
        Self {
            client,
            model: model.to_string(),
            parameters,
            template: Prompt::ComplaintAnalyst.load_or_default(),
        }
    }

    /// Build from config. A missing or blank token fails here, before any
    /// request is made.
    pub fn from_config(config: &Config, token: Option<&str>) -> Result<Self> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::MissingCredential(format!("{} is not set", TOKEN_ENV)))?;
        let client = HuggingFaceClient::with_base_url(token, &config.llm.base_url)?;

        Ok(Self::new(
            client,
            &config.llm.repo_id,
            GenerationParameters::from(&config.llm),
        ))
    }

    /// Replace the prompt template (must contain `{context}` and `{question}`).
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The prompt sent for `question` with `hits` as context.
    pub fn render_prompt(&self, question: &str, hits: &[SearchHit]) -> String {
        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        prompts::render(&self.template, &context, question)
    }

    pub async fn generate(&self, question: &str, hits: Vec<SearchHit>) -> Result<Answer> {
        let prompt = self.render_prompt(question, &hits);
        debug!("Prompt is {} characters", prompt.len());

        let started = Instant::now();
        let result = self
            .client
            .text_generation(&self.model, &prompt, &self.parameters)
            .await;
        metrics::record_llm_request(started.elapsed(), result.is_ok());

        let text = result?;
        info!(
            "Generated answer from {} sources in {:.1}s",
            hits.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(Answer {
            text,
            sources: hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ProductCategory;
    use crate::rag::chunker::{ChunkMetadata, ComplaintChunk};
    use httpmock::prelude::*;
    use serde_json::json;

    fn hit(id: u64, text: &str) -> SearchHit {
        SearchHit {
            id,
            chunk: ComplaintChunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    complaint_id: id.to_string(),
                    product_category: ProductCategory::CreditCard,
                    issue: "Billing".into(),
                    company: "Card Co".into(),
                    chunk_index: 0,
                },
            },
            score: 0.9,
        }
    }

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::defaults();
        config.llm.base_url = server.base_url();
        config
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let any = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!([{ "generated_text": "x" }]));
        });

        let config = config_for(&server);
        let err = AnswerGenerator::from_config(&config, None).err().unwrap();
        assert!(matches!(err, Error::MissingCredential(_)));

        let err = AnswerGenerator::from_config(&config, Some("   ")).err().unwrap();
        assert!(matches!(err, Error::MissingCredential(_)));

        any.assert_calls(0);
    }

    #[tokio::test]
    async fn prompt_embeds_every_chunk_verbatim() {
        let server = MockServer::start_async().await;
        let generator = AnswerGenerator::from_config(&config_for(&server), Some("hf_test"))
            .unwrap()
            .with_template(prompts::COMPLAINT_ANALYST_TEMPLATE);

        let prompt = generator.render_prompt(
            "What do people say about fees?",
            &[hit(0, "fee charged twice"), hit(1, "annual fee {waived}")],
        );

        assert!(prompt.contains("CONTEXT:\nfee charged twice\n\nannual fee {waived}\n\nQUESTION:"));
        assert!(prompt.contains("QUESTION:\nWhat do people say about fees?"));
    }

    #[tokio::test]
    async fn generate_returns_answer_with_sources() {
        let server = MockServer::start_async().await;
        let gen_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/mistralai/Mistral-7B-Instruct-v0.2")
                .matches(|req| {
                    String::from_utf8_lossy(req.body().as_ref()).contains("late payment")
                });
            then.status(200)
                .json_body(json!([{ "generated_text": "Customers report late payment fees." }]));
        });

        let generator = AnswerGenerator::from_config(&config_for(&server), Some("hf_test")).unwrap();
        let answer = generator
            .generate("Why complain?", vec![hit(3, "late payment fee")])
            .await
            .unwrap();

        assert_eq!(answer.text, "Customers report late payment fees.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].id, 3);
        gen_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn endpoint_failure_is_surfaced() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(401).body("invalid token");
        });

        let generator = AnswerGenerator::from_config(&config_for(&server), Some("bad")).unwrap();
        let err = generator.generate("q", vec![hit(0, "c")]).await.unwrap_err();
        assert!(matches!(err, Error::LlmError(_)));
    }
}
