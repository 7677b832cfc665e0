//! Tests for the ask command

use complaint_rag::commands::ask;
use httpmock::prelude::*;
use serde_json::json;

use crate::{build_corpus, local_config};

#[tokio::test]
async fn test_ask_returns_answer_with_k_sources() {
    let server = MockServer::start_async().await;
    let llm = server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .json_body(json!([{ "generated_text": "The lender refused early payoff." }]));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());
    build_corpus(&config).await;

    let answer = ask::run(
        &config,
        "why was my early payoff refused?",
        Some(2),
        Some("hf_test".into()),
        true,
    )
    .await
    .unwrap();

    llm.assert_calls(1);
    assert_eq!(answer.text, "The lender refused early payoff.");
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn test_ask_without_token_makes_no_calls() {
    let server = MockServer::start_async().await;
    let llm = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());

    let err = ask::run(&config, "anything?", None, None, false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("HUGGINGFACEHUB_API_TOKEN"));
    llm.assert_calls(0);
}

#[tokio::test]
async fn test_ask_rejects_blank_question() {
    let server = MockServer::start_async().await;
    let llm = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());
    build_corpus(&config).await;

    let result = ask::run(&config, "   ", None, Some("hf_test".into()), false).await;

    assert!(result.is_err());
    llm.assert_calls(0);
}
