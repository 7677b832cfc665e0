//! Tests for the interactive chat loop

use complaint_rag::commands::chat::{answer_turn, repl};
use complaint_rag::session::Role;
use complaint_rag::{ChatSession, RagPipeline};
use httpmock::prelude::*;
use serde_json::json;

use crate::{build_corpus, local_config};

#[tokio::test]
async fn test_chat_records_successful_exchanges() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .json_body(json!([{ "generated_text": "Annual fees are the main issue." }]));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());
    build_corpus(&config).await;
    let pipeline = RagPipeline::from_config(&config, Some("hf_test"))
        .await
        .unwrap();

    let mut session = ChatSession::new();
    let mut input: &[u8] = b"what about card fees?\n\n/history\n/quit\nnever read\n";
    let mut output = Vec::new();

    repl(&pipeline, &mut session, &mut input, &mut output)
        .await
        .unwrap();

    let transcript = String::from_utf8(output).unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.messages()[1].content, "Annual fees are the main issue.");
    assert!(transcript.contains("Source 1"));
    assert!(transcript.contains("[user] what about card fees?"));
    assert!(transcript.ends_with("Bye.\n"));
}

#[tokio::test]
async fn test_chat_failed_turn_leaves_history_untouched() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST);
        then.status(503).body("model is loading");
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());
    build_corpus(&config).await;
    let pipeline = RagPipeline::from_config(&config, Some("hf_test"))
        .await
        .unwrap();

    let mut session = ChatSession::new();
    assert!(answer_turn(&pipeline, &mut session, "is anyone there?")
        .await
        .is_err());
    assert!(session.is_empty());

    let mut input: &[u8] = b"still broken?\n";
    let mut output = Vec::new();
    repl(&pipeline, &mut session, &mut input, &mut output)
        .await
        .unwrap();

    assert!(session.is_empty());
    assert!(String::from_utf8(output).unwrap().contains("Error:"));
}

#[tokio::test]
async fn test_chat_clear_empties_session() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .json_body(json!([{ "generated_text": "ok" }]));
    });

    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), &server.base_url());
    build_corpus(&config).await;
    let pipeline = RagPipeline::from_config(&config, Some("hf_test"))
        .await
        .unwrap();

    let mut session = ChatSession::new();
    let mut input: &[u8] = b"first question\n/clear\n";
    let mut output = Vec::new();
    repl(&pipeline, &mut session, &mut input, &mut output)
        .await
        .unwrap();

    assert!(session.is_empty());
}
