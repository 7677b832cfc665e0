//! `ask`: answer a single question and exit.

use anyhow::Result;
use serde_json::json;

use super::format_sources;
use crate::config::Config;
use crate::rag::{Answer, RagPipeline};

pub async fn run(
    config: &Config,
    question: &str,
    k: Option<usize>,
    token: Option<String>,
    as_json: bool,
) -> Result<Answer> {
    let mut pipeline = RagPipeline::from_config(config, token.as_deref()).await?;
    if let Some(k) = k {
        pipeline.set_k(k);
    }

    let answer = pipeline.ask(question).await?;

    if as_json {
        let payload = json!({
            "question": question,
            "answer": answer.text,
            "sources": answer.sources,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}\n", answer.text);
        print!("{}", format_sources(&answer.sources));
    }

    Ok(answer)
}
