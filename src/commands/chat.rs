//! `chat`: interactive question answering with a session history.

use std::io::Write;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

use super::format_sources;
use crate::config::{Config, TOKEN_ENV};
use crate::rag::{Answer, RagPipeline};
use crate::session::ChatSession;

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Clear,
    History,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatCommand::Empty;
        }
        match line {
            "/clear" => ChatCommand::Clear,
            "/history" => ChatCommand::History,
            "/quit" | "/exit" => ChatCommand::Quit,
            other if other.starts_with('/') => ChatCommand::Unknown(other.to_string()),
            other => ChatCommand::Ask(other.to_string()),
        }
    }
}

pub async fn run(config: &Config, k: Option<usize>, token: Option<String>) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    let token = match token {
        Some(token) => token,
        None => prompt_for_token(&mut stdin, &mut stdout).await?,
    };

    let mut pipeline = RagPipeline::from_config(config, Some(&token)).await?;
    if let Some(k) = k {
        pipeline.set_k(k);
    }

    let mut session = ChatSession::new();
    repl(&pipeline, &mut session, &mut stdin, &mut stdout).await
}

/// Ask for the API token until a non-blank one is entered.
pub async fn prompt_for_token<R, W>(reader: &mut R, writer: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(writer, "{} is not set. Enter your Hugging Face token: ", TOKEN_ENV)?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            bail!("no API token provided");
        }
        let token = line.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }
}

/// Answer one question; the exchange is recorded only if it succeeds.
pub async fn answer_turn(
    pipeline: &RagPipeline,
    session: &mut ChatSession,
    question: &str,
) -> crate::Result<Answer> {
    let answer = pipeline.ask(question).await?;
    session.record_exchange(question, answer.text.clone(), answer.sources.clone());
    Ok(answer)
}

/// Read commands until `/quit` or end of input.
pub async fn repl<R, W>(
    pipeline: &RagPipeline,
    session: &mut ChatSession,
    reader: &mut R,
    writer: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        writer,
        "Ask about customer complaints. Commands: /clear, /history, /quit"
    )?;

    let mut line = String::new();
    loop {
        write!(writer, "> ")?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Quit => break,
            ChatCommand::Clear => {
                session.clear();
                writeln!(writer, "Conversation cleared.")?;
            }
            ChatCommand::History => {
                if session.is_empty() {
                    writeln!(writer, "No messages yet.")?;
                }
                for message in session.messages() {
                    writeln!(writer, "[{}] {}", message.role, message.content)?;
                }
            }
            ChatCommand::Unknown(cmd) => {
                writeln!(writer, "Unknown command {}", cmd)?;
            }
            ChatCommand::Ask(question) => match answer_turn(pipeline, session, &question).await {
                Ok(answer) => {
                    writeln!(writer, "\n{}\n", answer.text)?;
                    write!(writer, "{}", format_sources(&answer.sources))?;
                }
                Err(err) => {
                    warn!("Question failed: {}", err);
                    writeln!(writer, "Error: {}", err)?;
                }
            },
        }
    }

    writeln!(writer, "Bye.")?;
    Ok(())
}
