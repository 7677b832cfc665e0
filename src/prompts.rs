//! Prompt templates for answer generation.
//!
//! The built-in template can be overridden by a Markdown file in `prompts/`.

use std::path::PathBuf;

use tracing::debug;

use crate::{Error, Result};

/// Built-in analyst prompt. `{context}` and `{question}` are substituted.
pub const COMPLAINT_ANALYST_TEMPLATE: &str = "\
You are a financial analyst assistant for CrediTrust.
Your task is to answer questions about customer complaints.
Use the following retrieved complaint excerpts to formulate your answer.
If the context doesn't contain the answer, state that you don't have enough information.

CONTEXT:
{context}

QUESTION:
{question}

ANSWER:";

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Grounded answers over retrieved complaint excerpts.
    ComplaintAnalyst,
}

impl Prompt {
    /// Override file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::ComplaintAnalyst => "complaint_analyst.md",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            Prompt::ComplaintAnalyst => COMPLAINT_ANALYST_TEMPLATE,
        }
    }

    /// Override file contents if present, else the built-in template.
    pub fn load_or_default(&self) -> String {
        match load_prompt(self.filename()) {
            Ok(template) if !template.trim().is_empty() => {
                debug!("Using prompt override {}", self.filename());
                template
            }
            _ => self.default_template().to_string(),
        }
    }
}

/// Load a prompt by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e)))
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [PathBuf::from("prompts"), PathBuf::from("../prompts")];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// Fill `{context}` and `{question}`. Each placeholder is replaced once, in
/// a single pass, so braces inside complaint text are left untouched.
pub fn render(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
