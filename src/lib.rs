//! Complaint RAG library
//!
//! This library provides tools to:
//! - Filter and clean the CFPB complaint export into four product categories
//! - Split narratives into overlapping chunks carrying complaint metadata
//! - Embed chunks and store them in a local or Qdrant vector index
//! - Retrieve the closest chunks and answer questions with a hosted LLM

pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod integrations;
pub mod metrics;
pub mod prompts;
pub mod rag;
pub mod session;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use integrations::HuggingFaceClient;
pub use prompts::{load_prompt, Prompt};
pub use rag::RagPipeline;
pub use session::ChatSession;

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
