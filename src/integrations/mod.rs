//! External integrations module.
//!
//! Provides the Hugging Face Inference API client used for text generation
//! and feature extraction.

pub mod huggingface;

pub use huggingface::{GenerationParameters, HuggingFaceClient};
