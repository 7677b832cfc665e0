//! Retrieval-augmented answering over complaint chunks.

pub mod chunker;
pub mod generator;
pub mod indexer;
pub mod pipeline;
pub mod retriever;

pub use chunker::{ChunkMetadata, Chunker, ComplaintChunk};
pub use generator::{Answer, AnswerGenerator};
pub use indexer::{build_index, BuildOptions, BuildReport};
pub use pipeline::RagPipeline;
pub use retriever::Retriever;
