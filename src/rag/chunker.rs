//! Recursive character splitting of complaint narratives.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{CHUNK_OVERLAP, CHUNK_SIZE};
use crate::corpus::{ProcessedComplaint, ProductCategory};
use crate::error::{Error, Result};

/// Boundary preference: paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

const UNKNOWN: &str = "Unknown";

/// Metadata stored with every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub complaint_id: String,
    pub product_category: ProductCategory,
    pub issue: String,
    pub company: String,
    /// Position of the chunk within its narrative
    pub chunk_index: usize,
}

/// A retrieval unit: chunk text plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits text into chunks of at most `chunk_size` characters, carrying up
/// to `chunk_overlap` characters from the end of one chunk into the next.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Chunker {
    /// Create a chunker with the default separators.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(chunk_size, chunk_overlap, &DEFAULT_SEPARATORS)
    }

    /// Create a chunker with a custom separator list, tried in order.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &[&str],
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Split text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Iterate over the chunks of `text`; call again to restart.
    ///
    /// The chunks of one text are materialized before iteration starts.
    /// Laziness is per narrative: callers chain narratives with `flat_map`.
    pub fn chunks<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.split_text(text).into_iter()
    }

    /// Chunk a processed complaint and attach its metadata.
    pub fn chunk_complaint(&self, complaint: &ProcessedComplaint) -> Vec<ComplaintChunk> {
        let complaint_id = non_blank(complaint.complaint_id.as_deref());
        let issue = non_blank(complaint.issue.as_deref());
        let company = non_blank(complaint.company.as_deref());

        self.chunks(&complaint.cleaned_narrative)
            .enumerate()
            .map(|(chunk_index, text)| ComplaintChunk {
                text,
                metadata: ChunkMetadata {
                    complaint_id: complaint_id.clone(),
                    product_category: complaint.standardized_product,
                    issue: issue.clone(),
                    company: company.clone(),
                    chunk_index,
                },
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut output = Vec::new();
        let mut short_pieces = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                output.extend(self.merge_pieces(std::mem::take(&mut short_pieces)));
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    output.push(trimmed.to_string());
                }
            } else {
                output.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            output.extend(self.merge_pieces(short_pieces));
        }

        output
    }

    /// Greedily pack pieces into chunks, keeping a tail of up to
    /// `chunk_overlap` characters as the start of the next chunk.
    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of {} characters, longer than {}",
                        total, self.chunk_size
                    );
                }
                push_joined(&mut chunks, &window);

                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(&front),
                        None => break,
                    }
                }
            }

            total += len;
            window.push_back(piece);
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into characters. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut parts = text.split(separator);
    if let Some(first) = parts.next() {
        if !first.is_empty() {
            pieces.push(first.to_string());
        }
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<String>) {
    let joined: String = window.iter().map(String::as_str).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn non_blank(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
